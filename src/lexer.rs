// Copyright 2018 The remagic Project Developers.
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
// THE SOFTWARE.

//! Tokenizer for the "magic" pattern dialect.
//!
//! One byte of the pattern (or a backslash pair) becomes one [`Token`],
//! either a literal byte or a special operator character. Which punctuation
//! is special depends on the dialect flag, on position (`^` and `*` only act
//! as operators in certain places, `$` only before an alternation boundary or
//! the end), and on a preceding backslash, which toggles the specialness of
//! any character in the [`META`] set.

/// Every character whose specialness a backslash can toggle. `^` and `$` are
/// deliberately absent: their operator status is positional only, and `\^`,
/// `\$` always mean the literal character.
const META: &[u8] = b".[]()|=+*<>iIkKfFpPsSdDxXoOwWhHaAlLuU123456789{}~";

/// Escapes that keep their meaning inside a bracket expression.
pub(crate) const INRANGE: &[u8] = b"]^-\\";

/// Backslash-letter escapes that decode to control bytes in any dialect.
pub(crate) const ABBR: &[u8] = b"rteb";

/// One logical pattern character.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Token {
    /// An ordinary byte to be matched as itself.
    Literal(u8),
    /// An operator character, identified by its un-escaped form.
    Special(u8),
}

fn toggle(tok: Token) -> Token {
    match tok {
        Token::Literal(b) => Token::Special(b),
        Token::Special(b) => Token::Literal(b),
    }
}

/// Decode `\r`, `\t`, `\e`, `\b` to their control byte.
pub(crate) fn abbr_byte(c: u8) -> Option<u8> {
    match c {
        b'r' => Some(0x0D),
        b't' => Some(0x09),
        b'e' => Some(0x1B),
        b'b' => Some(0x08),
        _ => None,
    }
}

#[derive(Clone, Copy)]
struct State {
    pos: usize,
    at_start: bool,
    prev_at_start: bool,
    prev: Option<Token>,
}

/// A token cursor over a pattern string.
///
/// Tokens are computed on demand from the cursor state, so [`Lexer::peek`]
/// never commits to anything. [`Lexer::push_back`] undoes the most recent
/// [`Lexer::next_token`] and is usable once per consumed token. The bracket
/// and repetition-bounds parsers read raw bytes instead of tokens; they use
/// [`Lexer::rest`] and [`Lexer::bump`] to keep the cursor honest.
pub(crate) struct Lexer<'a> {
    pat: &'a [u8],
    pos: usize,
    magic: bool,
    at_start: bool,
    prev_at_start: bool,
    prev: Option<Token>,
    saved: Option<State>,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(pattern: &'a str, magic: bool) -> Lexer<'a> {
        Lexer {
            pat: pattern.as_bytes(),
            pos: 0,
            magic,
            at_start: true,
            prev_at_start: false,
            prev: None,
            saved: None,
        }
    }

    pub(crate) fn magic(&self) -> bool {
        self.magic
    }

    /// The token at the cursor, without consuming it.
    pub(crate) fn peek(&self) -> Option<Token> {
        self.lex().map(|(tok, _)| tok)
    }

    /// Consume and return the token at the cursor.
    pub(crate) fn next_token(&mut self) -> Option<Token> {
        let (tok, len) = self.lex()?;
        self.saved = Some(State {
            pos: self.pos,
            at_start: self.at_start,
            prev_at_start: self.prev_at_start,
            prev: self.prev,
        });
        self.pos += len;
        self.prev_at_start = self.at_start;
        // "^" regains its anchor meaning after an open group or an
        // alternation bar.
        self.at_start = matches!(tok, Token::Special(b'(') | Token::Special(b'|'));
        self.prev = Some(tok);
        Some(tok)
    }

    /// Undo the most recent `next_token`.
    pub(crate) fn push_back(&mut self) {
        debug_assert!(self.saved.is_some());
        if let Some(state) = self.saved.take() {
            self.pos = state.pos;
            self.at_start = state.at_start;
            self.prev_at_start = state.prev_at_start;
            self.prev = state.prev;
        }
    }

    /// The raw unconsumed bytes at the cursor.
    pub(crate) fn rest(&self) -> &'a [u8] {
        &self.pat[self.pos..]
    }

    /// Advance the cursor over `n` raw bytes consumed outside the token
    /// machinery. Clears the pushback slot and any anchor context.
    pub(crate) fn bump(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.pat.len());
        self.prev_at_start = self.at_start;
        self.at_start = false;
        self.prev = None;
        self.saved = None;
    }

    fn lex(&self) -> Option<(Token, usize)> {
        self.lex_at(self.pos, self.at_start, self.prev_at_start)
    }

    fn lex_at(&self, pos: usize, at_start: bool, prev_at_start: bool) -> Option<(Token, usize)> {
        let b = *self.pat.get(pos)?;
        let tok = match b {
            b'*' => {
                // A star at the pattern start, or right after an anchoring
                // "^", repeats nothing and stays a literal.
                let operator = self.magic
                    && !at_start
                    && !(prev_at_start && self.prev == Some(Token::Special(b'^')));
                if operator {
                    Token::Special(b'*')
                } else {
                    Token::Literal(b'*')
                }
            }
            b'^' => {
                if at_start {
                    Token::Special(b'^')
                } else {
                    Token::Literal(b'^')
                }
            }
            b'$' => {
                // "$" anchors only at the very end or in front of "\|", "\)".
                let at_end = match self.pat.get(pos + 1) {
                    None => true,
                    Some(&b'\\') => {
                        matches!(self.pat.get(pos + 2), Some(&b'|') | Some(&b')'))
                    }
                    Some(_) => false,
                };
                if at_end {
                    Token::Special(b'$')
                } else {
                    Token::Literal(b'$')
                }
            }
            b'.' | b'[' | b']' | b'~' => {
                if self.magic {
                    Token::Special(b)
                } else {
                    Token::Literal(b)
                }
            }
            b'\\' => {
                return match self.pat.get(pos + 1) {
                    // A trailing backslash stands for itself.
                    None => Some((Token::Literal(b'\\'), 1)),
                    Some(&c) if META.contains(&c) => {
                        // Evaluate the bare character in place, then flip it.
                        // The inner position never counts as "at start", so
                        // an escaped star is a literal even at the front of
                        // the pattern.
                        let (inner, len) = self.lex_at(pos + 1, false, at_start)?;
                        Some((toggle(inner), 1 + len))
                    }
                    Some(&c) => match abbr_byte(c) {
                        Some(ctrl) => Some((Token::Literal(ctrl), 2)),
                        // Unknown escapes fail soft to the escaped character.
                        None => Some((Token::Literal(c), 2)),
                    },
                };
            }
            _ => Token::Literal(b),
        };
        Some((tok, 1))
    }
}

/// Skip the body of a bracket expression. `i` indexes the byte after the
/// opening `[`. Returns the index of the terminating `]`, or `None` when the
/// expression is unterminated.
///
/// Mirrors the member rules of the real bracket parser: a leading `^` then a
/// leading `]` or `-` are members, `x-y` consumes the range end, `\` escapes
/// the in-range set and the control abbreviations, and `[:name:]` classes are
/// stepped over whole so a `]` inside one does not terminate.
pub(crate) fn skip_bracket(bytes: &[u8], mut i: usize) -> Option<usize> {
    if bytes.get(i) == Some(&b'^') {
        i += 1;
    }
    if matches!(bytes.get(i), Some(&b']') | Some(&b'-')) {
        i += 1;
    }
    while let Some(&b) = bytes.get(i) {
        match b {
            b']' => return Some(i),
            b'-' => {
                i += 1;
                if !matches!(bytes.get(i), None | Some(&b']')) {
                    i += 1;
                }
            }
            b'\\'
                if matches!(bytes.get(i + 1),
                    Some(c) if INRANGE.contains(c) || ABBR.contains(c)) =>
            {
                i += 2;
            }
            b'[' => match crate::classify::scan_bracket_class(&bytes[i..]) {
                Some((_, len)) => i += len,
                None => i += 1,
            },
            _ => i += 1,
        }
    }
    None
}

/// Scan forward over a pattern embedded in a larger command line, stopping at
/// the first unescaped `delimiter` byte. Returns the index of the delimiter,
/// or `text.len()` if none is found.
///
/// Honors backslash escapes and bracket expressions (a delimiter inside
/// `[...]` does not terminate) without compiling the pattern, so callers can
/// carve the pattern out of something like `s/pat/replacement/` first and
/// compile it afterwards.
pub fn skip_to_delimiter(text: &str, delimiter: u8, magic: bool) -> usize {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == delimiter {
            break;
        }
        // The bracket body starts after the "[", which in the non-magic
        // dialect sits one byte further, behind its backslash.
        let body = if b == b'[' && magic {
            Some(i + 1)
        } else if b == b'\\' && bytes.get(i + 1) == Some(&b'[') && !magic {
            Some(i + 2)
        } else {
            None
        };
        if let Some(start) = body {
            match skip_bracket(bytes, start) {
                Some(close) => i = close,
                None => return bytes.len(),
            }
        } else if b == b'\\' && i + 1 < bytes.len() {
            i += 1;
        }
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(pattern: &str, magic: bool) -> Vec<Token> {
        let mut lexer = Lexer::new(pattern, magic);
        let mut out = Vec::new();
        while let Some(tok) = lexer.next_token() {
            out.push(tok);
        }
        out
    }

    use Token::{Literal, Special};

    #[test]
    fn magic_defaults() {
        assert_eq!(
            tokens("a.[~", true),
            vec![Literal(b'a'), Special(b'.'), Special(b'['), Special(b'~')]
        );
        assert_eq!(
            tokens("a.[~", false),
            vec![Literal(b'a'), Literal(b'.'), Literal(b'['), Literal(b'~')]
        );
    }

    #[test]
    fn backslash_toggles_meta() {
        assert_eq!(tokens("\\.", true), vec![Literal(b'.')]);
        assert_eq!(tokens("\\.", false), vec![Special(b'.')]);
        assert_eq!(tokens("(", true), vec![Literal(b'(')]);
        assert_eq!(tokens("\\(", true), vec![Special(b'(')]);
        assert_eq!(tokens("\\(", false), vec![Special(b'(')]);
        assert_eq!(tokens("\\{", true), vec![Special(b'{')]);
        assert_eq!(tokens("\\i\\2", true), vec![Special(b'i'), Special(b'2')]);
    }

    #[test]
    fn star_positions() {
        assert_eq!(tokens("*a*", true), vec![Literal(b'*'), Literal(b'a'), Special(b'*')]);
        assert_eq!(tokens("^*", true), vec![Special(b'^'), Literal(b'*')]);
        assert_eq!(tokens("a*", false), vec![Literal(b'a'), Literal(b'*')]);
        assert_eq!(tokens("a\\*", false), vec![Literal(b'a'), Special(b'*')]);
        // An escaped star is literal even where a bare one would repeat.
        assert_eq!(tokens("a\\*", true), vec![Literal(b'a'), Literal(b'*')]);
        // After "\(" or "\|" a star repeats nothing.
        assert_eq!(
            tokens("\\(*", true),
            vec![Special(b'('), Literal(b'*')]
        );
    }

    #[test]
    fn caret_positions() {
        assert_eq!(tokens("^a^", true), vec![Special(b'^'), Literal(b'a'), Literal(b'^')]);
        assert_eq!(
            tokens("\\|^", true),
            vec![Special(b'|'), Special(b'^')]
        );
        assert_eq!(tokens("\\(^", true), vec![Special(b'('), Special(b'^')]);
        assert_eq!(tokens("\\^", true), vec![Literal(b'^')]);
    }

    #[test]
    fn dollar_positions() {
        assert_eq!(tokens("a$", true), vec![Literal(b'a'), Special(b'$')]);
        assert_eq!(tokens("a$b", true), vec![Literal(b'a'), Literal(b'$'), Literal(b'b')]);
        assert_eq!(
            tokens("a$\\|b", true),
            vec![Literal(b'a'), Special(b'$'), Special(b'|'), Literal(b'b')]
        );
        assert_eq!(
            tokens("\\($\\)", true),
            vec![Special(b'('), Special(b'$'), Special(b')')]
        );
        assert_eq!(tokens("\\$", true), vec![Literal(b'$')]);
    }

    #[test]
    fn control_abbreviations() {
        assert_eq!(
            tokens("\\r\\t\\e\\b", true),
            vec![Literal(0x0D), Literal(0x09), Literal(0x1B), Literal(0x08)]
        );
    }

    #[test]
    fn unknown_escape_fails_soft() {
        assert_eq!(tokens("\\q", true), vec![Literal(b'q')]);
        assert_eq!(tokens("\\\\", true), vec![Literal(b'\\')]);
        assert_eq!(tokens("\\", true), vec![Literal(b'\\')]);
    }

    #[test]
    fn pushback_replays_one_token() {
        let mut lexer = Lexer::new("ab", true);
        assert_eq!(lexer.next_token(), Some(Literal(b'a')));
        assert_eq!(lexer.next_token(), Some(Literal(b'b')));
        lexer.push_back();
        assert_eq!(lexer.peek(), Some(Literal(b'b')));
        assert_eq!(lexer.next_token(), Some(Literal(b'b')));
        assert_eq!(lexer.next_token(), None);
    }

    #[test]
    fn skip_bracket_members() {
        assert_eq!(skip_bracket(b"abc]", 0), Some(3));
        assert_eq!(skip_bracket(b"]abc]", 0), Some(4));
        assert_eq!(skip_bracket(b"^]a]", 0), Some(3));
        assert_eq!(skip_bracket(b"a-z]", 0), Some(3));
        assert_eq!(skip_bracket(b"\\]]", 0), Some(2));
        assert_eq!(skip_bracket(b"[:alpha:]x]", 0), Some(10));
        assert_eq!(skip_bracket(b"abc", 0), None);
    }

    #[test]
    fn delimiter_scan() {
        assert_eq!(skip_to_delimiter("foo/bar", b'/', true), 3);
        assert_eq!(skip_to_delimiter("a\\/b/c", b'/', true), 4);
        assert_eq!(skip_to_delimiter("x[a/]y/z", b'/', true), 6);
        assert_eq!(skip_to_delimiter("x\\[a/]y/z", b'/', false), 7);
        // In the magic dialect "\[" is a literal bracket, so the slash ends
        // the pattern.
        assert_eq!(skip_to_delimiter("x\\[a/]y/z", b'/', true), 4);
        assert_eq!(skip_to_delimiter("[a/bc", b'/', true), 5);
        assert_eq!(skip_to_delimiter("no delimiter", b'/', true), 12);
    }

    #[test]
    fn delimiter_scan_honors_leading_members() {
        // A "]" right after the opening "[" is a member, in both dialects,
        // so the delimiter inside the body does not end the pattern.
        assert_eq!(skip_to_delimiter("x[]a/c]y/z", b'/', true), 8);
        assert_eq!(skip_to_delimiter("x\\[]a/c]y/z", b'/', false), 9);
        assert_eq!(skip_to_delimiter("x\\[^]a/c]y/z", b'/', false), 10);
    }
}
