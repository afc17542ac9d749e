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

//! Recursive-descent pattern compiler.
//!
//! The grammar has one function per precedence level: `expression` handles
//! alternation and group numbering, `branch` concatenation, `piece` an atom
//! with an optional quantifier, and `atom` everything else. Nodes are pushed
//! into the program arena as they are parsed; dangling `next` links are
//! resolved by [`Compiler::tail`] exactly the way a chain converges on its
//! continuation, so a finished program never dangles.

use log::debug;

use crate::classify;
use crate::error::{CompileError, Result};
use crate::lexer::{abbr_byte, skip_bracket, Lexer, Token, INRANGE};
use crate::program::{Bytes, Node, NodeIx, Op, Prog, MAX_COMPLEX, MAX_LIMIT, NSUBEXP, PROG_MAGIC};

/// The class-atom letters, uppercase meaning "negated" or "excluding digits".
const CLASS_LETTERS: &[u8] = b"iIkKfFpPsSdDxXoOwWhHaAlLuU";

fn class_op(c: u8) -> Op {
    match c {
        b'i' => Op::Ident,
        b'I' => Op::SIdent,
        b'k' => Op::Kword,
        b'K' => Op::SKword,
        b'f' => Op::Fname,
        b'F' => Op::SFname,
        b'p' => Op::Print,
        b'P' => Op::SPrint,
        b's' => Op::White,
        b'S' => Op::NWhite,
        b'd' => Op::Digit,
        b'D' => Op::NDigit,
        b'x' => Op::Hex,
        b'X' => Op::NHex,
        b'o' => Op::Octal,
        b'O' => Op::NOctal,
        b'w' => Op::Word,
        b'W' => Op::NWord,
        b'h' => Op::Head,
        b'H' => Op::NHead,
        b'a' => Op::Alpha,
        b'A' => Op::NAlpha,
        b'l' => Op::Lower,
        b'L' => Op::NLower,
        b'u' => Op::Upper,
        b'U' => Op::NUpper,
        _ => Op::Nothing,
    }
}

fn is_multi(tok: Token) -> bool {
    matches!(
        tok,
        Token::Special(b'*') | Token::Special(b'+') | Token::Special(b'=') | Token::Special(b'{')
    )
}

/// What the parser learned about a sub-expression, used to validate
/// quantifiers and to drive the post-compile optimizer.
#[derive(Clone, Copy, Default)]
struct Flags {
    /// Known to match at least one byte.
    has_width: bool,
    /// A single fixed-width node, eligible for the fast repetition opcodes.
    simple: bool,
    /// Starts with a repetition, so an unanchored scan is expensive.
    star_start: bool,
}

struct Compiler<'a> {
    lexer: Lexer<'a>,
    nodes: Vec<Node>,
    /// Next capture group number to hand out.
    ngroup: u8,
    /// Complex bounded-repetition slots used so far.
    ncomplex: u8,
    prev_subst: Option<&'a str>,
}

/// Compile `pattern` into a program. `prev_subst` is the previously
/// substituted text the `~` atom expands to.
pub(crate) fn compile(pattern: &str, magic: bool, prev_subst: Option<&str>) -> Result<Prog> {
    let mut compiler = Compiler {
        lexer: Lexer::new(pattern, magic),
        nodes: Vec::new(),
        ngroup: 1,
        ncomplex: 0,
        prev_subst,
    };
    let (start, flags) = compiler.expression(false)?;
    let mut prog = Prog {
        check: PROG_MAGIC,
        nodes: compiler.nodes,
        start,
        anchored: false,
        start_byte: None,
        must: None,
    };
    optimize(&mut prog, flags);
    debug!(
        "compiled {} nodes; anchored={} start_byte={:?} must={:?}",
        prog.nodes.len(),
        prog.anchored,
        prog.start_byte.map(char::from),
        prog.must.as_deref().map(String::from_utf8_lossy),
    );
    Ok(prog)
}

impl<'a> Compiler<'a> {
    fn emit(&mut self, op: Op) -> NodeIx {
        let ix = self.nodes.len();
        self.nodes.push(Node { op, next: None });
        ix
    }

    /// Walk the chain starting at `from` to its dangling end and point that
    /// end at `to`.
    fn tail(&mut self, from: NodeIx, to: NodeIx) {
        let mut scan = from;
        while let Some(next) = self.nodes[scan].next {
            scan = next;
        }
        self.nodes[scan].next = Some(to);
    }

    /// Like `tail`, but on the operand chain, and only for the node kinds
    /// whose operand is an open-ended chain.
    fn operand_tail(&mut self, ix: NodeIx, to: NodeIx) {
        match self.nodes[ix].op {
            Op::Branch { operand } | Op::BraceComplex { operand, .. } => self.tail(operand, to),
            _ => {}
        }
    }

    /// Render a quantifier character the way the pattern spelled it, for
    /// error messages.
    fn multi_fragment(&self, op: u8) -> String {
        if self.lexer.magic() {
            char::from(op).to_string()
        } else {
            format!("\\{}", char::from(op))
        }
    }

    /// `expression := branch ('|' branch)*`, wrapped in a capture group pair
    /// when `paren` is set.
    fn expression(&mut self, paren: bool) -> Result<(NodeIx, Flags)> {
        let mut flags = Flags {
            has_width: true,
            ..Flags::default()
        };

        let parno = if paren {
            if usize::from(self.ngroup) >= NSUBEXP {
                return Err(CompileError::TooManyGroups.into());
            }
            let n = self.ngroup;
            self.ngroup += 1;
            Some(n)
        } else {
            None
        };
        let mopen = parno.map(|n| self.emit(Op::Mopen(n)));

        let (br, bflags) = self.branch()?;
        let ret = match mopen {
            Some(m) => {
                self.tail(m, br);
                m
            }
            None => br,
        };
        flags.has_width &= bflags.has_width;
        flags.star_start |= bflags.star_start;
        while self.lexer.peek() == Some(Token::Special(b'|')) {
            self.lexer.next_token();
            let (br, bflags) = self.branch()?;
            self.tail(ret, br);
            flags.has_width &= bflags.has_width;
            flags.star_start |= bflags.star_start;
        }

        let ender = match parno {
            Some(n) => self.emit(Op::Mclose(n)),
            None => self.emit(Op::End),
        };
        self.tail(ret, ender);

        // Hook the loose end of every alternative to the closing node.
        let mut scan = Some(ret);
        while let Some(ix) = scan {
            self.operand_tail(ix, ender);
            scan = self.nodes[ix].next;
        }

        if paren {
            if self.lexer.next_token() != Some(Token::Special(b')')) {
                return Err(CompileError::UnmatchedOpen.into());
            }
        } else if self.lexer.peek() == Some(Token::Special(b')')) {
            return Err(CompileError::UnmatchedClose.into());
        }
        Ok((ret, flags))
    }

    /// `branch := piece*`. Emits the `Branch` node after its pieces so the
    /// operand index is known at construction.
    fn branch(&mut self) -> Result<(NodeIx, Flags)> {
        let mut flags = Flags::default();
        let mut first: Option<NodeIx> = None;
        let mut chain: Option<NodeIx> = None;

        loop {
            match self.lexer.peek() {
                None | Some(Token::Special(b'|')) | Some(Token::Special(b')')) => break,
                Some(_) => {}
            }
            let (latest, pflags) = self.piece()?;
            flags.has_width |= pflags.has_width;
            match chain {
                None => {
                    flags.star_start |= pflags.star_start;
                    first = Some(latest);
                }
                Some(prev) => self.tail(prev, latest),
            }
            chain = Some(latest);
        }

        let operand = match first {
            Some(ix) => ix,
            // An empty branch still needs a traversable node.
            None => self.emit(Op::Nothing),
        };
        let br = self.emit(Op::Branch { operand });
        Ok((br, flags))
    }

    /// `piece := atom quantifier?`.
    fn piece(&mut self) -> Result<(NodeIx, Flags)> {
        let (atom_ix, atom_flags) = self.atom()?;

        let op = match self.lexer.peek() {
            Some(tok) if is_multi(tok) => match tok {
                Token::Special(c) => c,
                Token::Literal(_) => return Err(CompileError::Internal.into()),
            },
            _ => return Ok((atom_ix, atom_flags)),
        };
        if !atom_flags.has_width && op != b'=' {
            return Err(CompileError::RepeatEmpty(self.multi_fragment(op)).into());
        }
        self.lexer.next_token();

        let mut flags = Flags {
            star_start: true,
            ..Flags::default()
        };
        let ret = match op {
            b'*' if atom_flags.simple => self.emit(Op::Star { operand: atom_ix }),
            b'*' => {
                // x* becomes (x&|) where & loops back to the choice.
                let b1 = self.emit(Op::Branch { operand: atom_ix });
                let back = self.emit(Op::Back);
                self.operand_tail(b1, back);
                self.operand_tail(b1, b1);
                let nil = self.emit(Op::Nothing);
                let b2 = self.emit(Op::Branch { operand: nil });
                self.tail(b1, b2);
                self.tail(b1, nil);
                b1
            }
            b'+' if atom_flags.simple => {
                flags = Flags {
                    has_width: true,
                    ..Flags::default()
                };
                self.emit(Op::Plus { operand: atom_ix })
            }
            b'+' => {
                // x+ becomes x(&|): one mandatory pass, then the loop.
                let back = self.emit(Op::Back);
                let b1 = self.emit(Op::Branch { operand: back });
                self.tail(atom_ix, b1);
                self.tail(back, atom_ix);
                let nil = self.emit(Op::Nothing);
                let b2 = self.emit(Op::Branch { operand: nil });
                self.tail(b1, b2);
                self.tail(atom_ix, nil);
                flags = Flags {
                    has_width: true,
                    ..Flags::default()
                };
                atom_ix
            }
            b'=' => {
                // x= becomes (x|).
                let b1 = self.emit(Op::Branch { operand: atom_ix });
                let nil = self.emit(Op::Nothing);
                let b2 = self.emit(Op::Branch { operand: nil });
                self.tail(b1, b2);
                self.tail(b1, nil);
                self.operand_tail(b1, nil);
                b1
            }
            b'{' => {
                let (min, max) = self.read_limits()?;
                let ret = if atom_flags.simple {
                    let bs = self.emit(Op::BraceSimple { operand: atom_ix });
                    let lim = self.emit(Op::BraceLimits { min, max });
                    self.tail(lim, bs);
                    lim
                } else {
                    if usize::from(self.ncomplex) >= MAX_COMPLEX {
                        return Err(CompileError::TooManyComplexRepeats.into());
                    }
                    let bc = self.emit(Op::BraceComplex {
                        slot: self.ncomplex,
                        operand: atom_ix,
                    });
                    let back = self.emit(Op::Back);
                    self.operand_tail(bc, back);
                    self.operand_tail(bc, bc);
                    let lim = self.emit(Op::BraceLimits { min, max });
                    self.tail(lim, bc);
                    self.ncomplex += 1;
                    lim
                };
                if min > 0 && max > 0 {
                    flags = Flags {
                        has_width: true,
                        ..Flags::default()
                    };
                }
                ret
            }
            _ => return Err(CompileError::Internal.into()),
        };

        // A quantifier cannot follow a quantifier.
        if let Some(tok) = self.lexer.peek() {
            if is_multi(tok) {
                let c = match tok {
                    Token::Special(c) | Token::Literal(c) => c,
                };
                return Err(CompileError::StackedRepeat(self.multi_fragment(c)).into());
            }
        }
        Ok((ret, flags))
    }

    fn atom(&mut self) -> Result<(NodeIx, Flags)> {
        let tok = match self.lexer.next_token() {
            Some(tok) => tok,
            None => return Err(CompileError::Internal.into()),
        };
        let mut flags = Flags::default();
        let ix = match tok {
            Token::Special(b'^') => self.emit(Op::Bol),
            Token::Special(b'$') => self.emit(Op::Eol),
            Token::Special(b'<') => self.emit(Op::Bow),
            Token::Special(b'>') => self.emit(Op::Eow),
            Token::Special(b'.') => {
                flags.has_width = true;
                flags.simple = true;
                self.emit(Op::Any)
            }
            Token::Special(c) if CLASS_LETTERS.contains(&c) => {
                flags.has_width = true;
                flags.simple = true;
                self.emit(class_op(c))
            }
            Token::Special(b'(') => {
                let (ix, inner) = self.expression(true)?;
                flags.has_width = inner.has_width;
                flags.star_start = inner.star_start;
                ix
            }
            Token::Special(b'~') => {
                let prev = match self.prev_subst {
                    Some(prev) => prev,
                    None => return Err(CompileError::NoPreviousSubst.into()),
                };
                let bytes = Bytes::from_slice(prev.as_bytes());
                if !bytes.is_empty() {
                    flags.has_width = true;
                    if bytes.len() == 1 {
                        flags.simple = true;
                    }
                }
                self.emit(Op::Exactly(bytes))
            }
            Token::Special(c @ b'1'..=b'9') => {
                let refnum = c - b'0';
                // The group's open must have been seen already; whether it
                // has closed is checked at match time.
                if refnum >= self.ngroup {
                    return Err(CompileError::IllegalBackref.into());
                }
                flags.has_width = true;
                self.emit(Op::Backref(refnum))
            }
            Token::Special(c @ (b'=' | b'+' | b'{' | b'*')) => {
                return Err(CompileError::RepeatNothing(self.multi_fragment(c)).into());
            }
            Token::Special(b'[') => {
                if skip_bracket(self.lexer.rest(), 0).is_some() {
                    self.bracket(&mut flags)?
                } else {
                    // No matching "]": the bracket is an ordinary character.
                    flags.has_width = true;
                    flags.simple = true;
                    self.emit(Op::Exactly(Bytes::from_slice(b"[")))
                }
            }
            Token::Special(b'|') | Token::Special(b')') => {
                // Supposed to be caught by the callers.
                return Err(CompileError::Internal.into());
            }
            Token::Special(c) => self.literal_run(c, &mut flags),
            Token::Literal(c) => self.literal_run(c, &mut flags),
        };
        Ok((ix, flags))
    }

    /// Coalesce a run of literal tokens into one node. When a quantifier
    /// follows a longer run, the final byte is given back so the quantifier
    /// gets a single-character operand.
    fn literal_run(&mut self, first: u8, flags: &mut Flags) -> NodeIx {
        let mut bytes = Bytes::new();
        bytes.push(first);
        while let Some(Token::Literal(b)) = self.lexer.peek() {
            self.lexer.next_token();
            bytes.push(b);
        }
        if bytes.len() > 1 && matches!(self.lexer.peek(), Some(tok) if is_multi(tok)) {
            bytes.pop();
            self.lexer.push_back();
        }
        flags.has_width = true;
        if bytes.len() == 1 {
            flags.simple = true;
        }
        self.emit(Op::Exactly(bytes))
    }

    /// Parse the body of a `[...]` after the precheck found its `]`.
    fn bracket(&mut self, flags: &mut Flags) -> Result<NodeIx> {
        let rest = self.lexer.rest();
        let mut i = 0;
        let negate = rest.first() == Some(&b'^');
        if negate {
            i += 1;
        }
        let mut members = Bytes::new();
        let mut prev: Option<u8> = None;
        // "]" and "-" are ordinary members when they come first.
        if matches!(rest.get(i), Some(&b']') | Some(&b'-')) {
            members.push(rest[i]);
            prev = Some(rest[i]);
            i += 1;
        }
        loop {
            let b = match rest.get(i) {
                Some(&b) => b,
                None => return Err(CompileError::Internal.into()),
            };
            match b {
                b']' => break,
                b'-' => {
                    i += 1;
                    match (prev, rest.get(i)) {
                        (Some(lo), Some(&hi)) if hi != b']' => {
                            i += 1;
                            if lo > hi {
                                return Err(CompileError::InvalidRange.into());
                            }
                            let mut c = lo;
                            while c < hi {
                                c += 1;
                                members.push(c);
                            }
                            prev = None;
                        }
                        // Trailing "-", or one with no range start: a member.
                        _ => {
                            members.push(b'-');
                            prev = Some(b'-');
                        }
                    }
                }
                b'\\' => match rest.get(i + 1) {
                    Some(&c) if INRANGE.contains(&c) => {
                        members.push(c);
                        prev = Some(c);
                        i += 2;
                    }
                    Some(&c) if abbr_byte(c).is_some() => {
                        if let Some(ctrl) = abbr_byte(c) {
                            members.push(ctrl);
                            prev = Some(ctrl);
                        }
                        i += 2;
                    }
                    _ => {
                        members.push(b'\\');
                        prev = Some(b'\\');
                        i += 1;
                    }
                },
                b'[' => match classify::scan_bracket_class(&rest[i..]) {
                    Some((pred, len)) => {
                        for c in 1..=255u8 {
                            if pred(c) {
                                members.push(c);
                            }
                        }
                        prev = None;
                        i += len;
                    }
                    None => {
                        members.push(b'[');
                        prev = Some(b'[');
                        i += 1;
                    }
                },
                _ => {
                    members.push(b);
                    prev = Some(b);
                    i += 1;
                }
            }
        }
        self.lexer.bump(i + 1);
        flags.has_width = true;
        flags.simple = true;
        Ok(self.emit(if negate {
            Op::AnyBut(members)
        } else {
            Op::AnyOf(members)
        }))
    }

    /// Parse the `m,n` part of a bounded repetition, the `\{` already
    /// consumed. Returns the bounds with `min > max` meaning "prefer the
    /// shortest count".
    fn read_limits(&mut self) -> Result<(u32, u32)> {
        let rest = self.lexer.rest();
        let mut i = 0;
        let reverse = rest.first() == Some(&b'-');
        if reverse {
            i += 1;
        }
        let digits_start = i;
        let mut min: u32 = 0;
        while let Some(&d) = rest.get(i) {
            if !classify::is_digit(d) {
                break;
            }
            min = min.saturating_mul(10).saturating_add(u32::from(d - b'0'));
            i += 1;
        }
        let had_digits = i > digits_start;
        let mut max: u32 = MAX_LIMIT;
        if rest.get(i) == Some(&b',') {
            i += 1;
            if matches!(rest.get(i), Some(&d) if classify::is_digit(d)) {
                max = 0;
                while let Some(&d) = rest.get(i) {
                    if !classify::is_digit(d) {
                        break;
                    }
                    max = max.saturating_mul(10).saturating_add(u32::from(d - b'0'));
                    i += 1;
                }
            }
        } else if had_digits {
            // "{n}" means exactly n.
            max = min;
        }
        // Both "\{...}" and "\{...\}" close the bounds.
        if rest.get(i) == Some(&b'\\') {
            i += 1;
        }
        if rest.get(i) != Some(&b'}')
            || (min == 0 && max == 0)
            || min > MAX_LIMIT
            || max > MAX_LIMIT
        {
            return Err(CompileError::InvalidLimits(self.limits_fragment()).into());
        }
        i += 1;
        self.lexer.bump(i);
        if (!reverse && min > max) || (reverse && min < max) {
            Ok((max, min))
        } else {
            Ok((min, max))
        }
    }

    fn limits_fragment(&self) -> String {
        if self.lexer.magic() {
            "{".to_string()
        } else {
            "\\{".to_string()
        }
    }
}

/// Record the starting-point hints on a freshly compiled program: an anchor,
/// a required first byte, and, when the pattern opens with something
/// expensive, the longest literal the line must contain.
fn optimize(prog: &mut Prog, flags: Flags) {
    let single = match prog.nodes[prog.start].next {
        Some(next) => matches!(prog.nodes[next].op, Op::End),
        None => false,
    };
    let operand = match prog.nodes[prog.start].op {
        Op::Branch { operand } => operand,
        _ => return,
    };
    if !single {
        return;
    }

    let mut scan = operand;
    if matches!(prog.nodes[scan].op, Op::Bol) {
        prog.anchored = true;
        if let Some(next) = prog.nodes[scan].next {
            scan = next;
        }
    }
    match &prog.nodes[scan].op {
        Op::Exactly(bytes) => prog.start_byte = bytes.first().copied(),
        Op::Bow | Op::Eow => {
            if let Some(next) = prog.nodes[scan].next {
                if let Op::Exactly(bytes) = &prog.nodes[next].op {
                    prog.start_byte = bytes.first().copied();
                }
            }
        }
        _ => {}
    }

    if flags.star_start || matches!(prog.nodes[scan].op, Op::Bow | Op::Eow) {
        // Ties resolve to the later string: the start-byte check already
        // covers the front of the pattern.
        let mut longest: Option<Bytes> = None;
        let mut len = 0;
        let mut walk = Some(scan);
        while let Some(ix) = walk {
            if let Op::Exactly(bytes) = &prog.nodes[ix].op {
                if bytes.len() >= len {
                    len = bytes.len();
                    longest = Some(bytes.clone());
                }
            }
            walk = prog.nodes[ix].next;
        }
        prog.must = longest;
    }
}
