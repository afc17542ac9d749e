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

//! Substitution-template expansion against the captures of a match.

use crate::classify;
use crate::error::{Result, RuntimeError};
use crate::Captures;

/// Case conversion applied to emitted characters. The one-shot variants
/// revert to `Keep` after converting a single character.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Case {
    Keep,
    UpperOnce,
    Upper,
    LowerOnce,
    Lower,
}

impl Case {
    fn apply(&mut self, b: u8, ignore_case: bool) -> u8 {
        match *self {
            Case::Keep => b,
            Case::UpperOnce => {
                *self = Case::Keep;
                to_upper(b, ignore_case)
            }
            Case::Upper => to_upper(b, ignore_case),
            Case::LowerOnce => {
                *self = Case::Keep;
                to_lower(b, ignore_case)
            }
            Case::Lower => to_lower(b, ignore_case),
        }
    }
}

// The two folding routes have identical membership for this byte engine;
// both are kept so the conversion follows the caller's case policy the way
// the matcher's comparisons do.
fn to_upper(b: u8, ignore_case: bool) -> u8 {
    if ignore_case {
        if classify::is_lower(b) {
            b ^ 0x20
        } else {
            b
        }
    } else {
        b.to_ascii_uppercase()
    }
}

fn to_lower(b: u8, ignore_case: bool) -> u8 {
    if ignore_case {
        if classify::is_upper(b) {
            b ^ 0x20
        } else {
            b
        }
    } else {
        b.to_ascii_lowercase()
    }
}

struct Emitter<'d> {
    dest: &'d mut Vec<u8>,
    copy: bool,
    len: usize,
    case: Case,
    ignore_case: bool,
}

impl Emitter<'_> {
    /// Emit one byte through the case state.
    fn push(&mut self, b: u8) {
        let b = self.case.apply(b, self.ignore_case);
        if self.copy {
            self.dest.push(b);
        }
        self.len += 1;
    }

    /// Emit one byte untouched, bypassing the case state.
    fn push_raw(&mut self, b: u8) {
        if self.copy {
            self.dest.push(b);
        }
        self.len += 1;
    }

    /// Emit the text of one captured range.
    fn push_capture(&mut self, line: &[u8], span: (usize, usize)) -> Result<()> {
        let (start, end) = span;
        let text = match line.get(start..end) {
            Some(text) => text,
            None => return Err(RuntimeError::DamagedMatch.into()),
        };
        for &b in text {
            match b {
                // A NUL inside a capture means the offsets and the line
                // disagree about where the text ends.
                0 if self.copy => return Err(RuntimeError::DamagedMatch.into()),
                // A CR would read as a line break downstream; emit it
                // CTRL-V-escaped.
                b'\r' => {
                    self.push_raw(0x16);
                    self.push_raw(b'\r');
                }
                _ => self.push(b),
            }
        }
        Ok(())
    }
}

/// Expand `template` against `captures`, appending to `dest` when `copy` is
/// true, and return the number of bytes the expansion takes either way.
///
/// Calling once with `copy = false` sizes the output; calling again with
/// `copy = true` writes exactly that many bytes. The template understands:
///
/// * `&` (magic) or `\&` (non-magic), and `\0`: the whole match
/// * `\1` to `\9`: the text of that capture group (an unset group is empty)
/// * `\r` `\n` `\t` `\b`: CR, NL, TAB, BS
/// * `\u` `\l`: uppercase/lowercase the next character
/// * `\U` `\L`: uppercase/lowercase until `\e` or `\E`
/// * `\x` for any other `x`: the character itself
///
/// `ignore_case` picks the folding route the case operators use, matching
/// the policy the captures were produced under.
///
/// # Errors
///
/// [`RuntimeError::DamagedMatch`] when a captured range does not fit the
/// line it claims to come from; `dest` may then hold a partial expansion.
pub fn expand(
    captures: &Captures<'_>,
    template: &str,
    ignore_case: bool,
    magic: bool,
    dest: &mut Vec<u8>,
    copy: bool,
) -> Result<usize> {
    let line = captures.text.as_bytes();
    let t = template.as_bytes();
    let mut em = Emitter {
        dest,
        copy,
        len: 0,
        case: Case::Keep,
        ignore_case,
    };
    let mut i = 0;
    while i < t.len() {
        let b = t[i];
        i += 1;
        let group = if b == b'&' && magic {
            0
        } else if b == b'\\' {
            match t.get(i).copied() {
                Some(c @ b'0'..=b'9') => {
                    i += 1;
                    usize::from(c - b'0')
                }
                Some(b'&') if !magic => {
                    i += 1;
                    0
                }
                Some(b'u') => {
                    i += 1;
                    em.case = Case::UpperOnce;
                    continue;
                }
                Some(b'U') => {
                    i += 1;
                    em.case = Case::Upper;
                    continue;
                }
                Some(b'l') => {
                    i += 1;
                    em.case = Case::LowerOnce;
                    continue;
                }
                Some(b'L') => {
                    i += 1;
                    em.case = Case::Lower;
                    continue;
                }
                Some(b'e') | Some(b'E') => {
                    i += 1;
                    em.case = Case::Keep;
                    continue;
                }
                Some(b'r') => {
                    i += 1;
                    em.push(0x0D);
                    continue;
                }
                Some(b'n') => {
                    i += 1;
                    em.push(0x0A);
                    continue;
                }
                Some(b't') => {
                    i += 1;
                    em.push(0x09);
                    continue;
                }
                Some(b'b') => {
                    i += 1;
                    em.push(0x08);
                    continue;
                }
                Some(c) => {
                    i += 1;
                    em.push(c);
                    continue;
                }
                None => {
                    em.push(b'\\');
                    continue;
                }
            }
        } else {
            em.push(b);
            continue;
        };
        if let Some(span) = captures.slots[group] {
            em.push_capture(line, span)?;
        }
    }
    Ok(em.len)
}

/// Splice the previously recorded substitution template over every unescaped
/// `~` (magic) or `\~` (non-magic) in `template`, then record the spliced
/// result as the new previous template.
///
/// Spliced text is not rescanned, so a `~` inside the previous template stays
/// literal. With no previous template the tilde is deleted. Runs before
/// [`crate::compile`] or [`expand`] ever see the text.
pub fn expand_tilde(template: &str, magic: bool, previous: &mut Option<String>) -> String {
    let bytes = template.as_bytes();
    let mut out = String::new();
    let mut seg = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'~' if magic => {
                out.push_str(&template[seg..i]);
                if let Some(prev) = previous.as_deref() {
                    out.push_str(prev);
                }
                i += 1;
                seg = i;
            }
            b'\\' if !magic && bytes.get(i + 1) == Some(&b'~') => {
                out.push_str(&template[seg..i]);
                if let Some(prev) = previous.as_deref() {
                    out.push_str(prev);
                }
                i += 2;
                seg = i;
            }
            b'\\' if i + 1 < bytes.len() => i += 2,
            _ => i += 1,
        }
    }
    out.push_str(&template[seg..]);
    *previous = Some(out.clone());
    out
}
