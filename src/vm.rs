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

//! Backtracking matcher over a compiled program.
//!
//! The matcher walks the node chain recursively. Consuming nodes (literals,
//! classes, `.`) advance the input position and fall through to their `next`
//! link; choice points (alternation, repetition) recurse once per
//! alternative, so a failed recursion returns control to the choice point
//! with the input position it saved on the stack. That is all the
//! backtracking machinery there is: the call stack is the backtrack stack.
//!
//! The program for `a*b` looks like this:
//!
//! ```text
//! start 3
//!    0: EXACTLY "a"
//!    1: STAR [0] -> 2
//!    2: EXACTLY "b" -> 4
//!    3: BRANCH [1] -> 4
//!    4: END
//! must "b"
//! ```
//!
//! Matching it against `aaab` from position 0:
//!
//! 1. Node 3 is a branch without a following branch, so it is a plain
//!    continuation into node 1.
//! 2. Node 1 greedily counts repetitions of its operand (node 0), getting 3.
//! 3. The continuation (node 2) is tried after 3 repetitions. It wants a `b`,
//!    finds one, and falls through to node 4.
//! 4. Node 4 is END: the whole call chain unwinds as success, whole match
//!    `aaab`. Had node 2 failed, node 1 would have retried with 2
//!    repetitions, then 1, then 0 before giving up.
//!
//! Capture slots are written tentatively: a group node installs the current
//! position, recurses, and puts the old value back when the recursion fails,
//! so the slots only ever reflect the successful path. Depth and running time
//! are proportional to the amount of backtracking; nested quantifiers over
//! ambiguous input can make both exponential, which is inherent to this
//! algorithm and deliberately not papered over with memoization (that would
//! change which alternative wins in ambiguous matches, and with it the
//! captures).

use log::trace;
use memchr::memchr;

use crate::classify;
use crate::error::{Result, RuntimeError};
use crate::prefilter;
use crate::program::{NodeIx, Op, Prog, MAX_COMPLEX, MAX_LIMIT, NSUBEXP, PROG_MAGIC};

/// How many node visits go between polls of the interrupt predicate.
const POLL_INTERVAL: u32 = 4096;

/// Capture offsets of a successful attempt, indexed by group number.
/// Slot 0 is the whole match and is always present on success.
pub(crate) type Slots = [Option<(usize, usize)>; NSUBEXP];

/// Run `prog` against `line`, returning the captures of the leftmost match.
///
/// `at_line_start` tells the matcher whether offset 0 of `line` really is the
/// start of a line (a `^` in the pattern checks this). `interrupt` is polled
/// every few thousand node visits; when it reports true the attempt is
/// abandoned with [`RuntimeError::Interrupted`].
pub(crate) fn exec(
    prog: &Prog,
    line: &str,
    at_line_start: bool,
    ignore_case: bool,
    interrupt: Option<&dyn Fn() -> bool>,
) -> Result<Option<Slots>> {
    if prog.check != PROG_MAGIC || prog.nodes.get(prog.start).is_none() {
        return Err(RuntimeError::Corrupt.into());
    }
    let bytes = line.as_bytes();

    if let Some(must) = &prog.must {
        if !prefilter::contains(bytes, must, ignore_case) {
            trace!(
                "rejected: line does not contain {:?}",
                String::from_utf8_lossy(must)
            );
            return Ok(None);
        }
    }

    let mut state = MatchState {
        prog,
        line: bytes,
        line_start: at_line_start,
        ic: ignore_case,
        interrupt,
        start: [None; NSUBEXP],
        end: [None; NSUBEXP],
        limits: (0, 0),
        brace_min: [0; MAX_COMPLEX],
        brace_max: [0; MAX_COMPLEX],
        brace_count: [0; MAX_COMPLEX],
        ticks: 0,
    };

    if prog.anchored {
        if let Some(want) = prog.start_byte {
            match bytes.first() {
                Some(&b) if byte_eq(b, want, ignore_case) => {}
                _ => return Ok(None),
            }
        }
        return state.try_at(0);
    }

    let mut pos = 0;
    loop {
        if let Some(want) = prog.start_byte {
            pos = match prefilter::find_byte(bytes, pos, want, ignore_case) {
                Some(p) => p,
                None => return Ok(None),
            };
        }
        if let Some(slots) = state.try_at(pos)? {
            return Ok(Some(slots));
        }
        if pos >= bytes.len() {
            return Ok(None);
        }
        pos += 1;
    }
}

/// Everything one match attempt mutates. Created per [`exec`] call; nothing
/// here survives between calls.
struct MatchState<'a> {
    prog: &'a Prog,
    line: &'a [u8],
    line_start: bool,
    ic: bool,
    interrupt: Option<&'a dyn Fn() -> bool>,
    /// Tentative group-open offsets.
    start: [Option<usize>; NSUBEXP],
    /// Tentative group-close offsets.
    end: [Option<usize>; NSUBEXP],
    /// Bounds loaded by the most recent `BraceLimits` for a simple repeat.
    limits: (u32, u32),
    brace_min: [u32; MAX_COMPLEX],
    brace_max: [u32; MAX_COMPLEX],
    /// Iterations taken so far, per complex repetition slot.
    brace_count: [u32; MAX_COMPLEX],
    ticks: u32,
}

impl<'a> MatchState<'a> {
    /// One full attempt starting at `pos`. Resets every register first so a
    /// failed earlier attempt leaves no residue.
    fn try_at(&mut self, pos: usize) -> Result<Option<Slots>> {
        self.start = [None; NSUBEXP];
        self.end = [None; NSUBEXP];
        self.limits = (0, 0);
        self.brace_min = [0; MAX_COMPLEX];
        self.brace_max = [0; MAX_COMPLEX];
        self.brace_count = [0; MAX_COMPLEX];
        self.start[0] = Some(pos);
        if self.run(self.prog.start, pos)? {
            let mut slots = [None; NSUBEXP];
            for (slot, pair) in slots.iter_mut().enumerate() {
                if let (Some(s), Some(e)) = (self.start[slot], self.end[slot]) {
                    *pair = Some((s, e));
                }
            }
            Ok(Some(slots))
        } else {
            Ok(None)
        }
    }

    /// Walk the chain from `ix` with the input cursor at `pos`. Returns
    /// whether this chain (and everything after it, down to END) matched.
    fn run(&mut self, mut ix: NodeIx, mut pos: usize) -> Result<bool> {
        let prog = self.prog;
        loop {
            self.tick()?;
            let node = match prog.nodes.get(ix) {
                Some(node) => node,
                None => return Err(RuntimeError::Corrupt.into()),
            };
            match &node.op {
                Op::End => {
                    self.end[0] = Some(pos);
                    return Ok(true);
                }
                Op::Bol => {
                    if pos != 0 || !self.line_start {
                        return Ok(false);
                    }
                }
                Op::Eol => {
                    if pos != self.line.len() {
                        return Ok(false);
                    }
                }
                Op::Bow => {
                    let here = matches!(self.line.get(pos), Some(&b) if classify::is_word(b));
                    let before = pos > 0 && classify::is_word(self.line[pos - 1]);
                    if !here || before {
                        return Ok(false);
                    }
                }
                Op::Eow => {
                    let here = matches!(self.line.get(pos), Some(&b) if classify::is_word(b));
                    let before = pos > 0 && classify::is_word(self.line[pos - 1]);
                    if here || !before {
                        return Ok(false);
                    }
                }
                Op::Any => {
                    if pos >= self.line.len() {
                        return Ok(false);
                    }
                    pos += 1;
                }
                Op::Exactly(bytes) => {
                    let end = pos + bytes.len();
                    match self.line.get(pos..end) {
                        Some(have) if bytes_eq(have, bytes, self.ic) => pos = end,
                        _ => return Ok(false),
                    }
                }
                Op::AnyOf(set) => match self.line.get(pos) {
                    Some(&b) if set_member(set, b, self.ic) => pos += 1,
                    _ => return Ok(false),
                },
                Op::AnyBut(set) => match self.line.get(pos) {
                    Some(&b) if !set_member(set, b, self.ic) => pos += 1,
                    _ => return Ok(false),
                },
                Op::Nothing | Op::Back => {}
                Op::Branch { operand } => {
                    let next_is_branch = node
                        .next
                        .and_then(|n| prog.nodes.get(n))
                        .map_or(false, |n| matches!(n.op, Op::Branch { .. }));
                    if !next_is_branch {
                        // A lone branch is a plain continuation.
                        ix = *operand;
                        continue;
                    }
                    let mut scan = ix;
                    loop {
                        let alt = match &prog.nodes[scan].op {
                            Op::Branch { operand } => *operand,
                            _ => return Ok(false),
                        };
                        if self.run(alt, pos)? {
                            return Ok(true);
                        }
                        scan = match prog.nodes[scan].next {
                            Some(next) => next,
                            None => return Ok(false),
                        };
                        if !matches!(prog.nodes.get(scan).map(|n| &n.op), Some(Op::Branch { .. }))
                        {
                            return Ok(false);
                        }
                    }
                }
                Op::Star { operand } | Op::Plus { operand } | Op::BraceSimple { operand } => {
                    let (stored_min, stored_max) = match node.op {
                        Op::Star { .. } => (0, MAX_LIMIT),
                        Op::Plus { .. } => (1, MAX_LIMIT),
                        _ => self.limits,
                    };
                    let operand = *operand;
                    let next = match node.next {
                        Some(next) => next,
                        None => return Err(RuntimeError::Corrupt.into()),
                    };
                    // Peek the byte the continuation needs so hopeless
                    // repetition counts are skipped without recursing.
                    let want = match prog.nodes.get(next).map(|n| &n.op) {
                        Some(Op::Exactly(bytes)) => bytes.first().copied(),
                        _ => None,
                    };
                    return self.repeat_simple(operand, next, pos, stored_min, stored_max, want);
                }
                Op::BraceLimits { min, max } => {
                    let next = match node.next {
                        Some(next) => next,
                        None => return Err(RuntimeError::Corrupt.into()),
                    };
                    match prog.nodes.get(next).map(|n| &n.op) {
                        Some(Op::BraceSimple { .. }) => self.limits = (*min, *max),
                        Some(Op::BraceComplex { slot, .. }) => {
                            let slot = usize::from(*slot);
                            self.brace_min[slot] = *min;
                            self.brace_max[slot] = *max;
                            self.brace_count[slot] = 0;
                        }
                        _ => return Err(RuntimeError::Corrupt.into()),
                    }
                    ix = next;
                    continue;
                }
                Op::BraceComplex { slot, operand } => {
                    let (slot, operand) = (usize::from(*slot), *operand);
                    let next = match node.next {
                        Some(next) => next,
                        None => return Err(RuntimeError::Corrupt.into()),
                    };
                    return self.repeat_complex(slot, operand, next, pos);
                }
                Op::Mopen(n) => {
                    let n = usize::from(*n);
                    let next = match node.next {
                        Some(next) => next,
                        None => return Err(RuntimeError::Corrupt.into()),
                    };
                    let saved = self.start[n];
                    self.start[n] = Some(pos);
                    if self.run(next, pos)? {
                        return Ok(true);
                    }
                    self.start[n] = saved;
                    return Ok(false);
                }
                Op::Mclose(n) => {
                    let n = usize::from(*n);
                    let next = match node.next {
                        Some(next) => next,
                        None => return Err(RuntimeError::Corrupt.into()),
                    };
                    let saved = self.end[n];
                    self.end[n] = Some(pos);
                    if self.run(next, pos)? {
                        return Ok(true);
                    }
                    self.end[n] = saved;
                    return Ok(false);
                }
                Op::Backref(n) => {
                    let n = usize::from(*n);
                    // A group that has not closed yet, or whose recorded
                    // span is inverted, matches the empty string rather
                    // than failing.
                    if let (Some(s), Some(e)) = (self.start[n], self.end[n]) {
                        if s < e {
                            let len = e - s;
                            match self.line.get(pos..pos + len) {
                                Some(have) if bytes_eq(have, &self.line[s..e], self.ic) => {
                                    pos += len
                                }
                                _ => return Ok(false),
                            }
                        }
                    }
                }
                op => match class_test(op) {
                    Some(test) => match self.line.get(pos) {
                        Some(&b) if test(b) => pos += 1,
                        _ => return Ok(false),
                    },
                    None => return Err(RuntimeError::Corrupt.into()),
                },
            }
            ix = match node.next {
                Some(next) => next,
                None => return Err(RuntimeError::Corrupt.into()),
            };
        }
    }

    /// Star/plus/bounded repetition of a single-width operand. Bounds stored
    /// descending mean "prefer the shortest count".
    fn repeat_simple(
        &mut self,
        operand: NodeIx,
        next: NodeIx,
        pos: usize,
        stored_min: u32,
        stored_max: u32,
        want: Option<u8>,
    ) -> Result<bool> {
        if stored_min <= stored_max {
            // Greedy: take the maximum, then hand repetitions back.
            let min = stored_min as usize;
            let mut count = self.repeat_scan(operand, pos, stored_max as usize)?;
            if count < min {
                return Ok(false);
            }
            loop {
                if self.want_ok(want, pos + count) && self.run(next, pos + count)? {
                    return Ok(true);
                }
                if count == min {
                    return Ok(false);
                }
                count -= 1;
            }
        } else {
            // Lazy: start at the minimum and grow only on failure.
            let min = stored_max as usize;
            let max = stored_min as usize;
            let mut count = self.repeat_scan(operand, pos, min)?;
            if count < min {
                return Ok(false);
            }
            loop {
                if self.want_ok(want, pos + count) && self.run(next, pos + count)? {
                    return Ok(true);
                }
                if count >= max || self.repeat_scan(operand, pos + count, 1)? == 0 {
                    return Ok(false);
                }
                count += 1;
            }
        }
    }

    /// Bounded repetition of a complex operand chain. The loop edge re-enters
    /// the owning node, so `brace_count` tracks iterations across recursive
    /// re-entries.
    fn repeat_complex(
        &mut self,
        slot: usize,
        operand: NodeIx,
        next: NodeIx,
        pos: usize,
    ) -> Result<bool> {
        self.brace_count[slot] += 1;
        let (min, max) = (self.brace_min[slot], self.brace_max[slot]);
        if self.brace_count[slot] <= min.min(max) {
            // Below the effective minimum: another iteration is mandatory.
            if self.run(operand, pos)? {
                return Ok(true);
            }
            self.brace_count[slot] -= 1;
            return Ok(false);
        }
        if min <= max {
            // Greedy: try one more iteration before settling.
            if self.brace_count[slot] <= max {
                if self.run(operand, pos)? {
                    return Ok(true);
                }
                self.brace_count[slot] -= 1;
            }
            return self.run(next, pos);
        }
        // Lazy (bounds stored descending): settle first, iterate on failure.
        if self.run(next, pos)? {
            return Ok(true);
        }
        if self.brace_count[slot] <= min {
            if self.run(operand, pos)? {
                return Ok(true);
            }
            self.brace_count[slot] -= 1;
        }
        Ok(false)
    }

    /// Count how many consecutive repetitions of a single-width operand match
    /// at `pos`, up to `max`. A multi-width operand here means the compiler
    /// and matcher disagree about what "simple" means.
    fn repeat_scan(&mut self, operand: NodeIx, pos: usize, max: usize) -> Result<usize> {
        let node = match self.prog.nodes.get(operand) {
            Some(node) => node,
            None => return Err(RuntimeError::Corrupt.into()),
        };
        let avail = &self.line[pos.min(self.line.len())..];
        let avail = &avail[..avail.len().min(max)];
        let ic = self.ic;
        let count = match &node.op {
            Op::Any => avail.len(),
            Op::Exactly(bytes) => match *bytes.as_slice() {
                [b] => avail
                    .iter()
                    .take_while(|&&have| byte_eq(have, b, ic))
                    .count(),
                _ => return Err(RuntimeError::Corrupt.into()),
            },
            Op::AnyOf(set) => avail
                .iter()
                .take_while(|&&b| set_member(set, b, ic))
                .count(),
            Op::AnyBut(set) => avail
                .iter()
                .take_while(|&&b| !set_member(set, b, ic))
                .count(),
            op => match class_test(op) {
                Some(test) => avail.iter().take_while(|&&b| test(b)).count(),
                None => return Err(RuntimeError::Corrupt.into()),
            },
        };
        Ok(count)
    }

    /// The repetition-pruning peek: with a known continuation byte, only
    /// counts whose following input byte matches are worth recursing into.
    fn want_ok(&self, want: Option<u8>, at: usize) -> bool {
        match want {
            None => true,
            Some(b) => matches!(self.line.get(at), Some(&have) if byte_eq(have, b, self.ic)),
        }
    }

    fn tick(&mut self) -> Result<()> {
        self.ticks = self.ticks.wrapping_add(1);
        if self.ticks % POLL_INTERVAL == 0 {
            if let Some(check) = self.interrupt {
                if check() {
                    return Err(RuntimeError::Interrupted.into());
                }
            }
        }
        Ok(())
    }
}

#[inline]
fn byte_eq(a: u8, b: u8, ic: bool) -> bool {
    a == b || (ic && a.to_ascii_lowercase() == b.to_ascii_lowercase())
}

#[inline]
fn bytes_eq(a: &[u8], b: &[u8], ic: bool) -> bool {
    if ic {
        a.eq_ignore_ascii_case(b)
    } else {
        a == b
    }
}

#[inline]
fn set_member(set: &[u8], b: u8, ic: bool) -> bool {
    if memchr(b, set).is_some() {
        return true;
    }
    if ic && b.is_ascii_alphabetic() {
        return memchr(b ^ 0x20, set).is_some();
    }
    false
}

/// Single-byte test for the fixed-class opcodes, `None` for anything that is
/// not a class.
fn class_test(op: &Op) -> Option<fn(u8) -> bool> {
    Some(match op {
        Op::Ident => classify::is_ident,
        Op::SIdent => |b| !classify::is_digit(b) && classify::is_ident(b),
        Op::Kword => classify::is_keyword,
        Op::SKword => |b| !classify::is_digit(b) && classify::is_keyword(b),
        Op::Fname => classify::is_fname,
        Op::SFname => |b| !classify::is_digit(b) && classify::is_fname(b),
        Op::Print => classify::is_print,
        Op::SPrint => |b| !classify::is_digit(b) && classify::is_print(b),
        Op::White => classify::is_white,
        Op::NWhite => |b| !classify::is_white(b),
        Op::Digit => classify::is_digit,
        Op::NDigit => |b| !classify::is_digit(b),
        Op::Hex => classify::is_hex,
        Op::NHex => |b| !classify::is_hex(b),
        Op::Octal => classify::is_octal,
        Op::NOctal => |b| !classify::is_octal(b),
        Op::Word => classify::is_word,
        Op::NWord => |b| !classify::is_word(b),
        Op::Head => classify::is_head,
        Op::NHead => |b| !classify::is_head(b),
        Op::Alpha => classify::is_alpha,
        Op::NAlpha => |b| !classify::is_alpha(b),
        Op::Lower => classify::is_lower,
        Op::NLower => |b| !classify::is_lower(b),
        Op::Upper => classify::is_upper,
        Op::NUpper => |b| !classify::is_upper(b),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;
    use crate::error::Error;
    use crate::program::{Bytes, Node};
    use matches::assert_matches;

    fn run(pattern: &str, line: &str) -> Option<Slots> {
        run_opts(pattern, line, true, false)
    }

    fn run_opts(pattern: &str, line: &str, at_start: bool, ic: bool) -> Option<Slots> {
        let prog = match compile(pattern, true, None) {
            Ok(prog) => prog,
            Err(e) => panic!("compile({:?}) failed: {}", pattern, e),
        };
        match exec(&prog, line, at_start, ic, None) {
            Ok(slots) => slots,
            Err(e) => panic!("exec({:?}, {:?}) failed: {}", pattern, line, e),
        }
    }

    fn whole(pattern: &str, line: &str) -> Option<(usize, usize)> {
        run(pattern, line).and_then(|slots| slots[0])
    }

    #[test]
    fn greedy_star() {
        assert_eq!(whole("a*b", "aaab"), Some((0, 4)));
        assert_eq!(whole("a*b", "b"), Some((0, 1)));
        assert_eq!(whole("a*b", "aaa"), None);
    }

    #[test]
    fn leftmost_match_wins() {
        assert_eq!(whole("b\\+", "abbcbb"), Some((1, 3)));
        assert_eq!(whole("x*", "abc"), Some((0, 0)));
    }

    #[test]
    fn anchors() {
        assert_eq!(whole("^b", "abc"), None);
        assert_eq!(whole("^a", "abc"), Some((0, 1)));
        assert_eq!(whole("c$", "abc"), Some((2, 3)));
        assert_eq!(whole("b$", "abc"), None);
        assert_eq!(whole("^$", ""), Some((0, 0)));
        // The caller says position 0 is not a line start.
        assert_eq!(run_opts("^a", "abc", false, false), None);
    }

    #[test]
    fn word_boundaries() {
        assert_eq!(whole("\\<bar", "foo bar"), Some((4, 7)));
        assert_eq!(whole("\\<bar", "foobar"), None);
        assert_eq!(whole("foo\\>", "foo bar"), Some((0, 3)));
        assert_eq!(whole("foo\\>", "foobar"), None);
        assert_eq!(whole("\\<foo\\>", "foo"), Some((0, 3)));
    }

    #[test]
    fn captures_and_backref() {
        let slots = run("\\(foo\\)\\1", "foofoo").expect("should match");
        assert_eq!(slots[0], Some((0, 6)));
        assert_eq!(slots[1], Some((0, 3)));
        assert_eq!(slots[2], None);
    }

    #[test]
    fn backref_is_case_aware() {
        assert_eq!(whole("\\(foo\\)\\1", "fooFOO"), None);
        assert_eq!(
            run_opts("\\(foo\\)\\1", "fooFOO", true, true).and_then(|s| s[0]),
            Some((0, 6))
        );
    }

    #[test]
    fn unclosed_backref_matches_empty() {
        // \1 is read while group 1 is still open, so it matches nothing.
        let slots = run("\\(\\1a\\)", "aa").expect("should match");
        assert_eq!(slots[0], Some((0, 1)));
        assert_eq!(slots[1], Some((0, 1)));
    }

    #[test]
    fn captures_reflect_the_successful_path_only() {
        // The first alternative captures "ab" but then fails on "x"; only
        // the second alternative's capture survives.
        let slots = run("\\(ab\\)x\\|\\(a\\)b", "ab").expect("should match");
        assert_eq!(slots[1], None);
        assert_eq!(slots[2], Some((0, 1)));
    }

    #[test]
    fn simple_brace_greedy_and_lazy() {
        assert_eq!(whole("a\\{2,3}", "aaaa"), Some((0, 3)));
        assert_eq!(whole("a\\{-2,3}", "aaaa"), Some((0, 2)));
        assert_eq!(whole("a\\{2,3}", "a"), None);
        assert_eq!(whole("a\\{3}", "aaaa"), Some((0, 3)));
        // The lazy form still grows when the continuation needs it.
        assert_eq!(whole("a\\{-1,3}b", "aaab"), Some((0, 4)));
    }

    #[test]
    fn complex_brace_greedy_and_lazy() {
        assert_eq!(whole("\\(ab\\)\\{2,3}", "ababab"), Some((0, 6)));
        assert_eq!(whole("\\(ab\\)\\{-2,3}", "ababab"), Some((0, 4)));
        assert_eq!(whole("\\(ab\\)\\{2,3}", "ab"), None);
        assert_eq!(whole("\\(ab\\)\\{1,}c", "ababc"), Some((0, 5)));
    }

    #[test]
    fn complex_star_and_plus() {
        assert_eq!(whole("\\(ab\\)*c", "ababc"), Some((0, 5)));
        assert_eq!(whole("\\(ab\\)*c", "c"), Some((0, 1)));
        assert_eq!(whole("\\(ab\\)\\+c", "c"), None);
        let slots = run("\\(ab\\)\\+", "ababab").expect("should match");
        assert_eq!(slots[0], Some((0, 6)));
        // The last iteration owns the capture.
        assert_eq!(slots[1], Some((4, 6)));
    }

    #[test]
    fn alternation_prefers_the_left_arm() {
        let slots = run("\\(a\\)\\|\\(ab\\)", "ab").expect("should match");
        assert_eq!(slots[0], Some((0, 1)));
        assert_eq!(slots[1], Some((0, 1)));
        assert_eq!(slots[2], None);
        // An empty arm matches the empty string.
        assert_eq!(whole("x\\|", "abc"), Some((0, 0)));
    }

    #[test]
    fn bracket_and_classes() {
        assert_eq!(whole("[a-z]", "m"), Some((0, 1)));
        assert_eq!(whole("[a-z]", "M"), None);
        assert_eq!(whole("[^a-z]", "M"), Some((0, 1)));
        assert_eq!(whole("[^a-z]", "m"), None);
        // A negated set still needs a byte to consume.
        assert_eq!(whole("a[^b]", "a"), None);
        assert_eq!(whole("\\d\\+", "abc123"), Some((3, 6)));
        assert_eq!(whole("\\x\\+", "xyz0fe"), Some((3, 6)));
        assert_eq!(whole("\\h\\w*", "9 a_1"), Some((2, 5)));
        assert_eq!(whole("\\s\\+", "a \tb"), Some((1, 3)));
        assert_eq!(whole("\\u\\l\\+", "fooBar"), Some((3, 6)));
        assert_eq!(whole("\\D\\+", "12ab3"), Some((2, 4)));
    }

    #[test]
    fn ignore_case_folds_literals_and_sets() {
        assert_eq!(
            run_opts("abc", "ABC", true, true).and_then(|s| s[0]),
            Some((0, 3))
        );
        assert_eq!(run_opts("abc", "ABC", true, false), None);
        assert_eq!(
            run_opts("[a-z]\\+", "XYZ", true, true).and_then(|s| s[0]),
            Some((0, 3))
        );
        assert_eq!(
            run_opts("A*B", "aab", true, true).and_then(|s| s[0]),
            Some((0, 3))
        );
    }

    #[test]
    fn star_pruning_keeps_backtracking_honest() {
        // The peeked "a" must not stop the scan from giving repetitions back.
        assert_eq!(whole("a*ab", "aaab"), Some((0, 4)));
        assert_eq!(whole(".*b", "aaab"), Some((0, 4)));
        assert_eq!(whole(".*b.", "abab"), Some((0, 4)));
    }

    #[test]
    fn must_hint_rejects_cheaply() {
        // "x*foo" carries must="foo"; no "foo" in the line means no scan.
        assert_eq!(whole("x*foo", "barbar"), None);
        assert_eq!(whole("x*foo", "barfoo"), Some((3, 6)));
        assert_eq!(
            run_opts("x*foo", "barFOO", true, true).and_then(|s| s[0]),
            Some((3, 6))
        );
    }

    #[test]
    fn interrupt_aborts_a_long_match() {
        let prog = compile("a*a*a*a*a*b", true, None).expect("compiles");
        let line = "a".repeat(40);
        let hit = exec(&prog, &line, true, false, Some(&|| true));
        assert_matches!(hit, Err(Error::Runtime(RuntimeError::Interrupted)));
        // The same predicate never firing lets the match fail normally.
        let miss = exec(&prog, &line, true, false, Some(&|| false));
        assert_matches!(miss, Ok(None));
    }

    #[test]
    fn corrupt_programs_are_reported_not_executed() {
        let mut prog = compile("abc", true, None).expect("compiles");
        prog.check = 0;
        assert_matches!(
            exec(&prog, "abc", true, false, None),
            Err(Error::Runtime(RuntimeError::Corrupt))
        );
    }

    #[test]
    fn limits_without_a_repeat_node_are_corrupt() {
        let prog = Prog {
            check: PROG_MAGIC,
            nodes: vec![
                Node {
                    op: Op::BraceLimits { min: 1, max: 2 },
                    next: Some(1),
                },
                Node {
                    op: Op::Exactly(Bytes::from_slice(b"a")),
                    next: Some(2),
                },
                Node { op: Op::End, next: None },
            ],
            start: 0,
            anchored: false,
            start_byte: None,
            must: None,
        };
        assert_matches!(
            exec(&prog, "a", true, false, None),
            Err(Error::Runtime(RuntimeError::Corrupt))
        );
    }

    #[test]
    fn multibyte_repeat_operand_is_corrupt() {
        let prog = Prog {
            check: PROG_MAGIC,
            nodes: vec![
                Node {
                    op: Op::Exactly(Bytes::from_slice(b"ab")),
                    next: None,
                },
                Node {
                    op: Op::Star { operand: 0 },
                    next: Some(2),
                },
                Node { op: Op::End, next: None },
            ],
            start: 1,
            anchored: false,
            start_byte: None,
            must: None,
        };
        assert_matches!(
            exec(&prog, "ababab", true, false, None),
            Err(Error::Runtime(RuntimeError::Corrupt))
        );
    }

    #[test]
    fn inverted_backref_span_matches_empty() {
        // A close recorded before its open leaves the span inverted; the
        // back-reference treats it like an unclosed group.
        let prog = Prog {
            check: PROG_MAGIC,
            nodes: vec![
                Node { op: Op::Mclose(1), next: Some(1) },
                Node {
                    op: Op::Exactly(Bytes::from_slice(b"ab")),
                    next: Some(2),
                },
                Node { op: Op::Mopen(1), next: Some(3) },
                Node { op: Op::Backref(1), next: Some(4) },
                Node { op: Op::End, next: None },
            ],
            start: 0,
            anchored: false,
            start_byte: None,
            must: None,
        };
        let slots = exec(&prog, "ab", true, false, None)
            .expect("runs")
            .expect("matches");
        assert_eq!(slots[0], Some((0, 2)));
    }

    #[test]
    fn previous_subst_atom_matches_literally() {
        let prog = compile("x~y", true, Some("mid")).expect("compiles");
        assert_eq!(
            exec(&prog, "axmidyb", true, false, None)
                .expect("runs")
                .and_then(|s| s[0]),
            Some((1, 6))
        );
    }

    #[test]
    fn start_byte_skip_scans_candidates_only() {
        assert_eq!(whole("fo\\+", "xxfooxx"), Some((2, 5)));
        assert_eq!(
            run_opts("fo\\+", "xxFOOxx", true, true).and_then(|s| s[0]),
            Some((2, 5))
        );
        assert_eq!(whole("fo\\+", "xxxxx"), None);
    }
}
