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

//! The compiled program representation.
//!
//! A program is an arena of [`Node`]s. Control flow follows each node's
//! `next` link; alternation and repetition nodes additionally own an
//! `operand` index naming the sub-chain they govern. Loops are closed by a
//! [`Op::Back`] node whose `next` points at an earlier index; that node is
//! the only place a link may point backwards.

use std::ascii;
use std::fmt;

use smallvec::SmallVec;

/// Number of capture slots: the whole match plus nine groups.
pub(crate) const NSUBEXP: usize = 10;

/// Number of complex bounded-repetition slots available to one program.
pub(crate) const MAX_COMPLEX: usize = 10;

/// Largest representable repetition bound.
pub(crate) const MAX_LIMIT: u32 = 65535;

/// First byte of every valid program, checked before matching.
pub(crate) const PROG_MAGIC: u8 = 0x9C;

/// Index of a node in the program arena.
pub(crate) type NodeIx = usize;

/// Operand byte storage. Literal runs and bracket member sets are usually
/// short, so keep them inline.
pub(crate) type Bytes = SmallVec<[u8; 16]>;

/// Node opcode plus its immediate operands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Op {
    /// End of program: the match attempt has succeeded.
    End,
    /// Match the start of the line.
    Bol,
    /// Match the end of the line.
    Eol,
    /// Match the start of a word.
    Bow,
    /// Match the end of a word.
    Eow,
    /// Match any single byte.
    Any,
    /// Match the operand bytes literally.
    Exactly(Bytes),
    /// Match the empty string.
    Nothing,
    /// Loop closer; `next` points backwards.
    Back,
    /// Try the `operand` chain, or fall through to the next alternative.
    Branch { operand: NodeIx },
    /// Zero or more repetitions of a simple operand node.
    Star { operand: NodeIx },
    /// One or more repetitions of a simple operand node.
    Plus { operand: NodeIx },
    /// Bounded repetition of a simple operand node; bounds arrive through the
    /// preceding `BraceLimits`.
    BraceSimple { operand: NodeIx },
    /// Repetition bounds for the `BraceSimple` or `BraceComplex` that
    /// directly follows. Stored descending when the match should prefer the
    /// shortest count.
    BraceLimits { min: u32, max: u32 },
    /// Bounded repetition of a complex operand chain, counted in one of the
    /// ten per-attempt repetition slots.
    BraceComplex { slot: u8, operand: NodeIx },
    /// Open capture group 0-9 at the current position.
    Mopen(u8),
    /// Close capture group 0-9 at the current position.
    Mclose(u8),
    /// Match the text captured by an earlier group.
    Backref(u8),
    /// Match any byte in the operand set.
    AnyOf(Bytes),
    /// Match any byte not in the operand set.
    AnyBut(Bytes),
    /// Identifier character.
    Ident,
    /// Identifier character, excluding digits.
    SIdent,
    /// Keyword character.
    Kword,
    /// Keyword character, excluding digits.
    SKword,
    /// File-name character.
    Fname,
    /// File-name character, excluding digits.
    SFname,
    /// Printable character.
    Print,
    /// Printable character, excluding digits.
    SPrint,
    /// Space or tab.
    White,
    /// Anything but space or tab.
    NWhite,
    /// Decimal digit.
    Digit,
    /// Anything but a decimal digit.
    NDigit,
    /// Hexadecimal digit.
    Hex,
    /// Anything but a hexadecimal digit.
    NHex,
    /// Octal digit.
    Octal,
    /// Anything but an octal digit.
    NOctal,
    /// Word character.
    Word,
    /// Anything but a word character.
    NWord,
    /// Head-of-word character.
    Head,
    /// Anything but a head-of-word character.
    NHead,
    /// Alphabetic character.
    Alpha,
    /// Anything but an alphabetic character.
    NAlpha,
    /// Lowercase character.
    Lower,
    /// Anything but a lowercase character.
    NLower,
    /// Uppercase character.
    Upper,
    /// Anything but an uppercase character.
    NUpper,
}

impl Op {
    /// The operand chain this node governs, for the node kinds that own one.
    pub(crate) fn operand(&self) -> Option<NodeIx> {
        match *self {
            Op::Branch { operand }
            | Op::Star { operand }
            | Op::Plus { operand }
            | Op::BraceSimple { operand }
            | Op::BraceComplex { operand, .. } => Some(operand),
            _ => None,
        }
    }
}

/// One node of a compiled program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Node {
    pub(crate) op: Op,
    /// Control-flow successor. `None` only transiently during compilation;
    /// a finished program has every link resolved except on `End`, `Mclose`
    /// for the outermost level, and operand nodes of the simple repetitions.
    pub(crate) next: Option<NodeIx>,
}

/// A compiled pattern.
///
/// Immutable once built; one program can back any number of concurrent match
/// attempts. Structural equality doubles as the compile-determinism check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prog {
    /// Always [`PROG_MAGIC`] for a program built by this compiler.
    pub(crate) check: u8,
    pub(crate) nodes: Vec<Node>,
    /// Entry point of the control-flow chain.
    pub(crate) start: NodeIx,
    /// Match can only start at the beginning of the line.
    pub(crate) anchored: bool,
    /// Byte every match must start with, when known.
    pub(crate) start_byte: Option<u8>,
    /// Literal every matching line must contain, when known.
    pub(crate) must: Option<Bytes>,
}

fn write_bytes(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    for &b in bytes {
        write!(f, "{}", ascii::escape_default(b))?;
    }
    Ok(())
}

impl fmt::Display for Prog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "start {}", self.start)?;
        for (ix, node) in self.nodes.iter().enumerate() {
            write!(f, "{:4}: ", ix)?;
            match &node.op {
                Op::End => write!(f, "END")?,
                Op::Bol => write!(f, "BOL")?,
                Op::Eol => write!(f, "EOL")?,
                Op::Bow => write!(f, "BOW")?,
                Op::Eow => write!(f, "EOW")?,
                Op::Any => write!(f, "ANY")?,
                Op::Exactly(bytes) => {
                    write!(f, "EXACTLY \"")?;
                    write_bytes(f, bytes)?;
                    write!(f, "\"")?;
                }
                Op::Nothing => write!(f, "NOTHING")?,
                Op::Back => write!(f, "BACK")?,
                Op::Branch { operand } => write!(f, "BRANCH [{}]", operand)?,
                Op::Star { operand } => write!(f, "STAR [{}]", operand)?,
                Op::Plus { operand } => write!(f, "PLUS [{}]", operand)?,
                Op::BraceSimple { operand } => write!(f, "BRACE_SIMPLE [{}]", operand)?,
                Op::BraceLimits { min, max } => {
                    write!(f, "BRACE_LIMITS {{{},{}}}", min, max)?
                }
                Op::BraceComplex { slot, operand } => {
                    write!(f, "BRACE_COMPLEX{} [{}]", slot, operand)?
                }
                Op::Mopen(n) => write!(f, "MOPEN{}", n)?,
                Op::Mclose(n) => write!(f, "MCLOSE{}", n)?,
                Op::Backref(n) => write!(f, "BACKREF{}", n)?,
                Op::AnyOf(bytes) => {
                    write!(f, "ANYOF \"")?;
                    write_bytes(f, bytes)?;
                    write!(f, "\"")?;
                }
                Op::AnyBut(bytes) => {
                    write!(f, "ANYBUT \"")?;
                    write_bytes(f, bytes)?;
                    write!(f, "\"")?;
                }
                Op::Ident => write!(f, "IDENT")?,
                Op::SIdent => write!(f, "SIDENT")?,
                Op::Kword => write!(f, "KWORD")?,
                Op::SKword => write!(f, "SKWORD")?,
                Op::Fname => write!(f, "FNAME")?,
                Op::SFname => write!(f, "SFNAME")?,
                Op::Print => write!(f, "PRINT")?,
                Op::SPrint => write!(f, "SPRINT")?,
                Op::White => write!(f, "WHITE")?,
                Op::NWhite => write!(f, "NWHITE")?,
                Op::Digit => write!(f, "DIGIT")?,
                Op::NDigit => write!(f, "NDIGIT")?,
                Op::Hex => write!(f, "HEX")?,
                Op::NHex => write!(f, "NHEX")?,
                Op::Octal => write!(f, "OCTAL")?,
                Op::NOctal => write!(f, "NOCTAL")?,
                Op::Word => write!(f, "WORD")?,
                Op::NWord => write!(f, "NWORD")?,
                Op::Head => write!(f, "HEAD")?,
                Op::NHead => write!(f, "NHEAD")?,
                Op::Alpha => write!(f, "ALPHA")?,
                Op::NAlpha => write!(f, "NALPHA")?,
                Op::Lower => write!(f, "LOWER")?,
                Op::NLower => write!(f, "NLOWER")?,
                Op::Upper => write!(f, "UPPER")?,
                Op::NUpper => write!(f, "NUPPER")?,
            }
            match node.next {
                Some(next) => writeln!(f, " -> {}", next)?,
                None => writeln!(f)?,
            }
        }
        if self.anchored {
            writeln!(f, "anchored")?;
        }
        if let Some(b) = self.start_byte {
            writeln!(f, "start byte \"{}\"", ascii::escape_default(b))?;
        }
        if let Some(must) = &self.must {
            write!(f, "must \"")?;
            write_bytes(f, must)?;
            writeln!(f, "\"")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(op: Op, next: Option<NodeIx>) -> Node {
        Node { op, next }
    }

    #[test]
    fn operand_accessor() {
        assert_eq!(Op::Branch { operand: 7 }.operand(), Some(7));
        assert_eq!(Op::BraceComplex { slot: 3, operand: 2 }.operand(), Some(2));
        assert_eq!(Op::Exactly(Bytes::from_slice(b"ab")).operand(), None);
        assert_eq!(Op::BraceLimits { min: 1, max: 2 }.operand(), None);
    }

    #[test]
    fn display_lists_nodes_and_hints() {
        let prog = Prog {
            check: PROG_MAGIC,
            nodes: vec![
                node(Op::Exactly(Bytes::from_slice(b"ab\n")), Some(1)),
                node(Op::Branch { operand: 0 }, Some(2)),
                node(Op::End, None),
            ],
            start: 1,
            anchored: true,
            start_byte: Some(b'a'),
            must: Some(Bytes::from_slice(b"ab")),
        };
        let dump = prog.to_string();
        assert!(dump.starts_with("start 1\n"));
        assert!(dump.contains("   0: EXACTLY \"ab\\n\" -> 1\n"));
        assert!(dump.contains("   1: BRANCH [0] -> 2\n"));
        assert!(dump.contains("   2: END\n"));
        assert!(dump.contains("anchored\n"));
        assert!(dump.contains("start byte \"a\"\n"));
        assert!(dump.ends_with("must \"ab\"\n"));
    }
}
