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

//! Error types for pattern compilation, matching and substitution.

use thiserror::Error;

/// Result type for this crate with a defaulted error type.
pub type Result<T> = ::std::result::Result<T, Error>;

/// An error that occurred while compiling a pattern.
///
/// Several variants carry the offending fragment rendered in the dialect the
/// pattern was written in, so `\+` is reported as `\+` in a non-magic pattern
/// and as `+` in a magic one.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum CompileError {
    /// More than 9 capture groups in one pattern.
    #[error("too many \\(")]
    TooManyGroups,
    /// A `\(` without a matching `\)`.
    #[error("unmatched \\(")]
    UnmatchedOpen,
    /// A `\)` without a matching `\(`.
    #[error("unmatched \\)")]
    UnmatchedClose,
    /// A quantifier with no atom in front of it, e.g. a bare `\+`.
    #[error("{0} follows nothing")]
    RepeatNothing(String),
    /// A quantifier on an atom that can match the empty string.
    #[error("{0} operand could be empty")]
    RepeatEmpty(String),
    /// A quantifier directly following another quantifier, e.g. `a*\+`.
    #[error("{0} follows a repeated atom")]
    StackedRepeat(String),
    /// Malformed `\{...}` bounds: not numeric, missing `}`, out of range,
    /// or the useless `\{0,0}`.
    #[error("syntax error in {0}...}}")]
    InvalidLimits(String),
    /// A descending range in a bracket expression, e.g. `[z-a]`.
    #[error("invalid range")]
    InvalidRange,
    /// A back-reference to a group whose `\(` has not been seen yet.
    #[error("illegal back reference")]
    IllegalBackref,
    /// More than 10 complex bounded repetitions in one pattern.
    #[error("too many complex \\{{...}}s")]
    TooManyComplexRepeats,
    /// `~` used with no previous substitution template recorded.
    #[error("no previous substitute pattern")]
    NoPreviousSubst,
    /// A state the compiler should never reach.
    #[error("internal error")]
    Internal,
}

/// An error that occurred while running a compiled program.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum RuntimeError {
    /// The interrupt predicate reported true and the match was abandoned.
    #[error("pattern match interrupted")]
    Interrupted,
    /// The program is not one this library built, or its node links are
    /// inconsistent.
    #[error("corrupted program")]
    Corrupt,
    /// A capture range disagrees with the text it was captured from.
    #[error("damaged match text")]
    DamagedMatch,
}

/// Any error this crate reports.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
    /// An error while compiling a pattern.
    #[error("{0}")]
    Compile(#[from] CompileError),
    /// An error while matching or expanding.
    #[error("{0}")]
    Runtime(#[from] RuntimeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragments_render_in_dialect() {
        let e = CompileError::RepeatNothing("\\+".to_string());
        assert_eq!(e.to_string(), "\\+ follows nothing");
        let e = CompileError::RepeatNothing("*".to_string());
        assert_eq!(e.to_string(), "* follows nothing");
    }

    #[test]
    fn limits_message_closes_the_brace() {
        let e = CompileError::InvalidLimits("\\{".to_string());
        assert_eq!(e.to_string(), "syntax error in \\{...}");
    }

    #[test]
    fn wrapping_preserves_message() {
        let e = Error::from(RuntimeError::Interrupted);
        assert_eq!(e.to_string(), "pattern match interrupted");
    }
}
