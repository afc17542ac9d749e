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

/*!
An implementation of the classic editor "magic" regex dialect: a backtracking
engine with nine capture groups, backreferences, bounded repetition and the
substitution-template language that goes with it.

The dialect differs from modern regex syntax in two ways. First, which
characters are special is controlled by a *magic* switch: with magic on
(the default) `.` `*` `[` `~` match specially and `\(` opens a group; with
magic off everything except `^` `$` `\` is literal until escaped. Second,
some characters are only special by position: `^` anchors only as the first
character of a pattern or group, `$` only as the last, and a leading `*` is
a literal asterisk.

Patterns are compiled to a small node program and matched against one line
at a time by a recursive backtracking matcher. Matching is leftmost-first:
the earliest starting position wins, and within it alternatives are tried
left to right and repetitions greedily (or lazily for `\{-}` bounds).

# Example: matching and captures

```rust
use remagic::Regex;

let re = Regex::new(r"ab*c").unwrap();
let captures = re.exec("xxabbbc", true, false).unwrap().unwrap();
assert_eq!(captures.whole().as_str(), "abbbc");
assert_eq!(captures.whole().start(), 2);
```

Groups are written `\(` ... `\)` and referred back to with `\1` to `\9`:

```rust
use remagic::Regex;

let re = Regex::new(r"\(b.\)x\1").unwrap();
let captures = re.exec("abcxbcd", true, false).unwrap().unwrap();
assert_eq!(captures.get(1).unwrap().as_str(), "bc");
```

# Example: the magic switch

```rust
use remagic::RegexBuilder;

let re = RegexBuilder::new().magic(false).build("a.c").unwrap();
assert!(re.is_match("xa.c").unwrap());
assert!(!re.is_match("abc").unwrap());
```

# Example: substitution

[`expand`] fills a substitution template from the captures of a match:

```rust
use remagic::{expand, Regex};

let re = Regex::new(r"\(b.\)").unwrap();
let captures = re.exec("abcd", true, false).unwrap().unwrap();
let mut out = Vec::new();
expand(&captures, r"<\1>", false, true, &mut out, true).unwrap();
assert_eq!(out, b"<bc>");
```

# Text model

The engine works on one line of UTF-8 text at a time; `^` and `$` mean the
start and end of that line, never of an embedded `\n`. Comparisons are
bytewise, so multibyte characters match exactly and `.` consumes a single
byte.
*/

#![doc(html_root_url = "https://docs.rs/remagic/0.4.1")]
#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![warn(clippy::pedantic)]
#![allow(clippy::enum_glob_use)]
#![allow(clippy::if_not_else)]
#![allow(clippy::match_on_vec_items)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]

use std::fmt;
use std::ops::Range;

mod classify;
mod compile;
mod error;
mod expand;
mod lexer;
mod prefilter;
mod program;
mod vm;

pub use crate::error::{CompileError, Error, Result, RuntimeError};
pub use crate::expand::{expand, expand_tilde};
pub use crate::lexer::skip_to_delimiter;
pub use crate::program::Prog;

/// A compiled pattern, ready to run against lines of text.
#[derive(Clone, Debug)]
pub struct Regex {
    prog: Prog,
}

impl Regex {
    /// Compile `pattern` with magic on and no previous substitution.
    ///
    /// # Errors
    ///
    /// Returns an [`Error::Compile`] if the pattern is malformed.
    #[inline]
    pub fn new(pattern: &str) -> Result<Regex> {
        RegexBuilder::new().build(pattern)
    }

    /// Find the leftmost match in `line` and return its captures.
    ///
    /// `at_line_start` says whether offset 0 of `line` is really the start
    /// of a line; `^` only matches there. Pass false when handing the
    /// matcher a tail slice of a longer line. `ignore_case` folds ASCII
    /// letters in every comparison the pattern makes.
    ///
    /// # Errors
    ///
    /// Returns an [`Error::Runtime`] if the program fails its consistency
    /// checks.
    #[inline]
    pub fn exec<'t>(
        &self,
        line: &'t str,
        at_line_start: bool,
        ignore_case: bool,
    ) -> Result<Option<Captures<'t>>> {
        let slots = vm::exec(&self.prog, line, at_line_start, ignore_case, None)?;
        Ok(slots.map(|slots| Captures { text: line, slots }))
    }

    /// Like [`Regex::exec`], polling `interrupt` while matching runs.
    ///
    /// The callback is invoked every few thousand matcher steps; returning
    /// true abandons the attempt.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Interrupted`] when the callback fires, or an
    /// [`Error::Runtime`] as for [`Regex::exec`].
    #[inline]
    pub fn exec_interruptible<'t>(
        &self,
        line: &'t str,
        at_line_start: bool,
        ignore_case: bool,
        interrupt: &dyn Fn() -> bool,
    ) -> Result<Option<Captures<'t>>> {
        let slots = vm::exec(
            &self.prog,
            line,
            at_line_start,
            ignore_case,
            Some(interrupt),
        )?;
        Ok(slots.map(|slots| Captures { text: line, slots }))
    }

    /// Does the pattern match anywhere in `line`?
    ///
    /// # Errors
    ///
    /// Returns an [`Error::Runtime`] as for [`Regex::exec`].
    #[inline]
    pub fn is_match(&self, line: &str) -> Result<bool> {
        Ok(self.exec(line, true, false)?.is_some())
    }

    /// The compiled program backing this pattern.
    #[must_use]
    #[inline]
    pub fn as_prog(&self) -> &Prog {
        &self.prog
    }
}

/// A builder for a [`Regex`], for when the defaults are not wanted.
#[derive(Clone, Debug, Default)]
pub struct RegexBuilder(RegexOptions);

#[derive(Clone, Debug)]
struct RegexOptions {
    magic: bool,
    previous_subst: Option<String>,
}

impl Default for RegexOptions {
    fn default() -> Self {
        RegexOptions {
            magic: true,
            previous_subst: None,
        }
    }
}

impl RegexBuilder {
    /// Create a builder with magic on and no previous substitution.
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the magic switch. With magic off, `.` `*` `[` `~` are literal
    /// until escaped.
    #[inline]
    pub fn magic(&mut self, magic: bool) -> &mut Self {
        self.0.magic = magic;
        self
    }

    /// Record the previously substituted text the `~` atom expands to.
    /// Without it, compiling a pattern containing `~` fails with
    /// [`CompileError::NoPreviousSubst`].
    #[inline]
    pub fn previous_subst(&mut self, text: impl Into<String>) -> &mut Self {
        self.0.previous_subst = Some(text.into());
        self
    }

    /// Build the [`Regex`].
    ///
    /// # Errors
    ///
    /// Returns an [`Error::Compile`] if the pattern is malformed.
    #[inline]
    pub fn build(&self, pattern: &str) -> Result<Regex> {
        let prog = compile::compile(pattern, self.0.magic, self.0.previous_subst.as_deref())?;
        Ok(Regex { prog })
    }
}

/// Compile `pattern` to a bare program without the [`Regex`] wrapper.
///
/// # Errors
///
/// Returns an [`Error::Compile`] if the pattern is malformed.
#[inline]
pub fn compile(pattern: &str, magic: bool) -> Result<Prog> {
    compile::compile(pattern, magic, None)
}

/// Dump a compiled program to stdout, one node per line.
#[doc(hidden)]
pub fn debug_print(prog: &Prog) {
    print!("{}", prog);
}

/// The spans recorded by a successful match: the whole match in group 0 and
/// up to nine capture groups.
#[derive(Clone, Debug)]
pub struct Captures<'t> {
    pub(crate) text: &'t str,
    pub(crate) slots: vm::Slots,
}

impl<'t> Captures<'t> {
    /// The span of group `i`, or `None` if the group did not take part in
    /// the match. Group 0 is the whole match.
    #[must_use]
    pub fn get(&self, i: usize) -> Option<Match<'t>> {
        let (start, end) = *self.slots.get(i)?.as_ref()?;
        Some(Match {
            text: self.text,
            start,
            end,
        })
    }

    /// The whole match.
    #[must_use]
    pub fn whole(&self) -> Match<'t> {
        // Group 0 is always recorded; fall back to an empty span at the
        // origin rather than panic on a hand-damaged value.
        self.get(0).unwrap_or(Match {
            text: self.text,
            start: 0,
            end: 0,
        })
    }

    /// The line the match was found in.
    #[must_use]
    pub fn text(&self) -> &'t str {
        self.text
    }
}

/// A single matched span of the input line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Match<'t> {
    text: &'t str,
    start: usize,
    end: usize,
}

impl<'t> Match<'t> {
    /// Byte offset of the start of the span.
    #[must_use]
    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    /// Byte offset of the end of the span.
    #[must_use]
    #[inline]
    pub fn end(&self) -> usize {
        self.end
    }

    /// The span as a byte range.
    #[must_use]
    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// The matched text.
    #[must_use]
    #[inline]
    pub fn as_str(&self) -> &'t str {
        &self.text[self.start..self.end]
    }

    /// Is the span empty?
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Length of the span in bytes.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }
}

impl fmt::Display for Match<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
