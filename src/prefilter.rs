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

//! Cheap-rejection scans driven by the compiler's optimization hints.
//!
//! A program can carry a byte every match must start with and a literal every
//! matching line must contain. The matcher uses [`find_byte`] to hop between
//! candidate start positions and [`contains`] to throw away whole lines
//! before attempting anything.

use memchr::{memchr, memchr2, memmem};

/// Does `haystack` contain `needle` anywhere, under the given case policy?
pub(crate) fn contains(haystack: &[u8], needle: &[u8], ignore_case: bool) -> bool {
    let first = match needle.first() {
        Some(&first) => first,
        None => return true,
    };
    if !ignore_case {
        return memmem::find(haystack, needle).is_some();
    }
    let mut from = 0;
    while let Some(at) = find_insensitive(&haystack[from..], first).map(|off| from + off) {
        if haystack[at..]
            .get(..needle.len())
            .map_or(false, |head| head.eq_ignore_ascii_case(needle))
        {
            return true;
        }
        from = at + 1;
    }
    false
}

/// Position of the first occurrence of `byte` at or after `from`, under the
/// given case policy.
pub(crate) fn find_byte(
    haystack: &[u8],
    from: usize,
    byte: u8,
    ignore_case: bool,
) -> Option<usize> {
    let tail = haystack.get(from..)?;
    let off = if ignore_case {
        find_insensitive(tail, byte)
    } else {
        memchr(byte, tail)
    }?;
    Some(from + off)
}

fn find_insensitive(haystack: &[u8], byte: u8) -> Option<usize> {
    if byte.is_ascii_alphabetic() {
        memchr2(byte, byte ^ 0x20, haystack)
    } else {
        memchr(byte, haystack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_exact() {
        assert!(contains(b"one two three", b"two", false));
        assert!(!contains(b"one two three", b"Two", false));
        assert!(!contains(b"one", b"one two", false));
        assert!(contains(b"anything", b"", false));
    }

    #[test]
    fn contains_folded() {
        assert!(contains(b"one TWO three", b"two", true));
        assert!(contains(b"one two three", b"TWO", true));
        assert!(!contains(b"one tw", b"two", true));
        // Repeated first bytes must not end the scan early.
        assert!(contains(b"ttttwo", b"two", true));
    }

    #[test]
    fn find_byte_hops() {
        assert_eq!(find_byte(b"abcabc", 0, b'c', false), Some(2));
        assert_eq!(find_byte(b"abcabc", 3, b'c', false), Some(5));
        assert_eq!(find_byte(b"abcabc", 6, b'c', false), None);
        assert_eq!(find_byte(b"abcabc", 9, b'c', false), None);
        assert_eq!(find_byte(b"abCabc", 0, b'c', true), Some(2));
        // Case folding applies to letters only.
        assert_eq!(find_byte(b"a[b", 0, b'[', true), Some(1));
    }
}
