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

//! Byte classification over a fixed 256-entry bitmask table.
//!
//! Classification is deliberately locale-independent: every query is a table
//! lookup or a range test on the raw byte value, so a compiled program means
//! the same thing on every host. Bytes 0xC0-0xFF count as identifier and
//! file-name characters, matching the editor convention for Latin-1 text.

const DIGIT: u8 = 0x01;
const HEX: u8 = 0x02;
const OCTAL: u8 = 0x04;
const WORD: u8 = 0x08;
const HEAD: u8 = 0x10;
const ALPHA: u8 = 0x20;
const LOWER: u8 = 0x40;
const UPPER: u8 = 0x80;

static CLASS_TAB: [u8; 256] = {
    let mut tab = [0u8; 256];
    let mut b = b'0';
    while b <= b'9' {
        tab[b as usize] = DIGIT | HEX | WORD;
        if b <= b'7' {
            tab[b as usize] |= OCTAL;
        }
        b += 1;
    }
    let mut b = b'a';
    while b <= b'z' {
        tab[b as usize] = WORD | HEAD | ALPHA | LOWER;
        if b <= b'f' {
            tab[b as usize] |= HEX;
        }
        b += 1;
    }
    let mut b = b'A';
    while b <= b'Z' {
        tab[b as usize] = WORD | HEAD | ALPHA | UPPER;
        if b <= b'F' {
            tab[b as usize] |= HEX;
        }
        b += 1;
    }
    tab[b'_' as usize] = WORD | HEAD;
    tab
};

#[inline]
pub(crate) const fn is_digit(b: u8) -> bool {
    CLASS_TAB[b as usize] & DIGIT != 0
}

#[inline]
pub(crate) const fn is_hex(b: u8) -> bool {
    CLASS_TAB[b as usize] & HEX != 0
}

#[inline]
pub(crate) const fn is_octal(b: u8) -> bool {
    CLASS_TAB[b as usize] & OCTAL != 0
}

/// Word character: alphanumeric or underscore.
#[inline]
pub(crate) const fn is_word(b: u8) -> bool {
    CLASS_TAB[b as usize] & WORD != 0
}

/// Head-of-word character: a word character that is not a digit.
#[inline]
pub(crate) const fn is_head(b: u8) -> bool {
    CLASS_TAB[b as usize] & HEAD != 0
}

#[inline]
pub(crate) const fn is_alpha(b: u8) -> bool {
    CLASS_TAB[b as usize] & ALPHA != 0
}

#[inline]
pub(crate) const fn is_lower(b: u8) -> bool {
    CLASS_TAB[b as usize] & LOWER != 0
}

#[inline]
pub(crate) const fn is_upper(b: u8) -> bool {
    CLASS_TAB[b as usize] & UPPER != 0
}

/// Identifier character: letters, digits, underscore, and the Latin-1
/// accented range.
#[inline]
pub(crate) const fn is_ident(b: u8) -> bool {
    is_alpha(b) || is_digit(b) || b == b'_' || b >= 0xC0
}

/// Keyword character. The keyword table matches the identifier table by
/// default.
#[inline]
pub(crate) const fn is_keyword(b: u8) -> bool {
    is_ident(b)
}

/// File-name character, following the default editor file-name set.
#[inline]
pub(crate) const fn is_fname(b: u8) -> bool {
    is_alpha(b)
        || is_digit(b)
        || b >= 0xC0
        || matches!(
            b,
            b'/' | b'.' | b'-' | b'_' | b'+' | b',' | b'#' | b'$' | b'%' | b'~' | b'='
        )
}

/// Printable character: ASCII graphic plus space, and the high Latin-1 range.
#[inline]
pub(crate) const fn is_print(b: u8) -> bool {
    matches!(b, 0x20..=0x7E | 0xA0..=0xFF)
}

/// Whitespace as the matcher sees it: space or tab only.
#[inline]
pub(crate) const fn is_white(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

#[inline]
const fn is_alnum(b: u8) -> bool {
    is_alpha(b) || is_digit(b)
}

#[inline]
const fn is_cntrl(b: u8) -> bool {
    b < 0x20 || b == 0x7F
}

#[inline]
const fn is_graph(b: u8) -> bool {
    matches!(b, 0x21..=0x7E)
}

#[inline]
const fn is_punct(b: u8) -> bool {
    is_graph(b) && !is_alnum(b)
}

#[inline]
const fn is_space(b: u8) -> bool {
    b == b' ' || matches!(b, 0x09..=0x0D)
}

/// Named bracket classes, stored with their closing `:]` so that one
/// `starts_with` both recognizes the name and validates the terminator.
static BRACKET_CLASSES: [(&[u8], fn(u8) -> bool); 12] = [
    (b"alnum:]", is_alnum),
    (b"alpha:]", is_alpha),
    (b"blank:]", is_white),
    (b"cntrl:]", is_cntrl),
    (b"digit:]", is_digit),
    (b"graph:]", is_graph),
    (b"lower:]", is_lower),
    (b"print:]", is_print),
    (b"punct:]", is_punct),
    (b"space:]", is_space),
    (b"upper:]", is_upper),
    (b"xdigit:]", is_hex),
];

/// Recognize a `[:name:]` class at the start of `rest`. Returns the class
/// membership predicate and the number of bytes the token occupies, or `None`
/// if `rest` does not start with a well-formed class name (in which case the
/// leading `[` is an ordinary member byte).
pub(crate) fn scan_bracket_class(rest: &[u8]) -> Option<(fn(u8) -> bool, usize)> {
    let tail = rest.strip_prefix(b"[:")?;
    for &(name, pred) in BRACKET_CLASSES.iter() {
        if tail.starts_with(name) {
            return Some((pred, 2 + name.len()));
        }
    }
    None
}
