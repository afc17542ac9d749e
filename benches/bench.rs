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

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use remagic::{expand, Regex, RegexBuilder};

fn compile_literal(c: &mut Criterion) {
    c.bench_function("compile_literal", |b| {
        b.iter(|| Regex::new(black_box("needle")))
    });
}

fn compile_groups(c: &mut Criterion) {
    c.bench_function("compile_groups", |b| {
        b.iter(|| Regex::new(black_box(r"^\(\i\+\)\s*=\s*\(.*\)$")))
    });
}

fn match_literal_miss(c: &mut Criterion) {
    let re = Regex::new("needle").unwrap();
    let line = "hay ".repeat(200);
    // The must-literal prefilter should reject without running a node.
    c.bench_function("match_literal_miss", |b| {
        b.iter(|| re.exec(black_box(&line), true, false))
    });
}

fn match_anchored(c: &mut Criterion) {
    let re = Regex::new(r"^\s*\(\i\+\)").unwrap();
    let line = "    identifier = value";
    c.bench_function("match_anchored", |b| {
        b.iter(|| re.exec(black_box(line), true, false))
    });
}

fn match_backtracking(c: &mut Criterion) {
    let re = Regex::new(r"\(a*\)a*ab").unwrap();
    let line = format!("{}b", "a".repeat(64));
    c.bench_function("match_backtracking", |b| {
        b.iter(|| re.exec(black_box(&line), true, false))
    });
}

fn match_ignore_case(c: &mut Criterion) {
    let re = Regex::new("needle").unwrap();
    let line = format!("{}NEEDLE", "hay ".repeat(50));
    c.bench_function("match_ignore_case", |b| {
        b.iter(|| re.exec(black_box(&line), true, true))
    });
}

fn match_backref(c: &mut Criterion) {
    let re = RegexBuilder::new().build(r"\(\i\+\) \1").unwrap();
    let line = "one two two three";
    c.bench_function("match_backref", |b| {
        b.iter(|| re.exec(black_box(line), true, false))
    });
}

fn expand_template(c: &mut Criterion) {
    let re = Regex::new(r"\(\i\+\)-\(\i\+\)").unwrap();
    let caps = re.exec("alpha-beta", true, false).unwrap().unwrap();
    c.bench_function("expand_template", |b| {
        b.iter(|| {
            let mut out = Vec::new();
            expand(
                black_box(&caps),
                black_box(r"\2, \u\1 (&)"),
                false,
                true,
                &mut out,
                true,
            )
        })
    });
}

criterion_group!(
    benches,
    compile_literal,
    compile_groups,
    match_literal_miss,
    match_anchored,
    match_backtracking,
    match_ignore_case,
    match_backref,
    expand_template
);
criterion_main!(benches);
