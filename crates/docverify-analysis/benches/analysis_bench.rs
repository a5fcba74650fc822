// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the text analysis stage: classification, label
// scan, identifier patterns and scoring over a typical noisy OCR dump.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use docverify_analysis::{RecognizedText, analyze_text};

/// Roughly what Tesseract returns for a phone photo of a PAN card.
const PAN_CARD_TEXT: &str = "\
 aT Pe ‘ , HRT WaT\n\
INCOME TAX DEPARTMENT © GOVT. OF INDIA\n\
|\n\
Permanent Account Number Card\n\
ABCDE1234F\n\
Name / a\n\
RAHUL KUMAR SHARMA\n\
Father's Name\n\
SURESH KUMAR SHARMA\n\
Date of Birth / 14/08/1990\n\
 ~~ Signature\n";

/// No keywords, no identifiers: every fallback runs and misses.
const NOISE_TEXT: &str = "lorem ipsum dolor\nsit amet\n::\nconsectetur adipiscing\n";

fn bench_analyze_text(c: &mut Criterion) {
    c.bench_function("analyze_text (pan card)", |b| {
        b.iter(|| analyze_text(black_box(&RecognizedText::new(PAN_CARD_TEXT))));
    });

    c.bench_function("analyze_text (noise)", |b| {
        b.iter(|| analyze_text(black_box(&RecognizedText::new(NOISE_TEXT))));
    });
}

criterion_group!(benches, bench_analyze_text);
criterion_main!(benches);
