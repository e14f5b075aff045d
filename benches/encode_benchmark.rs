//! Benchmarks for option-list encoding and document assembly.
//!
//! Run with: cargo bench
//!
//! Encoding sits on the hot path of every engine call, so these track
//! the cost of building and rendering option lists of realistic shapes.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use enpdf::builder::PdfBuilder;
use enpdf::testing::FakeEngine;
use enpdf::{Color, OptionList};

/// Build an option list shaped like a typical textflow placement call.
fn typical_placement_options() -> OptionList {
    OptionList::new()
        .with("fontsize", 10.5)
        .with("leading", "125%")
        .with("alignment", "justify")
        .with("fillcolor", Color::rgb(20, 20, 20))
        .with("firstlinedist", "leading")
        .with_flag("avoidemptybegin")
        .with("fitmethod", "auto")
}

/// Build an option list with `entries` numeric entries.
fn synthetic_options(entries: usize) -> OptionList {
    let mut options = OptionList::new();
    for index in 0..entries {
        options.set(format!("option{index}"), index as f64);
    }
    options
}

/// Benchmark encoding of common value shapes.
fn bench_value_encoding(c: &mut Criterion) {
    let placement = typical_placement_options();

    c.bench_function("encode_placement_options", |b| {
        b.iter(|| black_box(&placement).encode());
    });

    let nested = OptionList::new()
        .with("fittextline", typical_placement_options())
        .with("margin", 4.0);
    c.bench_function("encode_nested_options", |b| {
        b.iter(|| black_box(&nested).encode());
    });

    let shading = OptionList::new()
        .with("startcolor", Color::gray(1.0))
        .with("endcolor", Color::cmyk(0.2, 0.0, 0.4, 0.1));
    c.bench_function("encode_color_options", |b| {
        b.iter(|| black_box(&shading).encode());
    });
}

/// Benchmark encoding cost as the list grows.
fn bench_list_growth(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_growth");

    for entries in [4usize, 16, 64].iter() {
        let options = synthetic_options(*entries);
        group.bench_function(format!("{}_entries", entries), |b| {
            b.iter(|| black_box(&options).encode());
        });
    }

    group.finish();
}

/// Benchmark the default-merging done by placement helpers.
fn bench_merge(c: &mut Criterion) {
    let defaults = typical_placement_options();
    let overrides = OptionList::new()
        .with("fitmethod", "meet")
        .with("rotate", 90.0);

    c.bench_function("merge_over_defaults", |b| {
        b.iter(|| black_box(&overrides).merge_over(black_box(&defaults)).encode());
    });
}

/// Benchmark a small document built end to end against the fake engine.
fn bench_document_assembly(c: &mut Criterion) {
    c.bench_function("assemble_three_pages", |b| {
        b.iter(|| {
            let mut pdf = PdfBuilder::new(FakeEngine::new()).unwrap();
            let font = pdf.load_font("Helvetica", None, OptionList::new()).unwrap();
            for _ in 0..3 {
                pdf.add_page(595.0, 842.0, OptionList::new()).unwrap();
                let flow = pdf
                    .new_textflow(&font, 10.5, "benchmark body text", OptionList::new())
                    .unwrap();
                pdf.place_textflow(&flow, 40.0, 40.0, 515.0, 760.0, OptionList::new())
                    .unwrap();
            }
            pdf.render().unwrap()
        });
    });
}

criterion_group!(
    benches,
    bench_value_encoding,
    bench_list_growth,
    bench_merge,
    bench_document_assembly,
);
criterion_main!(benches);
