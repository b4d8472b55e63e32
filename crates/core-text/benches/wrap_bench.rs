use core_encoding::{CP_UTF8, decoder_for};
use core_text::linemap::LineMap;
use core_text::reflow::{ControlRenderMode, ReflowOptions};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

fn sample_text(lines: usize) -> Vec<u8> {
    let mut buf = String::new();
    for i in 0..lines {
        buf.push_str(&format!(
            "line {i} has a handful of words so the wrap engine has to do real work here\n"
        ));
    }
    buf.into_bytes()
}

fn wrap_all(bytes: &[u8], opts: &ReflowOptions) {
    let decoder = decoder_for(CP_UTF8, false);
    let mut map = LineMap::new();
    map.set_stream_len(bytes.len() as u64);
    loop {
        match map.advance(bytes, 0, decoder.as_ref(), opts) {
            core_text::linemap::Advance::EndOfStream => break,
            core_text::linemap::Advance::NeedMoreData => break,
            _ => {}
        }
    }
}

fn wrap_bench(c: &mut Criterion) {
    let bytes = sample_text(2_000);
    let wrapped = ReflowOptions {
        wrap_width: Some(80),
        max_line_length: 4096,
        tab_width: 8,
        expand_tabs: true,
        binary_mode: false,
        control_mode: ControlRenderMode::Caret,
        help_mode_secondary_indent: false,
    };
    let unwrapped = ReflowOptions {
        wrap_width: None,
        ..wrapped
    };

    c.bench_function("wrap_2000_lines_at_80_cols", |b| {
        b.iter(|| wrap_all(black_box(&bytes), black_box(&wrapped)));
    });
    c.bench_function("wrap_2000_lines_unwrapped", |b| {
        b.iter(|| wrap_all(black_box(&bytes), black_box(&unwrapped)));
    });
}

criterion_group!(benches, wrap_bench);
criterion_main!(benches);
