use criterion::{black_box, criterion_group, criterion_main, Criterion};
use posh_line::color::Writer;
use posh_line::config::{SegmentConfig, SegmentStyle};
use posh_line::engine::{layout, BlockStyle, Placement, SegmentDescriptor};
use posh_line::template::{Context, Globals, Renderer, Template};
use posh_line::utils::cache::{Scope, Store, CACHE_DIR_ENV, INFINITE, SESSION_ENV};
use posh_line::Shell;
use serde_json::json;
use std::process::Command;
use std::time::Duration;
use tempfile::TempDir;

const GIT_TEMPLATE: &str =
    " {{ .HEAD }}{{ if .Working.Changed }} {{ .Working.String }}{{ end }}{{ if gt .Code 0 }} ✘{{ end }} ";

fn globals() -> serde_json::Value {
    Globals {
        shell: "zsh".to_string(),
        user_name: "bench".to_string(),
        code: 1,
        ..Globals::default()
    }
    .to_value()
}

fn bench_template_rendering(c: &mut Criterion) {
    let globals = globals();
    let data = json!({ "HEAD": "main", "Working": { "Changed": true, "String": "+1 ~2" } });
    let ctx = Context::new(&globals).with_data(&data);

    let mut group = c.benchmark_group("template");

    group.bench_function("parse_and_execute", |b| {
        b.iter(|| {
            let template = Template::new(black_box(GIT_TEMPLATE));
            black_box(template.execute(&ctx))
        })
    });

    let renderer = Renderer::new();
    group.bench_function("pooled_render", |b| {
        b.iter(|| black_box(renderer.render_str(black_box(GIT_TEMPLATE), &ctx)))
    });

    group.finish();
}

fn bench_layout(c: &mut Criterion) {
    let writer = Writer::colored(Shell::Zsh);
    let segments: Vec<SegmentDescriptor> = (0..12)
        .map(|i| {
            let config = SegmentConfig {
                style: if i % 3 == 0 { SegmentStyle::Plain } else { SegmentStyle::Powerline },
                powerline_symbol: "\u{e0b0}".to_string(),
                foreground: "#ffffff".to_string(),
                background: format!("#{:02x}3050", i * 20),
                ..SegmentConfig::default()
            };
            SegmentDescriptor::from_config(&config).with_text(format!(" segment {} ", i))
        })
        .collect();
    let style = BlockStyle {
        separator: " ".to_string(),
    };

    c.bench_function("layout_12_segments", |b| {
        b.iter(|| black_box(layout(black_box(&segments), Placement::Left, &style, &writer)))
    });
}

fn bench_cache_store(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    let store = Store::open(Scope::Device, temp_dir.path().join("device.json"));
    for i in 0..100 {
        store.set(&format!("key{}", i), "value", INFINITE);
    }

    let mut group = c.benchmark_group("cache_store");
    group.bench_function("get", |b| b.iter(|| black_box(store.get(black_box("key50")))));
    group.bench_function("set", |b| b.iter(|| store.set(black_box("key50"), "other", 60)));
    group.bench_function("open", |b| {
        b.iter(|| black_box(Store::open(Scope::Device, temp_dir.path().join("device.json"))))
    });
    group.finish();
}

fn bench_binary(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();

    // Needs a release build of the binary.
    let mut group = c.benchmark_group("binary");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(20);

    for shell in ["zsh", "bash", "fish"] {
        group.bench_with_input(format!("primary_{}", shell), shell, |b, shell| {
            b.iter(|| {
                let output = Command::new("./target/release/posh-line")
                    .args(["--shell", shell, "--status", "1", "--terminal-width", "120"])
                    .env(CACHE_DIR_ENV, temp_dir.path())
                    .env(SESSION_ENV, "bench")
                    .output()
                    .expect("Failed to execute");
                black_box(output)
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_template_rendering,
    bench_layout,
    bench_cache_store,
    bench_binary
);
criterion_main!(benches);
