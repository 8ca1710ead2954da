use criterion::{black_box, Criterion};
use futures::future::{BoxFuture, FutureExt};
use rfsnap::inline::read_urls;
use rfsnap::{Error, Fetch, HtmlDocument, SnapshotConfig, Snapshotter, StyleDeclaration};
use std::sync::Arc;
use std::time::Instant;
use url::Url;

// Pipeline benchmarks. Run with:
//    cargo bench --bench pipeline_bench

const STYLE: &str = "color: rgb(34, 34, 34); font: 14px/1.4 \"Open Sans\", sans-serif; \
    background: url(data:image/png;base64,iVBORw0KGgo=) no-repeat !important; margin: 0 auto; \
    padding: 4px 8px; border: 1px solid #ccc; --accent: Teal";

struct Offline;

impl Fetch for Offline {
    fn fetch<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, rfsnap::Result<Vec<u8>>> {
        async move { Err(Error::NetworkError(format!("offline: {}", url))) }.boxed()
    }
}

fn page(rows: usize) -> String {
    let mut body = String::new();
    for i in 0..rows {
        body.push_str(&format!(
            "<div class=\"row\"><span class=\"label\">row {}</span><input value=\"{}\"></div>",
            i, i
        ));
    }
    format!(
        "<html><head><style>.row {{ padding: 2px; color: #333 }} .label::before {{ content: '>' }}</style></head><body>{}</body></html>",
        body
    )
}

/// Bench: declaration block parsing and serialization
fn bench_style_declaration(c: &mut Criterion) {
    c.bench_function("style_declaration_parse", |b| {
        b.iter(|| StyleDeclaration::parse(black_box(STYLE)))
    });
    let parsed = StyleDeclaration::parse(STYLE);
    c.bench_function("style_declaration_css_text", |b| b.iter(|| black_box(&parsed).css_text()));
}

/// Bench: reference scanning
fn bench_read_urls(c: &mut Criterion) {
    let css = (0..50)
        .map(|i| format!("@font-face {{ font-family: F{}; src: url('/fonts/f{}.woff2') format('woff2'); }}", i, i % 10))
        .collect::<Vec<_>>()
        .join("\n");
    c.bench_function("read_urls_50_rules", |b| b.iter(|| read_urls(black_box(&css))));
}

/// Bench: full snapshot of a synthetic page, no network
fn bench_snapshot(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("runtime");
    let doc = HtmlDocument::parse(&page(200), None);
    let snapshotter = Snapshotter::with_fetcher(SnapshotConfig::default(), Arc::new(Offline));

    c.bench_function("to_svg_200_rows", |b| {
        b.iter(|| {
            let body = doc.body().expect("body");
            rt.block_on(snapshotter.to_svg(&doc, body)).expect("snapshot")
        })
    });
}

/// Nearest-rank percentile over sorted samples
fn percentile(samples: &[u128], pct: usize) -> u128 {
    let n = samples.len();
    if n == 0 {
        return 0;
    }
    let rank = (pct * n).div_ceil(100);
    samples[rank.saturating_sub(1).min(n - 1)]
}

fn bench_latency_percentiles() {
    let rt = tokio::runtime::Runtime::new().expect("runtime");
    let doc = HtmlDocument::parse(&page(50), None);
    let snapshotter = Snapshotter::with_fetcher(SnapshotConfig::default(), Arc::new(Offline));
    let body = doc.body().expect("body");

    let mut samples: Vec<u128> = (0..100)
        .map(|_| {
            let t0 = Instant::now();
            let _ = rt.block_on(snapshotter.to_svg(&doc, body));
            t0.elapsed().as_micros()
        })
        .collect();
    samples.sort_unstable();
    eprintln!(
        "to_svg_50_rows latency (us): p50={} p90={} p99={}",
        percentile(&samples, 50),
        percentile(&samples, 90),
        percentile(&samples, 99)
    );
}

// Run benches manually so percentile output shows up next to criterion's
fn main() {
    let mut c = Criterion::default();

    bench_style_declaration(&mut c);
    bench_read_urls(&mut c);
    bench_snapshot(&mut c);

    c.final_summary();

    bench_latency_percentiles();
}
