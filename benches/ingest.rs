//! Ingestion and search benchmarks over a generated fixture.
//!
//! Run with: `cargo bench`
//! Save baseline: `cargo bench -- --save-baseline main`
//! Compare: `cargo bench -- --baseline main`

use criterion::{criterion_group, criterion_main, Criterion};
use rowgrid::config::TableConfig;
use rowgrid::query::{SearchEvent, SearchScope};
use rowgrid::session::TableSession;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

const ROWS: usize = 250_000;

fn fixture() -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create fixture");
    let mut content = String::with_capacity(ROWS * 32);
    content.push_str("id,name,note\n");
    for i in 0..ROWS {
        let name = if i % 10_000 == 0 { "Alice" } else { "worker" };
        content.push_str(&format!("{i},{name},\"note, row {i}\"\n"));
    }
    file.write_all(content.as_bytes()).expect("write fixture");
    file.flush().expect("flush fixture");
    file
}

fn load_to_completion(path: &std::path::Path) -> TableSession {
    let config = TableConfig {
        chunk_rows: 10_000,
        ..TableConfig::default()
    };
    let (mut session, _events) = TableSession::open(path, config);
    session.join_load();
    session
}

fn bench_ingest(c: &mut Criterion) {
    let file = fixture();

    let mut group = c.benchmark_group("ingest");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(30));
    group.bench_function("load_250k_rows", |b| {
        b.iter(|| {
            let session = load_to_completion(file.path());
            assert_eq!(session.store().row_count(), ROWS as u64);
        });
    });
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let file = fixture();
    let session = load_to_completion(file.path());
    let name = session.schema().unwrap().column_index("name").unwrap();

    let mut group = c.benchmark_group("search");
    group.sample_size(10);
    group.bench_function("column_scan_250k_rows", |b| {
        b.iter(|| {
            let rx = session.search("ali", SearchScope::Column(name));
            let mut matches = 0;
            while let Ok(event) = rx.recv() {
                match event {
                    SearchEvent::Match(_) => matches += 1,
                    _ => break,
                }
            }
            assert_eq!(matches, 25);
        });
    });
    group.finish();
}

criterion_group!(benches, bench_ingest, bench_search);
criterion_main!(benches);
