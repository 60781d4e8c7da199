//! Catalog benchmarks for medialib
//!
//! **Benchmarks Included:**
//! - `track_search`: substring search latency at 100, 1000 and 10000 tracks
//! - `track_upsert`: insert throughput for batches of tracks in one transaction
//! - `catalog_read`: single track read by id
//!
//! **Run benchmarks:**
//! ```bash
//! cargo bench                      # Run all benchmarks
//! cargo bench -- track_search      # Search only
//! ```
//!
//! Databases live in a `TempDir` so WAL behaviour matches a real catalog.

use std::path::PathBuf;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use medialib::metadata::TrackMetadata;
use medialib::storage::{get_track, init_storage, persist_track, search_tracks, Database, SearchOptions};
use tempfile::TempDir;

fn create_benchmark_db() -> (TempDir, Database) {
    let tmpdir = TempDir::new().expect("failed to create temp dir");
    let db = Database::open(tmpdir.path().join("bench.db")).expect("failed to open database");
    init_storage(&db).expect("failed to initialise storage");
    (tmpdir, db)
}

/// Ten tracks per album, five albums per artist.
fn track(i: usize) -> (PathBuf, TrackMetadata) {
    let album = i / 10;
    let path = PathBuf::from(format!("/music/artist_{}/album_{album}/{i:05}.mp3", album / 5));
    let meta = TrackMetadata {
        title: format!("Track {i}"),
        artist: format!("Artist {}", album / 5),
        album: format!("Album {album}"),
        track_number: u32::try_from(i % 10 + 1).unwrap_or_default(),
        duration: Duration::from_secs(180),
    };
    (path, meta)
}

fn populate(db: &Database, count: usize) {
    db.with_transaction(|conn| {
        for i in 0..count {
            let (path, meta) = track(i);
            persist_track(conn, &path, &meta)?;
        }
        Ok(())
    })
    .expect("populate failed");
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("track_search");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(5));

    for count in [100, 1000, 10000] {
        let (_tmpdir, db) = create_benchmark_db();
        populate(&db, count);

        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                db.with_conn(|conn| {
                    let results =
                        search_tracks(conn, black_box("album 4"), &SearchOptions::new(50))?;
                    black_box(results);
                    Ok(())
                })
                .expect("search failed");
            });
        });
    }

    group.finish();
}

fn bench_upsert(c: &mut Criterion) {
    let mut group = c.benchmark_group("track_upsert");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(5));

    for batch_size in [10, 100, 500] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{batch_size}_tracks")),
            &batch_size,
            |b, &batch_size| {
                b.iter_batched(
                    create_benchmark_db,
                    |(_tmpdir, db)| populate(&db, batch_size),
                    criterion::BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

fn bench_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("catalog_read");
    group.sample_size(10);

    let (_tmpdir, db) = create_benchmark_db();
    populate(&db, 1000);

    group.bench_function("single_track_read", |b| {
        b.iter(|| {
            db.with_conn(|conn| {
                black_box(get_track(conn, black_box(500))?);
                Ok(())
            })
            .expect("read failed");
        });
    });

    group.finish();
}

criterion_group!(benches, bench_search, bench_upsert, bench_read);
criterion_main!(benches);
