//! Criterion micro-benchmarks for record encode/decode throughput.

use std::io::Cursor;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use reel_core::{DrawCount, GameMode, KeyCode, TurnId};
use reel_log::{Player, Recorder, SessionHeader, DEFAULT_WINDOW_CAPACITY};

const TURNS: u32 = 10_000;

fn bench_header() -> SessionHeader {
    SessionHeader {
        version: "CE 1.9.3".into(),
        mode: GameMode::Standard,
        seed: 42,
        turn_count: 0,
        max_level_changes: 0,
        declared_length: 0,
    }
}

/// One keystroke plus one checkpoint per turn, the dominant record mix
/// of an interactive session.
fn record_session(turns: u32) -> Vec<u8> {
    let mut recorder = Recorder::new(
        Cursor::new(Vec::new()),
        bench_header(),
        DEFAULT_WINDOW_CAPACITY,
    )
    .unwrap();
    for turn in 1..=turns {
        recorder
            .record_keystroke(KeyCode((turn % 23) as u16), false, false)
            .unwrap();
        recorder
            .record_rng_check(TurnId(turn), DrawCount(u64::from(turn) * 3))
            .unwrap();
    }
    recorder.finish(turns, 0).unwrap().into_inner()
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    group.throughput(Throughput::Elements(u64::from(TURNS)));
    group.bench_function("keystroke_and_checkpoint_per_turn", |b| {
        b.iter(|| black_box(record_session(TURNS)));
    });
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let bytes = record_session(TURNS);

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Elements(u64::from(TURNS)));
    group.bench_function("keystroke_and_checkpoint_per_turn", |b| {
        b.iter(|| {
            let mut player =
                Player::open(Cursor::new(bytes.clone()), DEFAULT_WINDOW_CAPACITY).unwrap();
            for _ in 0..TURNS {
                black_box(player.next_event().unwrap());
                black_box(player.next_rng_check().unwrap());
            }
            assert!(player.at_end());
        });
    });
    group.finish();
}

fn bench_run_compression(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    group.throughput(Throughput::Elements(u64::from(TURNS)));
    group.bench_function("merged_keystroke_run", |b| {
        b.iter(|| {
            let mut recorder = Recorder::new(
                Cursor::new(Vec::new()),
                bench_header(),
                DEFAULT_WINDOW_CAPACITY,
            )
            .unwrap();
            for _ in 0..TURNS {
                recorder.record_keystroke(KeyCode(5), false, false).unwrap();
            }
            black_box(recorder.finish(0, 0).unwrap().into_inner())
        });
    });
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_run_compression);
criterion_main!(benches);
