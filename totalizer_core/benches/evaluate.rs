use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use totalizer_core::{ChannelConfig, ChannelTotalizer, TotalMode};
use totalizer_traits::{Countby, WeightSnapshot};

// Repeating load cycles: empty, noisy ramp, settled load, unload.
fn synth_cycles(n: usize, seed: u32) -> Vec<WeightSnapshot> {
    let mut state = seed.max(1);
    let mut next_f32 = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        (x as f32) / (u32::MAX as f32 + 1.0)
    };
    let mut v = Vec::with_capacity(n);
    for i in 0..n {
        let phase = i % 200;
        let (weight, in_motion) = match phase {
            0..=19 => (0.0, false),
            20..=49 => ((phase - 20) as f32 * 3.0, true),
            50..=179 => (90.0 + (next_f32() * 2.0 - 1.0) * 4.0, false),
            _ => (0.0, phase < 185),
        };
        v.push(WeightSnapshot {
            weight,
            in_motion,
            overloaded: false,
            active: true,
        });
    }
    v
}

fn cfg(mode: TotalMode) -> ChannelConfig {
    ChannelConfig {
        capacity: 100.0,
        mode,
        rise_pct: 5.0,
        drop_pct: 2.0,
        min_stable_ms: 300,
        pending_ms: 1000,
        accept_lower: 80.0,
        accept_upper: 100.0,
    }
}

pub fn bench_evaluate(c: &mut Criterion) {
    let mut g = c.benchmark_group("evaluate");
    // Allow quick tweaking without CLI flags (Criterion 0.5):
    //   BENCH_SAMPLE_SIZE=10 BENCH_MEAS_MS=50 cargo bench -p totalizer_core --bench evaluate
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE") {
        if let Ok(n) = ss.parse::<usize>() {
            g.sample_size(n.max(1));
        }
    } else {
        g.sample_size(50);
    }
    if let Ok(ms) = std::env::var("BENCH_MEAS_MS")
        && let Ok(ms_u64) = ms.parse::<u64>()
    {
        g.measurement_time(std::time::Duration::from_millis(ms_u64));
    }

    let trace = synth_cycles(20_000, 0xC0FFEE);
    let countby = Countby {
        decimals: 1,
        increment: 0.1,
    };

    for mode in TotalMode::ALL {
        g.bench_function(mode.as_str(), |b| {
            b.iter_batched(
                || ChannelTotalizer::new(0, cfg(mode)),
                |mut ch| {
                    for (i, snap) in trace.iter().enumerate() {
                        let now = (i as u32).wrapping_mul(20);
                        if i % 200 == 60 {
                            black_box(ch.handle_command(snap, 100, now));
                        }
                        black_box(ch.evaluate(black_box(snap), countby, now));
                    }
                    black_box(ch.totals().num_total);
                },
                BatchSize::SmallInput,
            )
        });
    }
    g.finish();
}

criterion_group!(evaluate, bench_evaluate);
criterion_main!(evaluate);
