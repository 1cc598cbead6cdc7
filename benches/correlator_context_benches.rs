// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Benchmarks the baseline/antenna index bookkeeping that every tile read
//! goes through. Unlike the teacher crate, no real metafits/gpubox fixtures
//! ship with this crate (see SPEC_FULL §10.4), so `CorrelatorContext::new`
//! and the FITS-backed read path can't be exercised here; these benchmarks
//! instead target the public, file-independent arithmetic in `misc`.

use criterion::{criterion_group, criterion_main, Criterion, SamplingMode};
use mwa_obs_ctx::misc::{
    get_antennas_from_baseline, get_baseline_count, get_baseline_from_antennas,
};

const NUM_ANTS: usize = 128;

fn bench_get_baseline_count(c: &mut Criterion) {
    let group = &mut c.benchmark_group("baseline_index_bookkeeping");
    group.sampling_mode(SamplingMode::Flat);

    group.bench_function("get_baseline_count", |b| {
        b.iter(|| get_baseline_count(NUM_ANTS));
    });
}

fn bench_get_antennas_from_baseline(c: &mut Criterion) {
    let group = &mut c.benchmark_group("baseline_index_bookkeeping");
    group.sampling_mode(SamplingMode::Flat);

    let num_baselines = get_baseline_count(NUM_ANTS);

    group.bench_function("get_antennas_from_baseline_all", |b| {
        b.iter(|| {
            for bl in 0..num_baselines {
                get_antennas_from_baseline(bl, NUM_ANTS).expect("baseline in range");
            }
        });
    });
}

fn bench_get_baseline_from_antennas(c: &mut Criterion) {
    let group = &mut c.benchmark_group("baseline_index_bookkeeping");
    group.sampling_mode(SamplingMode::Flat);

    group.bench_function("get_baseline_from_antennas_all", |b| {
        b.iter(|| {
            for a1 in 0..NUM_ANTS {
                for a2 in a1..NUM_ANTS {
                    get_baseline_from_antennas(a1, a2, NUM_ANTS).expect("pair in range");
                }
            }
        });
    });
}

criterion_group!(
    name = correlator_context_benches;
    config = Criterion::default().sample_size(50).with_plots();
    targets = bench_get_baseline_count, bench_get_antennas_from_baseline, bench_get_baseline_from_antennas
);
criterion_main!(correlator_context_benches);
