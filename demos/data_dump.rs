// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Given gpubox files, provide a way to output/dump visibilities for one
//! baseline of one (timestep, coarse channel) tile.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;

use mwa_obs_ctx::CorrelatorContext;

#[derive(Parser, Debug)]
#[command(name = "mwa-obs-ctx-data-dump", author)]
struct Opt {
    /// Timestep number (0-indexed).
    #[arg(short, long)]
    timestep: usize,

    /// Baseline number (0-indexed).
    #[arg(short, long)]
    baseline: usize,

    /// Fine channel to start with.
    #[arg(long)]
    fine_chan1: usize,
    /// Fine channel to end with.
    #[arg(long)]
    fine_chan2: usize,

    /// Coarse channel index (0-indexed).
    #[arg(long)]
    coarse_chan: usize,

    /// Path to the metafits file.
    #[arg(short, long)]
    metafits: PathBuf,

    /// Paths to the gpubox files.
    #[arg(name = "GPUBOX FILE")]
    files: Vec<PathBuf>,

    /// Dump filename.
    #[arg(short, long)]
    dump_filename: PathBuf,
}

#[allow(clippy::too_many_arguments)]
fn dump_data(
    metafits: &Path,
    files: &[PathBuf],
    timestep: usize,
    baseline: usize,
    fine_chan_range: (usize, usize),
    coarse_chan: usize,
    dump_filename: &Path,
) -> Result<()> {
    let mut dump_file = File::create(dump_filename)?;
    println!("Dumping data via mwa_obs_ctx...");
    let context = CorrelatorContext::new(metafits, files)?;

    println!("Correlator version: {}", context.corr_version);

    let floats_per_fine_chan = context.num_visibility_pols * 2;
    let floats_per_baseline = context.num_fine_chans_per_coarse * floats_per_fine_chan;

    let bl = &context.metafits_context.baselines[baseline];
    let ant1_name = context.metafits_context.antennas[bl.ant1_index].tile_name.clone();
    let ant2_name = context.metafits_context.antennas[bl.ant2_index].tile_name.clone();

    let baseline_index = baseline * floats_per_baseline;
    let (ch1, ch2) = fine_chan_range;
    let ch_start_index = baseline_index + (ch1 * floats_per_fine_chan);
    let ch_end_index = baseline_index + (ch2 * floats_per_fine_chan) + floats_per_fine_chan;

    let coarse_channel = &context.coarse_channels[coarse_chan];
    println!(
        "Dumping t={} coarse chan: {} ({}) {:.3} MHz, fine ch: {}-{}, ant {} vs {}",
        timestep,
        coarse_chan,
        coarse_channel.receiver_channel_number,
        coarse_channel.centre_hz as f32 / 1.0e6,
        ch1,
        ch2,
        ant1_name,
        ant2_name
    );

    let outcome = context.read_by_baseline(timestep, coarse_chan)?;
    if let Some(warning) = &outcome.warning {
        println!("warning: {warning}");
    }
    let data = outcome.data;

    let mut sum: f64 = 0.;
    let mut float_count: u64 = 0;
    let mut fine_chan_counter = 0;
    for v in (0..data.len()).step_by(floats_per_fine_chan) {
        if v >= ch_start_index && v < ch_end_index {
            writeln!(
                &mut dump_file,
                "{},{},{},{},{},{},{},{},{}",
                ch1 + fine_chan_counter,
                data[v],
                data[v + 1],
                data[v + 2],
                data[v + 3],
                data[v + 4],
                data[v + 5],
                data[v + 6],
                data[v + 7],
            )?;

            sum += data[v..v + 8].iter().map(|f| *f as f64).sum::<f64>();
            float_count += 8;
            fine_chan_counter += 1;
        }
    }

    println!("Sum was {sum}, count was {float_count} floats");

    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let opts = Opt::parse();

    dump_data(
        &opts.metafits,
        &opts.files,
        opts.timestep,
        opts.baseline,
        (opts.fine_chan1, opts.fine_chan2),
        opts.coarse_chan,
        &opts.dump_filename,
    )?;

    Ok(())
}
