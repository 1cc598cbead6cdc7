// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Given an observation's metafits and gpubox files, verify that
//! `mwa_obs_ctx` is functioning correctly by printing the correlator
//! context it builds from them.

use anyhow::Result;
use clap::Parser;

use mwa_obs_ctx::CorrelatorContext;

#[derive(Parser, Debug)]
#[command(name = "mwa-obs-ctx-print-corr-context", author)]
struct Opt {
    /// The path to an observation's metafits file.
    #[arg(short, long)]
    metafits: std::path::PathBuf,

    /// Allow the metafits INTTIME and the gpubox-derived integration time to
    /// disagree instead of failing.
    #[arg(long)]
    allow_integration_time_mismatch: bool,

    /// Paths to the observation's gpubox files.
    #[arg(name = "GPUBOX FILE")]
    files: Vec<std::path::PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();

    let opts = Opt::parse();
    let context = CorrelatorContext::new_with_options(
        &opts.metafits,
        &opts.files,
        mwa_obs_ctx::ContextOptions {
            allow_integration_time_mismatch: opts.allow_integration_time_mismatch,
        },
    )?;

    println!("{context}");

    Ok(())
}
