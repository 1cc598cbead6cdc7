// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Given a metafits file, verify that `mwa_obs_ctx` is functioning correctly
//! by printing the context it parses out of it.

use anyhow::Result;
use clap::Parser;

use mwa_obs_ctx::MetafitsContext;

#[derive(Parser, Debug)]
#[command(name = "mwa-obs-ctx-print-context", author)]
struct Opt {
    /// The path to an observation's metafits file.
    #[arg(short, long)]
    metafits: std::path::PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();

    let opts = Opt::parse();
    let context = MetafitsContext::new(&opts.metafits)?;

    println!("{context}");

    Ok(())
}
