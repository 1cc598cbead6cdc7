// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Top-level error type aggregating every module's fallible operations.

use thiserror::Error;

/// Every fallible operation in this crate ultimately returns one of these.
#[derive(Error, Debug)]
pub enum MwaObsCtxError {
    /// An error derived from `FitsError`.
    #[error("{0}")]
    Fits(#[from] crate::fits_read::error::FitsError),

    /// An error derived from `CoarseChannelError`.
    #[error("{0}")]
    CoarseChannel(#[from] crate::coarse_channel::error::CoarseChannelError),

    /// An error derived from `MetafitsError`.
    #[error("{0}")]
    Metafits(#[from] crate::metafits_context::error::MetafitsError),

    /// An error derived from `RfinputError`.
    #[error("{0}")]
    Rfinput(#[from] crate::rfinput::error::RfinputError),

    /// An error derived from `GpuboxError`.
    #[error("{0}")]
    Gpubox(#[from] crate::gpubox_files::error::GpuboxError),

    /// A gpubox filename didn't match any known correlator-version pattern.
    #[error("Invalid gpubox filename: {0}")]
    InvalidFilename(String),

    /// The supplied gpubox files span more than one correlator version.
    #[error("Mixture of correlator versions amongst the supplied gpubox files")]
    MixedCorrelatorVersions,

    /// A Legacy batch is missing a file, or batches disagree on HDU count / shape.
    #[error("Inconsistent gpubox batches: {0}")]
    InconsistentBatches(String),

    /// A gpubox file that should exist (by batch/gpubox-number) was not supplied.
    #[error("Missing gpubox file for batch {batch}, gpubox number {gpubox_number}")]
    MissingGpuboxFile { batch: usize, gpubox_number: usize },

    /// The intersection of per-file HDU timestamps was empty.
    #[error("No timesteps are common to every supplied gpubox file")]
    NoCommonTimesteps,

    /// An index-based accessor was called out of range.
    #[error("{which} index {value} is out of range (must be < {bound})")]
    IndexOutOfRange {
        which: &'static str,
        value: usize,
        bound: usize,
    },

    /// A caller-supplied read buffer was smaller than `floats_per_hdu`.
    #[error("Buffer too small: need {needed} floats, caller supplied {given}")]
    BufferTooSmall { needed: usize, given: usize },

    /// An operation was attempted against a context that doesn't carry the
    /// data it needs (e.g. correlator metadata on a metafits-only context, or
    /// an integration-time mismatch between metafits and gpubox data).
    #[error("Incompatible context: {0}")]
    IncompatibleContext(String),

    /// An error associated with parsing a string into another type.
    #[error("{source_file}:{source_line}\nCouldn't parse {key} in {fits_filename} HDU {hdu_num}")]
    Parse {
        key: String,
        fits_filename: String,
        hdu_num: usize,
        source_file: String,
        source_line: u32,
    },
}
