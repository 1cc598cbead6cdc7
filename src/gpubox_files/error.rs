// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Errors associated with reading in gpubox files that don't already have a
top-level [`crate::MwaObsCtxError`] variant of their own.
*/

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GpuboxError {
    #[error("Failed to read OBSID from {0} - is this an MWA fits file?")]
    MissingObsid(String),

    #[error(
        "OBSID {gpubox_obsid} from {gpubox_filename} does not match expected value of obs_id \
         from metafits file {obsid} - maybe you have a mix of different observations?"
    )]
    ObsidMismatch {
        obsid: u32,
        gpubox_filename: String,
        gpubox_obsid: u32,
    },

    #[error(
        "Correlator version mismatch: gpubox filenames indicate OldLegacy or Legacy but \
         {gpubox_filename} has CORR_VER = {gpu_corr_version_value}"
    )]
    CorrVerMismatch {
        gpubox_filename: String,
        gpu_corr_version_value: u8,
    },

    #[error("Failed to read key CORR_VER from MWAX gpubox file {0}")]
    MwaxCorrVerMissing(String),

    #[error("MWAX gpubox file {0} had a CORR_VER not equal to 2")]
    MwaxCorrVerMismatch(String),

    #[error("HDU image sizes are not equal across the supplied gpubox files")]
    UnequalHduSizes,

    /// An error derived from `FitsError`.
    #[error("{0}")]
    Fits(#[from] crate::fits_read::error::FitsError),
}
