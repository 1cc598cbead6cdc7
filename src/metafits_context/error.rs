// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Errors associated with reading in metafits files.
*/

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetafitsError {
    /// The metafits `MODE` keyword held something we don't recognise.
    #[error("Unrecognised MODE keyword value {0:?} in metafits file")]
    UnrecognisedMode(String),

    /// `NINPUTS` wasn't an even number, so RF inputs can't be paired into
    /// antennas.
    #[error("NINPUTS ({0}) is not even; can't pair RF inputs into antennas")]
    OddNumInputs(u32),

    /// The number of RF input rows actually read didn't match `NINPUTS`.
    #[error("NINPUTS says {expected} rows but the TILEDATA table has {actual}")]
    RfInputCountMismatch { expected: usize, actual: usize },

    /// An error derived from `FitsError`.
    #[error("{0}")]
    Fits(#[from] crate::fits_read::error::FitsError),
}
