// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Structs and helper methods for the per-RF-input rows of the metafits
TILEDATA table.
*/

pub mod error;
pub use error::RfinputError;

use std::fmt;
use std::path::Path;

use fitsio::hdu::FitsHdu;
use fitsio::FitsFile;

use crate::types::{Pol, ReceiverType};
use crate::MwaObsCtxError;

/// One row of the metafits TILEDATA table: a single polarisation feed of a
/// single tile. Every antenna (tile) contributes exactly two of these, one
/// per polarisation, sharing `tile_id`/`tile_name`/position.
#[derive(Clone)]
pub struct RFInput {
    /// 0-indexed position of this row in the unsorted metafits table.
    pub input: u32,
    /// 0-indexed antenna number this input belongs to.
    pub ant: u32,
    /// Tile ID (as assigned by the array operators).
    pub tile_id: u32,
    /// Tile name.
    pub tile_name: String,
    /// X or Y polarisation.
    pub pol: Pol,
    /// Electrical length in metres, derived from the `Length` column.
    pub electrical_length_m: f64,
    /// North coordinate relative to the array centre, in metres.
    pub north_m: f64,
    /// East coordinate relative to the array centre, in metres.
    pub east_m: f64,
    /// Height coordinate relative to the array centre, in metres.
    pub height_m: f64,
    /// Order this input appears in the voltage capture system.
    pub vcs_order: u32,
    /// Order this input appears in the legacy correlator's output; the
    /// canonical ordering metafits rows must be sorted into.
    pub subfile_order: u32,
    /// Whether this input is flagged (excluded from the array).
    pub flagged: bool,
    /// Digital gains, one per coarse channel.
    pub gains: Vec<u32>,
    /// Beamformer delays, one per dipole.
    pub delays: Vec<u32>,
    /// Receiver number this input is connected to.
    pub receiver_number: u32,
    /// Slot on the receiver this input is connected to.
    pub receiver_slot_number: u32,
    /// Receiver type, inferred from the `Rx` column.
    pub receiver_type: ReceiverType,
}

impl RFInput {
    /// Reads all `num_rf_inputs` rows out of the metafits TILEDATA HDU and
    /// returns them sorted by `subfile_order` ascending — the canonical
    /// ordering the legacy correlator's output is indexed by.
    pub(crate) fn populate_rf_inputs(
        num_rf_inputs: usize,
        metafits_fptr: &mut FitsFile,
        metafits_filename: &Path,
        metafits_tile_table_hdu: FitsHdu,
        coax_v_factor: f64,
    ) -> Result<Vec<Self>, MwaObsCtxError> {
        let mut rf_inputs = Vec::with_capacity(num_rf_inputs);

        for row in 0..num_rf_inputs {
            rf_inputs.push(Self::read_metafits_values(
                metafits_fptr,
                metafits_filename,
                &metafits_tile_table_hdu,
                row,
                coax_v_factor,
            )?);
        }

        rf_inputs.sort_unstable_by_key(|rf| rf.subfile_order);

        Ok(rf_inputs)
    }

    fn read_metafits_values(
        metafits_fptr: &mut FitsFile,
        metafits_filename: &Path,
        hdu: &FitsHdu,
        row: usize,
        coax_v_factor: f64,
    ) -> Result<Self, MwaObsCtxError> {
        let input: u32 = get_fits_col!(metafits_fptr, metafits_filename, hdu, "Input", row)?;
        let ant: u32 = get_fits_col!(metafits_fptr, metafits_filename, hdu, "Antenna", row)?;
        let tile_id: u32 = get_fits_col!(metafits_fptr, metafits_filename, hdu, "Tile", row)?;
        let tile_name: String =
            get_fits_col!(metafits_fptr, metafits_filename, hdu, "TileName", row)?;

        let pol_str: String = get_fits_col!(metafits_fptr, metafits_filename, hdu, "Pol", row)?;
        let pol = pol_str
            .parse()
            .map_err(|got| RfinputError::UnrecognisedPol {
                fits_filename: metafits_filename.display().to_string(),
                hdu_num: hdu.number,
                row_num: row,
                got,
            })?;

        let length_string: String =
            get_fits_col!(metafits_fptr, metafits_filename, hdu, "Length", row)?;
        let electrical_length_m = get_electrical_length(&length_string, coax_v_factor);

        let north_m: f64 = get_fits_col!(metafits_fptr, metafits_filename, hdu, "North", row)?;
        let east_m: f64 = get_fits_col!(metafits_fptr, metafits_filename, hdu, "East", row)?;
        let height_m: f64 = get_fits_col!(metafits_fptr, metafits_filename, hdu, "Height", row)?;

        let vcs_order: u32 =
            get_fits_col!(metafits_fptr, metafits_filename, hdu, "VCSOrder", row)?;
        let subfile_order: u32 =
            get_fits_col!(metafits_fptr, metafits_filename, hdu, "Subfile_Order", row)?;
        let flag_val: i32 = get_fits_col!(metafits_fptr, metafits_filename, hdu, "Flag", row)?;
        let flagged = flag_val != 0;

        let gains: Vec<u32> = get_fits_col!(metafits_fptr, metafits_filename, hdu, "Gains", row)?;
        let delays: Vec<u32> =
            get_fits_col!(metafits_fptr, metafits_filename, hdu, "Delays", row)?;

        let receiver_number: u32 = get_fits_col!(metafits_fptr, metafits_filename, hdu, "Rx", row)?;
        let receiver_slot_number: u32 =
            get_fits_col!(metafits_fptr, metafits_filename, hdu, "Slot", row)?;

        let receiver_type = if receiver_number > 0 {
            ReceiverType::RRI
        } else {
            ReceiverType::Unknown
        };

        Ok(RFInput {
            input,
            ant,
            tile_id,
            tile_name,
            pol,
            electrical_length_m,
            north_m,
            east_m,
            height_m,
            vcs_order,
            subfile_order,
            flagged,
            gains,
            delays,
            receiver_number,
            receiver_slot_number,
            receiver_type,
        })
    }
}

/// Derives an RF input's electrical length in metres from the metafits
/// `Length` column: values of the form `"EL_<metres>"` are an explicit
/// electrical length; anything else is a physical cable length that must be
/// scaled by the coax velocity factor.
pub(crate) fn get_electrical_length(length_string: &str, coax_v_factor: f64) -> f64 {
    match length_string.strip_prefix("EL_") {
        Some(suffix) => suffix.parse().unwrap_or(0.0),
        None => length_string.parse().unwrap_or(0.0) * coax_v_factor,
    }
}

impl fmt::Debug for RFInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} (ant {})",
            self.tile_name, self.pol, self.ant
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_get_electrical_length_explicit() {
        assert!((get_electrical_length("EL_123.45", 1.204) - 123.45).abs() < 1e-9);
    }

    #[test]
    fn test_get_electrical_length_physical() {
        let len = get_electrical_length("100.0", 1.204);
        assert!((len - 120.4).abs() < 1e-9);
    }
}
