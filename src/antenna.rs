// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Structs and helper methods for antenna (tile) metadata.

use std::fmt;

use crate::rfinput::RFInput;

/// An antenna (tile), derived by pairing up the X and Y polarisation
/// [`RFInput`] rows that share an `ant` number.
#[derive(Clone)]
pub struct Antenna {
    /// 0-indexed antenna number.
    pub ant: u32,
    /// Tile ID.
    pub tile_id: u32,
    /// Tile name.
    pub tile_name: String,
    /// The X-polarisation RF input for this tile.
    pub rfinput_x: RFInput,
    /// The Y-polarisation RF input for this tile.
    pub rfinput_y: RFInput,
}

impl Antenna {
    pub(crate) fn new(x_pol: &RFInput, y_pol: &RFInput) -> Self {
        Antenna {
            ant: x_pol.ant,
            tile_id: x_pol.tile_id,
            tile_name: x_pol.tile_name.clone(),
            rfinput_x: x_pol.clone(),
            rfinput_y: y_pol.clone(),
        }
    }

    /// Builds the antenna vector from RF inputs that have already been
    /// sorted by `subfile_order`; inputs are consumed two at a time (X then
    /// Y, per spec §4.1 invariant).
    pub(crate) fn populate_antennas(rf_inputs: &[RFInput]) -> Vec<Antenna> {
        rf_inputs
            .chunks_exact(2)
            .map(|pair| Antenna::new(&pair[0], &pair[1]))
            .collect()
    }
}

impl fmt::Debug for Antenna {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tile_name)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::misc::make_test_rf_input_pair;

    #[test]
    fn test_populate_antennas() {
        let (x0, y0) = make_test_rf_input_pair(0, 0, 100, "Tile001");
        let (x1, y1) = make_test_rf_input_pair(2, 1, 101, "Tile002");
        let rf_inputs = vec![x0, y0, x1, y1];

        let antennas = Antenna::populate_antennas(&rf_inputs);
        assert_eq!(antennas.len(), 2);
        assert_eq!(antennas[0].tile_name, "Tile001");
        assert_eq!(antennas[1].ant, 1);
    }
}
