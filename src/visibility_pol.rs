// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The four polarisation products the correlator emits per baseline.

use std::fmt;

/// One of the four visibility polarisation products: XX, XY, YX or YY.
#[derive(Clone)]
pub struct VisibilityPol {
    pub polarisation: String,
}

impl VisibilityPol {
    pub(crate) fn populate_visibility_pols() -> Vec<Self> {
        ["XX", "XY", "YX", "YY"]
            .iter()
            .map(|p| VisibilityPol {
                polarisation: p.to_string(),
            })
            .collect()
    }
}

impl fmt::Debug for VisibilityPol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pol={}", self.polarisation)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_visibility_pol_populate() {
        let pols = VisibilityPol::populate_visibility_pols();
        assert_eq!(pols.len(), 4);
        assert_eq!(pols[0].polarisation, "XX");
        assert_eq!(pols[3].polarisation, "YY");
    }
}
