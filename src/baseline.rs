// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Structs and helper methods for baseline metadata.

use std::fmt;

use crate::misc;

/// An ordered antenna pair; `ant1_index <= ant2_index`, including autos.
#[derive(Clone)]
pub struct Baseline {
    /// Index into `MetafitsContext::antennas` for the first antenna.
    pub ant1_index: usize,
    /// Index into `MetafitsContext::antennas` for the second antenna.
    pub ant2_index: usize,
}

impl Baseline {
    /// Enumerates all `(ant1, ant2)` pairs with `ant1 <= ant2`, in
    /// lexicographic order, for `num_ants` antennas.
    pub(crate) fn populate_baselines(num_ants: usize) -> Vec<Self> {
        let num_baselines = misc::get_baseline_count(num_ants);
        let mut baselines = Vec::with_capacity(num_baselines);

        for a1 in 0..num_ants {
            for a2 in a1..num_ants {
                baselines.push(Baseline {
                    ant1_index: a1,
                    ant2_index: a2,
                });
            }
        }

        baselines
    }
}

impl fmt::Debug for Baseline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.ant1_index, self.ant2_index)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_populate_baselines_count_and_order() {
        let num_ants = 4;
        let baselines = Baseline::populate_baselines(num_ants);

        assert_eq!(baselines.len(), misc::get_baseline_count(num_ants));
        assert_eq!(baselines[0].ant1_index, 0);
        assert_eq!(baselines[0].ant2_index, 0);

        for b in &baselines {
            assert!(b.ant1_index <= b.ant2_index);
        }
    }
}
