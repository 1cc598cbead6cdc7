// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Structs and helper methods for timestep metadata.

use std::collections::BTreeMap;
use std::fmt;

use crate::gpubox_files::GpuboxTimeMap;

/// One timestep common to every supplied gpubox file.
#[derive(Clone)]
pub struct TimeStep {
    /// UNIX time in milliseconds (avoids floating point inaccuracy).
    pub unix_time_ms: u64,
}

impl TimeStep {
    pub(crate) fn new(unix_time_ms: u64) -> Self {
        TimeStep { unix_time_ms }
    }

    /// Builds the list of timesteps common to every `(batch, gpubox_number)`
    /// slot in `gpubox_time_map` — i.e. those keys whose sub-map is as large
    /// as the largest sub-map present. Returns `None` if the map is empty.
    pub(crate) fn populate_correlator_timesteps(
        gpubox_time_map: &GpuboxTimeMap,
    ) -> Option<Vec<Self>> {
        if gpubox_time_map.is_empty() {
            return None;
        }

        let max_chans = gpubox_time_map.values().map(BTreeMap::len).max().unwrap();

        Some(
            gpubox_time_map
                .iter()
                .filter(|(_, chans)| chans.len() == max_chans)
                .map(|(time, _)| Self::new(*time))
                .collect(),
        )
    }
}

impl fmt::Debug for TimeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unix={:.3}", self.unix_time_ms as f64 / 1000.)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_populate_correlator_timesteps() {
        let mut gpubox_time_map: GpuboxTimeMap = BTreeMap::new();

        let times: Vec<u64> = vec![
            1_381_844_923_000,
            1_381_844_923_500,
            1_381_844_924_000,
            1_381_844_924_500,
        ];

        for (i, time) in times.iter().enumerate() {
            let mut chans = BTreeMap::new();
            chans.insert(1, (0, i));
            chans.insert(2, (0, i + 1));
            gpubox_time_map.insert(*time, chans);
        }

        let timesteps = TimeStep::populate_correlator_timesteps(&gpubox_time_map).unwrap();
        assert_eq!(timesteps.len(), 4);
        assert_eq!(timesteps[0].unix_time_ms, 1_381_844_923_000);
        assert_eq!(timesteps[3].unix_time_ms, 1_381_844_924_500);
    }

    #[test]
    fn test_populate_correlator_timesteps_filters_partial() {
        let mut gpubox_time_map: GpuboxTimeMap = BTreeMap::new();

        let mut full = BTreeMap::new();
        full.insert(1, (0, 0));
        full.insert(2, (0, 0));
        gpubox_time_map.insert(1000, full);

        let mut partial = BTreeMap::new();
        partial.insert(1, (0, 1));
        gpubox_time_map.insert(1500, partial);

        let mut full2 = BTreeMap::new();
        full2.insert(1, (0, 2));
        full2.insert(2, (0, 2));
        gpubox_time_map.insert(2000, full2);

        let timesteps = TimeStep::populate_correlator_timesteps(&gpubox_time_map).unwrap();
        assert_eq!(timesteps.len(), 2);
        assert_eq!(timesteps[0].unix_time_ms, 1000);
        assert_eq!(timesteps[1].unix_time_ms, 2000);
    }

    #[test]
    fn test_populate_correlator_timesteps_empty() {
        let gpubox_time_map: GpuboxTimeMap = BTreeMap::new();
        assert!(TimeStep::populate_correlator_timesteps(&gpubox_time_map).is_none());
    }
}
