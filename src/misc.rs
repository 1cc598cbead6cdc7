// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Compile-time constants and small free functions shared across modules.

use crate::antenna::Antenna;
use crate::rfinput::RFInput;

/// Latitude of the MWA array centre, in radians.
pub const MWA_LATITUDE_RADIANS: f64 = -0.4660608448386394;
/// Longitude of the MWA array centre, in radians.
pub const MWA_LONGITUDE_RADIANS: f64 = 2.0362898668561042;
/// Altitude of the MWA array centre, in metres.
pub const MWA_ALTITUDE_METRES: f64 = 377.827;
/// Velocity factor of electric fields in RG-6-like coax, used to derive an
/// RF input's electrical length when `EL_` is absent from the metafits.
pub const COAX_V_FACTOR: f64 = 1.204;

/// Width of one coarse channel, in Hz.
pub const COARSE_CHANNEL_WIDTH_HZ: u32 = 1_280_000;

/// Receiver channel numbers above this split to the high end of the
/// correlator's channel ordering, in descending order (see
/// `coarse_channel::CoarseChannel::populate_coarse_channels`).
pub const RECEIVER_CHANNEL_SPLIT: usize = 128;

/// Converts a sexagesimal "degrees:minutes:seconds" string into decimal degrees.
pub fn dms_to_degrees(dms: &str) -> Option<f64> {
    let parts: Vec<&str> = dms.split(':').collect();
    if parts.len() != 3 {
        return None;
    }

    let degrees: f64 = parts[0].parse().ok()?;
    let minutes: f64 = parts[1].parse().ok()?;
    let seconds: f64 = parts[2].parse().ok()?;

    let sign = if degrees < 0.0 { -1.0 } else { 1.0 };
    Some(degrees + sign * (minutes / 60.0 + seconds / 3600.0))
}

/// Number of baselines (autos + cross-correlations) for `num_ants` antennas.
pub fn get_baseline_count(num_ants: usize) -> usize {
    num_ants * (num_ants + 1) / 2
}

/// Reinterpret a slice of `f32` as raw bytes, for bulk buffer writes.
pub fn as_u8_slice(v: &[f32]) -> &[u8] {
    bytemuck::cast_slice(v)
}

/// Converts a gpstime (in milliseconds) to a unix time (in milliseconds),
/// given the gpstime/unixtime of the observation's start.
pub fn convert_gpstime_to_unixtime(
    gpstime_ms: u64,
    mwa_start_gpstime_ms: u64,
    mwa_start_unixtime_ms: u64,
) -> u64 {
    let offset = mwa_start_unixtime_ms as i64 - mwa_start_gpstime_ms as i64;
    (gpstime_ms as i64 + offset) as u64
}

/// Inverse of [`convert_gpstime_to_unixtime`].
pub fn convert_unixtime_to_gpstime(
    unixtime_ms: u64,
    mwa_start_gpstime_ms: u64,
    mwa_start_unixtime_ms: u64,
) -> u64 {
    let offset = mwa_start_unixtime_ms as i64 - mwa_start_gpstime_ms as i64;
    (unixtime_ms as i64 - offset) as u64
}

/// Returns the `(ant1_index, ant2_index)` pair for a 0-indexed baseline
/// number, given the total number of antennas.
pub fn get_antennas_from_baseline(baseline: usize, num_ants: usize) -> Option<(usize, usize)> {
    let mut b = baseline;
    for a1 in 0..num_ants {
        let row_len = num_ants - a1;
        if b < row_len {
            return Some((a1, a1 + b));
        }
        b -= row_len;
    }
    None
}

/// Returns the 0-indexed baseline number for an `(ant1, ant2)` pair with
/// `ant1 <= ant2`.
pub fn get_baseline_from_antennas(ant1: usize, ant2: usize, num_ants: usize) -> Option<usize> {
    if ant1 > ant2 || ant2 >= num_ants {
        return None;
    }
    let mut baseline = 0;
    for a1 in 0..ant1 {
        baseline += num_ants - a1;
    }
    Some(baseline + (ant2 - ant1))
}

/// Looks up the 0-indexed baseline number for a pair of tile names.
pub fn get_baseline_from_antenna_names(
    ant1_tile_name: String,
    ant2_tile_name: String,
    antennas: &[Antenna],
) -> Option<usize> {
    let ant1 = antennas.iter().position(|a| a.tile_name == ant1_tile_name)?;
    let ant2 = antennas.iter().position(|a| a.tile_name == ant2_tile_name)?;
    let (lo, hi) = if ant1 <= ant2 {
        (ant1, ant2)
    } else {
        (ant2, ant1)
    };
    get_baseline_from_antennas(lo, hi, antennas.len())
}

/// Convenience used by tests that need to build a fake [`RFInput`] pair
/// without going through a metafits file.
#[cfg(test)]
pub(crate) fn make_test_rf_input_pair(
    input: u32,
    ant: u32,
    tile_id: u32,
    tile_name: &str,
) -> (RFInput, RFInput) {
    let base = RFInput {
        input,
        ant,
        tile_id,
        tile_name: tile_name.to_string(),
        pol: crate::types::Pol::X,
        electrical_length_m: 0.0,
        north_m: 0.0,
        east_m: 0.0,
        height_m: 0.0,
        vcs_order: 0,
        subfile_order: input,
        flagged: false,
        gains: vec![],
        delays: vec![],
        receiver_number: 0,
        receiver_slot_number: 0,
        receiver_type: crate::types::ReceiverType::Unknown,
    };
    let mut y = base.clone();
    y.input = input + 1;
    y.pol = crate::types::Pol::Y;
    y.subfile_order = input + 1;
    (base, y)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_dms_to_degrees() {
        assert!((dms_to_degrees("10:30:00").unwrap() - 10.5).abs() < 1e-9);
        assert!(dms_to_degrees("not:a:dms").is_none());
    }

    #[test]
    fn test_get_baseline_count() {
        assert_eq!(get_baseline_count(128), 8256);
        assert_eq!(get_baseline_count(3), 6);
        assert_eq!(get_baseline_count(5), 15);
    }

    #[test]
    fn test_gpstime_unixtime_round_trip() {
        let gps = 1_300_000_000_000;
        let unix = convert_gpstime_to_unixtime(gps, 1_000_000_000_000, 1_050_000_000_000);
        assert_eq!(convert_unixtime_to_gpstime(unix, 1_000_000_000_000, 1_050_000_000_000), gps);
    }

    #[test]
    fn test_get_antennas_from_baseline_and_back() {
        let num_ants = 4;
        for a1 in 0..num_ants {
            for a2 in a1..num_ants {
                let bl = get_baseline_from_antennas(a1, a2, num_ants).unwrap();
                assert_eq!(get_antennas_from_baseline(bl, num_ants), Some((a1, a2)));
            }
        }
    }
}
