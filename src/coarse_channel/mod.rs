// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Bridges the metafits receiver-channel list, the gpubox numbering scheme and
the physical frequency grid. See spec §4.3: the physical ordering is NOT
monotonic in gpubox index for Legacy/OldLegacy observations whose receiver
channels straddle 128.
*/

pub mod error;
pub use error::CoarseChannelError;

use std::fmt;
use std::path::Path;

use fitsio::hdu::FitsHdu;
use fitsio::FitsFile;

use crate::fits_read::error::FitsError;
use crate::gpubox_files::GpuboxTimeMap;
use crate::metafits_context::CorrelatorVersion;
use crate::misc::{COARSE_CHANNEL_WIDTH_HZ, RECEIVER_CHANNEL_SPLIT};
use crate::MwaObsCtxError;

/// One coarse (1.28 MHz) channel, positioned in the physical frequency grid.
#[derive(Clone)]
pub struct CoarseChannel {
    /// 0-indexed position after sorting all present channels by `centre_hz`
    /// ascending.
    pub correlator_index: usize,
    /// The "sky" channel number used by the receiver (0..255); physical
    /// centre frequency is `receiver_channel_number * 1.28 MHz`.
    pub receiver_channel_number: usize,
    /// The numeric suffix carried in the gpubox filename: for Legacy this is
    /// the 1..24 slot; for V2 it is the receiver channel number itself.
    pub gpubox_number: usize,
    /// Width of this coarse channel in Hz.
    pub width_hz: u32,
    /// Start frequency of this coarse channel in Hz.
    pub start_hz: u32,
    /// Centre frequency of this coarse channel in Hz.
    pub centre_hz: u32,
    /// End frequency of this coarse channel in Hz.
    pub end_hz: u32,
}

impl CoarseChannel {
    pub(crate) fn new(
        receiver_channel_number: usize,
        gpubox_number: usize,
        width_hz: u32,
    ) -> Self {
        let centre_hz = receiver_channel_number as u32 * width_hz;
        CoarseChannel {
            correlator_index: 0,
            receiver_channel_number,
            gpubox_number,
            width_hz,
            centre_hz,
            start_hz: centre_hz - width_hz / 2,
            end_hz: centre_hz + width_hz / 2,
        }
    }

    /// Parses the metafits `CHANNELS` CONTINUE-string into a vector of
    /// receiver channel numbers, in the order the metafits lists them.
    fn parse_metafits_coarse_chan_array(metafits_coarse_chans_string: &str) -> Vec<usize> {
        metafits_coarse_chans_string
            .replace(['\'', '&'], "")
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect()
    }

    /// Reads the metafits `CHANNELS` keyword and derives the width of each
    /// coarse channel from the observation bandwidth.
    pub(crate) fn get_metafits_coarse_channel_info(
        metafits_fptr: &mut FitsFile,
        metafits_filename: &Path,
        hdu: &FitsHdu,
        observation_bandwidth_hz: u32,
    ) -> Result<(Vec<usize>, u32), FitsError> {
        let coarse_chans_string =
            get_required_fits_key_long_string!(metafits_fptr, metafits_filename, hdu, "CHANNELS")?;

        let coarse_chan_vec = Self::parse_metafits_coarse_chan_array(&coarse_chans_string);
        let width_hz = observation_bandwidth_hz / coarse_chan_vec.len() as u32;

        Ok((coarse_chan_vec, width_hz))
    }

    /// Re-orders `sorted_channels` (physical-frequency ascending) into the
    /// order the digital receiver actually emits them in: channels with
    /// `receiver_channel_number <= 128` ascending, followed by channels
    /// `> 128` in descending receiver-number order (spec §4.3 steps 2-3).
    /// Only applies to Legacy/OldLegacy; V2 emits channels unreordered.
    fn effective_correlator_order(sorted_channels: &[usize]) -> Vec<usize> {
        let split = sorted_channels
            .iter()
            .take_while(|&&c| c <= RECEIVER_CHANNEL_SPLIT)
            .count();

        let mut order: Vec<usize> = sorted_channels[..split].to_vec();
        order.extend(sorted_channels[split..].iter().rev());
        order
    }

    /// Builds the vector of [`CoarseChannel`]s actually present for this
    /// observation.
    ///
    /// * `gpubox_time_map` is `Some` when building a correlator context: only
    ///   channels whose `gpubox_number` was actually supplied survive.
    /// * `gpubox_time_map` is `None` when building a metafits-only context:
    ///   every channel named in the metafits is assumed present.
    pub(crate) fn populate_coarse_channels(
        corr_version: CorrelatorVersion,
        metafits_coarse_chan_vec: &[usize],
        metafits_coarse_chan_width_hz: u32,
        gpubox_time_map: Option<&GpuboxTimeMap>,
    ) -> Result<Vec<Self>, MwaObsCtxError> {
        let mut sorted_channels = metafits_coarse_chan_vec.to_vec();
        sorted_channels.sort_unstable();

        let present_gpubox_numbers: Option<Vec<usize>> = gpubox_time_map.map(|m| {
            m.values()
                .next()
                .map(|chans| chans.keys().copied().collect())
                .unwrap_or_default()
        });

        let mut coarse_chans: Vec<CoarseChannel> = match corr_version {
            CorrelatorVersion::Legacy | CorrelatorVersion::OldLegacy => {
                let correlator_order = Self::effective_correlator_order(&sorted_channels);

                correlator_order
                    .iter()
                    .enumerate()
                    .filter_map(|(i, &rec_chan)| {
                        let gpubox_number = i + 1;
                        let present = present_gpubox_numbers
                            .as_ref()
                            .map(|g| g.contains(&gpubox_number))
                            .unwrap_or(true);
                        present.then(|| {
                            CoarseChannel::new(
                                rec_chan,
                                gpubox_number,
                                metafits_coarse_chan_width_hz,
                            )
                        })
                    })
                    .collect()
            }
            CorrelatorVersion::V2 => sorted_channels
                .iter()
                .filter_map(|&rec_chan| {
                    let present = present_gpubox_numbers
                        .as_ref()
                        .map(|g| g.contains(&rec_chan))
                        .unwrap_or(true);
                    present.then(|| {
                        CoarseChannel::new(rec_chan, rec_chan, metafits_coarse_chan_width_hz)
                    })
                })
                .collect(),
        };

        // Sort by centre_hz ascending (physical frequency order) and assign
        // the final, dense correlator_index.
        coarse_chans.sort_by_key(|c| c.centre_hz);
        for (i, c) in coarse_chans.iter_mut().enumerate() {
            c.correlator_index = i;
        }

        Ok(coarse_chans)
    }
}

impl fmt::Debug for CoarseChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gpu={} corr={} rec={} @ {:.3} MHz",
            self.gpubox_number,
            self.correlator_index,
            self.receiver_channel_number,
            self.centre_hz as f32 / 1_000_000.
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::BTreeMap;

    fn gpubox_time_map_with_keys(keys: Vec<usize>) -> GpuboxTimeMap {
        let mut chans = BTreeMap::new();
        for k in keys {
            chans.insert(k, (0, 0));
        }
        let mut map = BTreeMap::new();
        map.insert(1_381_844_923_000, chans);
        map
    }

    #[test]
    fn test_parse_metafits_coarse_chan_array() {
        assert_eq!(
            CoarseChannel::parse_metafits_coarse_chan_array("'0,1,2,3,127,128,129,255'&").len(),
            8
        );
    }

    #[test]
    fn test_legacy_contiguous_low() {
        let metafits_chans: Vec<usize> = (57..=80).collect();
        let gpubox_map = gpubox_time_map_with_keys((1..=24).collect());

        let result = CoarseChannel::populate_coarse_channels(
            CorrelatorVersion::Legacy,
            &metafits_chans,
            COARSE_CHANNEL_WIDTH_HZ,
            Some(&gpubox_map),
        )
        .unwrap();

        assert_eq!(result.len(), 24);
        assert_eq!(result[0].gpubox_number, 1);
        assert_eq!(result[0].receiver_channel_number, 57);
        assert_eq!(result[23].receiver_channel_number, 80);
    }

    #[test]
    fn test_legacy_split_high() {
        // CHANNELS=[120,121,122,123,129,130,131,132]
        // correlator order: 120,121,122,123,132,131,130,129
        // coarse_chans sorted ascending by centre_hz give back 120..132 order
        let metafits_chans = vec![120, 121, 122, 123, 129, 130, 131, 132];
        let gpubox_map = gpubox_time_map_with_keys((1..=8).collect());

        let result = CoarseChannel::populate_coarse_channels(
            CorrelatorVersion::Legacy,
            &metafits_chans,
            COARSE_CHANNEL_WIDTH_HZ,
            Some(&gpubox_map),
        )
        .unwrap();

        assert_eq!(result.len(), 8);
        let rec_chans: Vec<usize> = result.iter().map(|c| c.receiver_channel_number).collect();
        assert_eq!(rec_chans, vec![120, 121, 122, 123, 129, 130, 131, 132]);

        // gpubox 5 (index 4 in correlator order) should map to receiver 132
        let gpubox5 = result
            .iter()
            .find(|c| c.gpubox_number == 5)
            .expect("gpubox 5 present");
        assert_eq!(gpubox5.receiver_channel_number, 132);
    }

    #[test]
    fn test_legacy_missing_middle_gpuboxes() {
        let metafits_chans = vec![109, 110, 111, 112];
        let gpubox_map = gpubox_time_map_with_keys(vec![2, 3]);

        let result = CoarseChannel::populate_coarse_channels(
            CorrelatorVersion::Legacy,
            &metafits_chans,
            COARSE_CHANNEL_WIDTH_HZ,
            Some(&gpubox_map),
        )
        .unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].receiver_channel_number, 110);
        assert_eq!(result[0].gpubox_number, 2);
        assert_eq!(result[1].receiver_channel_number, 111);
        assert_eq!(result[1].gpubox_number, 3);
    }

    #[test]
    fn test_mwax_no_reorder() {
        let metafits_chans = vec![126, 127, 128, 129, 130];
        let gpubox_map = gpubox_time_map_with_keys(vec![126, 127, 128, 129, 130]);

        let result = CoarseChannel::populate_coarse_channels(
            CorrelatorVersion::V2,
            &metafits_chans,
            COARSE_CHANNEL_WIDTH_HZ,
            Some(&gpubox_map),
        )
        .unwrap();

        for (i, c) in result.iter().enumerate() {
            assert_eq!(c.correlator_index, i);
            assert_eq!(c.gpubox_number, c.receiver_channel_number);
        }
    }

    #[test]
    fn test_no_gpubox_map_metafits_only() {
        let metafits_chans = vec![133, 134, 135];
        let result = CoarseChannel::populate_coarse_channels(
            CorrelatorVersion::Legacy,
            &metafits_chans,
            COARSE_CHANNEL_WIDTH_HZ,
            None,
        )
        .unwrap();

        assert_eq!(result.len(), 3);
    }

    #[test]
    fn test_coarse_chan_debug() {
        let mut cc = CoarseChannel::new(109, 2, COARSE_CHANNEL_WIDTH_HZ);
        cc.correlator_index = 1;
        assert_eq!(format!("{:?}", cc), "gpu=2 corr=1 rec=109 @ 139.520 MHz");
    }
}
