// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Combines a [`MetafitsContext`] with the gpubox files of one observation into
a [`CorrelatorContext`]: validated batches, the coarse-channel map, the
common timestep grid, and the tile-granularity read path (§4.2-§4.5).
*/

use std::fmt;
use std::path::Path;

use log::warn;

use crate::coarse_channel::CoarseChannel;
use crate::convert::{
    convert_legacy_hdu_to_mwax_baseline_order, convert_legacy_hdu_to_mwax_frequency_order,
    convert_mwax_hdu_to_frequency_order, generate_conversion_array, LegacyConversionBaseline,
};
use crate::gpubox_files::{determine_obs_times, examine_gpubox_files, GpuboxBatch, GpuboxTimeMap};
use crate::metafits_context::{CorrelatorVersion, MetafitsContext};
use crate::timestep::TimeStep;
use crate::MwaObsCtxError;

/// Which axis order a caller wants a tile read back in (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileLayout {
    /// `[baseline][fine_chan][pol][re,im]`.
    ByBaseline,
    /// `[fine_chan][baseline][pol][re,im]`.
    ByFrequency,
}

/// Explains why a read returned zero-filled data instead of real visibilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadWarning {
    /// The (timestep, coarse channel) pair has no HDU in any supplied
    /// gpubox file; the caller's buffer was zero-filled instead of erroring
    /// (§4.4, §7).
    MissingHdu {
        timestep_index: usize,
        coarse_chan_index: usize,
    },
}

impl fmt::Display for ReadWarning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ReadWarning::MissingHdu {
                timestep_index,
                coarse_chan_index,
            } => write!(
                f,
                "no HDU for timestep {timestep_index} / coarse channel {coarse_chan_index}; buffer zero-filled"
            ),
        }
    }
}

/// The result of a tile read: the visibility floats plus an optional
/// soft-warning when the caller's buffer was zero-filled rather than
/// populated from real data (Supplemented feature, §11).
#[derive(Debug, Clone)]
pub struct ReadOutcome {
    pub data: Vec<f32>,
    pub warning: Option<ReadWarning>,
}

/// Whether `CorrelatorContext::new` should hard-fail when the metafits
/// `INTTIME` and the gpubox-derived integration time disagree (Open
/// Question decision, spec §9 / SPEC_FULL §12).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextOptions {
    pub allow_integration_time_mismatch: bool,
}

impl Default for ContextOptions {
    fn default() -> Self {
        ContextOptions {
            allow_integration_time_mismatch: false,
        }
    }
}

/// The maximum difference, in milliseconds, tolerated between metafits
/// `INTTIME` and the gpubox-derived integration time before
/// `allow_integration_time_mismatch` is consulted.
const INTEGRATION_TIME_EPSILON_MS: i64 = 1;

/// Owns a [`MetafitsContext`] plus every product of gpubox discovery: the
/// validated batches, the coarse-channel table, the common timestep grid,
/// and the legacy-to-canonical conversion table. Immutable once built;
/// `read_by_baseline`/`read_by_frequency` never mutate it.
pub struct CorrelatorContext {
    pub metafits_context: MetafitsContext,
    pub corr_version: CorrelatorVersion,

    pub start_unix_ms: u64,
    pub end_unix_ms: u64,
    pub duration_ms: u64,
    pub integration_time_ms: u64,

    pub num_timesteps: usize,
    pub timesteps: Vec<TimeStep>,

    pub num_coarse_channels: usize,
    pub coarse_channels: Vec<CoarseChannel>,
    pub bandwidth_hz: u32,

    pub num_baselines: usize,
    pub num_visibility_pols: usize,
    pub num_fine_chans_per_coarse: usize,
    pub floats_per_hdu: usize,
    pub bytes_per_hdu: usize,

    pub gpubox_batches: Vec<GpuboxBatch>,
    pub(crate) gpubox_time_map: GpuboxTimeMap,

    legacy_conversion_table: Vec<LegacyConversionBaseline>,
}

impl CorrelatorContext {
    /// Builds a [`CorrelatorContext`] from a metafits path and a set of
    /// gpubox paths, failing loudly on integration-time mismatch (the
    /// default per the Open Question decision).
    pub fn new<P: AsRef<Path>>(
        metafits_filename: P,
        gpubox_filenames: &[P],
    ) -> Result<Self, MwaObsCtxError> {
        Self::new_with_options(metafits_filename, gpubox_filenames, ContextOptions::default())
    }

    /// As [`CorrelatorContext::new`], but with explicit control over whether
    /// an `INTTIME`/gpubox integration-time mismatch is tolerated.
    pub fn new_with_options<P: AsRef<Path>>(
        metafits_filename: P,
        gpubox_filenames: &[P],
        options: ContextOptions,
    ) -> Result<Self, MwaObsCtxError> {
        let metafits_context = MetafitsContext::new(&metafits_filename)?;

        let (gpubox_batches, corr_version, gpubox_time_map, timesteps) = if gpubox_filenames.is_empty()
        {
            (Vec::new(), CorrelatorVersion::Legacy, GpuboxTimeMap::new(), Vec::new())
        } else {
            let info = examine_gpubox_files(gpubox_filenames, metafits_context.obsid)?;
            let timesteps = TimeStep::populate_correlator_timesteps(&info.time_map)
                .ok_or(MwaObsCtxError::NoCommonTimesteps)?;
            (info.batches, info.corr_format, info.time_map, timesteps)
        };
        let num_timesteps = timesteps.len();

        let coarse_channels = CoarseChannel::populate_coarse_channels(
            corr_version,
            &metafits_context.scheduled_coarse_channels,
            metafits_context.coarse_channel_width_hz,
            (!gpubox_filenames.is_empty()).then_some(&gpubox_time_map),
        )?;
        let num_coarse_channels = coarse_channels.len();
        let bandwidth_hz = num_coarse_channels as u32 * metafits_context.coarse_channel_width_hz;

        let num_baselines = metafits_context.num_baselines;
        let num_visibility_pols = metafits_context.num_visibility_pols;
        let num_fine_chans_per_coarse = metafits_context.num_fine_chans_per_coarse;
        let floats_per_hdu = num_baselines * num_fine_chans_per_coarse * num_visibility_pols * 2;
        let bytes_per_hdu = floats_per_hdu * 4;

        let (start_unix_ms, end_unix_ms, duration_ms, integration_time_ms) = if gpubox_filenames
            .is_empty()
        {
            (
                metafits_context.scheduled_start_unix_ms,
                metafits_context.scheduled_end_unix_ms,
                metafits_context.scheduled_duration_ms,
                metafits_context.corr_int_time_ms,
            )
        } else {
            let integration_time_ms = if num_timesteps >= 2 {
                timesteps[1].unix_time_ms - timesteps[0].unix_time_ms
            } else {
                metafits_context.corr_int_time_ms
            };

            let delta =
                integration_time_ms as i64 - metafits_context.corr_int_time_ms as i64;
            if delta.abs() > INTEGRATION_TIME_EPSILON_MS && !options.allow_integration_time_mismatch
            {
                return Err(MwaObsCtxError::IncompatibleContext(format!(
                    "metafits INTTIME ({} ms) disagrees with gpubox-derived integration time ({} ms)",
                    metafits_context.corr_int_time_ms, integration_time_ms
                )));
            }

            let obs_times = determine_obs_times(&gpubox_time_map, integration_time_ms)?;
            (
                obs_times.start_millisec,
                obs_times.end_millisec,
                obs_times.duration_millisec,
                integration_time_ms,
            )
        };

        if !gpubox_filenames.is_empty() {
            Self::validate_first_hdu(
                corr_version,
                num_fine_chans_per_coarse,
                num_baselines,
                num_visibility_pols,
                &gpubox_batches,
            )?;
        }

        let legacy_conversion_table = match corr_version {
            CorrelatorVersion::Legacy | CorrelatorVersion::OldLegacy
                if !metafits_context.rf_inputs.is_empty() =>
            {
                generate_conversion_array(&metafits_context.rf_inputs)
            }
            _ => Vec::new(),
        };

        Ok(CorrelatorContext {
            metafits_context,
            corr_version,
            start_unix_ms,
            end_unix_ms,
            duration_ms,
            integration_time_ms,
            num_timesteps,
            timesteps,
            num_coarse_channels,
            coarse_channels,
            bandwidth_hz,
            num_baselines,
            num_visibility_pols,
            num_fine_chans_per_coarse,
            floats_per_hdu,
            bytes_per_hdu,
            gpubox_batches,
            gpubox_time_map,
            legacy_conversion_table,
        })
    }

    /// Cross-checks a gpubox file's NAXIS1/NAXIS2 against the dimensions
    /// implied by the metafits (§4.2).
    fn validate_first_hdu(
        corr_version: CorrelatorVersion,
        num_fine_chans_per_coarse: usize,
        num_baselines: usize,
        num_visibility_pols: usize,
        gpubox_batches: &[GpuboxBatch],
    ) -> Result<(), MwaObsCtxError> {
        let first_file = match gpubox_batches.iter().find_map(|b| b.gpubox_files.first()) {
            Some(f) => f,
            None => return Ok(()),
        };

        let (expected_naxis1, expected_naxis2) = match corr_version {
            CorrelatorVersion::Legacy | CorrelatorVersion::OldLegacy => (
                num_fine_chans_per_coarse * num_visibility_pols * 2,
                num_baselines,
            ),
            CorrelatorVersion::V2 => (
                num_baselines * num_visibility_pols * 2,
                num_fine_chans_per_coarse,
            ),
        };

        // image_shape is stored slowest-varying axis first: [NAXIS2, NAXIS1].
        match first_file.image_shape.as_slice() {
            [naxis2, naxis1] if *naxis1 == expected_naxis1 && *naxis2 == expected_naxis2 => Ok(()),
            [naxis2, naxis1] => Err(MwaObsCtxError::IncompatibleContext(format!(
                "{}: image shape [{naxis2}, {naxis1}] doesn't match the shape implied by the \
                 metafits ([{expected_naxis2}, {expected_naxis1}])",
                first_file.path.display()
            ))),
            other => Err(MwaObsCtxError::IncompatibleContext(format!(
                "{}: expected a 2-D image, got shape {other:?}",
                first_file.path.display()
            ))),
        }
    }

    fn find_gpubox_file(&self, batch_index: usize, gpubox_number: usize) -> Option<&Path> {
        self.gpubox_batches
            .get(batch_index)?
            .gpubox_files
            .iter()
            .find(|g| g.gpubox_number == gpubox_number)
            .map(|g| g.path.as_path())
    }

    /// Reads one (timestep, coarse channel) tile, converted to the requested
    /// canonical layout.
    fn read_tile(
        &self,
        timestep_index: usize,
        coarse_chan_index: usize,
        layout: TileLayout,
    ) -> Result<ReadOutcome, MwaObsCtxError> {
        if timestep_index >= self.num_timesteps {
            return Err(MwaObsCtxError::IndexOutOfRange {
                which: "timestep",
                value: timestep_index,
                bound: self.num_timesteps,
            });
        }
        if coarse_chan_index >= self.num_coarse_channels {
            return Err(MwaObsCtxError::IndexOutOfRange {
                which: "coarse_channel",
                value: coarse_chan_index,
                bound: self.num_coarse_channels,
            });
        }

        let gpubox_number = self.coarse_channels[coarse_chan_index].gpubox_number;
        let time = self.timesteps[timestep_index].unix_time_ms;

        let (batch_index, hdu_index) = match self
            .gpubox_time_map
            .get(&time)
            .and_then(|m| m.get(&gpubox_number))
        {
            Some(loc) => *loc,
            None => {
                let warning = ReadWarning::MissingHdu {
                    timestep_index,
                    coarse_chan_index,
                };
                warn!("{warning}");
                return Ok(ReadOutcome {
                    data: vec![0.0; self.floats_per_hdu],
                    warning: Some(warning),
                });
            }
        };

        let path = self
            .find_gpubox_file(batch_index, gpubox_number)
            .ok_or_else(|| {
                MwaObsCtxError::MissingGpuboxFile {
                    batch: batch_index,
                    gpubox_number,
                }
            })?
            .to_path_buf();

        let mut fptr = crate::fits_open!(&path)?;
        let hdu = crate::fits_open_hdu!(&mut fptr, &path, hdu_index)?;
        let raw: Vec<f32> = crate::get_fits_image!(&mut fptr, &path, &hdu)?;

        if raw.len() != self.floats_per_hdu {
            return Err(MwaObsCtxError::IncompatibleContext(format!(
                "{}: HDU {hdu_index} has {} floats, expected {} ({}x{}x{}x2)",
                path.display(),
                raw.len(),
                self.floats_per_hdu,
                self.num_baselines,
                self.num_fine_chans_per_coarse,
                self.num_visibility_pols,
            )));
        }

        let mut data = vec![0.0f32; self.floats_per_hdu];
        match (self.corr_version, layout) {
            (CorrelatorVersion::Legacy | CorrelatorVersion::OldLegacy, TileLayout::ByBaseline) => {
                convert_legacy_hdu_to_mwax_baseline_order(
                    &self.legacy_conversion_table,
                    &raw,
                    &mut data,
                    self.num_fine_chans_per_coarse,
                );
            }
            (CorrelatorVersion::Legacy | CorrelatorVersion::OldLegacy, TileLayout::ByFrequency) => {
                convert_legacy_hdu_to_mwax_frequency_order(
                    &self.legacy_conversion_table,
                    &raw,
                    &mut data,
                    self.num_fine_chans_per_coarse,
                );
            }
            (CorrelatorVersion::V2, TileLayout::ByBaseline) => {
                // MWAX already packs [baseline][fine_chan][pol][re,im].
                data.copy_from_slice(&raw);
            }
            (CorrelatorVersion::V2, TileLayout::ByFrequency) => {
                convert_mwax_hdu_to_frequency_order(
                    &raw,
                    &mut data,
                    self.num_baselines,
                    self.num_fine_chans_per_coarse,
                    self.num_visibility_pols,
                );
            }
        }

        Ok(ReadOutcome { data, warning: None })
    }

    /// Reads one (timestep, coarse channel) tile as
    /// `[baseline][fine_chan][pol][re,im]`.
    pub fn read_by_baseline(
        &self,
        timestep_index: usize,
        coarse_chan_index: usize,
    ) -> Result<ReadOutcome, MwaObsCtxError> {
        self.read_tile(timestep_index, coarse_chan_index, TileLayout::ByBaseline)
    }

    /// Reads one (timestep, coarse channel) tile as
    /// `[fine_chan][baseline][pol][re,im]`.
    pub fn read_by_frequency(
        &self,
        timestep_index: usize,
        coarse_chan_index: usize,
    ) -> Result<ReadOutcome, MwaObsCtxError> {
        self.read_tile(timestep_index, coarse_chan_index, TileLayout::ByFrequency)
    }

    /// As [`CorrelatorContext::read_by_baseline`], but writes into a
    /// caller-supplied buffer instead of allocating (§6 external interface).
    pub fn read_by_baseline_into_buffer(
        &self,
        timestep_index: usize,
        coarse_chan_index: usize,
        buffer: &mut [f32],
    ) -> Result<Option<ReadWarning>, MwaObsCtxError> {
        self.read_into_buffer(timestep_index, coarse_chan_index, buffer, TileLayout::ByBaseline)
    }

    /// As [`CorrelatorContext::read_by_frequency`], but writes into a
    /// caller-supplied buffer instead of allocating (§6 external interface).
    pub fn read_by_frequency_into_buffer(
        &self,
        timestep_index: usize,
        coarse_chan_index: usize,
        buffer: &mut [f32],
    ) -> Result<Option<ReadWarning>, MwaObsCtxError> {
        self.read_into_buffer(timestep_index, coarse_chan_index, buffer, TileLayout::ByFrequency)
    }

    fn read_into_buffer(
        &self,
        timestep_index: usize,
        coarse_chan_index: usize,
        buffer: &mut [f32],
        layout: TileLayout,
    ) -> Result<Option<ReadWarning>, MwaObsCtxError> {
        if buffer.len() < self.floats_per_hdu {
            return Err(MwaObsCtxError::BufferTooSmall {
                needed: self.floats_per_hdu,
                given: buffer.len(),
            });
        }

        let outcome = self.read_tile(timestep_index, coarse_chan_index, layout)?;
        buffer[..self.floats_per_hdu].copy_from_slice(&outcome.data);
        Ok(outcome.warning)
    }
}

impl fmt::Display for CorrelatorContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            r#"CorrelatorContext (
    {metafits_context}
    Correlator version:       {corr_ver}

    Actual UNIX start time:   {start_unix}
    Actual UNIX end time:     {end_unix}
    Actual duration:          {duration} s
    integration time:         {int_time:.2} s

    num timesteps:            {n_ts}
    num coarse channels:      {n_cc}
    observation bandwidth:    {bw} MHz

    floats per HDU:           {fph}
    bytes per HDU:            {bph}

    num gpubox batches:       {n_batches}
)"#,
            metafits_context = self.metafits_context,
            corr_ver = self.corr_version,
            start_unix = self.start_unix_ms as f64 / 1e3,
            end_unix = self.end_unix_ms as f64 / 1e3,
            duration = self.duration_ms as f64 / 1e3,
            int_time = self.integration_time_ms as f64 / 1e3,
            n_ts = self.num_timesteps,
            n_cc = self.num_coarse_channels,
            bw = self.bandwidth_hz as f64 / 1e6,
            fph = self.floats_per_hdu,
            bph = self.bytes_per_hdu,
            n_batches = self.gpubox_batches.len(),
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_read_warning_display() {
        let w = ReadWarning::MissingHdu {
            timestep_index: 2,
            coarse_chan_index: 5,
        };
        assert!(format!("{w}").contains("timestep 2"));
    }

    #[test]
    fn test_context_options_default_fails_loudly() {
        assert!(!ContextOptions::default().allow_integration_time_mismatch);
    }
}
