// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Discovers, groups and cross-validates the raw visibility (gpubox) files that
go with a metafits file. See spec §4.2.
*/

pub mod error;
pub use error::GpuboxError;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use fitsio::{hdu::FitsHdu, FitsFile};
use lazy_static::lazy_static;
use rayon::prelude::*;
use regex::Regex;

use crate::fits_read::error::FitsError;
use crate::metafits_context::CorrelatorVersion;
use crate::MwaObsCtxError;

lazy_static! {
    // MWAX: 1234567890_12345678901234_ch123_123.fits
    //          obsid        datetime     chan  batch
    static ref RE_MWAX: Regex =
        Regex::new(r"^\d{10}_\d{14}_ch(?P<channel>\d{3})_(?P<batch>\d{3})\.fits$").unwrap();
    // Legacy: 1234567890_12345678901234_gpubox12_12.fits
    static ref RE_LEGACY_BATCH: Regex =
        Regex::new(r"^\d{10}_\d{14}_gpubox(?P<band>\d{2})_(?P<batch>\d{2})\.fits$").unwrap();
    // Old Legacy: 1234567890_12345678901234_gpubox12.fits
    static ref RE_OLD_LEGACY: Regex =
        Regex::new(r"^\d{10}_\d{14}_gpubox(?P<band>\d{2})\.fits$").unwrap();
}

/// `BTreeMap<unix_time_ms, BTreeMap<gpubox_number, (batch_number, hdu_index)>>`.
///
/// The outer keys are UNIX times in milliseconds that appear in at least one
/// supplied gpubox file; the inner map gives, for each coarse channel present
/// at that time, which batch/HDU holds the data.
pub(crate) type GpuboxTimeMap = BTreeMap<u64, BTreeMap<usize, (usize, usize)>>;

/// One visibility data file belonging to an observation.
#[derive(Clone)]
pub struct GpuboxFile {
    pub path: PathBuf,
    pub batch_number: usize,
    pub gpubox_number: usize,
    pub first_hdu_time_ms: u64,
    pub hdu_count: usize,
    pub image_shape: Vec<usize>,
}

impl fmt::Debug for GpuboxFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} batch={} gpubox={} hdus={} shape={:?}",
            self.path.display(),
            self.batch_number,
            self.gpubox_number,
            self.hdu_count,
            self.image_shape
        )
    }
}

/// All [`GpuboxFile`]s sharing one `batch_number`.
#[derive(Clone)]
pub struct GpuboxBatch {
    pub batch_number: usize,
    pub gpubox_files: Vec<GpuboxFile>,
}

impl fmt::Debug for GpuboxBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "batch {} ({} files)",
            self.batch_number,
            self.gpubox_files.len()
        )
    }
}

pub(crate) struct GpuboxInfo {
    pub batches: Vec<GpuboxBatch>,
    pub corr_format: CorrelatorVersion,
    pub time_map: GpuboxTimeMap,
}

pub(crate) struct ObsTimes {
    pub start_millisec: u64,
    pub end_millisec: u64,
    pub duration_millisec: u64,
}

struct TempGpuboxFile<'a> {
    filename: &'a Path,
    gpubox_number: usize,
    batch_number: usize,
}

/// Groups, opens and cross-checks every supplied gpubox file against the
/// metafits observation ID.
pub(crate) fn examine_gpubox_files<T: AsRef<Path>>(
    gpubox_filenames: &[T],
    metafits_obs_id: u32,
) -> Result<GpuboxInfo, MwaObsCtxError> {
    let (temp_gpuboxes, corr_format) = determine_gpubox_batches(gpubox_filenames)?;

    let time_map = create_time_map(&temp_gpuboxes, corr_format)?;

    let mut batches = group_into_batches(&temp_gpuboxes);

    for batch in &mut batches {
        for g in &mut batch.gpubox_files {
            let mut fptr = crate::fits_open!(&g.path)?;

            let hdu = crate::fits_open_hdu!(&mut fptr, &g.path, 1)?;
            g.image_shape = crate::get_hdu_image_size!(&mut fptr, &g.path, &hdu)?;
            g.hdu_count = fptr.iter().count().saturating_sub(1);
            if corr_format == CorrelatorVersion::V2 {
                // every second HDU is a weights table
                g.hdu_count = (g.hdu_count + 1) / 2;
            }

            let primary_hdu = crate::fits_open_hdu!(&mut fptr, &g.path, 0)?;
            validate_gpubox_correlator_version(&mut fptr, &g.path, &primary_hdu, corr_format)?;
            validate_gpubox_obs_id(&mut fptr, &g.path, &primary_hdu, metafits_obs_id)?;
        }
    }

    validate_batch_completeness(&batches)?;

    Ok(GpuboxInfo {
        batches,
        corr_format,
        time_map,
    })
}

fn regex_captures<'a>(filename: &'a Path) -> Option<(CorrelatorVersion, usize, usize)> {
    let name = filename.file_name()?.to_str()?;

    if let Some(caps) = RE_MWAX.captures(name) {
        return Some((
            CorrelatorVersion::V2,
            caps["channel"].parse().unwrap(),
            caps["batch"].parse().unwrap(),
        ));
    }
    if let Some(caps) = RE_LEGACY_BATCH.captures(name) {
        return Some((
            CorrelatorVersion::Legacy,
            caps["band"].parse().unwrap(),
            caps["batch"].parse().unwrap(),
        ));
    }
    if let Some(caps) = RE_OLD_LEGACY.captures(name) {
        return Some((CorrelatorVersion::OldLegacy, caps["band"].parse().unwrap(), 0));
    }

    None
}

fn determine_gpubox_batches<T: AsRef<Path>>(
    gpubox_filenames: &[T],
) -> Result<(Vec<TempGpuboxFile>, CorrelatorVersion), MwaObsCtxError> {
    let mut format = None;
    let mut temp_gpuboxes = Vec::with_capacity(gpubox_filenames.len());

    for g_path in gpubox_filenames {
        let filename = g_path.as_ref();
        match regex_captures(filename) {
            Some((version, gpubox_number, batch_number)) => {
                match format {
                    None => format = Some(version),
                    Some(f) if f == version => (),
                    Some(_) => return Err(MwaObsCtxError::MixedCorrelatorVersions),
                }
                temp_gpuboxes.push(TempGpuboxFile {
                    filename,
                    gpubox_number,
                    batch_number,
                });
            }
            None => {
                return Err(MwaObsCtxError::InvalidFilename(
                    filename.display().to_string(),
                ))
            }
        }
    }

    let corr_format = match format {
        Some(f) => f,
        None => {
            return Err(MwaObsCtxError::InconsistentBatches(
                "no gpubox files were supplied".to_string(),
            ))
        }
    };

    temp_gpuboxes.sort_unstable_by_key(|g| (g.batch_number, g.gpubox_number));

    Ok((temp_gpuboxes, corr_format))
}

fn group_into_batches(temp_gpuboxes: &[TempGpuboxFile]) -> Vec<GpuboxBatch> {
    let num_batches = temp_gpuboxes.iter().map(|g| g.batch_number).max().unwrap_or(0) + 1;
    let mut batches: Vec<GpuboxBatch> = (0..num_batches)
        .map(|batch_number| GpuboxBatch {
            batch_number,
            gpubox_files: vec![],
        })
        .collect();

    for g in temp_gpuboxes {
        batches[g.batch_number].gpubox_files.push(GpuboxFile {
            path: g.filename.to_path_buf(),
            batch_number: g.batch_number,
            gpubox_number: g.gpubox_number,
            first_hdu_time_ms: 0,
            hdu_count: 0,
            image_shape: vec![],
        });
    }

    for b in &mut batches {
        b.gpubox_files
            .sort_unstable_by_key(|g| g.gpubox_number);
    }

    batches
}

/// Every batch that appears must carry the same set of `gpubox_number`s as
/// batch 0, and the same `hdu_count`/`image_shape` (the last batch may be
/// shorter in `hdu_count`).
fn validate_batch_completeness(batches: &[GpuboxBatch]) -> Result<(), MwaObsCtxError> {
    let first_gpuboxes: Vec<usize> = match batches.first() {
        Some(b) => b.gpubox_files.iter().map(|g| g.gpubox_number).collect(),
        None => return Ok(()),
    };

    let reference_shape = &batches[0].gpubox_files[0].image_shape;

    for batch in batches {
        let these: Vec<usize> = batch.gpubox_files.iter().map(|g| g.gpubox_number).collect();
        if these != first_gpuboxes {
            return Err(MwaObsCtxError::InconsistentBatches(format!(
                "batch {} has gpubox numbers {:?}, expected {:?}",
                batch.batch_number, these, first_gpuboxes
            )));
        }

        for g in &batch.gpubox_files {
            if &g.image_shape != reference_shape {
                return Err(MwaObsCtxError::InconsistentBatches(format!(
                    "{} has image shape {:?}, expected {:?}",
                    g.path.display(),
                    g.image_shape,
                    reference_shape
                )));
            }
        }
    }

    let is_last = |i: usize| i == batches.len() - 1;
    if let Some(reference_hdu_count) = batches.first().map(|b| b.gpubox_files[0].hdu_count) {
        for (i, batch) in batches.iter().enumerate() {
            for g in &batch.gpubox_files {
                if g.hdu_count != reference_hdu_count && !is_last(i) {
                    return Err(MwaObsCtxError::InconsistentBatches(format!(
                        "{} has {} HDUs, expected {}",
                        g.path.display(),
                        g.hdu_count,
                        reference_hdu_count
                    )));
                }
            }
        }
    }

    Ok(())
}

fn determine_hdu_time(
    gpubox_fptr: &mut FitsFile,
    filename: &Path,
    gpubox_hdu_fptr: &FitsHdu,
) -> Result<u64, FitsError> {
    let start_unix_time: u64 =
        crate::get_required_fits_key!(gpubox_fptr, filename, gpubox_hdu_fptr, "TIME")?;
    let start_unix_millitime: u64 =
        crate::get_required_fits_key!(gpubox_fptr, filename, gpubox_hdu_fptr, "MILLITIM")?;
    Ok(start_unix_time * 1000 + start_unix_millitime)
}

fn map_unix_times_to_hdus(
    gpubox_fptr: &mut FitsFile,
    filename: &Path,
    correlator_version: CorrelatorVersion,
) -> Result<BTreeMap<u64, usize>, FitsError> {
    let mut map = BTreeMap::new();
    let last_hdu_index = gpubox_fptr.iter().count();
    let step_size = if correlator_version == CorrelatorVersion::V2 {
        2
    } else {
        1
    };

    for hdu_index in (1..last_hdu_index).step_by(step_size) {
        let hdu = crate::fits_open_hdu!(gpubox_fptr, filename, hdu_index)?;
        let time = determine_hdu_time(gpubox_fptr, filename, &hdu)?;
        map.insert(time, hdu_index);
    }

    Ok(map)
}

fn validate_gpubox_correlator_version(
    gpubox_fptr: &mut FitsFile,
    filename: &Path,
    primary_hdu: &FitsHdu,
    correlator_version: CorrelatorVersion,
) -> Result<(), MwaObsCtxError> {
    let gpu_corr_version: Option<u8> =
        crate::get_optional_fits_key!(gpubox_fptr, filename, primary_hdu, "CORR_VER")?;

    match correlator_version {
        CorrelatorVersion::V2 => match gpu_corr_version {
            None => Err(GpuboxError::MwaxCorrVerMissing(filename.display().to_string()).into()),
            Some(2) => Ok(()),
            Some(_) => {
                Err(GpuboxError::MwaxCorrVerMismatch(filename.display().to_string()).into())
            }
        },
        CorrelatorVersion::OldLegacy | CorrelatorVersion::Legacy => match gpu_corr_version {
            None => Ok(()),
            Some(gpu_corr_version_value) => Err(GpuboxError::CorrVerMismatch {
                gpubox_filename: filename.display().to_string(),
                gpu_corr_version_value,
            }
            .into()),
        },
    }
}

fn validate_gpubox_obs_id(
    gpubox_fptr: &mut FitsFile,
    filename: &Path,
    primary_hdu: &FitsHdu,
    metafits_obs_id: u32,
) -> Result<(), MwaObsCtxError> {
    let gpu_obs_id: u32 =
        match crate::get_required_fits_key!(gpubox_fptr, filename, primary_hdu, "OBSID") {
            Ok(o) => o,
            Err(_) => {
                return Err(GpuboxError::MissingObsid(filename.display().to_string()).into())
            }
        };

    if gpu_obs_id != metafits_obs_id {
        Err(GpuboxError::ObsidMismatch {
            obsid: metafits_obs_id,
            gpubox_filename: filename.display().to_string(),
            gpubox_obsid: gpu_obs_id,
        }
        .into())
    } else {
        Ok(())
    }
}

fn create_time_map(
    gpuboxes: &[TempGpuboxFile],
    correlator_version: CorrelatorVersion,
) -> Result<GpuboxTimeMap, MwaObsCtxError> {
    let maps = gpuboxes
        .par_iter()
        .map(|g| -> Result<BTreeMap<u64, usize>, MwaObsCtxError> {
            let mut fptr = crate::fits_open!(g.filename)?;
            let hdu = crate::fits_open_hdu!(&mut fptr, g.filename, 0)?;

            if correlator_version == CorrelatorVersion::V2 {
                let v: u8 = crate::get_required_fits_key!(&mut fptr, g.filename, &hdu, "CORR_VER")?;
                if v != 2 {
                    return Err(
                        GpuboxError::MwaxCorrVerMismatch(g.filename.display().to_string()).into(),
                    );
                }
            }

            map_unix_times_to_hdus(&mut fptr, g.filename, correlator_version)
                .map_err(MwaObsCtxError::from)
        })
        .collect::<Vec<_>>();

    let mut gpubox_time_map = GpuboxTimeMap::new();
    for (map_maybe_error, gpubox) in maps.into_iter().zip(gpuboxes.iter()) {
        let map = map_maybe_error?;
        for (time, hdu_index) in map {
            gpubox_time_map
                .entry(time)
                .or_insert_with(BTreeMap::new)
                .entry(gpubox.gpubox_number)
                .or_insert((gpubox.batch_number, hdu_index));
        }
    }

    Ok(gpubox_time_map)
}

/// Determines the start/end/duration of an observation from the times that
/// are common to every supplied gpubox file (dangling data at either end is
/// trimmed).
pub(crate) fn determine_obs_times(
    gpubox_time_map: &GpuboxTimeMap,
    integration_time_ms: u64,
) -> Result<ObsTimes, MwaObsCtxError> {
    let size = match gpubox_time_map.values().map(BTreeMap::len).max() {
        Some(m) => m,
        None => return Err(MwaObsCtxError::NoCommonTimesteps),
    };

    let mut common = gpubox_time_map.iter().filter(|(_, m)| m.len() == size);
    let proper_start_millisec = common.next().map(|(time, _)| *time).unwrap();
    let proper_end_millisec =
        common.last().map(|(time, _)| *time).unwrap_or(proper_start_millisec) + integration_time_ms;

    Ok(ObsTimes {
        start_millisec: proper_start_millisec,
        end_millisec: proper_end_millisec,
        duration_millisec: proper_end_millisec - proper_start_millisec,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_regex_v2() {
        let (version, chan, batch) =
            regex_captures(Path::new("1234567890_12345678901234_ch123_001.fits")).unwrap();
        assert_eq!(version, CorrelatorVersion::V2);
        assert_eq!(chan, 123);
        assert_eq!(batch, 1);
    }

    #[test]
    fn test_regex_legacy() {
        let (version, band, batch) =
            regex_captures(Path::new("1234567890_12345678901234_gpubox12_01.fits")).unwrap();
        assert_eq!(version, CorrelatorVersion::Legacy);
        assert_eq!(band, 12);
        assert_eq!(batch, 1);
    }

    #[test]
    fn test_regex_old_legacy() {
        let (version, band, batch) =
            regex_captures(Path::new("1234567890_12345678901234_gpubox12.fits")).unwrap();
        assert_eq!(version, CorrelatorVersion::OldLegacy);
        assert_eq!(band, 12);
        assert_eq!(batch, 0);
    }

    #[test]
    fn test_regex_unrecognised() {
        assert!(regex_captures(Path::new("not_a_gpubox_file.fits")).is_none());
    }

    #[test]
    fn test_mixed_versions_rejected() {
        let filenames = vec![
            "1234567890_12345678901234_ch123_001.fits".to_string(),
            "1234567890_12345678901234_gpubox12_01.fits".to_string(),
        ];
        let result = determine_gpubox_batches(&filenames);
        assert!(matches!(
            result,
            Err(MwaObsCtxError::MixedCorrelatorVersions)
        ));
    }

    #[test]
    fn test_determine_obs_times() {
        let mut map = GpuboxTimeMap::new();
        let mut full = BTreeMap::new();
        full.insert(1, (0, 0));
        full.insert(2, (0, 0));
        map.insert(1000, full);

        let mut partial = BTreeMap::new();
        partial.insert(1, (0, 1));
        map.insert(1500, partial);

        let mut full2 = BTreeMap::new();
        full2.insert(1, (0, 2));
        full2.insert(2, (0, 2));
        map.insert(2000, full2);

        let times = determine_obs_times(&map, 500).unwrap();
        assert_eq!(times.start_millisec, 1000);
        assert_eq!(times.end_millisec, 2500);
        assert_eq!(times.duration_millisec, 1500);
    }

    #[test]
    fn test_determine_obs_times_empty() {
        let map = GpuboxTimeMap::new();
        assert!(matches!(
            determine_obs_times(&map, 500),
            Err(MwaObsCtxError::NoCommonTimesteps)
        ));
    }
}
