// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Parses the metafits sidecar FITS file into an immutable [`MetafitsContext`]:
antennas, RF inputs, pointing, scheduling and the scheduled coarse-channel
list. See spec §4.1.
*/

pub mod error;
pub use error::MetafitsError;

use std::f64::consts::FRAC_PI_2;
use std::fmt;
use std::path::Path;

use chrono::{DateTime, Duration, FixedOffset};
use num_traits::FromPrimitive;

use crate::antenna::Antenna;
use crate::baseline::Baseline;
use crate::coarse_channel::CoarseChannel;
use crate::misc::{COAX_V_FACTOR, MWA_ALTITUDE_METRES, MWA_LATITUDE_RADIANS, MWA_LONGITUDE_RADIANS};
use crate::rfinput::RFInput;
use crate::types::{CableDelaysApplied, GeometricDelaysApplied, MWAMode};
use crate::visibility_pol::VisibilityPol;
use crate::MwaObsCtxError;

/// Which generation of MWA correlator produced a set of gpubox files.
#[repr(C)]
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum CorrelatorVersion {
    /// MWAX correlator (v2.0): one file per (coarse channel, batch), no
    /// batch letter in the filename.
    V2,
    /// Legacy correlator (v1.0) with a batch number in the filename.
    Legacy,
    /// Legacy correlator (v1.0) without a batch number (earliest observations).
    OldLegacy,
}

impl fmt::Display for CorrelatorVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                CorrelatorVersion::V2 => "v2 MWAX",
                CorrelatorVersion::Legacy => "v1 Legacy",
                CorrelatorVersion::OldLegacy => "v1 Legacy (no batch number)",
            }
        )
    }
}

/// Everything the metafits sidecar tells us about an observation: antennas,
/// RF inputs, pointing and scheduling. Built once by [`MetafitsContext::new`]
/// and never mutated afterwards; cheap to clone (shares no file handles).
#[derive(Clone, Debug)]
pub struct MetafitsContext {
    /// GPS observation id (`GPSTIME`).
    pub obsid: u32,
    /// Latitude of the MWA array centre, in radians.
    pub mwa_latitude_radians: f64,
    /// Longitude of the MWA array centre, in radians.
    pub mwa_longitude_radians: f64,
    /// Altitude of the MWA array centre, in metres.
    pub mwa_altitude_metres: f64,
    /// Velocity factor used to derive electrical length when `EL_` is absent.
    pub coax_v_factor: f64,

    /// Scheduled start of the observation, GPS time in milliseconds.
    pub scheduled_start_gpstime_ms: u64,
    /// Scheduled end of the observation, GPS time in milliseconds.
    pub scheduled_end_gpstime_ms: u64,
    /// Scheduled start of the observation, UNIX time in milliseconds.
    pub scheduled_start_unix_ms: u64,
    /// Scheduled end of the observation, UNIX time in milliseconds.
    pub scheduled_end_unix_ms: u64,
    /// Scheduled start of the observation, UTC.
    pub scheduled_start_utc: DateTime<FixedOffset>,
    /// Scheduled end of the observation, UTC.
    pub scheduled_end_utc: DateTime<FixedOffset>,
    /// Scheduled duration of the observation, in milliseconds (`EXPOSURE`).
    pub scheduled_duration_ms: u64,
    /// Number of scans (`NSCANS`), used to synthesize timesteps when no
    /// gpubox files are supplied.
    pub num_scans: u64,

    /// RA of the tile pointing, degrees.
    pub ra_tile_pointing_degrees: f64,
    /// Dec of the tile pointing, degrees.
    pub dec_tile_pointing_degrees: f64,
    /// RA of the phase centre, degrees, if set.
    pub ra_phase_center_degrees: Option<f64>,
    /// Dec of the phase centre, degrees, if set.
    pub dec_phase_center_degrees: Option<f64>,
    /// Azimuth of the pointing, degrees.
    pub azimuth_degrees: f64,
    /// Altitude (elevation) of the pointing, degrees.
    pub altitude_degrees: f64,
    /// Zenith angle of the pointing, degrees.
    pub zenith_angle_degrees: f64,
    /// Sun's altitude at the start of the observation, degrees.
    pub sun_altitude_degrees: f64,
    /// Angular distance from the pointing centre to the Sun, degrees.
    pub sun_distance_degrees: f64,
    /// Angular distance from the pointing centre to the Moon, degrees.
    pub moon_distance_degrees: f64,
    /// Angular distance from the pointing centre to Jupiter, degrees.
    pub jupiter_distance_degrees: f64,
    /// Local sidereal time, degrees.
    pub lst_degrees: f64,
    /// Hour angle of the pointing centre, as the metafits' sexagesimal string.
    pub hour_angle_string: String,

    /// Grid name (`GRIDNAME`).
    pub grid_name: String,
    /// Grid number (`GRIDNUM`).
    pub grid_number: i32,
    /// Creator of the metafits (`CREATOR`).
    pub creator: String,
    /// Project ID (`PROJECT`).
    pub project_id: String,
    /// Observation name (`FILENAME`).
    pub observation_name: String,
    /// Observation mode (`MODE`).
    pub mode: MWAMode,
    /// Whether geometric delays have already been applied (`GEODEL`).
    pub geometric_delays_applied: GeometricDelaysApplied,
    /// Whether cable length corrections have already been applied (`CABLEDEL`).
    pub cable_delays_applied: CableDelaysApplied,
    /// Global analogue attenuation, dB (`ATTEN_DB`).
    pub global_analogue_attenuation_db: f64,

    /// Duration of bad data at the start of the observation, in milliseconds
    /// (`QUACKTIM`).
    pub quack_time_duration_ms: u64,
    /// `GOODTIME`, converted to UNIX milliseconds: the first good timestep.
    pub good_time_unix_ms: u64,

    /// Total number of antennas (tiles).
    pub num_antennas: usize,
    pub antennas: Vec<Antenna>,
    /// Total number of RF inputs (`2 * num_antennas`).
    pub num_rf_inputs: usize,
    pub rf_inputs: Vec<RFInput>,
    /// Number of polarisations per antenna (always 2: X, Y).
    pub num_antenna_pols: usize,

    /// Receiver channel numbers the observation was scheduled to use, in the
    /// order the metafits `CHANNELS` keyword lists them.
    pub scheduled_coarse_channels: Vec<usize>,
    /// `CoarseChannel` table assuming every scheduled channel is present;
    /// superseded by `CorrelatorContext::coarse_channels` once gpubox files
    /// are examined.
    pub metafits_coarse_channels: Vec<CoarseChannel>,
    /// Number of entries in `scheduled_coarse_channels`.
    pub num_coarse_channels: usize,
    /// Total bandwidth assuming every scheduled channel is present.
    pub observation_bandwidth_hz: u32,
    /// Width of one coarse channel, in Hz.
    pub coarse_channel_width_hz: u32,

    /// Fine-channel width, in Hz (`FINECHAN`, kHz in the metafits).
    pub corr_fine_chan_width_hz: u32,
    /// Correlator dump (integration) time, in milliseconds (`INTTIME`).
    pub corr_int_time_ms: u64,
    /// Number of fine channels per coarse channel.
    pub num_fine_chans_per_coarse: usize,

    /// Number of baselines (autos + cross-correlations).
    pub num_baselines: usize,
    pub baselines: Vec<Baseline>,
    /// Number of visibility polarisation products (always 4: XX, XY, YX, YY).
    pub num_visibility_pols: usize,
    pub visibility_pols: Vec<VisibilityPol>,

    /// Path this context was built from.
    pub metafits_filename: String,
}

impl MetafitsContext {
    /// Parses a metafits file into an immutable [`MetafitsContext`].
    pub fn new<P: AsRef<Path>>(metafits_filename: P) -> Result<Self, MwaObsCtxError> {
        let metafits_filename = metafits_filename.as_ref();
        let mut fptr = crate::fits_open!(metafits_filename)?;
        let hdu = crate::fits_open_hdu!(&mut fptr, metafits_filename, 0)?;
        let tile_data_hdu = crate::fits_open_hdu!(&mut fptr, metafits_filename, 1)?;

        let obsid: u32 = crate::get_required_fits_key!(&mut fptr, metafits_filename, &hdu, "GPSTIME")?;

        let num_rf_inputs: usize =
            crate::get_required_fits_key!(&mut fptr, metafits_filename, &hdu, "NINPUTS")?;
        if num_rf_inputs % 2 != 0 {
            return Err(MetafitsError::OddNumInputs(num_rf_inputs as u32).into());
        }
        let num_antennas = num_rf_inputs / 2;

        let mut rf_inputs = RFInput::populate_rf_inputs(
            num_rf_inputs,
            &mut fptr,
            metafits_filename,
            tile_data_hdu,
            COAX_V_FACTOR,
        )?;
        rf_inputs.sort_unstable_by_key(|rf| rf.subfile_order);
        if rf_inputs.len() != num_rf_inputs {
            return Err(MetafitsError::RfInputCountMismatch {
                expected: num_rf_inputs,
                actual: rf_inputs.len(),
            }
            .into());
        }

        let antennas = Antenna::populate_antennas(&rf_inputs);
        let num_antenna_pols = 2;
        let baselines = Baseline::populate_baselines(num_antennas);
        let visibility_pols = VisibilityPol::populate_visibility_pols();
        let num_visibility_pols = visibility_pols.len();
        let num_baselines = crate::misc::get_baseline_count(num_antennas);

        let quack_time_duration_ms: u64 = {
            let qt: f64 = crate::get_required_fits_key!(&mut fptr, metafits_filename, &hdu, "QUACKTIM")?;
            (qt * 1000.).round() as u64
        };
        let good_time_unix_ms: u64 = {
            let gt: f64 = crate::get_required_fits_key!(&mut fptr, metafits_filename, &hdu, "GOODTIME")?;
            (gt * 1000.).round() as u64
        };

        let scheduled_start_utc_string: String =
            crate::get_required_fits_key!(&mut fptr, metafits_filename, &hdu, "DATE-OBS")?;
        let scheduled_start_utc = DateTime::parse_from_rfc3339(&format!(
            "{scheduled_start_utc_string}+00:00"
        ))
        .map_err(|_| MwaObsCtxError::IncompatibleContext(format!(
            "Unable to parse DATE-OBS {scheduled_start_utc_string:?} into a date time"
        )))?;

        let scheduled_duration_ms: u64 = {
            let ex: u64 = crate::get_required_fits_key!(&mut fptr, metafits_filename, &hdu, "EXPOSURE")?;
            ex * 1000
        };
        let scheduled_end_utc = scheduled_start_utc + Duration::milliseconds(scheduled_duration_ms as i64);

        let num_scans: u64 = crate::get_required_fits_key!(&mut fptr, metafits_filename, &hdu, "NSCANS")?;

        let scheduled_start_gpstime_ms: u64 = obsid as u64 * 1000;
        let scheduled_end_gpstime_ms = scheduled_start_gpstime_ms + scheduled_duration_ms;
        let scheduled_start_unix_ms = good_time_unix_ms - quack_time_duration_ms;
        let scheduled_end_unix_ms = scheduled_start_unix_ms + scheduled_duration_ms;

        let ra_tile_pointing_degrees: f64 =
            crate::get_required_fits_key!(&mut fptr, metafits_filename, &hdu, "RA")?;
        let dec_tile_pointing_degrees: f64 =
            crate::get_required_fits_key!(&mut fptr, metafits_filename, &hdu, "DEC")?;
        let ra_phase_center_degrees: Option<f64> =
            crate::get_optional_fits_key!(&mut fptr, metafits_filename, &hdu, "RAPHASE")?;
        let dec_phase_center_degrees: Option<f64> =
            crate::get_optional_fits_key!(&mut fptr, metafits_filename, &hdu, "DECPHASE")?;
        let azimuth_degrees: f64 =
            crate::get_required_fits_key!(&mut fptr, metafits_filename, &hdu, "AZIMUTH")?;
        let altitude_degrees: f64 =
            crate::get_required_fits_key!(&mut fptr, metafits_filename, &hdu, "ALTITUDE")?;
        let zenith_angle_degrees = FRAC_PI_2.to_degrees() - altitude_degrees;
        let sun_altitude_degrees: f64 =
            crate::get_required_fits_key!(&mut fptr, metafits_filename, &hdu, "SUN-ALT")?;
        let sun_distance_degrees: f64 =
            crate::get_required_fits_key!(&mut fptr, metafits_filename, &hdu, "SUN-DIST")?;
        let moon_distance_degrees: f64 =
            crate::get_required_fits_key!(&mut fptr, metafits_filename, &hdu, "MOONDIST")?;
        let jupiter_distance_degrees: f64 =
            crate::get_required_fits_key!(&mut fptr, metafits_filename, &hdu, "JUP-DIST")?;
        let lst_degrees: f64 = crate::get_required_fits_key!(&mut fptr, metafits_filename, &hdu, "LST")?;
        let hour_angle_string: String =
            crate::get_required_fits_key!(&mut fptr, metafits_filename, &hdu, "HA")?;

        let grid_name: String =
            crate::get_required_fits_key!(&mut fptr, metafits_filename, &hdu, "GRIDNAME")?;
        let grid_number: i32 =
            crate::get_required_fits_key!(&mut fptr, metafits_filename, &hdu, "GRIDNUM")?;
        let creator: String = crate::get_required_fits_key!(&mut fptr, metafits_filename, &hdu, "CREATOR")?;
        let project_id: String =
            crate::get_required_fits_key!(&mut fptr, metafits_filename, &hdu, "PROJECT")?;
        let observation_name: String =
            crate::get_required_fits_key!(&mut fptr, metafits_filename, &hdu, "FILENAME")?;

        let mode_string: String = crate::get_required_fits_key!(&mut fptr, metafits_filename, &hdu, "MODE")?;
        let mode: MWAMode = mode_string
            .parse()
            .map_err(|_| MetafitsError::UnrecognisedMode(mode_string.clone()))?;

        let geodel: Option<i32> =
            crate::get_optional_fits_key!(&mut fptr, metafits_filename, &hdu, "GEODEL")?;
        let geometric_delays_applied =
            geodel.and_then(GeometricDelaysApplied::from_i32).unwrap_or(GeometricDelaysApplied::No);
        let cabledel: Option<i32> =
            crate::get_optional_fits_key!(&mut fptr, metafits_filename, &hdu, "CABLEDEL")?;
        let cable_delays_applied =
            cabledel.and_then(CableDelaysApplied::from_i32).unwrap_or(CableDelaysApplied::No);

        let global_analogue_attenuation_db: f64 =
            crate::get_required_fits_key!(&mut fptr, metafits_filename, &hdu, "ATTEN_DB")?;

        let observation_bandwidth_hz: u32 = {
            let bw: f64 = crate::get_required_fits_key!(&mut fptr, metafits_filename, &hdu, "BANDWDTH")?;
            (bw * 1e6).round() as u32
        };

        let (scheduled_coarse_channels, coarse_channel_width_hz) =
            CoarseChannel::get_metafits_coarse_channel_info(
                &mut fptr,
                metafits_filename,
                &hdu,
                observation_bandwidth_hz,
            )?;
        let num_coarse_channels = scheduled_coarse_channels.len();

        let metafits_coarse_channels = CoarseChannel::populate_coarse_channels(
            CorrelatorVersion::Legacy,
            &scheduled_coarse_channels,
            coarse_channel_width_hz,
            None,
        )?;

        let corr_fine_chan_width_hz: u32 = {
            let fc: f64 = crate::get_required_fits_key!(&mut fptr, metafits_filename, &hdu, "FINECHAN")?;
            (fc * 1000.).round() as u32
        };
        let num_fine_chans_per_coarse = (coarse_channel_width_hz / corr_fine_chan_width_hz) as usize;

        let corr_int_time_ms: u64 = {
            let it: f64 = crate::get_required_fits_key!(&mut fptr, metafits_filename, &hdu, "INTTIME")?;
            (it * 1000.).round() as u64
        };

        Ok(MetafitsContext {
            obsid,
            mwa_latitude_radians: MWA_LATITUDE_RADIANS,
            mwa_longitude_radians: MWA_LONGITUDE_RADIANS,
            mwa_altitude_metres: MWA_ALTITUDE_METRES,
            coax_v_factor: COAX_V_FACTOR,
            scheduled_start_gpstime_ms,
            scheduled_end_gpstime_ms,
            scheduled_start_unix_ms,
            scheduled_end_unix_ms,
            scheduled_start_utc,
            scheduled_end_utc,
            scheduled_duration_ms,
            num_scans,
            ra_tile_pointing_degrees,
            dec_tile_pointing_degrees,
            ra_phase_center_degrees,
            dec_phase_center_degrees,
            azimuth_degrees,
            altitude_degrees,
            zenith_angle_degrees,
            sun_altitude_degrees,
            sun_distance_degrees,
            moon_distance_degrees,
            jupiter_distance_degrees,
            lst_degrees,
            hour_angle_string,
            grid_name,
            grid_number,
            creator,
            project_id,
            observation_name,
            mode,
            geometric_delays_applied,
            cable_delays_applied,
            global_analogue_attenuation_db,
            quack_time_duration_ms,
            good_time_unix_ms,
            num_antennas,
            antennas,
            num_rf_inputs,
            rf_inputs,
            num_antenna_pols,
            scheduled_coarse_channels,
            metafits_coarse_channels,
            num_coarse_channels,
            observation_bandwidth_hz,
            coarse_channel_width_hz,
            corr_fine_chan_width_hz,
            corr_int_time_ms,
            num_fine_chans_per_coarse,
            num_baselines,
            baselines,
            num_visibility_pols,
            visibility_pols,
            metafits_filename: metafits_filename.display().to_string(),
        })
    }
}

impl fmt::Display for MetafitsContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            r#"MetafitsContext (
    obsid:                    {obsid}
    mode:                     {mode:?}
    MWA lat/lon/alt:          {lat:.6}, {lon:.6}, {alt:.1} m

    Scheduled start (UNIX):   {start_unix}
    Scheduled end (UNIX):     {end_unix}
    Scheduled duration:       {duration} s
    Quack time:               {quack} s
    Good UNIX start time:     {good}

    RA/Dec (tile pointing):   {ra}, {dec} degrees
    Azimuth/Altitude:         {az}, {alti} degrees

    num antennas:             {n_ants}
    num rf_inputs:            {n_rf}
    num baselines:            {n_bls}
    num visibility pols:      {n_vps}

    num coarse channels:      {n_cc}
    coarse channel width:     {ccw} kHz
    fine channels/coarse:     {nfcpc}
    integration time:         {int_time:.2} s

    metafits filename:        {fname}
)"#,
            obsid = self.obsid,
            mode = self.mode,
            lat = self.mwa_latitude_radians.to_degrees(),
            lon = self.mwa_longitude_radians.to_degrees(),
            alt = self.mwa_altitude_metres,
            start_unix = self.scheduled_start_unix_ms as f64 / 1e3,
            end_unix = self.scheduled_end_unix_ms as f64 / 1e3,
            duration = self.scheduled_duration_ms as f64 / 1e3,
            quack = self.quack_time_duration_ms as f64 / 1e3,
            good = self.good_time_unix_ms as f64 / 1e3,
            ra = self.ra_tile_pointing_degrees,
            dec = self.dec_tile_pointing_degrees,
            az = self.azimuth_degrees,
            alti = self.altitude_degrees,
            n_ants = self.num_antennas,
            n_rf = self.num_rf_inputs,
            n_bls = self.num_baselines,
            n_vps = self.num_visibility_pols,
            n_cc = self.num_coarse_channels,
            ccw = self.coarse_channel_width_hz as f64 / 1e3,
            nfcpc = self.num_fine_chans_per_coarse,
            int_time = self.corr_int_time_ms as f64 / 1e3,
            fname = self.metafits_filename,
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_correlator_version_display() {
        assert_eq!(format!("{}", CorrelatorVersion::V2), "v2 MWAX");
        assert_eq!(format!("{}", CorrelatorVersion::Legacy), "v1 Legacy");
    }
}
