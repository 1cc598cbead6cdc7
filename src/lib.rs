// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
`mwa_obs_ctx` parses the sidecar files the MWA correlator produces — a
metafits file describing an observation, and the raw `gpubox` visibility
files that go with it — into typed, validated Rust structures.

Two entry points cover the two things a caller can have on disk:

* [`metafits_context::MetafitsContext`] parses a metafits file on its own:
  antennas, RF inputs, pointing and scheduling, with no raw visibility data
  required.
* [`correlator_context::CorrelatorContext`] additionally takes a set of
  `gpubox` files, cross-validates them against the metafits, builds the
  common timestep grid and coarse-channel table, and exposes tile reads in
  either baseline-major or frequency-major order, transparently reordering
  Legacy-correlator data into the MWAX canonical layout.

Both correlator generations (`Legacy`/`OldLegacy` and MWAX `V2`) are
supported; see [`metafits_context::CorrelatorVersion`].
*/

#[macro_use]
pub mod fits_read;

pub mod antenna;
pub mod baseline;
pub mod coarse_channel;
pub mod convert;
pub mod correlator_context;
pub mod error;
pub mod ffi;
pub mod gpubox_files;
pub mod metafits_context;
pub mod misc;
pub mod rfinput;
pub mod timestep;
pub mod types;
pub mod visibility_pol;

pub use antenna::Antenna;
pub use baseline::Baseline;
pub use coarse_channel::CoarseChannel;
pub use correlator_context::{ContextOptions, CorrelatorContext, ReadOutcome, ReadWarning, TileLayout};
pub use error::MwaObsCtxError;
pub use metafits_context::{CorrelatorVersion, MetafitsContext};
pub use rfinput::RFInput;
pub use timestep::TimeStep;
pub use types::{CableDelaysApplied, GeometricDelaysApplied, MWAMode, Pol, ReceiverType};
pub use visibility_pol::VisibilityPol;

pub use misc::{
    COARSE_CHANNEL_WIDTH_HZ, COAX_V_FACTOR, MWA_ALTITUDE_METRES, MWA_LATITUDE_RADIANS,
    MWA_LONGITUDE_RADIANS, RECEIVER_CHANNEL_SPLIT,
};
