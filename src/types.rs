// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Small metadata enums carried on `RfInput`/`MetafitsContext`.
//!
//! `mwalib` (the library this crate's approach is grounded on) also tracks
//! voltage-capture (VCS) correlator generations here; since VCS ingestion is
//! out of scope for this crate (see Non-goals), only the correlator-relevant
//! variants survive.

use std::fmt;
use std::str::FromStr;

use num_derive::FromPrimitive;

/// Polarisation of an RF input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pol {
    X,
    Y,
}

impl fmt::Display for Pol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            Pol::X => "X",
            Pol::Y => "Y",
        })
    }
}

impl FromStr for Pol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "X" | "x" => Ok(Pol::X),
            "Y" | "y" => Ok(Pol::Y),
            other => Err(other.to_string()),
        }
    }
}

/// Whether geometric delays have already been applied to an observation's
/// visibilities, per the metafits `GEODEL` keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum GeometricDelaysApplied {
    No = 0,
    Zenith = 1,
    TilePointing = 2,
    AzElTracking = 3,
}

impl fmt::Display for GeometricDelaysApplied {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                GeometricDelaysApplied::No => "No",
                GeometricDelaysApplied::Zenith => "Zenith",
                GeometricDelaysApplied::TilePointing => "Tile Pointing",
                GeometricDelaysApplied::AzElTracking => "Az/El Tracking",
            }
        )
    }
}

/// Whether cable length corrections have already been applied to an
/// observation's visibilities, per the metafits `CABLEDEL` keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum CableDelaysApplied {
    No = 0,
    Cable = 1,
    CableAndRecClock = 2,
}

impl fmt::Display for CableDelaysApplied {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                CableDelaysApplied::No => "No",
                CableDelaysApplied::Cable => "Cable length",
                CableDelaysApplied::CableAndRecClock => "Cable length and receiver clock",
            }
        )
    }
}

/// The kind of receiver an RF input is connected to, inferred from the
/// `Rx` column of the metafits TILEDATA table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverType {
    RRI,
    NI,
    Unknown,
}

impl fmt::Display for ReceiverType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ReceiverType::RRI => "RRI",
                ReceiverType::NI => "NI",
                ReceiverType::Unknown => "Unknown",
            }
        )
    }
}

/// MWA observation mode, from the metafits `MODE` keyword. Only the
/// correlator-relevant variants are retained; voltage-capture modes are a
/// Non-goal of this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MWAMode {
    HwLfiles,
    CorrMode,
    NoCapture,
}

impl FromStr for MWAMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HW_LFILES" => Ok(MWAMode::HwLfiles),
            "CORR_MODE" => Ok(MWAMode::CorrMode),
            "NO_CAPTURE" => Ok(MWAMode::NoCapture),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for MWAMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                MWAMode::HwLfiles => "HW_LFILES",
                MWAMode::CorrMode => "CORR_MODE",
                MWAMode::NoCapture => "NO_CAPTURE",
            }
        )
    }
}
