use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::quantity::{WattHours, Watts};

/// CT measurement role.
///
/// Roles introduced by newer firmware are kept under their literal label.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MeterRole {
    Production,
    TotalConsumption,
    NetConsumption,
    Storage,
    Other(String),
}

impl MeterRole {
    #[must_use]
    pub const fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Production => "production",
            Self::TotalConsumption => "total-consumption",
            Self::NetConsumption => "net-consumption",
            Self::Storage => "storage",
            Self::Other(label) => label,
        }
    }
}

impl From<String> for MeterRole {
    fn from(label: String) -> Self {
        match label.as_str() {
            "production" => Self::Production,
            "total-consumption" => Self::TotalConsumption,
            "net-consumption" => Self::NetConsumption,
            "storage" => Self::Storage,
            _ => Self::Other(label),
        }
    }
}

impl From<MeterRole> for String {
    fn from(role: MeterRole) -> Self {
        match role {
            MeterRole::Other(label) => label,
            role => role.as_str().to_owned(),
        }
    }
}

impl Display for MeterRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeterState {
    Enabled,
    Disabled,

    #[serde(other)]
    Unknown,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseMode {
    #[default]
    Single,
    Split,
    Three,
}

/// `/ivp/meters` entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeterConfig {
    #[serde(rename = "eid")]
    pub eid: u64,

    #[serde(rename = "state")]
    pub state: MeterState,

    #[serde(rename = "measurementType")]
    pub role: MeterRole,

    #[serde(rename = "phaseMode", default)]
    pub phase_mode: PhaseMode,

    #[serde(rename = "phaseCount", default)]
    pub phase_count: usize,

    #[serde(rename = "meteringStatus", default)]
    pub metering_status: String,

    #[serde(rename = "statusFlags", default)]
    pub status_flags: Vec<String>,
}

impl MeterConfig {
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.state == MeterState::Enabled
    }
}

/// Values shared by a meter reading and each of its phase channels.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MeterValues {
    #[serde(rename = "timestamp", default)]
    pub timestamp: i64,

    #[serde(rename = "actEnergyDlvd", default)]
    pub energy_delivered: WattHours,

    #[serde(rename = "actEnergyRcvd", default)]
    pub energy_received: WattHours,

    #[serde(rename = "activePower", default)]
    pub active_power: Watts,

    #[serde(rename = "voltage", default)]
    pub voltage: f64,

    #[serde(rename = "current", default)]
    pub current: f64,

    #[serde(rename = "freq", default)]
    pub frequency: f64,

    #[serde(rename = "pwrFactor", default)]
    pub power_factor: f64,
}

/// `/ivp/meters/readings` entry.
#[derive(Deserialize)]
pub struct MeterReading {
    #[serde(rename = "eid")]
    pub eid: u64,

    #[serde(flatten)]
    pub values: MeterValues,

    #[serde(rename = "channels", default)]
    pub channels: Vec<MeterValues>,
}

impl MeterReading {
    /// Per-phase values, or `None` when the channels do not cover all the configured phases.
    #[must_use]
    pub fn phases(&self, phase_count: usize) -> Option<Vec<MeterValues>> {
        (phase_count > 1 && self.channels.len() >= phase_count)
            .then(|| self.channels[..phase_count].to_vec())
    }
}

/// CT reading in the snapshot, keyed by the meter role.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CtReading {
    pub eid: u64,

    #[serde(flatten)]
    pub values: MeterValues,

    pub phases: Option<Vec<MeterValues>>,
}
