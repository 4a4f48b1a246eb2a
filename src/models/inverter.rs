use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::{TimestampSeconds, serde_as};

use crate::quantity::{WattHours, Watts};

/// Micro-inverter telemetry keyed by the serial number in the snapshot.
#[must_use]
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Inverter {
    pub serial_number: String,

    #[serde_as(as = "TimestampSeconds<i64>")]
    pub last_report_date: DateTime<Utc>,

    pub last_report_watts: Watts,

    /// Only reported by the legacy inverter list.
    pub max_report_watts: Option<Watts>,

    pub detail: Option<InverterDetail>,
}

/// Per-inverter DC and AC readings, only available from the device data resource.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct InverterDetail {
    pub dc_voltage: f64,
    pub dc_current: f64,
    pub ac_voltage: f64,
    pub ac_frequency: f64,
    pub temperature: f64,
    pub lifetime_energy: WattHours,

    /// Length of the last reporting interval in seconds.
    pub last_report_duration: u32,
}

/// `/api/v1/production/inverters` entry.
#[serde_as]
#[derive(Deserialize)]
pub struct ApiV1Inverter {
    #[serde(rename = "serialNumber")]
    pub serial_number: String,

    #[serde_as(as = "TimestampSeconds<i64>")]
    #[serde(rename = "lastReportDate")]
    pub last_report_date: DateTime<Utc>,

    #[serde(rename = "lastReportWatts")]
    pub last_report_watts: Watts,

    #[serde(rename = "maxReportWatts")]
    pub max_report_watts: Watts,
}

impl From<ApiV1Inverter> for Inverter {
    fn from(inverter: ApiV1Inverter) -> Self {
        Self {
            serial_number: inverter.serial_number,
            last_report_date: inverter.last_report_date,
            last_report_watts: inverter.last_report_watts,
            max_report_watts: Some(inverter.max_report_watts),
            detail: None,
        }
    }
}

/// `/ivp/pdm/device_data`: device objects keyed by the device ID, mixed with some counters.
#[derive(Deserialize)]
#[serde(transparent)]
pub struct DeviceData(pub BTreeMap<String, Value>);

impl DeviceData {
    /// Micro-inverters which have reported at least once.
    pub fn inverters(&self) -> impl Iterator<Item = Inverter> + '_ {
        self.0
            .values()
            .filter_map(|value| Device::deserialize(value).ok())
            .filter(|device| device.name == Device::MICRO_INVERTER)
            .filter_map(Device::into_inverter)
    }
}

#[derive(Deserialize)]
struct Device {
    #[serde(rename = "devName")]
    name: String,

    #[serde(rename = "sn")]
    serial_number: String,

    #[serde(rename = "channels", default)]
    channels: Vec<Channel>,
}

impl Device {
    const MICRO_INVERTER: &'static str = "pcu";

    fn into_inverter(self) -> Option<Inverter> {
        let channel = self.channels.into_iter().next()?;
        let reading = channel.last_reading;
        Some(Inverter {
            serial_number: self.serial_number,
            last_report_date: reading.end_date,
            last_report_watts: Watts::from_joules(
                reading.joules_produced,
                f64::from(reading.duration),
            ),
            max_report_watts: None,
            detail: Some(InverterDetail {
                dc_voltage: reading.dc_voltage_mv / 1000.0,
                dc_current: reading.dc_current_ma / 1000.0,
                ac_voltage: reading.ac_voltage_mv / 1000.0,
                ac_frequency: reading.ac_frequency_mhz / 1000.0,
                temperature: reading.channel_temperature,
                lifetime_energy: WattHours::from_joules(channel.lifetime.joules_produced),
                last_report_duration: reading.duration,
            }),
        })
    }
}

#[derive(Deserialize)]
struct Channel {
    #[serde(rename = "lastReading")]
    last_reading: LastReading,

    #[serde(rename = "lifetime")]
    lifetime: Lifetime,
}

#[serde_as]
#[derive(Deserialize)]
struct LastReading {
    #[serde_as(as = "TimestampSeconds<i64>")]
    #[serde(rename = "endDate")]
    end_date: DateTime<Utc>,

    #[serde(rename = "duration")]
    duration: u32,

    #[serde(rename = "joulesProduced")]
    joules_produced: f64,

    #[serde(rename = "acVoltageINmV")]
    ac_voltage_mv: f64,

    #[serde(rename = "acFrequencyINmHz")]
    ac_frequency_mhz: f64,

    #[serde(rename = "dcVoltageINmV")]
    dc_voltage_mv: f64,

    #[serde(rename = "dcCurrentINmA")]
    dc_current_ma: f64,

    #[serde(rename = "channelTemp")]
    channel_temperature: f64,
}

#[derive(Deserialize)]
struct Lifetime {
    #[serde(rename = "joulesProduced")]
    joules_produced: f64,
}
