//! Battery storage and grid controller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::{TimestampSeconds, serde_as};

use crate::quantity::{WattHours, Watts};

/// `/ivp/ensemble/inventory`: either the device groups, or an error object on unsupported gateways.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum InventoryResponse {
    Groups(Vec<InventoryGroup>),
    Error {
        #[serde(rename = "error")]
        error: Value,
    },
}

impl InventoryResponse {
    /// Device groups, empty when the gateway reported an error.
    pub fn into_groups(self) -> Vec<InventoryGroup> {
        match self {
            Self::Groups(groups) => groups,
            Self::Error { .. } => Vec::new(),
        }
    }
}

#[derive(Deserialize)]
pub struct InventoryGroup {
    /// `ENCHARGE`, `ENPOWER`, or something we do not support yet.
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(rename = "devices", default)]
    pub devices: Vec<Value>,
}

impl InventoryGroup {
    pub const ENCHARGE: &'static str = "ENCHARGE";
    pub const ENPOWER: &'static str = "ENPOWER";
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayState {
    Open,
    Closed,

    #[serde(other)]
    Unknown,
}

/// Battery in the snapshot, keyed by the serial number.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Battery {
    #[serde(rename = "serial_num")]
    pub serial_number: String,

    #[serde_as(as = "TimestampSeconds<i64>")]
    #[serde(rename = "last_rpt_date")]
    pub last_report_date: DateTime<Utc>,

    #[serde(rename = "percentFull")]
    pub percent_full: u8,

    #[serde(rename = "temperature")]
    pub temperature: f64,

    #[serde(rename = "maxCellTemp", default)]
    pub max_cell_temperature: f64,

    #[serde(rename = "encharge_capacity", default)]
    pub capacity: WattHours,

    #[serde(rename = "communicating", default)]
    pub communicating: bool,

    #[serde(rename = "operating", default)]
    pub operating: bool,

    #[serde(rename = "dc_switch_off", default)]
    pub dc_switch_off: bool,

    #[serde(rename = "led_status", default)]
    pub led_status: i32,

    /// Filled in from the ensemble power resource.
    #[serde(skip_deserializing)]
    pub real_power: Option<Watts>,
}

/// Grid controller.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Enpower {
    #[serde(rename = "serial_num")]
    pub serial_number: String,

    #[serde_as(as = "TimestampSeconds<i64>")]
    #[serde(rename = "last_rpt_date")]
    pub last_report_date: DateTime<Utc>,

    #[serde(rename = "temperature", default)]
    pub temperature: f64,

    #[serde(rename = "communicating", default)]
    pub communicating: bool,

    #[serde(rename = "mains_admin_state")]
    pub mains_admin_state: RelayState,

    #[serde(rename = "mains_oper_state")]
    pub mains_oper_state: RelayState,

    #[serde(rename = "Enpwr_grid_mode", default)]
    pub grid_mode: String,
}

/// `/ivp/ensemble/secctrl`.
#[derive(Deserialize)]
pub struct SecondaryControl {
    #[serde(rename = "agg_soc")]
    pub state_of_charge: u8,

    #[serde(rename = "Max_energy")]
    pub max_energy: WattHours,

    #[serde(rename = "ENC_agg_soc", default)]
    pub encharge_state_of_charge: u8,

    #[serde(rename = "ENC_agg_soh", default)]
    pub encharge_state_of_health: u8,

    #[serde(rename = "ENC_agg_backup_energy", default)]
    pub encharge_backup_energy: WattHours,

    #[serde(rename = "ENC_agg_avail_energy", default)]
    pub encharge_available_energy: WattHours,

    #[serde(rename = "Enc_commissioned_capacity", default)]
    pub encharge_commissioned_capacity: WattHours,

    #[serde(rename = "Enc_max_available_capacity", default)]
    pub encharge_max_available_capacity: WattHours,

    #[serde(rename = "ACB_agg_soc", default)]
    pub acb_state_of_charge: u8,

    #[serde(rename = "ACB_agg_energy", default)]
    pub acb_energy: WattHours,
}

/// Aggregate figures across both battery families.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BatteryAggregate {
    pub state_of_charge: u8,
    pub state_of_health: u8,
    pub max_energy: WattHours,
    pub available_energy: WattHours,
    pub backup_reserve: WattHours,
    pub encharge_state_of_charge: u8,
    pub acb_state_of_charge: u8,
}

impl SecondaryControl {
    /// Merge the battery families into one aggregate.
    ///
    /// ACB energy is only added when the production resource has reported the ACB batteries,
    /// otherwise the field is a leftover of a decommissioned installation.
    pub fn aggregate(&self, acb_batteries_reported: u32) -> BatteryAggregate {
        let mut available_energy = self.encharge_available_energy;
        if acb_batteries_reported != 0 {
            available_energy += self.acb_energy;
        }
        BatteryAggregate {
            state_of_charge: self.state_of_charge,
            state_of_health: self.encharge_state_of_health,
            max_energy: self.max_energy,
            available_energy,
            backup_reserve: self.encharge_backup_energy,
            encharge_state_of_charge: self.encharge_state_of_charge,
            acb_state_of_charge: self.acb_state_of_charge,
        }
    }
}

/// `/ivp/ensemble/power`.
#[derive(Deserialize)]
pub struct EnsemblePower {
    /// Yes, the colon is a part of the key on the actual devices.
    #[serde(rename = "devices:", alias = "devices", default)]
    pub devices: Vec<DevicePower>,
}

#[derive(Deserialize)]
pub struct DevicePower {
    #[serde(rename = "serial_num")]
    pub serial_number: String,

    #[serde(rename = "real_power_mw")]
    pub real_power_mw: f64,
}

impl DevicePower {
    pub const fn real_power(&self) -> Watts {
        Watts(self.real_power_mw / 1000.0)
    }
}

/// `/ivp/ensemble/dry_contacts`.
#[derive(Deserialize)]
pub struct DryContacts {
    #[serde(rename = "dry_contacts", default)]
    pub dry_contacts: Vec<DryContactStatus>,
}

#[derive(Clone, Deserialize)]
pub struct DryContactStatus {
    #[serde(rename = "id")]
    pub id: String,

    #[serde(rename = "status")]
    pub status: RelayState,
}

/// `/ivp/ss/dry_contact_settings`.
#[derive(Deserialize)]
pub struct DryContactSettingsResponse {
    #[serde(rename = "dry_contacts", default)]
    pub dry_contacts: Vec<DryContactSettings>,
}

/// Dry contact relay configuration.
///
/// The gateway rejects partial objects, so the unmodelled fields are carried along in `extra`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DryContactSettings {
    #[serde(rename = "id")]
    pub id: String,

    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(rename = "grid_action", default)]
    pub grid_action: String,

    #[serde(rename = "micro_grid_action", default)]
    pub micro_grid_action: String,

    #[serde(rename = "gen_action", default)]
    pub generator_action: String,

    #[serde(rename = "load_name", default)]
    pub load_name: String,

    #[serde(rename = "mode", default)]
    pub mode: String,

    #[serde(rename = "soc_low", default)]
    pub soc_low: f64,

    #[serde(rename = "soc_high", default)]
    pub soc_high: f64,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Caller-supplied partial dry contact settings.
#[must_use]
#[derive(Clone, Debug, Default, bon::Builder)]
pub struct DryContactSettingsPatch {
    #[builder(into)]
    pub grid_action: Option<String>,

    #[builder(into)]
    pub micro_grid_action: Option<String>,

    #[builder(into)]
    pub generator_action: Option<String>,

    #[builder(into)]
    pub load_name: Option<String>,

    #[builder(into)]
    pub mode: Option<String>,

    pub soc_low: Option<f64>,
    pub soc_high: Option<f64>,
}

impl DryContactSettings {
    /// Apply the patch over the last known settings.
    #[must_use]
    pub fn merged(&self, patch: DryContactSettingsPatch) -> Self {
        Self {
            id: self.id.clone(),
            kind: self.kind.clone(),
            grid_action: patch.grid_action.unwrap_or_else(|| self.grid_action.clone()),
            micro_grid_action: patch
                .micro_grid_action
                .unwrap_or_else(|| self.micro_grid_action.clone()),
            generator_action: patch
                .generator_action
                .unwrap_or_else(|| self.generator_action.clone()),
            load_name: patch.load_name.unwrap_or_else(|| self.load_name.clone()),
            mode: patch.mode.unwrap_or_else(|| self.mode.clone()),
            soc_low: patch.soc_low.unwrap_or(self.soc_low),
            soc_high: patch.soc_high.unwrap_or(self.soc_high),
            extra: self.extra.clone(),
        }
    }
}
