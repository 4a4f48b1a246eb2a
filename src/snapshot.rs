use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::models::{
    ensemble::{Battery, BatteryAggregate, DryContactSettings, Enpower, RelayState},
    generator::GeneratorConfig,
    inverter::Inverter,
    meter::{CtReading, MeterConfig, MeterRole},
    production::{AcbStorage, EnergyTotals},
    tariff::Tariff,
};

/// Everything aggregated in one cycle.
///
/// Built from scratch on every cycle, and only patched afterwards by the commands.
/// Ordered maps make two snapshots of the same gateway state serialize identically.
#[must_use]
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub production: Option<EnergyTotals>,
    pub production_phases: Option<Vec<EnergyTotals>>,

    pub total_consumption: Option<EnergyTotals>,
    pub total_consumption_phases: Option<Vec<EnergyTotals>>,

    pub net_consumption: Option<EnergyTotals>,
    pub net_consumption_phases: Option<Vec<EnergyTotals>>,

    pub acb_storage: Option<AcbStorage>,

    pub inverters: BTreeMap<String, Inverter>,

    pub ct_meters: Vec<MeterConfig>,
    pub ct_readings: BTreeMap<MeterRole, CtReading>,

    pub batteries: BTreeMap<String, Battery>,
    pub battery_aggregate: Option<BatteryAggregate>,

    pub enpower: Option<Enpower>,

    pub dry_contact_status: BTreeMap<String, RelayState>,
    pub dry_contact_settings: BTreeMap<String, DryContactSettings>,

    pub tariff: Option<Tariff>,

    pub generator: Option<GeneratorConfig>,

    /// Decoded payload of every resource fetched in the cycle, keyed by the path.
    pub raw: BTreeMap<String, Value>,
}
