use serde::{Deserialize, Serialize};

use crate::quantity::{WattHours, Watts};

/// Production or consumption totals, the common denominator of all the production endpoints.
#[must_use]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnergyTotals {
    pub watts_now: Watts,
    pub watt_hours_today: WattHours,
    pub watt_hours_last_seven_days: WattHours,
    pub watt_hours_lifetime: WattHours,
}

impl EnergyTotals {
    /// Early firmware reports all zeros right after the start-up instead of «not ready».
    #[must_use]
    pub fn is_all_zero(&self) -> bool {
        self.watts_now == Watts::zero()
            && self.watt_hours_today.is_zero()
            && self.watt_hours_last_seven_days.is_zero()
            && self.watt_hours_lifetime.is_zero()
    }
}

/// `/production.json` with or without the details.
#[derive(Deserialize)]
pub struct ProductionJson {
    #[serde(rename = "production", default)]
    pub production: Vec<ProductionEntry>,

    #[serde(rename = "consumption", default)]
    pub consumption: Vec<ProductionEntry>,

    #[serde(rename = "storage", default)]
    pub storage: Vec<StorageEntry>,
}

impl ProductionJson {
    /// CT production entry, active or not.
    pub fn eim_production(&self) -> Option<&ProductionEntry> {
        self.production.iter().find(|entry| entry.is_eim_production())
    }

    /// Active CT production entry.
    pub fn metered_production(&self) -> Option<&ProductionEntry> {
        self.eim_production().filter(|entry| entry.active_count != 0)
    }

    /// Micro-inverter based production estimate.
    pub fn inverters_production(&self) -> Option<&ProductionEntry> {
        self.production.iter().find(|entry| entry.kind == ProductionEntry::INVERTERS)
    }

    pub fn consumption(&self, measurement_type: &str) -> Option<&ProductionEntry> {
        self.consumption.iter().find(|entry| {
            entry.kind == ProductionEntry::EIM
                && entry.measurement_type.as_deref() == Some(measurement_type)
        })
    }

    /// Number of AC batteries reported in the storage section.
    #[must_use]
    pub fn acb_count(&self) -> u32 {
        self.acb_storage().map_or(0, |entry| entry.active_count)
    }

    pub fn acb_storage(&self) -> Option<&StorageEntry> {
        self.storage.iter().find(|entry| entry.kind == StorageEntry::ACB)
    }
}

#[derive(Clone, Deserialize)]
pub struct ProductionEntry {
    /// `inverters`, `eim`, `rgms` or `pmu`.
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(rename = "activeCount", default)]
    pub active_count: u32,

    #[serde(rename = "measurementType")]
    pub measurement_type: Option<String>,

    #[serde(rename = "wNow", default)]
    pub watts_now: Watts,

    #[serde(rename = "whToday", default)]
    pub watt_hours_today: WattHours,

    #[serde(rename = "whLastSevenDays", default)]
    pub watt_hours_last_seven_days: WattHours,

    #[serde(rename = "whLifetime", default)]
    pub watt_hours_lifetime: WattHours,

    /// Per-phase figures on multi-phase installations.
    #[serde(rename = "lines", default)]
    pub lines: Vec<ProductionLine>,
}

impl ProductionEntry {
    pub const EIM: &'static str = "eim";
    pub const INVERTERS: &'static str = "inverters";

    #[must_use]
    pub fn is_eim_production(&self) -> bool {
        self.kind == Self::EIM
            && self.measurement_type.as_deref().is_none_or(|kind| kind == "production")
    }

    pub const fn totals(&self) -> EnergyTotals {
        EnergyTotals {
            watts_now: self.watts_now,
            watt_hours_today: self.watt_hours_today,
            watt_hours_last_seven_days: self.watt_hours_last_seven_days,
            watt_hours_lifetime: self.watt_hours_lifetime,
        }
    }

    /// Per-phase totals, only when all the configured phases are present.
    #[must_use]
    pub fn phases(&self, phase_count: usize) -> Option<Vec<EnergyTotals>> {
        (phase_count > 1 && self.lines.len() >= phase_count)
            .then(|| self.lines[..phase_count].iter().map(ProductionLine::totals).collect())
    }
}

#[derive(Clone, Deserialize)]
pub struct ProductionLine {
    #[serde(rename = "wNow", default)]
    pub watts_now: Watts,

    #[serde(rename = "whToday", default)]
    pub watt_hours_today: WattHours,

    #[serde(rename = "whLastSevenDays", default)]
    pub watt_hours_last_seven_days: WattHours,

    #[serde(rename = "whLifetime", default)]
    pub watt_hours_lifetime: WattHours,
}

impl ProductionLine {
    const fn totals(&self) -> EnergyTotals {
        EnergyTotals {
            watts_now: self.watts_now,
            watt_hours_today: self.watt_hours_today,
            watt_hours_last_seven_days: self.watt_hours_last_seven_days,
            watt_hours_lifetime: self.watt_hours_lifetime,
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct StorageEntry {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(rename = "activeCount", default)]
    pub active_count: u32,

    #[serde(rename = "wNow", default)]
    pub watts_now: Watts,

    #[serde(rename = "whNow", default)]
    pub watt_hours_now: WattHours,

    #[serde(rename = "state", default)]
    pub state: String,
}

impl StorageEntry {
    pub const ACB: &'static str = "acb";
}

/// AC battery storage, as reported by `/production.json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AcbStorage {
    pub active_count: u32,
    pub watts_now: Watts,
    pub watt_hours_now: WattHours,
    pub state: String,
}

impl From<&StorageEntry> for AcbStorage {
    fn from(entry: &StorageEntry) -> Self {
        Self {
            active_count: entry.active_count,
            watts_now: entry.watts_now,
            watt_hours_now: entry.watt_hours_now,
            state: entry.state.clone(),
        }
    }
}

/// `/api/v1/production`.
#[derive(Deserialize)]
pub struct ApiV1Production {
    #[serde(rename = "wattsNow")]
    pub watts_now: Watts,

    #[serde(rename = "wattHoursToday")]
    pub watt_hours_today: WattHours,

    #[serde(rename = "wattHoursSevenDays")]
    pub watt_hours_seven_days: WattHours,

    #[serde(rename = "wattHoursLifetime")]
    pub watt_hours_lifetime: WattHours,
}

impl From<ApiV1Production> for EnergyTotals {
    fn from(production: ApiV1Production) -> Self {
        Self {
            watts_now: production.watts_now,
            watt_hours_today: production.watt_hours_today,
            watt_hours_last_seven_days: production.watt_hours_seven_days,
            watt_hours_lifetime: production.watt_hours_lifetime,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_json_ok() -> Result<(), serde_json::Error> {
        // language=json
        let body = r#"{
            "production": [
                {"type": "inverters", "activeCount": 24, "readingTime": 1672575917, "wNow": 4108, "whLifetime": 1508976},
                {
                    "type": "eim",
                    "activeCount": 1,
                    "measurementType": "production",
                    "readingTime": 1672575917,
                    "wNow": 4154.456,
                    "whLifetime": 1523712.3,
                    "varhLeadLifetime": 0.0,
                    "whToday": 22540.0,
                    "whLastSevenDays": 160115.0,
                    "rmsCurrent": 35.023,
                    "lines": [
                        {"wNow": 2077.2, "whLifetime": 761856.1, "whToday": 11270.0, "whLastSevenDays": 80057.5},
                        {"wNow": 2077.2, "whLifetime": 761856.2, "whToday": 11270.0, "whLastSevenDays": 80057.5}
                    ]
                }
            ],
            "consumption": [
                {"type": "eim", "activeCount": 1, "measurementType": "total-consumption", "wNow": 1000.5, "whLifetime": 100.0},
                {"type": "eim", "activeCount": 1, "measurementType": "net-consumption", "wNow": -3153.9, "whLifetime": 50.0}
            ],
            "storage": [{"type": "acb", "activeCount": 2, "readingTime": 0, "wNow": 0, "whNow": 840, "state": "idle"}]
        }"#;
        let production = serde_json::from_str::<ProductionJson>(body)?;

        let metered = production.metered_production().unwrap();
        assert_eq!(metered.watts_now, Watts(4154.456));
        assert_eq!(metered.totals().watt_hours_today, WattHours(22540.0));
        assert_eq!(metered.phases(2).unwrap()[1].watt_hours_lifetime, WattHours(761_856.2));
        assert!(metered.phases(3).is_none());
        assert!(metered.phases(1).is_none());

        assert_eq!(production.inverters_production().unwrap().active_count, 24);
        assert_eq!(production.consumption("net-consumption").unwrap().watts_now, Watts(-3153.9));
        assert_eq!(production.acb_count(), 2);
        Ok(())
    }

    #[test]
    fn inactive_eim_is_not_metered() -> Result<(), serde_json::Error> {
        // language=json
        let body = r#"{"production": [{"type": "eim", "activeCount": 0, "measurementType": "production", "wNow": 0}]}"#;
        let production = serde_json::from_str::<ProductionJson>(body)?;
        assert!(production.metered_production().is_none());
        assert!(production.eim_production().is_some());
        Ok(())
    }

    #[test]
    fn api_v1_production_ok() -> Result<(), serde_json::Error> {
        // language=json
        let body = r#"{"wattHoursToday": 1460, "wattHoursSevenDays": 18427, "wattHoursLifetime": 1232873, "wattsNow": 0}"#;
        let totals = EnergyTotals::from(serde_json::from_str::<ApiV1Production>(body)?);
        assert_eq!(totals.watt_hours_last_seven_days, WattHours(18427.0));
        assert!(!totals.is_all_zero());
        assert!(EnergyTotals::default().is_all_zero());
        Ok(())
    }
}
