use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `/admin/lib/tariff`.
#[derive(Deserialize)]
pub struct TariffResponse {
    #[serde(rename = "tariff")]
    pub tariff: Tariff,
}

/// Tariff with the storage settings.
///
/// Sent back as a whole on every change, hence the unmodelled fields are preserved.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tariff {
    #[serde(rename = "storage_settings", default, skip_serializing_if = "Option::is_none")]
    pub storage_settings: Option<StorageSettings>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum StorageMode {
    /// Full backup: the batteries are kept charged for an outage.
    Backup,

    SelfConsumption,

    /// Time-of-use savings.
    Economy,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(rename = "mode")]
    pub mode: StorageMode,

    #[serde(rename = "reserved_soc")]
    pub reserved_soc: f64,

    #[serde(rename = "very_low_soc", default)]
    pub very_low_soc: f64,

    #[serde(rename = "charge_from_grid", default)]
    pub charge_from_grid: bool,

    #[serde(rename = "date", default)]
    pub date: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Caller-supplied partial storage settings.
#[must_use]
#[derive(Copy, Clone, Debug, Default)]
pub struct StorageSettingsPatch {
    pub mode: Option<StorageMode>,
    pub reserved_soc: Option<f64>,
    pub charge_from_grid: Option<bool>,
}

impl StorageSettings {
    #[must_use]
    pub fn merged(&self, patch: StorageSettingsPatch) -> Self {
        Self {
            mode: patch.mode.unwrap_or(self.mode),
            reserved_soc: patch.reserved_soc.unwrap_or(self.reserved_soc),
            charge_from_grid: patch.charge_from_grid.unwrap_or(self.charge_from_grid),
            ..self.clone()
        }
    }
}

impl Tariff {
    /// Whole tariff with the patched storage settings, or `None` if there are no storage settings.
    #[must_use]
    pub fn merged(&self, patch: StorageSettingsPatch) -> Option<Self> {
        let storage_settings = self.storage_settings.as_ref()?.merged(patch);
        Some(Self { storage_settings: Some(storage_settings), extra: self.extra.clone() })
    }
}
