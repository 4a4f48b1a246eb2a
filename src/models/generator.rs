use serde::{Deserialize, Serialize};

/// `/ivp/ss/gen_config`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(rename = "admin_state", default)]
    pub admin_state: String,

    #[serde(rename = "oper_state", default)]
    pub operational_state: String,

    #[serde(rename = "admin_mode", default)]
    pub admin_mode: String,

    #[serde(rename = "schedule", default)]
    pub schedule: u32,

    #[serde(rename = "start_soc", default)]
    pub start_soc: u8,

    #[serde(rename = "stop_soc", default)]
    pub stop_soc: u8,

    #[serde(rename = "exc_on", default)]
    pub exercise_on: u32,

    #[serde(rename = "present", default)]
    pub is_present: bool,

    #[serde(rename = "type", default)]
    pub kind: String,
}
