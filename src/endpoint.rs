//! Gateway HTTP resources.

pub const PRODUCTION_JSON_DETAILS: &str = "/production.json?details=1";
pub const PRODUCTION_JSON: &str = "/production.json";
pub const API_V1_PRODUCTION: &str = "/api/v1/production";
pub const API_V1_PRODUCTION_INVERTERS: &str = "/api/v1/production/inverters";
pub const DEVICE_DATA: &str = "/ivp/pdm/device_data";
pub const METERS: &str = "/ivp/meters";
pub const METERS_READINGS: &str = "/ivp/meters/readings";
pub const ENSEMBLE_INVENTORY: &str = "/ivp/ensemble/inventory";
pub const ENSEMBLE_SECONDARY_CONTROL: &str = "/ivp/ensemble/secctrl";
pub const ENSEMBLE_POWER: &str = "/ivp/ensemble/power";
pub const ENSEMBLE_RELAY: &str = "/ivp/ensemble/relay";
pub const DRY_CONTACTS: &str = "/ivp/ensemble/dry_contacts";
pub const DRY_CONTACT_SETTINGS: &str = "/ivp/ss/dry_contact_settings";
pub const TARIFF: &str = "/admin/lib/tariff";
pub const GENERATOR_CONFIG: &str = "/ivp/ss/gen_config";
