use std::time::Duration;

use clap::{Parser, Subcommand};
use envoy_gateway::{
    Firmware,
    Gateway,
    GatewayConfig,
    GatewayInfo,
    UnknownMeterRoles,
    models::tariff::StorageMode,
    transport::{Auth, BearerToken, DigestCredentials, NoAuth},
};
use reqwest::Url;

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
pub struct Args {
    #[clap(flatten)]
    pub gateway: GatewayArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Discover the capabilities and list the selected updaters.
    #[clap(name = "probe")]
    Probe,

    /// Run one aggregation cycle and dump the snapshot as JSON.
    #[clap(name = "snapshot")]
    Snapshot,

    /// Aggregate periodically and print the summary tables.
    #[clap(name = "poll")]
    Poll(PollArgs),

    /// Close the main relay.
    #[clap(name = "on-grid")]
    GoOnGrid,

    /// Open the main relay.
    #[clap(name = "off-grid")]
    GoOffGrid,

    /// Change the battery storage mode.
    #[clap(name = "storage-mode")]
    StorageMode {
        #[clap(value_enum)]
        mode: StorageMode,
    },

    /// Change the battery reserve, in percent.
    #[clap(name = "reserve")]
    Reserve { soc: f64 },
}

#[derive(Parser)]
pub struct GatewayArgs {
    #[clap(long = "url", env = "ENVOY_URL", default_value = "https://envoy.local")]
    pub url: Url,

    /// Cloud-issued JWT, required by firmware 7 and newer.
    #[clap(long = "token", env = "ENVOY_TOKEN")]
    pub token: Option<String>,

    /// Installer username of the legacy firmware, used when there is no token.
    #[clap(long = "username", env = "ENVOY_USERNAME", requires = "password")]
    pub username: Option<String>,

    #[clap(long = "password", env = "ENVOY_PASSWORD")]
    pub password: Option<String>,

    #[clap(long = "serial-number", env = "ENVOY_SERIAL_NUMBER")]
    pub serial_number: String,

    /// Firmware version as shown in the info resource, for example `D7.6.175`.
    #[clap(long = "firmware", env = "ENVOY_FIRMWARE")]
    pub firmware: Firmware,

    /// The gateway has the integrated CT meter board.
    #[clap(long = "metered", env = "ENVOY_METERED")]
    pub is_metered: bool,

    #[clap(
        long = "unknown-meter-roles",
        env = "ENVOY_UNKNOWN_METER_ROLES",
        value_enum,
        default_value = "best-effort"
    )]
    pub unknown_meter_roles: UnknownMeterRoles,
}

impl GatewayArgs {
    pub fn connect(&self) -> envoy_gateway::prelude::Result<Gateway> {
        let info = GatewayInfo::builder()
            .serial_number(&self.serial_number)
            .firmware(self.firmware)
            .is_metered(self.is_metered)
            .build();
        let config = GatewayConfig::builder()
            .base_url(self.url.clone())
            .unknown_meter_roles(self.unknown_meter_roles)
            .build();
        let auth: Box<dyn Auth> = match (&self.token, &self.username, &self.password) {
            (Some(token), _, _) => Box::new(BearerToken::new(token)),
            (None, Some(username), Some(password)) => Box::new(DigestCredentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => Box::new(NoAuth),
        };
        Gateway::connect(info, &config, auth)
    }
}

#[derive(Parser)]
pub struct PollArgs {
    #[clap(long = "interval-seconds", default_value = "60", env = "POLL_INTERVAL_SECONDS")]
    pub interval_seconds: u64,

    /// Stop after this many cycles.
    #[clap(long = "n-cycles")]
    pub n_cycles: Option<usize>,
}

impl PollArgs {
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}
