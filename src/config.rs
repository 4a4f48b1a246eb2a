use std::time::Duration;

use bon::Builder;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::{retry::RetryPolicy, transport::ReqwestTransport};

/// How the CT meters with a role unknown to this crate are treated.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum UnknownMeterRoles {
    /// Listed among the meters, but left out of the readings and the phase detection.
    #[default]
    BestEffort,

    /// Treated like any known role: read and taken into account for the phase detection.
    FirstClass,
}

#[must_use]
#[derive(Clone, Debug, Builder)]
pub struct GatewayConfig {
    /// For example, `https://envoy.local`.
    pub base_url: Url,

    #[builder(default = ReqwestTransport::DEFAULT_CONNECT_TIMEOUT)]
    pub connect_timeout: Duration,

    #[builder(default = ReqwestTransport::DEFAULT_READ_TIMEOUT)]
    pub read_timeout: Duration,

    #[builder(default = RetryPolicy::probe())]
    pub probe_retry: RetryPolicy,

    #[builder(default = RetryPolicy::live())]
    pub live_retry: RetryPolicy,

    #[builder(default)]
    pub unknown_meter_roles: UnknownMeterRoles,
}
