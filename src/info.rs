use std::{fmt::Display, str::FromStr};

use bon::Builder;
use serde::{Deserialize, Serialize};

/// Gateway identity, as reported by the info resource.
///
/// Fetching and parsing the info document happens outside of this crate,
/// the client only consults the result.
#[must_use]
#[derive(Clone, Debug, Builder, Serialize, Deserialize, PartialEq, Eq)]
pub struct GatewayInfo {
    #[builder(into)]
    pub serial_number: String,

    pub firmware: Firmware,

    /// Whether this is a metered model (has the integrated CT meter board).
    #[builder(default)]
    pub is_metered: bool,
}

/// Firmware version, compared component-wise.
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Firmware {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Firmware {
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    /// Firmware older than 4.0 reports all zeros right after the start-up instead of «not ready».
    #[must_use]
    pub const fn is_early(self) -> bool {
        self.major < 4
    }
}

impl Display for Firmware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Lenient parser for the `D7.6.175` / `R3.9.36` style strings.
///
/// Only the leading numeric components are taken into account.
impl FromStr for Firmware {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut components = s
            .trim_start_matches(|c: char| !c.is_ascii_digit())
            .split(['.', '_', '-'])
            .map_while(|component| {
                let digits = component.split(|c: char| !c.is_ascii_digit()).next()?;
                (!digits.is_empty()).then_some(digits)
            });
        let major = components.next().unwrap_or_default().parse()?;
        let minor = components.next().map_or(Ok(0), str::parse)?;
        let patch = components.next().map_or(Ok(0), str::parse)?;
        Ok(Self { major, minor, patch })
    }
}
