//! Production sources, in the order of preference.

use async_trait::async_trait;

use crate::{
    capability::{Capabilities, Capability},
    context::SharedContext,
    endpoint,
    models::production::{AcbStorage, ApiV1Production, EnergyTotals, ProductionJson},
    prelude::*,
    session::Session,
    snapshot::Snapshot,
    updater::{AuthPolicy, Probe, Updater},
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Source {
    /// Production CT.
    Metered,

    /// Sum of the micro-inverter reports.
    Inverters,
}

/// `production.json` variants.
pub struct ProductionJsonUpdater {
    name: &'static str,
    endpoint: &'static str,

    /// Accept the micro-inverter estimate when there is no active production CT.
    allow_inverters_fallback: bool,

    source: Source,
    capabilities: Capabilities,
}

impl ProductionJsonUpdater {
    pub const DETAILS_NAME: &'static str = "production_json";
    pub const PLAIN_NAME: &'static str = "production";
    pub const FALLBACK_NAME: &'static str = "production_json_fallback";

    fn new(name: &'static str, endpoint: &'static str, allow_inverters_fallback: bool) -> Self {
        Self {
            name,
            endpoint,
            allow_inverters_fallback,
            source: Source::Metered,
            capabilities: Capabilities::empty(),
        }
    }

    /// Metered-only source with the details.
    #[must_use]
    pub fn details() -> Self {
        Self::new(Self::DETAILS_NAME, endpoint::PRODUCTION_JSON_DETAILS, false)
    }

    /// Metered-only source without the details, for the firmware which does not know the flag.
    #[must_use]
    pub fn plain() -> Self {
        Self::new(Self::PLAIN_NAME, endpoint::PRODUCTION_JSON, false)
    }

    /// Legacy fallback which also accepts the micro-inverter estimate.
    #[must_use]
    pub fn fallback() -> Self {
        Self::new(Self::FALLBACK_NAME, endpoint::PRODUCTION_JSON_DETAILS, true)
    }
}

#[async_trait]
impl Updater for ProductionJsonUpdater {
    fn name(&self) -> &'static str {
        self.name
    }

    fn should_run_probe(&self, discovered: Capabilities) -> bool {
        !discovered.contains(Capability::Production)
    }

    #[instrument(skip_all, name = "production_json", fields(updater = self.name))]
    async fn probe(
        &mut self,
        session: &mut Session,
        shared: &mut SharedContext,
        _discovered: Capabilities,
    ) -> Result<Probe> {
        if self.allow_inverters_fallback
            && let Some(candidate) = shared.production_candidates.first().copied()
        {
            // Already known to respond, and cached.
            self.endpoint = candidate;
        }
        let response = match session.probe::<ProductionJson>(self.endpoint).await {
            Ok(response) => response,
            Err(error) => return AuthPolicy::Required.absent(self.endpoint, error),
        };

        let mut capabilities = Capabilities::only(Capability::Production);
        if let Some(entry) = response.metered_production() {
            if shared.firmware.is_early() && entry.totals().is_all_zero() {
                debug!(endpoint = self.endpoint, "all zeros on early firmware");
                return Ok(Probe::NotApplicable);
            }
            self.source = Source::Metered;
            capabilities |= Capability::Metering;
            for (measurement_type, capability) in [
                ("total-consumption", Capability::TotalConsumption),
                ("net-consumption", Capability::NetConsumption),
            ] {
                if response.consumption(measurement_type).is_some_and(|entry| entry.active_count != 0) {
                    capabilities |= capability;
                }
            }
        } else if self.allow_inverters_fallback
            && let Some(entry) = response.inverters_production()
        {
            if shared.firmware.is_early() && entry.totals().is_all_zero() {
                debug!(endpoint = self.endpoint, "all zeros on early firmware");
                return Ok(Probe::NotApplicable);
            }
            self.source = Source::Inverters;
        } else {
            debug!(endpoint = self.endpoint, "no active production meter");
            if !shared.is_production_candidate(self.endpoint) {
                shared.production_candidates.push(self.endpoint);
            }
            return Ok(Probe::NotApplicable);
        }

        shared.acb_batteries_reported = response.acb_count();
        self.capabilities = capabilities;
        info!(endpoint = self.endpoint, source = ?self.source, ?capabilities, "gotcha");
        Ok(Probe::Applicable(capabilities))
    }

    #[instrument(skip_all, name = "production_json", fields(updater = self.name))]
    async fn update(
        &mut self,
        session: &mut Session,
        shared: &SharedContext,
        snapshot: &mut Snapshot,
    ) -> Result {
        let response: ProductionJson = session.live(self.endpoint, snapshot).await?;
        let entry = match self.source {
            Source::Metered => response.eim_production(),
            Source::Inverters => response.inverters_production(),
        }
        .ok_or_else(|| {
            Error::PoorDataQuality(format!("`{}` has no production entry", self.endpoint))
        })?;
        snapshot.production = Some(entry.totals());
        snapshot.production_phases = entry.phases(shared.metered_phase_count());

        if self.capabilities.contains(Capability::TotalConsumption)
            && let Some(entry) = response.consumption("total-consumption")
        {
            snapshot.total_consumption = Some(entry.totals());
            snapshot.total_consumption_phases = entry.phases(shared.metered_phase_count());
        }
        if self.capabilities.contains(Capability::NetConsumption)
            && let Some(entry) = response.consumption("net-consumption")
        {
            snapshot.net_consumption = Some(entry.totals());
            snapshot.net_consumption_phases = entry.phases(shared.metered_phase_count());
        }
        snapshot.acb_storage = response.acb_storage().map(AcbStorage::from);
        Ok(())
    }
}

/// `/api/v1/production` variants.
pub struct ApiV1ProductionUpdater {
    name: &'static str,

    /// Last resort: accept the all-zero payload as is.
    tolerate_zero: bool,
}

impl ApiV1ProductionUpdater {
    pub const NAME: &'static str = "api_v1_production";
    pub const TOLERANT_NAME: &'static str = "api_v1_production_tolerant";

    #[must_use]
    pub const fn strict() -> Self {
        Self { name: Self::NAME, tolerate_zero: false }
    }

    #[must_use]
    pub const fn tolerant() -> Self {
        Self { name: Self::TOLERANT_NAME, tolerate_zero: true }
    }
}

#[async_trait]
impl Updater for ApiV1ProductionUpdater {
    fn name(&self) -> &'static str {
        self.name
    }

    fn should_run_probe(&self, discovered: Capabilities) -> bool {
        !discovered.contains(Capability::Production)
    }

    #[instrument(skip_all, name = "api_v1_production", fields(updater = self.name))]
    async fn probe(
        &mut self,
        session: &mut Session,
        _shared: &mut SharedContext,
        _discovered: Capabilities,
    ) -> Result<Probe> {
        let production = match session.probe::<ApiV1Production>(endpoint::API_V1_PRODUCTION).await
        {
            Ok(production) => production,
            Err(error) => return AuthPolicy::Required.absent(endpoint::API_V1_PRODUCTION, error),
        };
        if !self.tolerate_zero && EnergyTotals::from(production).is_all_zero() {
            debug!("all zeros");
            return Ok(Probe::NotApplicable);
        }
        info!("gotcha");
        Ok(Probe::Applicable(Capabilities::only(Capability::Production)))
    }

    #[instrument(skip_all, name = "api_v1_production", fields(updater = self.name))]
    async fn update(
        &mut self,
        session: &mut Session,
        _shared: &SharedContext,
        snapshot: &mut Snapshot,
    ) -> Result {
        let production: ApiV1Production = session.live(endpoint::API_V1_PRODUCTION, snapshot).await?;
        snapshot.production = Some(production.into());
        Ok(())
    }
}
