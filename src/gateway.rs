use std::sync::Arc;

use crate::{
    aggregation::aggregate,
    capability::{Capabilities, Capability},
    config::GatewayConfig,
    context::SharedContext,
    discovery::{DiscoveryState, discover},
    info::GatewayInfo,
    prelude::*,
    registry::Registry,
    session::Session,
    snapshot::Snapshot,
    transport::{Auth, ReqwestTransport, Transport},
    updater::Updater,
};

/// Client of one gateway.
///
/// Discovery, aggregation and the commands all take `&mut self`,
/// so one instance serves one refresh loop at a time.
pub struct Gateway {
    pub(crate) info: GatewayInfo,
    pub(crate) session: Session,
    pub(crate) registry: Registry,
    pub(crate) shared: SharedContext,
    pub(crate) state: DiscoveryState,
    pub(crate) capabilities: Capabilities,
    pub(crate) updaters: Vec<Box<dyn Updater>>,
    pub(crate) snapshot: Option<Arc<Snapshot>>,
}

impl Gateway {
    pub fn new(info: GatewayInfo, transport: Box<dyn Transport>, config: &GatewayConfig) -> Self {
        let session = Session::new(transport, config.probe_retry, config.live_retry);
        let shared = SharedContext::new(&info);
        Self {
            info,
            session,
            registry: Registry::builtin(config.unknown_meter_roles),
            shared,
            state: DiscoveryState::Uninitialized,
            capabilities: Capabilities::empty(),
            updaters: Vec::new(),
            snapshot: None,
        }
    }

    /// Connect over HTTP with the default transport.
    pub fn connect(info: GatewayInfo, config: &GatewayConfig, auth: Box<dyn Auth>) -> Result<Self> {
        let transport = ReqwestTransport::new(
            config.base_url.clone(),
            auth,
            config.connect_timeout,
            config.read_timeout,
        )?;
        Ok(Self::new(info, Box::new(transport), config))
    }

    pub const fn info(&self) -> &GatewayInfo {
        &self.info
    }

    /// Capabilities of the last successful discovery.
    pub const fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    #[must_use]
    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(capability)
    }

    pub const fn state(&self) -> DiscoveryState {
        self.state
    }

    /// Names of the updaters selected by the last discovery, in order.
    pub fn active_updaters(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.updaters.iter().map(|updater| updater.name())
    }

    /// Changes are picked up by the next discovery.
    pub const fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Snapshot of the last successful cycle, with the command patches applied.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.clone()
    }

    /// Run the discovery, fully replacing the outcome of the previous one.
    #[instrument(skip_all, fields(serial_number = %self.info.serial_number))]
    pub async fn probe(&mut self) -> Result<Capabilities> {
        self.state = DiscoveryState::Probing;
        match discover(&mut self.session, &mut self.shared, &self.info, &self.registry).await {
            Ok(discovery) => {
                self.capabilities = discovery.capabilities;
                self.updaters = discovery.updaters;
                self.state = DiscoveryState::Ready;
                Ok(self.capabilities)
            }
            Err(error) => {
                warn!(error = %error, "discovery failed");
                self.capabilities = Capabilities::empty();
                self.updaters.clear();
                self.state = DiscoveryState::Failed;
                Err(error)
            }
        }
    }

    /// Run one aggregation cycle, probing first if needed.
    ///
    /// On error, the previous snapshot is kept.
    #[instrument(skip_all, fields(serial_number = %self.info.serial_number))]
    pub async fn update(&mut self) -> Result<Arc<Snapshot>> {
        match self.state {
            DiscoveryState::Uninitialized | DiscoveryState::Probing => {
                self.probe().await?;
            }
            DiscoveryState::Failed => {
                return Err(Error::ProbeFailed("the last discovery has failed".to_owned()));
            }
            DiscoveryState::Ready => {}
        }
        let snapshot =
            Arc::new(aggregate(&mut self.session, &self.shared, &mut self.updaters).await?);
        self.snapshot = Some(snapshot.clone());
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use http::StatusCode;
    use serde_json::{Value, json};

    use super::*;
    use crate::{
        endpoint,
        info::Firmware,
        quantity::Watts,
        retry::RetryPolicy,
        testing::{MockTransport, gateway_info},
        updater::{Probe, production::ProductionJsonUpdater},
    };

    /// Custom updater reading the same endpoint as the built-in production updater.
    struct RawProduction;

    #[async_trait]
    impl Updater for RawProduction {
        fn name(&self) -> &'static str {
            "raw_production"
        }

        async fn probe(
            &mut self,
            _session: &mut Session,
            _shared: &mut SharedContext,
            _discovered: Capabilities,
        ) -> Result<Probe> {
            Ok(Probe::Applicable(Capabilities::only(Capability::Production)))
        }

        async fn update(
            &mut self,
            session: &mut Session,
            _shared: &SharedContext,
            snapshot: &mut Snapshot,
        ) -> Result {
            let _: Value = session.live(endpoint::PRODUCTION_JSON_DETAILS, snapshot).await?;
            Ok(())
        }
    }

    fn new_gateway(firmware: Firmware, is_metered: bool, transport: &MockTransport) -> Gateway {
        let config = GatewayConfig::builder()
            .base_url(reqwest::Url::parse("https://envoy.local").unwrap())
            .probe_retry(RetryPolicy::immediate(2))
            .live_retry(RetryPolicy::immediate(3))
            .build();
        Gateway::new(gateway_info(firmware, is_metered), Box::new(transport.clone()), &config)
    }

    fn production_json(active_count: u32, watts_now: f64) -> Value {
        // language=json
        json!({
            "production": [
                {"type": "inverters", "activeCount": 24, "readingTime": 1672575917, "wNow": 4000, "whLifetime": 1508976},
                {"type": "eim", "activeCount": active_count, "measurementType": "production", "wNow": watts_now, "whLifetime": 1523712, "whToday": 22540, "whLastSevenDays": 160115}
            ],
            "consumption": [],
            "storage": [{"type": "acb", "activeCount": 0, "wNow": 0, "whNow": 0, "state": "idle"}]
        })
    }

    fn meters() -> Value {
        // language=json
        json!([
            {"eid": 704643328, "state": "enabled", "measurementType": "production", "phaseMode": "split", "phaseCount": 2, "meteringStatus": "normal", "statusFlags": []},
            {"eid": 704643584, "state": "enabled", "measurementType": "backfeed", "phaseMode": "split", "phaseCount": 2, "meteringStatus": "normal", "statusFlags": []}
        ])
    }

    #[tokio::test]
    async fn json_status_selected_when_api_v1_is_missing() -> Result {
        let transport = MockTransport::default()
            .with_status(endpoint::API_V1_PRODUCTION, StatusCode::NOT_FOUND)
            .with_json(endpoint::PRODUCTION_JSON_DETAILS, production_json(1, 4154.5));
        let mut gateway = new_gateway(Firmware::new(7, 6, 175), false, &transport);

        let capabilities = gateway.probe().await?;

        assert_eq!(gateway.state(), DiscoveryState::Ready);
        assert!(capabilities.is_superset(Capability::Production | Capability::Metering));
        assert_eq!(
            gateway.active_updaters().next(),
            Some(ProductionJsonUpdater::DETAILS_NAME),
        );
        let snapshot = gateway.update().await?;
        assert_eq!(snapshot.production.unwrap().watts_now, Watts(4154.5));
        Ok(())
    }

    #[tokio::test]
    async fn inactive_meter_without_fallback_fails() {
        let transport = MockTransport::default()
            .with_json(endpoint::PRODUCTION_JSON_DETAILS, production_json(0, 0.0))
            .with_json(endpoint::PRODUCTION_JSON, production_json(0, 0.0));
        let mut gateway = new_gateway(Firmware::new(7, 6, 175), false, &transport);
        assert!(gateway.registry_mut().unregister_named(ProductionJsonUpdater::FALLBACK_NAME));

        let result = gateway.probe().await;

        assert!(matches!(result, Err(Error::ProbeFailed(_))));
        assert_eq!(gateway.state(), DiscoveryState::Failed);
        assert!(gateway.capabilities().is_empty());

        transport.reset_calls();
        assert!(matches!(gateway.update().await, Err(Error::ProbeFailed(_))));
        assert_eq!(transport.total_calls(), 0, "aggregation must not proceed");
    }

    #[tokio::test]
    async fn inactive_meter_falls_back_to_inverters() -> Result {
        let transport = MockTransport::default()
            .with_json(endpoint::PRODUCTION_JSON_DETAILS, production_json(0, 0.0));
        let mut gateway = new_gateway(Firmware::new(7, 6, 175), false, &transport);

        let capabilities = gateway.probe().await?;

        assert!(capabilities.contains(Capability::Production));
        assert!(!capabilities.contains(Capability::Metering));
        assert_eq!(gateway.active_updaters().next(), Some(ProductionJsonUpdater::FALLBACK_NAME));
        let snapshot = gateway.update().await?;
        assert_eq!(snapshot.production.unwrap().watts_now, Watts(4000.0));
        Ok(())
    }

    #[tokio::test]
    async fn discovery_is_idempotent() -> Result {
        let transport = MockTransport::default()
            .with_json(endpoint::PRODUCTION_JSON_DETAILS, production_json(1, 4154.5))
            .with_json(endpoint::METERS, meters());
        let mut gateway = new_gateway(Firmware::new(7, 6, 175), true, &transport);

        let first = gateway.probe().await?;
        let first_updaters = gateway.active_updaters().collect::<Vec<_>>();
        let second = gateway.probe().await?;

        assert_eq!(first, second);
        assert_eq!(first_updaters, gateway.active_updaters().collect::<Vec<_>>());
        Ok(())
    }

    #[tokio::test]
    async fn unknown_meter_role_is_listed() -> Result {
        let transport = MockTransport::default()
            .with_json(endpoint::PRODUCTION_JSON_DETAILS, production_json(1, 4154.5))
            .with_json(endpoint::METERS, meters())
            .with_json(endpoint::METERS_READINGS, json!([]));
        let mut gateway = new_gateway(Firmware::new(7, 6, 175), true, &transport);

        let capabilities = gateway.probe().await?;
        assert!(capabilities.is_superset(Capability::CtMeters | Capability::DualPhase));

        let snapshot = gateway.update().await?;
        let roles = snapshot.ct_meters.iter().map(|meter| meter.role.to_string()).collect::<Vec<_>>();
        assert_eq!(roles, ["production", "backfeed"]);
        Ok(())
    }

    #[tokio::test]
    async fn endpoint_is_fetched_once_per_cycle() -> Result {
        let transport = MockTransport::default()
            .with_json(endpoint::PRODUCTION_JSON_DETAILS, production_json(1, 4154.5));
        let mut gateway = new_gateway(Firmware::new(7, 6, 175), false, &transport);
        gateway.probe().await?;
        assert_eq!(transport.n_calls(endpoint::PRODUCTION_JSON_DETAILS), 1);

        let _ = gateway.registry_mut().register("raw_production", || Box::new(RawProduction));
        gateway.probe().await?;
        assert_eq!(gateway.active_updaters().last(), Some("raw_production"));
        transport.reset_calls();
        gateway.update().await?;

        assert_eq!(transport.n_calls(endpoint::PRODUCTION_JSON_DETAILS), 1);
        Ok(())
    }

    #[tokio::test]
    async fn early_firmware_zeros_keep_the_previous_snapshot() -> Result {
        // language=json
        let good = json!({"wattHoursToday": 1460, "wattHoursSevenDays": 18427, "wattHoursLifetime": 1232873, "wattsNow": 350});
        // language=json
        let zeros = json!({"wattHoursToday": 0, "wattHoursSevenDays": 0, "wattHoursLifetime": 0, "wattsNow": 0});
        let transport = MockTransport::default().with_json(endpoint::API_V1_PRODUCTION, good);
        let mut gateway = new_gateway(Firmware::new(3, 9, 36), false, &transport);
        let previous = gateway.update().await?;

        transport.set_json(endpoint::API_V1_PRODUCTION, zeros);
        let result = gateway.update().await;

        assert!(matches!(result, Err(Error::PoorDataQuality(_))));
        assert_eq!(gateway.snapshot(), Some(previous));
        Ok(())
    }

    #[tokio::test]
    async fn stable_gateway_yields_identical_snapshots() -> Result {
        let transport = MockTransport::default()
            .with_json(endpoint::PRODUCTION_JSON_DETAILS, production_json(1, 4154.5))
            .with_json(endpoint::METERS, meters())
            .with_json(
                endpoint::METERS_READINGS,
                json!([{"eid": 704643328, "timestamp": 1693824452, "activePower": 4154.5, "channels": [{"activePower": 2077.25}, {"activePower": 2077.25}]}]),
            );
        let mut gateway = new_gateway(Firmware::new(7, 6, 175), true, &transport);

        let first = gateway.update().await?;
        let second = gateway.update().await?;

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_vec(&*first).map_err(Error::Serialize)?,
            serde_json::to_vec(&*second).map_err(Error::Serialize)?,
        );
        Ok(())
    }

    #[tokio::test]
    async fn live_failure_aborts_the_cycle() -> Result {
        let transport = MockTransport::default()
            .with_json(endpoint::PRODUCTION_JSON_DETAILS, production_json(1, 4154.5));
        let mut gateway = new_gateway(Firmware::new(7, 6, 175), false, &transport);
        gateway.probe().await?;

        transport.reset_calls();
        let transport = transport.with_connection_refused(endpoint::PRODUCTION_JSON_DETAILS);
        let result = gateway.update().await;

        assert!(matches!(result, Err(Error::Communication { .. })));
        assert_eq!(transport.n_calls(endpoint::PRODUCTION_JSON_DETAILS), 3);
        assert!(gateway.snapshot().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn unauthenticated_session_fails_discovery() {
        let transport = MockTransport::default()
            .with_status(endpoint::PRODUCTION_JSON_DETAILS, StatusCode::UNAUTHORIZED);
        let mut gateway = new_gateway(Firmware::new(7, 6, 175), false, &transport);

        let result = gateway.probe().await;

        assert!(result.is_err_and(|error| error.is_authentication_required()));
        assert_eq!(gateway.state(), DiscoveryState::Failed);
    }
}
