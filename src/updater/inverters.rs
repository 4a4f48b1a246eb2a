//! Micro-inverter sources, the richer one first.

use async_trait::async_trait;

use crate::{
    capability::{Capabilities, Capability},
    context::SharedContext,
    endpoint,
    info::Firmware,
    models::inverter::{ApiV1Inverter, DeviceData, Inverter},
    prelude::*,
    session::Session,
    snapshot::Snapshot,
    updater::{AuthPolicy, Probe, Updater},
};

/// Per-inverter telemetry from the device data resource.
pub struct DeviceDataUpdater;

impl DeviceDataUpdater {
    pub const NAME: &'static str = "device_data_inverters";

    /// Earlier firmware either lacks the resource or reports stale channels.
    pub const MIN_FIRMWARE: Firmware = Firmware::new(8, 2, 4264);
}

#[async_trait]
impl Updater for DeviceDataUpdater {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn should_run_probe(&self, discovered: Capabilities) -> bool {
        !discovered.contains(Capability::Inverters)
    }

    #[instrument(skip_all, name = "device_data")]
    async fn probe(
        &mut self,
        session: &mut Session,
        shared: &mut SharedContext,
        _discovered: Capabilities,
    ) -> Result<Probe> {
        if shared.firmware < Self::MIN_FIRMWARE {
            debug!(firmware = %shared.firmware, "firmware is too old");
            return Ok(Probe::NotApplicable);
        }
        let device_data = match session.probe::<DeviceData>(endpoint::DEVICE_DATA).await {
            Ok(device_data) => device_data,
            Err(error) => return AuthPolicy::Optional.absent(endpoint::DEVICE_DATA, error),
        };
        let n_inverters = device_data.inverters().count();
        if n_inverters == 0 {
            debug!("no inverters");
            return Ok(Probe::NotApplicable);
        }
        info!(n_inverters, "gotcha");
        Ok(Probe::Applicable(Capability::Inverters | Capability::DetailedInverters))
    }

    #[instrument(skip_all, name = "device_data")]
    async fn update(
        &mut self,
        session: &mut Session,
        _shared: &SharedContext,
        snapshot: &mut Snapshot,
    ) -> Result {
        let device_data: DeviceData = session.live(endpoint::DEVICE_DATA, snapshot).await?;
        snapshot.inverters = device_data
            .inverters()
            .map(|inverter| (inverter.serial_number.clone(), inverter))
            .collect();
        Ok(())
    }
}

/// Legacy inverter list: last and maximum reported power only.
pub struct ApiV1InvertersUpdater;

impl ApiV1InvertersUpdater {
    pub const NAME: &'static str = "api_v1_inverters";
}

#[async_trait]
impl Updater for ApiV1InvertersUpdater {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn should_run_probe(&self, discovered: Capabilities) -> bool {
        !discovered.contains(Capability::Inverters)
    }

    #[instrument(skip_all, name = "api_v1_inverters")]
    async fn probe(
        &mut self,
        session: &mut Session,
        _shared: &mut SharedContext,
        _discovered: Capabilities,
    ) -> Result<Probe> {
        let inverters =
            match session.probe::<Vec<ApiV1Inverter>>(endpoint::API_V1_PRODUCTION_INVERTERS).await {
                Ok(inverters) => inverters,
                Err(error) => {
                    return AuthPolicy::Optional.absent(endpoint::API_V1_PRODUCTION_INVERTERS, error);
                }
            };
        if inverters.is_empty() {
            debug!("no inverters");
            return Ok(Probe::NotApplicable);
        }
        info!(n_inverters = inverters.len(), "gotcha");
        Ok(Probe::Applicable(Capabilities::only(Capability::Inverters)))
    }

    #[instrument(skip_all, name = "api_v1_inverters")]
    async fn update(
        &mut self,
        session: &mut Session,
        _shared: &SharedContext,
        snapshot: &mut Snapshot,
    ) -> Result {
        let inverters: Vec<ApiV1Inverter> =
            session.live(endpoint::API_V1_PRODUCTION_INVERTERS, snapshot).await?;
        snapshot.inverters = inverters
            .into_iter()
            .map(Inverter::from)
            .map(|inverter| (inverter.serial_number.clone(), inverter))
            .collect();
        Ok(())
    }
}
