use async_trait::async_trait;

use crate::{
    capability::{Capabilities, Capability},
    context::SharedContext,
    endpoint,
    models::tariff::TariffResponse,
    prelude::*,
    session::Session,
    snapshot::Snapshot,
    updater::{AuthPolicy, Probe, Updater},
};

/// Tariff and the storage settings.
pub struct TariffUpdater;

impl TariffUpdater {
    pub const NAME: &'static str = "tariff";
}

#[async_trait]
impl Updater for TariffUpdater {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    #[instrument(skip_all, name = "tariff")]
    async fn probe(
        &mut self,
        session: &mut Session,
        _shared: &mut SharedContext,
        _discovered: Capabilities,
    ) -> Result<Probe> {
        match session.probe::<TariffResponse>(endpoint::TARIFF).await {
            Ok(_) => {
                info!("gotcha");
                Ok(Probe::Applicable(Capabilities::only(Capability::Tariff)))
            }
            Err(error) => AuthPolicy::Optional.absent(endpoint::TARIFF, error),
        }
    }

    #[instrument(skip_all, name = "tariff")]
    async fn update(
        &mut self,
        session: &mut Session,
        _shared: &SharedContext,
        snapshot: &mut Snapshot,
    ) -> Result {
        let response: TariffResponse = session.live(endpoint::TARIFF, snapshot).await?;
        snapshot.tariff = Some(response.tariff);
        Ok(())
    }
}
