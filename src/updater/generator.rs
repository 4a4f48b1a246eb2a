use async_trait::async_trait;

use crate::{
    capability::{Capabilities, Capability},
    context::SharedContext,
    endpoint,
    models::generator::GeneratorConfig,
    prelude::*,
    session::Session,
    snapshot::Snapshot,
    updater::{AuthPolicy, Probe, Updater},
};

/// Generator attached to the grid controller.
pub struct GeneratorUpdater;

impl GeneratorUpdater {
    pub const NAME: &'static str = "generator";
}

#[async_trait]
impl Updater for GeneratorUpdater {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    /// The generator can only be wired through the grid controller.
    fn should_run_probe(&self, discovered: Capabilities) -> bool {
        discovered.contains(Capability::Enpower)
    }

    #[instrument(skip_all, name = "generator")]
    async fn probe(
        &mut self,
        session: &mut Session,
        _shared: &mut SharedContext,
        _discovered: Capabilities,
    ) -> Result<Probe> {
        let config = match session.probe::<GeneratorConfig>(endpoint::GENERATOR_CONFIG).await {
            Ok(config) => config,
            Err(error) => return AuthPolicy::Optional.absent(endpoint::GENERATOR_CONFIG, error),
        };
        if !config.is_present {
            debug!("not present");
            return Ok(Probe::NotApplicable);
        }
        info!(kind = %config.kind, "gotcha");
        Ok(Probe::Applicable(Capabilities::only(Capability::Generator)))
    }

    #[instrument(skip_all, name = "generator")]
    async fn update(
        &mut self,
        session: &mut Session,
        _shared: &SharedContext,
        snapshot: &mut Snapshot,
    ) -> Result {
        let config: GeneratorConfig = session.live(endpoint::GENERATOR_CONFIG, snapshot).await?;
        snapshot.generator = Some(config);
        Ok(())
    }
}
