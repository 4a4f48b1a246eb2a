use serde::Serialize;

use crate::{
    capability::{Capabilities, Capability},
    context::SharedContext,
    info::GatewayInfo,
    prelude::*,
    registry::Registry,
    session::Session,
    updater::{Probe, Updater},
};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub enum DiscoveryState {
    #[default]
    Uninitialized,

    /// Also left behind when a probing future gets dropped halfway.
    Probing,

    Ready,
    Failed,
}

/// Outcome of a successful discovery pass.
pub struct Discovery {
    pub capabilities: Capabilities,

    /// Applicable updaters in the registration order.
    pub updaters: Vec<Box<dyn Updater>>,
}

/// Probe all the registered updaters once, in order.
///
/// Every pass starts from a clean cache and a clean shared context,
/// and builds the updaters anew from the registry.
#[instrument(skip_all, fields(serial_number = %info.serial_number, firmware = %info.firmware))]
pub async fn discover(
    session: &mut Session,
    shared: &mut SharedContext,
    info: &GatewayInfo,
    registry: &Registry,
) -> Result<Discovery> {
    session.clear_cache();
    shared.reset(info);

    let mut capabilities = Capabilities::empty();
    let mut updaters = Vec::new();
    for mut updater in registry.instantiate() {
        let name = updater.name();
        if !updater.should_run_probe(capabilities) {
            debug!(name, "skipped");
            continue;
        }
        match updater.probe(session, shared, capabilities).await? {
            Probe::Applicable(contributed) if !contributed.is_empty() => {
                debug!(name, ?contributed, "applicable");
                capabilities |= contributed;
                updaters.push(updater);
            }
            Probe::Applicable(_) | Probe::NotApplicable => {
                debug!(name, "not applicable");
            }
        }
    }

    if !capabilities.contains(Capability::Production) {
        return Err(Error::ProbeFailed("no production data source has been found".to_owned()));
    }
    info!(
        ?capabilities,
        updaters = ?updaters.iter().map(|updater| updater.name()).collect::<Vec<_>>(),
        "discovered",
    );
    Ok(Discovery { capabilities, updaters })
}
