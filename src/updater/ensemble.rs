use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::{
    capability::{Capabilities, Capability},
    context::SharedContext,
    endpoint,
    info::Firmware,
    models::ensemble::{
        Battery,
        DryContactSettingsResponse,
        DryContacts,
        EnsemblePower,
        Enpower,
        InventoryGroup,
        InventoryResponse,
        SecondaryControl,
    },
    prelude::*,
    session::Session,
    snapshot::Snapshot,
    updater::{AuthPolicy, Probe, Updater},
};

/// Batteries and the grid controller.
#[derive(Default)]
pub struct EnsembleUpdater {
    capabilities: Capabilities,
}

impl EnsembleUpdater {
    pub const NAME: &'static str = "ensemble";

    pub const MIN_FIRMWARE: Firmware = Firmware::new(7, 0, 0);
}

/// Decode an inventory device, a malformed device fails the cycle like a malformed response.
fn decode<T: DeserializeOwned>(path: &str, value: &serde_json::Value) -> Result<T> {
    T::deserialize(value).map_err(|error| Error::live(path, error.into()))
}

#[async_trait]
impl Updater for EnsembleUpdater {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    #[instrument(skip_all, name = "ensemble")]
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
        let inventory =
            match session.probe::<InventoryResponse>(endpoint::ENSEMBLE_INVENTORY).await {
                Ok(inventory) => inventory.into_groups(),
                Err(error) => return AuthPolicy::Optional.absent(endpoint::ENSEMBLE_INVENTORY, error),
            };

        let mut capabilities = Capabilities::empty();
        for group in inventory.iter().filter(|group| !group.devices.is_empty()) {
            match group.kind.as_str() {
                InventoryGroup::ENCHARGE => capabilities |= Capability::Encharge,
                InventoryGroup::ENPOWER => capabilities |= Capability::Enpower,
                kind => debug!(kind, "unsupported device type"),
            }
        }
        if capabilities.is_empty() {
            debug!("no ensemble devices");
            return Ok(Probe::NotApplicable);
        }
        self.capabilities = capabilities;
        info!(?capabilities, "gotcha");
        Ok(Probe::Applicable(capabilities))
    }

    #[instrument(skip_all, name = "ensemble")]
    async fn update(
        &mut self,
        session: &mut Session,
        shared: &SharedContext,
        snapshot: &mut Snapshot,
    ) -> Result {
        let inventory: InventoryResponse =
            session.live(endpoint::ENSEMBLE_INVENTORY, snapshot).await?;
        for group in inventory.into_groups() {
            match group.kind.as_str() {
                InventoryGroup::ENCHARGE if self.capabilities.contains(Capability::Encharge) => {
                    for device in &group.devices {
                        let battery: Battery = decode(endpoint::ENSEMBLE_INVENTORY, device)?;
                        snapshot.batteries.insert(battery.serial_number.clone(), battery);
                    }
                }
                InventoryGroup::ENPOWER if self.capabilities.contains(Capability::Enpower) => {
                    if let Some(device) = group.devices.first() {
                        let enpower: Enpower = decode(endpoint::ENSEMBLE_INVENTORY, device)?;
                        snapshot.enpower = Some(enpower);
                    }
                }
                _ => {}
            }
        }

        let control: SecondaryControl =
            session.live(endpoint::ENSEMBLE_SECONDARY_CONTROL, snapshot).await?;
        snapshot.battery_aggregate = Some(control.aggregate(shared.acb_batteries_reported));

        if self.capabilities.contains(Capability::Encharge) {
            let power: EnsemblePower = session.live(endpoint::ENSEMBLE_POWER, snapshot).await?;
            for device in power.devices {
                if let Some(battery) = snapshot.batteries.get_mut(&device.serial_number) {
                    battery.real_power = Some(device.real_power());
                }
            }
        }

        if self.capabilities.contains(Capability::Enpower) {
            let status: DryContacts = session.live(endpoint::DRY_CONTACTS, snapshot).await?;
            snapshot.dry_contact_status =
                status.dry_contacts.into_iter().map(|relay| (relay.id, relay.status)).collect();
            let settings: DryContactSettingsResponse =
                session.live(endpoint::DRY_CONTACT_SETTINGS, snapshot).await?;
            snapshot.dry_contact_settings = settings
                .dry_contacts
                .into_iter()
                .map(|settings| (settings.id.clone(), settings))
                .collect();
        }
        Ok(())
    }
}
