//! State-changing operations with the optimistic snapshot patch.
//!
//! The gateway takes several seconds to reflect a change, so the in-memory snapshot
//! is patched right away once the gateway has accepted the command.

use std::sync::Arc;

use http::Method;
use serde_json::{Value, json};

use crate::{
    capability::Capability,
    endpoint,
    gateway::Gateway,
    models::{
        ensemble::{DryContactSettingsPatch, RelayState},
        tariff::{StorageMode, StorageSettingsPatch},
    },
    prelude::*,
    snapshot::Snapshot,
};

impl Gateway {
    fn require(&self, capability: Capability) -> Result {
        if self.supports(capability) { Ok(()) } else { Err(Error::FeatureNotAvailable(capability)) }
    }

    fn patch_snapshot(&mut self, patch: impl FnOnce(&mut Snapshot)) {
        if let Some(snapshot) = &mut self.snapshot {
            patch(Arc::make_mut(snapshot));
        }
    }

    /// Close the main relay of the grid controller.
    pub async fn go_on_grid(&mut self) -> Result<Value> {
        self.set_grid_relay(RelayState::Closed).await
    }

    /// Open the main relay of the grid controller.
    pub async fn go_off_grid(&mut self) -> Result<Value> {
        self.set_grid_relay(RelayState::Open).await
    }

    #[instrument(skip_all, fields(state = ?state))]
    async fn set_grid_relay(&mut self, state: RelayState) -> Result<Value> {
        self.require(Capability::Enpower)?;
        if self.snapshot.as_ref().is_none_or(|snapshot| snapshot.enpower.is_none()) {
            return Err(Error::NoData("grid controller"));
        }
        let response = self
            .session
            .command(Method::POST, endpoint::ENSEMBLE_RELAY, json!({"mains_admin_state": state}))
            .await?;
        self.patch_snapshot(|snapshot| {
            if let Some(enpower) = &mut snapshot.enpower {
                enpower.mains_admin_state = state;
            }
        });
        Ok(response)
    }

    pub async fn open_dry_contact(&mut self, id: &str) -> Result<Value> {
        self.set_dry_contact(id, RelayState::Open).await
    }

    pub async fn close_dry_contact(&mut self, id: &str) -> Result<Value> {
        self.set_dry_contact(id, RelayState::Closed).await
    }

    #[instrument(skip_all, fields(id = id, state = ?state))]
    async fn set_dry_contact(&mut self, id: &str, state: RelayState) -> Result<Value> {
        self.require(Capability::Enpower)?;
        if self
            .snapshot
            .as_ref()
            .is_none_or(|snapshot| !snapshot.dry_contact_status.contains_key(id))
        {
            return Err(Error::NoData("dry contact"));
        }
        let response = self
            .session
            .command(
                Method::POST,
                endpoint::DRY_CONTACTS,
                json!({"dry_contacts": {"id": id, "status": state}}),
            )
            .await?;
        self.patch_snapshot(|snapshot| {
            snapshot.dry_contact_status.insert(id.to_owned(), state);
        });
        Ok(response)
    }

    /// Change the dry contact settings, keeping the unspecified ones.
    #[instrument(skip_all, fields(id = id))]
    pub async fn update_dry_contact(
        &mut self,
        id: &str,
        patch: DryContactSettingsPatch,
    ) -> Result<Value> {
        self.require(Capability::Enpower)?;
        let merged = self
            .snapshot
            .as_ref()
            .and_then(|snapshot| snapshot.dry_contact_settings.get(id))
            .ok_or(Error::NoData("dry contact settings"))?
            .merged(patch);
        let body = json!({"dry_contacts": serde_json::to_value(&merged).map_err(Error::Serialize)?});
        let response =
            self.session.command(Method::POST, endpoint::DRY_CONTACT_SETTINGS, body).await?;
        self.patch_snapshot(|snapshot| {
            snapshot.dry_contact_settings.insert(id.to_owned(), merged);
        });
        Ok(response)
    }

    pub async fn set_storage_mode(&mut self, mode: StorageMode) -> Result<Value> {
        self.update_storage_settings(StorageSettingsPatch { mode: Some(mode), ..Default::default() })
            .await
    }

    pub async fn set_reserve_soc(&mut self, reserved_soc: f64) -> Result<Value> {
        self.update_storage_settings(StorageSettingsPatch {
            reserved_soc: Some(reserved_soc),
            ..Default::default()
        })
        .await
    }

    pub async fn set_charge_from_grid(&mut self, charge_from_grid: bool) -> Result<Value> {
        self.update_storage_settings(StorageSettingsPatch {
            charge_from_grid: Some(charge_from_grid),
            ..Default::default()
        })
        .await
    }

    /// Change the storage settings, sending the whole tariff back.
    #[instrument(skip_all, fields(patch = ?patch))]
    pub async fn update_storage_settings(&mut self, patch: StorageSettingsPatch) -> Result<Value> {
        self.require(Capability::Tariff)?;
        self.require(Capability::Encharge)?;
        let tariff = self
            .snapshot
            .as_ref()
            .and_then(|snapshot| snapshot.tariff.as_ref())
            .ok_or(Error::NoData("tariff"))?;
        let merged = tariff.merged(patch).ok_or(Error::NoData("storage settings"))?;
        let body = json!({"tariff": serde_json::to_value(&merged).map_err(Error::Serialize)?});
        let response = self.session.command(Method::PUT, endpoint::TARIFF, body).await?;
        self.patch_snapshot(|snapshot| snapshot.tariff = Some(merged));
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;

    use super::*;
    use crate::{
        config::GatewayConfig,
        info::Firmware,
        retry::RetryPolicy,
        testing::{MockTransport, gateway_info},
    };

    fn new_gateway(transport: &MockTransport) -> Gateway {
        let config = GatewayConfig::builder()
            .base_url(reqwest::Url::parse("https://envoy.local").unwrap())
            .probe_retry(RetryPolicy::immediate(2))
            .live_retry(RetryPolicy::immediate(3))
            .build();
        Gateway::new(
            gateway_info(Firmware::new(7, 6, 175), true),
            Box::new(transport.clone()),
            &config,
        )
    }

    /// Metered gateway with a battery, a grid controller and the tariff.
    fn ensemble_transport() -> MockTransport {
        // language=json
        MockTransport::default()
            .with_json(
                endpoint::PRODUCTION_JSON_DETAILS,
                json!({"production": [{"type": "eim", "activeCount": 1, "measurementType": "production", "wNow": 1000, "whLifetime": 5000}]}),
            )
            .with_json(
                endpoint::ENSEMBLE_INVENTORY,
                json!([
                    {"type": "ENCHARGE", "devices": [{"serial_num": "482206015180", "last_rpt_date": 1693824452, "percentFull": 39, "temperature": 29}]},
                    {"type": "ENPOWER", "devices": [{"serial_num": "482223013120", "last_rpt_date": 1693824452, "mains_admin_state": "closed", "mains_oper_state": "closed"}]}
                ]),
            )
            .with_json(endpoint::ENSEMBLE_SECONDARY_CONTROL, json!({"agg_soc": 39, "Max_energy": 3360}))
            .with_json(endpoint::ENSEMBLE_POWER, json!({"devices:": []}))
            .with_json(endpoint::DRY_CONTACTS, json!({"dry_contacts": [{"id": "NC1", "status": "closed"}]}))
            .with_json(
                endpoint::DRY_CONTACT_SETTINGS,
                json!({"dry_contacts": [{"id": "NC1", "type": "LOAD", "grid_action": "apply", "load_name": "Pool", "mode": "manual", "soc_low": 25, "soc_high": 30, "override": "false"}]}),
            )
            .with_json(
                endpoint::TARIFF,
                json!({"tariff": {"currency": {"code": "EUR"}, "storage_settings": {"mode": "self-consumption", "reserved_soc": 15.0, "very_low_soc": 5, "charge_from_grid": false, "date": "1695598084"}}}),
            )
            .with_body(endpoint::ENSEMBLE_RELAY, StatusCode::OK, "")
    }

    #[tokio::test]
    async fn relay_without_enpower_makes_no_calls() -> Result {
        // language=json
        let transport = MockTransport::default().with_json(
            endpoint::PRODUCTION_JSON_DETAILS,
            json!({"production": [{"type": "eim", "activeCount": 1, "measurementType": "production", "wNow": 1000, "whLifetime": 5000}]}),
        );
        let mut gateway = new_gateway(&transport);
        gateway.probe().await?;
        transport.reset_calls();

        let result = gateway.open_dry_contact("NC1").await;

        assert!(matches!(result, Err(Error::FeatureNotAvailable(Capability::Enpower))));
        assert!(matches!(gateway.go_off_grid().await, Err(Error::FeatureNotAvailable(_))));
        assert_eq!(transport.total_calls(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn settings_edit_before_aggregation_has_no_data() -> Result {
        let transport = ensemble_transport();
        let mut gateway = new_gateway(&transport);
        gateway.probe().await?;
        transport.reset_calls();

        let result = gateway.update_dry_contact("NC1", DryContactSettingsPatch::default()).await;
        assert!(matches!(result, Err(Error::NoData(_))));
        let result = gateway.set_reserve_soc(20.0).await;
        assert!(matches!(result, Err(Error::NoData(_))));
        assert_eq!(transport.total_calls(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn relay_toggle_before_aggregation_has_no_data() -> Result {
        let transport = ensemble_transport();
        let mut gateway = new_gateway(&transport);
        gateway.probe().await?;
        transport.reset_calls();

        assert!(matches!(gateway.open_dry_contact("NC1").await, Err(Error::NoData(_))));
        assert!(matches!(gateway.go_off_grid().await, Err(Error::NoData(_))));
        assert_eq!(transport.total_calls(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_dry_contact_has_no_data() -> Result {
        let transport = ensemble_transport();
        let mut gateway = new_gateway(&transport);
        gateway.update().await?;
        transport.reset_calls();

        let result = gateway.close_dry_contact("NC9").await;

        assert!(matches!(result, Err(Error::NoData(_))));
        assert_eq!(transport.total_calls(), 0);
        assert!(!gateway.snapshot().unwrap().dry_contact_status.contains_key("NC9"));
        Ok(())
    }

    #[tokio::test]
    async fn go_off_grid_patches_the_snapshot() -> Result {
        let transport = ensemble_transport();
        let mut gateway = new_gateway(&transport);
        let before = gateway.update().await?;

        gateway.go_off_grid().await?;

        assert_eq!(
            transport.last_body(endpoint::ENSEMBLE_RELAY),
            Some(json!({"mains_admin_state": "open"})),
        );
        let after = gateway.snapshot().unwrap();
        assert_eq!(after.enpower.as_ref().unwrap().mains_admin_state, RelayState::Open);
        assert_eq!(
            before.enpower.as_ref().unwrap().mains_admin_state,
            RelayState::Closed,
            "snapshots handed out earlier are not affected",
        );
        Ok(())
    }

    #[tokio::test]
    async fn open_dry_contact_ok() -> Result {
        let transport = ensemble_transport();
        let mut gateway = new_gateway(&transport);
        gateway.update().await?;

        gateway.open_dry_contact("NC1").await?;

        assert_eq!(
            transport.last_body(endpoint::DRY_CONTACTS),
            Some(json!({"dry_contacts": {"id": "NC1", "status": "open"}})),
        );
        assert_eq!(gateway.snapshot().unwrap().dry_contact_status["NC1"], RelayState::Open);
        Ok(())
    }

    #[tokio::test]
    async fn update_dry_contact_sends_the_full_object() -> Result {
        let transport = ensemble_transport();
        let mut gateway = new_gateway(&transport);
        gateway.update().await?;
        transport.set_json(endpoint::DRY_CONTACT_SETTINGS, json!({}));

        gateway
            .update_dry_contact("NC1", DryContactSettingsPatch::builder().soc_low(10.0).build())
            .await?;

        let body = transport.last_body(endpoint::DRY_CONTACT_SETTINGS).unwrap();
        assert_eq!(body["dry_contacts"]["soc_low"], 10.0);
        assert_eq!(body["dry_contacts"]["soc_high"], 30.0);
        assert_eq!(body["dry_contacts"]["load_name"], "Pool");
        assert_eq!(body["dry_contacts"]["override"], "false");
        let snapshot = gateway.snapshot().unwrap();
        assert_eq!(snapshot.dry_contact_settings["NC1"].soc_low, 10.0);
        Ok(())
    }

    #[tokio::test]
    async fn set_storage_mode_sends_the_whole_tariff() -> Result {
        let transport = ensemble_transport();
        let mut gateway = new_gateway(&transport);
        gateway.update().await?;
        transport.set_json(endpoint::TARIFF, json!({}));

        gateway.set_storage_mode(StorageMode::Backup).await?;

        let body = transport.last_body(endpoint::TARIFF).unwrap();
        assert_eq!(body["tariff"]["storage_settings"]["mode"], "backup");
        assert_eq!(body["tariff"]["storage_settings"]["reserved_soc"], 15.0);
        assert_eq!(body["tariff"]["currency"]["code"], "EUR");
        let snapshot = gateway.snapshot().unwrap();
        let settings = snapshot.tariff.as_ref().unwrap().storage_settings.as_ref().unwrap();
        assert_eq!(settings.mode, StorageMode::Backup);
        Ok(())
    }

    #[tokio::test]
    async fn rejected_command_leaves_the_snapshot() -> Result {
        let transport = ensemble_transport();
        let mut gateway = new_gateway(&transport);
        let before = gateway.update().await?;
        let transport = transport.with_status(endpoint::ENSEMBLE_RELAY, StatusCode::FORBIDDEN);

        let result = gateway.go_off_grid().await;

        assert!(result.is_err_and(|error| error.is_authentication_required()));
        assert_eq!(gateway.snapshot(), Some(before));
        assert_eq!(transport.n_calls(endpoint::ENSEMBLE_RELAY), 1);
        Ok(())
    }
}
