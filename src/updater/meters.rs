use std::collections::HashMap;

use async_trait::async_trait;

use crate::{
    capability::{Capabilities, Capability},
    config::UnknownMeterRoles,
    context::SharedContext,
    endpoint,
    models::meter::{CtReading, MeterConfig, MeterReading, MeterRole, PhaseMode},
    prelude::*,
    session::Session,
    snapshot::Snapshot,
    updater::{AuthPolicy, Probe, Updater},
};

/// CT meter configuration and readings.
pub struct MetersUpdater {
    unknown_roles: UnknownMeterRoles,

    /// Roles of the enabled meters taking part in the readings, keyed by the meter EID.
    roles: HashMap<u64, MeterRole>,
}

impl MetersUpdater {
    pub const NAME: &'static str = "meters";

    pub fn new(unknown_roles: UnknownMeterRoles) -> Self {
        Self { unknown_roles, roles: HashMap::new() }
    }

    fn is_first_class(&self, meter: &MeterConfig) -> bool {
        meter.role.is_known() || self.unknown_roles == UnknownMeterRoles::FirstClass
    }
}

#[async_trait]
impl Updater for MetersUpdater {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    #[instrument(skip_all, name = "meters")]
    async fn probe(
        &mut self,
        session: &mut Session,
        shared: &mut SharedContext,
        _discovered: Capabilities,
    ) -> Result<Probe> {
        if !shared.is_metered {
            debug!("not a metered model");
            return Ok(Probe::NotApplicable);
        }
        let meters = match session.probe::<Vec<MeterConfig>>(endpoint::METERS).await {
            Ok(meters) => meters,
            Err(error) => return AuthPolicy::Required.absent(endpoint::METERS, error),
        };

        let enabled = meters.iter().filter(|meter| meter.is_enabled()).collect::<Vec<_>>();
        if enabled.is_empty() {
            debug!(n_meters = meters.len(), "no enabled meters");
            return Ok(Probe::NotApplicable);
        }
        for meter in enabled.iter().filter(|meter| !meter.role.is_known()) {
            info!(eid = meter.eid, role = %meter.role, "unknown meter role");
        }

        self.roles.clear();
        for meter in &enabled {
            if !self.is_first_class(meter) {
                continue;
            }
            if self.roles.values().any(|role| *role == meter.role) {
                warn!(eid = meter.eid, role = %meter.role, "duplicate role, skipped");
                continue;
            }
            self.roles.insert(meter.eid, meter.role.clone());
        }

        shared.ct_meter_count = enabled.len();
        shared.phase_count = enabled
            .iter()
            .filter(|meter| meter.phase_mode != PhaseMode::Split)
            .map(|meter| meter.phase_count)
            .max()
            .unwrap_or(1)
            .max(1);
        shared.phase_mode = if enabled.iter().any(|meter| meter.phase_mode == PhaseMode::Three) {
            PhaseMode::Three
        } else if enabled.iter().any(|meter| meter.phase_mode == PhaseMode::Split) {
            PhaseMode::Split
        } else {
            PhaseMode::Single
        };

        let mut capabilities = Capabilities::only(Capability::CtMeters);
        match shared.phase_mode {
            PhaseMode::Split => capabilities |= Capability::DualPhase,
            PhaseMode::Three => capabilities |= Capability::ThreePhase,
            PhaseMode::Single => {}
        }
        info!(
            n_enabled = shared.ct_meter_count,
            phase_count = shared.phase_count,
            phase_mode = ?shared.phase_mode,
            "gotcha",
        );
        Ok(Probe::Applicable(capabilities))
    }

    #[instrument(skip_all, name = "meters")]
    async fn update(
        &mut self,
        session: &mut Session,
        shared: &SharedContext,
        snapshot: &mut Snapshot,
    ) -> Result {
        let meters: Vec<MeterConfig> = session.live(endpoint::METERS, snapshot).await?;
        snapshot.ct_meters = meters;
        let readings: Vec<MeterReading> = session.live(endpoint::METERS_READINGS, snapshot).await?;
        for reading in readings {
            let Some(role) = self.roles.get(&reading.eid) else {
                trace!(eid = reading.eid, "skipping the reading");
                continue;
            };
            let phases = reading.phases(shared.metered_phase_count());
            snapshot
                .ct_readings
                .insert(role.clone(), CtReading { eid: reading.eid, values: reading.values, phases });
        }
        Ok(())
    }
}
