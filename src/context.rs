use crate::{
    info::{Firmware, GatewayInfo},
    models::meter::PhaseMode,
};

/// Scratch space shared by the updaters within one discovery pass.
///
/// Only the discovery orchestrator resets it, once at the start of every pass.
#[must_use]
#[derive(Clone, Debug)]
pub struct SharedContext {
    pub firmware: Firmware,

    /// Seeded from the gateway info.
    pub is_metered: bool,

    /// Number of the enabled CT meters.
    pub ct_meter_count: usize,

    pub phase_count: usize,

    pub phase_mode: PhaseMode,

    /// Production endpoints which responded, but were rejected by the strict updaters.
    pub production_candidates: Vec<&'static str>,

    /// AC batteries reported by the production endpoint.
    pub acb_batteries_reported: u32,
}

impl SharedContext {
    pub fn new(info: &GatewayInfo) -> Self {
        Self {
            firmware: info.firmware,
            is_metered: info.is_metered,
            ct_meter_count: 0,
            phase_count: 1,
            phase_mode: PhaseMode::default(),
            production_candidates: Vec::new(),
            acb_batteries_reported: 0,
        }
    }

    pub(crate) fn reset(&mut self, info: &GatewayInfo) {
        *self = Self::new(info);
    }

    /// Number of phases to break the readings down into, `1` without multi-phase CT metering.
    #[must_use]
    pub fn metered_phase_count(&self) -> usize {
        if self.ct_meter_count == 0 || self.phase_mode == PhaseMode::Single {
            1
        } else {
            self.phase_count
        }
    }

    /// Whether the production endpoint is a known strict-rejected candidate.
    #[must_use]
    pub fn is_production_candidate(&self, endpoint: &str) -> bool {
        self.production_candidates.contains(&endpoint)
    }
}
