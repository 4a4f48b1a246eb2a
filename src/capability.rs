use enumset::{EnumSet, EnumSetType};
use serde::{Deserialize, Serialize};

/// Independently discovered gateway feature.
#[derive(Debug, Hash, Serialize, Deserialize, EnumSetType)]
#[enumset(serialize_repr = "list")]
pub enum Capability {
    /// Micro-inverter list is available.
    Inverters,

    /// Production CT metering is installed and active.
    Metering,

    /// Total consumption CT is installed.
    TotalConsumption,

    /// Net consumption CT is installed.
    NetConsumption,

    /// Battery storage.
    Encharge,

    /// Grid controller with relays.
    Enpower,

    /// Production data is available from at least one source.
    Production,

    /// Tariff and storage settings.
    Tariff,

    /// Split-phase wiring.
    DualPhase,

    /// Three-phase wiring.
    ThreePhase,

    /// Current transformer meters are configured.
    CtMeters,

    /// Generator configured on the grid controller.
    Generator,

    /// Per-inverter DC and AC telemetry.
    DetailedInverters,
}

/// Discovered feature bitset, accumulated by OR across the updaters.
pub type Capabilities = EnumSet<Capability>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulate_ok() {
        let mut capabilities = Capabilities::empty();
        capabilities |= Capability::Production | Capability::Metering;
        capabilities |= Capability::Metering | Capability::CtMeters;
        assert_eq!(capabilities.len(), 3);
        assert!(capabilities.contains(Capability::CtMeters));
    }

    #[test]
    fn serialize_ok() -> Result<(), serde_json::Error> {
        let capabilities = Capability::Production | Capability::Inverters;
        assert_eq!(serde_json::to_string(&capabilities)?, r#"["Inverters","Production"]"#);
        Ok(())
    }
}
