use crate::{
    context::SharedContext,
    prelude::*,
    session::Session,
    snapshot::Snapshot,
    updater::Updater,
};

/// Run one aggregation cycle: a complete snapshot, or an error.
#[instrument(skip_all, fields(n_updaters = updaters.len()))]
pub async fn aggregate(
    session: &mut Session,
    shared: &SharedContext,
    updaters: &mut [Box<dyn Updater>],
) -> Result<Snapshot> {
    session.clear_cache();
    let mut snapshot = Snapshot::default();
    for updater in updaters {
        if let Err(error) = updater.update(session, shared, &mut snapshot).await {
            warn!(updater = updater.name(), error = %error, "cycle aborted");
            return Err(error);
        }
    }
    check_data_quality(shared, &snapshot)?;
    debug!(n_endpoints = snapshot.raw.len(), "aggregated");
    Ok(snapshot)
}

/// Reject the start-up zeros of firmware older than 4.0, the source has been committed to already.
fn check_data_quality(shared: &SharedContext, snapshot: &Snapshot) -> Result {
    if shared.firmware.is_early()
        && let Some(production) = &snapshot.production
        && production.is_all_zero()
    {
        warn!(firmware = %shared.firmware, "all-zero production");
        return Err(Error::PoorDataQuality(format!(
            "firmware {} reported all-zero production",
            shared.firmware,
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        info::Firmware,
        models::production::EnergyTotals,
        quantity::WattHours,
        testing::gateway_info,
    };

    fn snapshot(production: EnergyTotals) -> Snapshot {
        Snapshot { production: Some(production), ..Snapshot::default() }
    }

    #[test]
    fn early_firmware_zeros_rejected() {
        let shared = SharedContext::new(&gateway_info(Firmware::new(3, 9, 36), false));
        let result = check_data_quality(&shared, &snapshot(EnergyTotals::default()));
        assert!(matches!(result, Err(Error::PoorDataQuality(_))));
    }

    #[test]
    fn early_firmware_non_zero_ok() {
        let shared = SharedContext::new(&gateway_info(Firmware::new(3, 9, 36), false));
        let production =
            EnergyTotals { watt_hours_lifetime: WattHours(1.0), ..EnergyTotals::default() };
        assert!(check_data_quality(&shared, &snapshot(production)).is_ok());
    }

    #[test]
    fn recent_firmware_zeros_ok() {
        let shared = SharedContext::new(&gateway_info(Firmware::new(7, 6, 175), false));
        assert!(check_data_quality(&shared, &snapshot(EnergyTotals::default())).is_ok());
    }
}
