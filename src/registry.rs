use crate::{
    config::UnknownMeterRoles,
    prelude::*,
    updater::{
        Updater,
        ensemble::EnsembleUpdater,
        generator::GeneratorUpdater,
        inverters::{ApiV1InvertersUpdater, DeviceDataUpdater},
        meters::MetersUpdater,
        production::{ApiV1ProductionUpdater, ProductionJsonUpdater},
        tariff::TariffUpdater,
    },
};

/// Creates a fresh updater for every discovery pass.
pub type UpdaterFactory = Box<dyn Fn() -> Box<dyn Updater> + Send + Sync>;

/// Undo handle returned by the registration.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct RegistrationId(u64);

struct Registration {
    id: RegistrationId,
    name: &'static str,
    factory: UpdaterFactory,
}

/// Ordered updater factories, consulted by every discovery pass.
///
/// The order is the priority: when several updaters may provide the same data,
/// the earlier one claims it.
#[must_use]
#[derive(Default)]
pub struct Registry {
    registrations: Vec<Registration>,
    next_id: u64,
}

impl Registry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Built-in updaters in their order of preference.
    pub fn builtin(unknown_meter_roles: UnknownMeterRoles) -> Self {
        let mut registry = Self::empty();
        let _ = registry.register(MetersUpdater::NAME, move || {
            Box::new(MetersUpdater::new(unknown_meter_roles))
        });
        let _ = registry.register(ProductionJsonUpdater::DETAILS_NAME, || {
            Box::new(ProductionJsonUpdater::details())
        });
        let _ = registry
            .register(ProductionJsonUpdater::PLAIN_NAME, || Box::new(ProductionJsonUpdater::plain()));
        let _ = registry
            .register(ApiV1ProductionUpdater::NAME, || Box::new(ApiV1ProductionUpdater::strict()));
        let _ = registry.register(ProductionJsonUpdater::FALLBACK_NAME, || {
            Box::new(ProductionJsonUpdater::fallback())
        });
        let _ = registry.register(ApiV1ProductionUpdater::TOLERANT_NAME, || {
            Box::new(ApiV1ProductionUpdater::tolerant())
        });
        let _ = registry.register(DeviceDataUpdater::NAME, || Box::new(DeviceDataUpdater));
        let _ = registry.register(ApiV1InvertersUpdater::NAME, || Box::new(ApiV1InvertersUpdater));
        let _ = registry.register(EnsembleUpdater::NAME, || Box::new(EnsembleUpdater::default()));
        let _ = registry.register(TariffUpdater::NAME, || Box::new(TariffUpdater));
        let _ = registry.register(GeneratorUpdater::NAME, || Box::new(GeneratorUpdater));
        registry
    }

    fn new_registration(
        &mut self,
        name: &'static str,
        factory: impl Fn() -> Box<dyn Updater> + Send + Sync + 'static,
    ) -> Registration {
        let id = RegistrationId(self.next_id);
        self.next_id += 1;
        Registration { id, name, factory: Box::new(factory) }
    }

    /// Append the updater to the end of the list.
    pub fn register(
        &mut self,
        name: &'static str,
        factory: impl Fn() -> Box<dyn Updater> + Send + Sync + 'static,
    ) -> RegistrationId {
        let registration = self.new_registration(name, factory);
        let id = registration.id;
        self.registrations.push(registration);
        debug!(name, n_registrations = self.registrations.len(), "registered");
        id
    }

    /// Insert the updater right before the named one, or append it if there is no such updater.
    pub fn register_before(
        &mut self,
        before: &str,
        name: &'static str,
        factory: impl Fn() -> Box<dyn Updater> + Send + Sync + 'static,
    ) -> RegistrationId {
        let registration = self.new_registration(name, factory);
        let id = registration.id;
        let index = self
            .registrations
            .iter()
            .position(|registration| registration.name == before)
            .unwrap_or(self.registrations.len());
        self.registrations.insert(index, registration);
        debug!(name, before, index, "registered");
        id
    }

    /// Undo the registration. Returns `false` if it has already been removed.
    pub fn unregister(&mut self, id: RegistrationId) -> bool {
        let n_before = self.registrations.len();
        self.registrations.retain(|registration| registration.id != id);
        n_before != self.registrations.len()
    }

    /// Remove all the updaters with the name, built-in ones included.
    pub fn unregister_named(&mut self, name: &str) -> bool {
        let n_before = self.registrations.len();
        self.registrations.retain(|registration| registration.name != name);
        n_before != self.registrations.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.registrations.iter().map(|registration| registration.name)
    }

    /// Fresh updater instances in the registration order.
    #[must_use]
    pub fn instantiate(&self) -> Vec<Box<dyn Updater>> {
        self.registrations.iter().map(|registration| (registration.factory)()).collect()
    }
}
