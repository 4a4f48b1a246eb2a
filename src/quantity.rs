#[macro_use]
mod macros;

quantity!(Watts, "W");
quantity!(WattHours, "Wh");

impl Watts {
    /// Average power over the period in which the energy was produced.
    #[must_use]
    pub fn from_joules(joules: f64, seconds: f64) -> Self {
        if seconds > 0.0 { Self(joules / seconds) } else { Self::zero() }
    }
}

impl WattHours {
    #[must_use]
    pub fn from_joules(joules: f64) -> Self {
        Self(joules / 3600.0)
    }

    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0 == 0.0
    }
}
