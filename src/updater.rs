//! Pluggable data sources.

pub mod ensemble;
pub mod generator;
pub mod inverters;
pub mod meters;
pub mod production;
pub mod tariff;

use async_trait::async_trait;

use crate::{
    capability::Capabilities,
    context::SharedContext,
    prelude::*,
    session::Session,
    snapshot::Snapshot,
};

/// Probing outcome.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Probe {
    /// The source applies, with the capabilities contributed by this updater alone.
    Applicable(Capabilities),

    NotApplicable,
}

/// One logical data source: decides whether it applies to the gateway, then feeds the snapshot.
#[async_trait]
pub trait Updater: Send + Sync {
    /// Stable name, used for logging and for inserting custom updaters relative to this one.
    fn name(&self) -> &'static str;

    /// Cheap pre-check against the capabilities discovered by the preceding updaters.
    fn should_run_probe(&self, _discovered: Capabilities) -> bool {
        true
    }

    /// Find out whether the source applies.
    ///
    /// Implementations downgrade a missing or broken resource to [`Probe::NotApplicable`],
    /// and only return an error when the whole discovery must be aborted.
    async fn probe(
        &mut self,
        _session: &mut Session,
        _shared: &mut SharedContext,
        _discovered: Capabilities,
    ) -> Result<Probe> {
        Ok(Probe::NotApplicable)
    }

    /// Fetch the live data and write it into the snapshot.
    async fn update(
        &mut self,
        session: &mut Session,
        shared: &SharedContext,
        snapshot: &mut Snapshot,
    ) -> Result;
}

/// What an authentication failure means while probing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AuthPolicy {
    /// The resource is gated for restricted accounts, the source is just skipped.
    Optional,

    /// The resource is always available to a valid session: the session itself is unauthenticated.
    Required,
}

impl AuthPolicy {
    /// Classify a failed probe call.
    pub fn absent(self, path: &str, error: FetchError) -> Result<Probe> {
        match (self, error) {
            (Self::Required, FetchError::Unauthorized(status)) => {
                warn!(path, %status, "unauthorized");
                Err(Error::AuthenticationRequired { path: path.to_owned() })
            }
            (Self::Optional, FetchError::Unauthorized(status)) => {
                info!(path, %status, "not authorized, skipping");
                Ok(Probe::NotApplicable)
            }
            (_, error) => {
                debug!(path, error = %error, "absent");
                Ok(Probe::NotApplicable)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;

    use super::*;

    #[test]
    fn required_auth_propagates() {
        let result =
            AuthPolicy::Required.absent("/ivp/meters", FetchError::Unauthorized(StatusCode::FORBIDDEN));
        assert!(matches!(result, Err(Error::AuthenticationRequired { .. })));
    }

    #[test]
    fn optional_auth_skips() {
        let result = AuthPolicy::Optional
            .absent("/admin/lib/tariff", FetchError::Unauthorized(StatusCode::UNAUTHORIZED));
        assert_eq!(result.unwrap(), Probe::NotApplicable);
    }

    #[test]
    fn missing_resource_is_absent_for_any_policy() {
        let result =
            AuthPolicy::Required.absent("/ivp/meters", FetchError::Status(StatusCode::NOT_FOUND));
        assert_eq!(result.unwrap(), Probe::NotApplicable);
    }
}
