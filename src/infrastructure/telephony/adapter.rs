//! Telephony-integration adapter
//!
//! Wraps the platform call facility behind a strategy chosen once at
//! construction. When the facility is unusable every reservation is granted
//! synthetically and releases are no-ops.

use crate::domain::call::CapabilityProfile;
use crate::domain::shared::value_objects::ReservationId;
use crate::domain::telephony::{
    ProviderEvent, ReservationOutcome, TelephonyError, TelephonyProvider,
};
use futures::future::{self, BoxFuture, FutureExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

enum Strategy {
    Platform(Arc<dyn TelephonyProvider>),
    Bypass,
}

/// An issued reservation whose outcome is still pending
///
/// The id is known before the outcome so platform-driven events can be
/// matched against it.
pub struct Reservation {
    id: ReservationId,
    outcome: BoxFuture<'static, ReservationOutcome>,
}

impl Reservation {
    pub fn id(&self) -> ReservationId {
        self.id
    }

    pub async fn outcome(self) -> ReservationOutcome {
        self.outcome.await
    }
}

pub struct TelephonyAdapter {
    profile: CapabilityProfile,
    strategy: Strategy,
}

impl TelephonyAdapter {
    pub fn new(profile: CapabilityProfile, provider: Option<Arc<dyn TelephonyProvider>>) -> Self {
        let strategy = match (profile.telephony_supported(), provider) {
            (true, Some(provider)) => {
                info!("Telephony integration enabled ({})", profile.reason());
                Strategy::Platform(provider)
            }
            (true, None) => {
                warn!("Telephony integration supported but no provider available, bypassing");
                Strategy::Bypass
            }
            (false, _) => {
                info!("Telephony integration bypassed ({})", profile.reason());
                Strategy::Bypass
            }
        };

        Self { profile, strategy }
    }

    /// Adapter that never touches a platform facility
    pub fn bypass() -> Self {
        Self::new(CapabilityProfile::unsupported("no call facility"), None)
    }

    pub fn capability(&self) -> &CapabilityProfile {
        &self.profile
    }

    /// Whether the platform facility is in use
    pub fn uses_platform(&self) -> bool {
        matches!(self.strategy, Strategy::Platform(_))
    }

    /// Reserve a call slot
    pub fn reserve_call(&self) -> Reservation {
        let id = ReservationId::new();
        let outcome = match &self.strategy {
            Strategy::Platform(provider) => {
                let provider = provider.clone();
                async move {
                    match provider.request_start(id).await {
                        Ok(()) => ReservationOutcome::Granted(id),
                        Err(e) => ReservationOutcome::Rejected(e),
                    }
                }
                .boxed()
            }
            Strategy::Bypass => {
                debug!("Synthetic reservation {}", id);
                future::ready(ReservationOutcome::Granted(id)).boxed()
            }
        };

        Reservation { id, outcome }
    }

    pub fn report_connected(&self, id: ReservationId) {
        if let Strategy::Platform(provider) = &self.strategy {
            provider.report_connected(id);
        }
    }

    /// Release a reservation
    pub async fn release_call(&self, id: ReservationId) -> Result<(), TelephonyError> {
        match &self.strategy {
            Strategy::Platform(provider) => provider.request_end(id).await,
            Strategy::Bypass => Ok(()),
        }
    }

    /// Platform lifecycle events, available once
    pub fn take_events(&self) -> Option<mpsc::UnboundedReceiver<ProviderEvent>> {
        match &self.strategy {
            Strategy::Platform(provider) => provider.take_events(),
            Strategy::Bypass => None,
        }
    }
}
