//! Registration heartbeat: periodic self-registration with the catalog.
//!
//! Every tick copies the registry, builds the gateway document and sends it
//! to the catalog. Failures are logged and the next tick tries again; there is
//! no backoff and no retry bound.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use deviot_domain::gateway::GatewayIdentity;
use deviot_domain::time::{Timestamp, now};

use crate::ports::CatalogClient;
use crate::registry::ThingRegistry;

/// Time between two registration attempts.
pub const REGISTRATION_INTERVAL: Duration = Duration::from_secs(5);

/// Outcome counters for the registration loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationStatus {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub last_attempt_at: Option<Timestamp>,
    pub last_success_at: Option<Timestamp>,
    /// Message of the most recent failure, cleared by the next success.
    pub last_error: Option<String>,
}

/// Shared, lock-protected [`RegistrationStatus`].
pub type SharedStatus = Arc<Mutex<RegistrationStatus>>;

/// Handle on a running heartbeat task.
pub(crate) struct Heartbeat {
    shutdown: watch::Sender<bool>,
    // Detached on drop; the loop exits on its own once signalled.
    _task: JoinHandle<()>,
}

impl Heartbeat {
    /// Spawn the loop. The first registration happens immediately.
    pub(crate) fn spawn<C>(
        identity: Arc<GatewayIdentity>,
        registry: Arc<ThingRegistry>,
        catalog: Arc<C>,
        status: SharedStatus,
    ) -> Self
    where
        C: CatalogClient + 'static,
    {
        let (shutdown, signal) = watch::channel(false);
        let task = tokio::spawn(run(identity, registry, catalog, status, signal));
        Self {
            shutdown,
            _task: task,
        }
    }

    /// Ask the loop to stop before its next tick.
    ///
    /// A registration already in flight is allowed to finish on its own.
    pub(crate) fn stop(self) {
        drop(self);
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

async fn run<C>(
    identity: Arc<GatewayIdentity>,
    registry: Arc<ThingRegistry>,
    catalog: Arc<C>,
    status: SharedStatus,
    mut signal: watch::Receiver<bool>,
) where
    C: CatalogClient,
{
    let mut ticker = tokio::time::interval(REGISTRATION_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = signal.changed() => break,
            _ = ticker.tick() => {}
        }
        register_once(&identity, &registry, catalog.as_ref(), &status).await;
    }

    tracing::debug!(gateway = %identity.name, "registration loop stopped");
}

/// Perform one registration attempt and record its outcome.
pub(crate) async fn register_once<C>(
    identity: &GatewayIdentity,
    registry: &ThingRegistry,
    catalog: &C,
    status: &Mutex<RegistrationStatus>,
) where
    C: CatalogClient + ?Sized,
{
    let document = identity.document(registry.snapshot());
    let sensors = document.sensors.len();
    let attempted_at = now();
    let result = catalog.register(&document).await;

    let mut status = status.lock().unwrap_or_else(PoisonError::into_inner);
    status.attempts += 1;
    status.last_attempt_at = Some(attempted_at);
    match result {
        Ok(()) => {
            tracing::info!(gateway = %identity.name, sensors, "gateway registered");
            status.successes += 1;
            status.last_success_at = Some(attempted_at);
            status.last_error = None;
        }
        Err(err) => {
            tracing::warn!(gateway = %identity.name, error = %err, "failed to register gateway");
            status.failures += 1;
            status.last_error = Some(error_chain(&err));
        }
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
