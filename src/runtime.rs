//! Concurrent channel runtime.
//!
//! Every front end (console, HTTP) is a [`Component`]: it captures the
//! shared state it needs when constructed and is then driven by
//! [`spawn_components`] until the shared shutdown token fires or its own
//! work ends.

use std::future::Future;
use std::pin::Pin;

use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::AppError;

pub type ComponentFuture = Pin<Box<dyn Future<Output = Result<(), AppError>> + Send + 'static>>;

/// An independently running front end.
pub trait Component: Send + 'static {
    /// Stable name for log lines.
    fn id(&self) -> &str;

    /// Consume the component and return its run loop. The loop must return
    /// once `shutdown` is cancelled.
    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture;
}

/// Handle to a set of running components. Await [`RuntimeHandle::join`] to
/// wait for all of them.
pub struct RuntimeHandle {
    inner: JoinHandle<Result<(), AppError>>,
}

impl RuntimeHandle {
    /// Resolve once every component has exited, yielding the first error.
    pub async fn join(self) -> Result<(), AppError> {
        match self.inner.await {
            Ok(r) => r,
            Err(e) => Err(AppError::Comms(format!("runtime task panicked: {e}"))),
        }
    }
}

/// Spawn each component on its own task.
///
/// The first component to fail (or panic) cancels `shutdown`, so the rest
/// wind down too. A component that exits cleanly leaves its siblings
/// running. With no components the handle resolves once `shutdown` fires.
pub fn spawn_components(components: Vec<Box<dyn Component>>, shutdown: CancellationToken) -> RuntimeHandle {
    let inner = tokio::spawn(async move {
        if components.is_empty() {
            info!("no channels enabled; idling until shutdown");
            shutdown.cancelled().await;
            return Ok(());
        }

        let mut set: JoinSet<Result<(), AppError>> = JoinSet::new();
        for component in components {
            debug!(component = component.id(), "spawning component");
            set.spawn(component.run(shutdown.clone()));
        }

        let mut first_err: Option<AppError> = None;
        while let Some(res) = set.join_next().await {
            match res {
                Err(e) => {
                    error!("component panicked: {e}");
                    shutdown.cancel();
                    first_err.get_or_insert_with(|| AppError::Comms(format!("component panicked: {e}")));
                }
                Ok(Err(e)) => {
                    error!(error = %e, "component failed");
                    shutdown.cancel();
                    first_err.get_or_insert(e);
                }
                Ok(Ok(())) => {}
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    });

    RuntimeHandle { inner }
}
