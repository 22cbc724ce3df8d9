// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Off-thread dispatch: run a method call on tokio's blocking pool and hand
// the caller a one-shot result handle.

use std::sync::Arc;

use scanx_core::error::{Result, ScanxError};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::channel::{ChannelRegistry, MethodCall, MethodResult};

/// Completion of one background call. Resolves exactly once.
#[derive(Debug)]
pub struct ResultHandle {
    rx: oneshot::Receiver<MethodResult>,
}

impl ResultHandle {
    /// Await the result from async code.
    pub async fn wait(self) -> Result<MethodResult> {
        self.rx.await.map_err(|_| dropped())
    }

    /// Block the current thread until the result arrives. Must not be called
    /// from inside the runtime's async context.
    pub fn blocking_wait(self) -> Result<MethodResult> {
        self.rx.blocking_recv().map_err(|_| dropped())
    }
}

fn dropped() -> ScanxError {
    ScanxError::Bridge("method call worker exited without a result".into())
}

/// Runs registry dispatches on the runtime's blocking pool so image work
/// never occupies the caller's thread.
#[derive(Debug, Clone)]
pub struct BackgroundDispatcher {
    registry: Arc<ChannelRegistry>,
    runtime: Handle,
}

impl BackgroundDispatcher {
    pub fn new(registry: Arc<ChannelRegistry>, runtime: Handle) -> Self {
        Self { registry, runtime }
    }

    /// Bind to the runtime of the calling async context.
    pub fn current(registry: Arc<ChannelRegistry>) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| ScanxError::Bridge(format!("no tokio runtime: {e}")))?;
        Ok(Self::new(registry, runtime))
    }

    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }

    /// Queue `call` for `channel` and return its result handle.
    pub fn invoke(&self, channel: impl Into<String>, call: MethodCall) -> ResultHandle {
        let (tx, rx) = oneshot::channel();
        self.invoke_with(channel, call, move |result| {
            if tx.send(result).is_err() {
                debug!("Result handle dropped before completion");
            }
        });
        ResultHandle { rx }
    }

    /// Queue `call` for `channel` and pass its result to `callback` on the
    /// worker thread.
    pub fn invoke_with<F>(&self, channel: impl Into<String>, call: MethodCall, callback: F)
    where
        F: FnOnce(MethodResult) + Send + 'static,
    {
        let registry = Arc::clone(&self.registry);
        let channel = channel.into();
        let task = self.runtime.spawn_blocking(move || {
            let result = registry.dispatch(&channel, &call);
            callback(result);
        });
        self.runtime.spawn(async move {
            if let Err(e) = task.await {
                warn!(error = %e, "Method call worker failed");
            }
        });
    }
}
