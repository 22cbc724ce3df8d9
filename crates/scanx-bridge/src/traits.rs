// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic handler trait for method channels.

use crate::channel::{MethodCall, MethodResult};

/// Native side of one method channel.
///
/// A handler answers every call with exactly one [`MethodResult`]. Handlers
/// are shared across threads by the registry and the background dispatcher,
/// so they must be `Send + Sync` and must not rely on being called from any
/// particular thread.
pub trait MethodCallHandler: Send + Sync {
    /// Answer one call. Unknown method names answer
    /// [`MethodResult::NotImplemented`].
    fn on_method_call(&self, call: &MethodCall) -> MethodResult;
}

impl<F> MethodCallHandler for F
where
    F: Fn(&MethodCall) -> MethodResult + Send + Sync,
{
    fn on_method_call(&self, call: &MethodCall) -> MethodResult {
        self(call)
    }
}
