// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Method calls, results, and the channel dispatch table.

use std::collections::HashMap;
use std::sync::Arc;

use scanx_core::error::{Result, ScanxError};
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use crate::codec;
use crate::traits::MethodCallHandler;
use crate::value::MessageValue;

/// One invocation on a channel: a method name and its arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub method: String,
    pub arguments: MessageValue,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: MessageValue) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }

    /// A named argument. Absent when the arguments are not a map, the key is
    /// missing, or the value is null.
    pub fn argument(&self, name: &str) -> Option<&MessageValue> {
        self.arguments.get(name).filter(|v| !v.is_null())
    }
}

/// The single completion of a method call.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodResult {
    Success(MessageValue),
    Error {
        code: String,
        message: Option<String>,
        details: MessageValue,
    },
    /// The channel has no such method (or no handler at all).
    NotImplemented,
}

impl MethodResult {
    /// Error result carrying the error's channel code and message, with no
    /// details payload.
    pub fn from_error(err: &ScanxError) -> Self {
        MethodResult::Error {
            code: err.code().to_owned(),
            message: Some(err.channel_message()),
            details: MessageValue::Null,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, MethodResult::Success(_))
    }

    /// Short label for logs.
    fn outcome(&self) -> &str {
        match self {
            MethodResult::Success(_) => "success",
            MethodResult::Error { code, .. } => code,
            MethodResult::NotImplemented => "not-implemented",
        }
    }
}

impl<T: Into<MessageValue>> From<Result<T>> for MethodResult {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(value) => MethodResult::Success(value.into()),
            Err(err) => MethodResult::from_error(&err),
        }
    }
}

/// Channel handlers keyed by channel name.
///
/// Built once at startup by the owning process, then only read.
#[derive(Default)]
pub struct ChannelRegistry {
    handlers: HashMap<String, Arc<dyn MethodCallHandler>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `handler` for `channel`, replacing and returning any earlier one.
    pub fn register(
        &mut self,
        channel: impl Into<String>,
        handler: Arc<dyn MethodCallHandler>,
    ) -> Option<Arc<dyn MethodCallHandler>> {
        let channel = channel.into();
        let previous = self.handlers.insert(channel.clone(), handler);
        if previous.is_some() {
            warn!(channel = %channel, "Replaced existing channel handler");
        } else {
            info!(channel = %channel, "Channel handler registered");
        }
        previous
    }

    /// Registered channel names, sorted.
    pub fn channels(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Route a call to its channel's handler. Unregistered channels answer
    /// "not implemented".
    pub fn dispatch(&self, channel: &str, call: &MethodCall) -> MethodResult {
        let call_id = Uuid::new_v4();
        let span = info_span!("method_call", %call_id, channel, method = %call.method);
        let _guard = span.enter();

        let result = match self.handlers.get(channel) {
            Some(handler) => handler.on_method_call(call),
            None => {
                warn!("No handler registered for channel");
                MethodResult::NotImplemented
            }
        };
        debug!(outcome = result.outcome(), "Method call completed");
        result
    }

    /// Decode a standard-codec method call, dispatch it, and encode the reply
    /// envelope.
    pub fn handle_message(&self, channel: &str, message: &[u8]) -> Result<Vec<u8>> {
        let call = codec::decode_method_call(message)?;
        let result = self.dispatch(channel, &call);
        Ok(codec::encode_reply(&result))
    }
}

impl std::fmt::Debug for ChannelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelRegistry")
            .field("channels", &self.channels())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo(call: &MethodCall) -> MethodResult {
        MethodResult::Success(MessageValue::String(call.method.clone()))
    }

    #[test]
    fn dispatch_routes_by_channel() {
        let mut registry = ChannelRegistry::new();
        registry.register("echo", Arc::new(echo));

        let call = MethodCall::new("ping", MessageValue::Null);
        assert_eq!(
            registry.dispatch("echo", &call),
            MethodResult::Success(MessageValue::String("ping".into()))
        );
    }

    #[test]
    fn unknown_channel_is_not_implemented() {
        let registry = ChannelRegistry::new();
        let call = MethodCall::new("ping", MessageValue::Null);
        assert_eq!(registry.dispatch("nope", &call), MethodResult::NotImplemented);
    }

    #[test]
    fn reregistering_replaces_handler() {
        let mut registry = ChannelRegistry::new();
        assert!(registry.register("c", Arc::new(echo)).is_none());
        let replaced = registry.register(
            "c",
            Arc::new(|_: &MethodCall| MethodResult::NotImplemented),
        );
        assert!(replaced.is_some());
        assert_eq!(registry.channels(), vec!["c"]);

        let call = MethodCall::new("ping", MessageValue::Null);
        assert_eq!(registry.dispatch("c", &call), MethodResult::NotImplemented);
    }

    #[test]
    fn null_argument_counts_as_absent() {
        let call = MethodCall::new(
            "m",
            MessageValue::map([("image", MessageValue::Null), ("n", MessageValue::Int32(1))]),
        );
        assert!(call.argument("image").is_none());
        assert_eq!(call.argument("n"), Some(&MessageValue::Int32(1)));
    }

    #[test]
    fn error_result_uses_channel_code() {
        let result = MethodResult::from_error(&ScanxError::NoImage);
        assert_eq!(
            result,
            MethodResult::Error {
                code: "NO_IMAGE".into(),
                message: Some("No image provided".into()),
                details: MessageValue::Null,
            }
        );
    }

    #[test]
    fn handle_message_rejects_runaway_nesting() {
        let mut registry = ChannelRegistry::new();
        registry.register("echo", Arc::new(echo));

        let mut message = vec![7, 4];
        message.extend_from_slice(b"ping");
        message.extend([12u8, 1].repeat(200_000));
        message.push(0);
        assert!(matches!(
            registry.handle_message("echo", &message),
            Err(ScanxError::Codec(_))
        ));
    }

    #[test]
    fn handle_message_rejects_garbage() {
        let registry = ChannelRegistry::new();
        assert!(matches!(
            registry.handle_message("c", &[0xFF]),
            Err(ScanxError::Codec(_))
        ));
    }
}
