// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanx-bridge: the native side of the app shell's method channels.
//
// Calls arrive as standard-codec messages (see `codec`), are routed by
// channel name through a `ChannelRegistry`, and are answered by a
// `MethodCallHandler`. The `scanx_cv` channel is the only one shipped;
// `register_channels` installs it at startup.

pub mod channel;
pub mod codec;
pub mod dispatch;
pub mod scanx_cv;
pub mod traits;
pub mod value;

#[cfg(target_os = "android")]
pub mod android;

pub use channel::{ChannelRegistry, MethodCall, MethodResult};
pub use dispatch::{BackgroundDispatcher, ResultHandle};
pub use scanx_cv::{ChannelRequest, ScanxCvHandler, register_channels};
pub use traits::MethodCallHandler;
pub use value::MessageValue;
