// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Android entry points via JNI.
//
// The host app declares a `com.example.scanx.ScanxNative` class with these
// static natives:
//
//   static native boolean configure(String configJson);
//   static native byte[] processDocument(byte[] image);
//   static native byte[] handleMessage(String channel, byte[] message);
//
// `handleMessage` carries standard-codec method calls from the plugin's
// `MethodChannel` handler and returns the encoded reply envelope. Errors that
// cannot be expressed as a reply throw `IllegalArgumentException` with a
// `"<CODE>: <message>"` string.

#![cfg(target_os = "android")]

use std::sync::OnceLock;

use jni::JNIEnv;
use jni::objects::{JByteArray, JClass, JString};
use jni::sys::{JNI_FALSE, JNI_TRUE, jboolean, jbyteArray};

use scanx_core::config::ScanConfig;
use scanx_core::error::{Result, ScanxError};
use scanx_document::DocumentScanner;

use crate::channel::ChannelRegistry;
use crate::scanx_cv::register_channels;

const ILLEGAL_ARGUMENT: &str = "java/lang/IllegalArgumentException";
const ILLEGAL_STATE: &str = "java/lang/IllegalStateException";

/// Process-wide native state, built on first use or by `configure`.
struct NativeState {
    registry: ChannelRegistry,
    scanner: DocumentScanner,
}

impl NativeState {
    fn build(config: ScanConfig) -> Result<Self> {
        let mut registry = ChannelRegistry::new();
        register_channels(&mut registry, &config)?;
        Ok(Self {
            registry,
            scanner: DocumentScanner::new(config)?,
        })
    }
}

static STATE: OnceLock<NativeState> = OnceLock::new();

fn state() -> Result<&'static NativeState> {
    if let Some(state) = STATE.get() {
        return Ok(state);
    }
    let built = NativeState::build(ScanConfig::default())?;
    Ok(STATE.get_or_init(|| built))
}

/// Convenience: map any `jni::errors::Error` into `ScanxError::Bridge`.
fn jni_err(context: &str, e: jni::errors::Error) -> ScanxError {
    ScanxError::Bridge(format!("{context}: {e}"))
}

fn read_bytes(env: &JNIEnv<'_>, array: &JByteArray<'_>) -> Result<Vec<u8>> {
    if array.is_null() {
        return Ok(Vec::new());
    }
    env.convert_byte_array(array)
        .map_err(|e| jni_err("convert_byte_array", e))
}

fn read_string(env: &mut JNIEnv<'_>, s: &JString<'_>) -> Result<String> {
    if s.is_null() {
        return Err(ScanxError::InvalidArgument {
            argument: "string".into(),
            reason: "null".into(),
        });
    }
    env.get_string(s)
        .map(Into::into)
        .map_err(|e| jni_err("get_string", e))
}

/// Hand `bytes` back to Java, or throw and return null.
fn finish(env: &mut JNIEnv<'_>, outcome: Result<Vec<u8>>) -> jbyteArray {
    let bytes = match outcome {
        Ok(bytes) => bytes,
        Err(err) => {
            throw(env, ILLEGAL_ARGUMENT, &err);
            return std::ptr::null_mut();
        }
    };
    match env.byte_array_from_slice(&bytes) {
        Ok(array) => array.into_raw(),
        Err(e) => {
            throw(env, ILLEGAL_STATE, &jni_err("byte_array_from_slice", e));
            std::ptr::null_mut()
        }
    }
}

fn throw(env: &mut JNIEnv<'_>, class: &str, err: &ScanxError) {
    tracing::warn!(code = err.code(), error = %err, "Android: throwing to Java");
    let message = format!("{}: {}", err.code(), err.channel_message());
    if let Err(e) = env.throw_new(class, message) {
        tracing::error!(error = %e, "Android: failed to throw Java exception");
    }
}

/// `ScanxNative.configure(String)`: install a JSON `ScanConfig` before first
/// use. Returns false when the state already exists.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_example_scanx_ScanxNative_configure<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    config_json: JString<'local>,
) -> jboolean {
    let outcome = read_string(&mut env, &config_json).and_then(|json| {
        let config: ScanConfig = serde_json::from_str(&json)?;
        NativeState::build(config)
    });
    match outcome {
        Ok(built) => {
            if STATE.set(built).is_ok() {
                tracing::info!("Android: native state configured");
                JNI_TRUE
            } else {
                tracing::warn!("Android: configure called after first use; ignored");
                JNI_FALSE
            }
        }
        Err(err) => {
            throw(&mut env, ILLEGAL_ARGUMENT, &err);
            JNI_FALSE
        }
    }
}

/// `ScanxNative.processDocument(byte[])`: run the processor directly.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_example_scanx_ScanxNative_processDocument<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    image: JByteArray<'local>,
) -> jbyteArray {
    let outcome = read_bytes(&env, &image).and_then(|bytes| {
        tracing::info!(bytes = bytes.len(), "Android: processDocument");
        state()?.scanner.process(&bytes)
    });
    finish(&mut env, outcome)
}

/// `ScanxNative.handleMessage(String, byte[])`: decode a method call, route
/// it, and return the encoded reply envelope.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_example_scanx_ScanxNative_handleMessage<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    channel: JString<'local>,
    message: JByteArray<'local>,
) -> jbyteArray {
    let outcome = read_string(&mut env, &channel).and_then(|channel| {
        let message = read_bytes(&env, &message)?;
        state()?.registry.handle_message(&channel, &message)
    });
    finish(&mut env, outcome)
}
