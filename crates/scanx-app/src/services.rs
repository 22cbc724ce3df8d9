// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command implementations: configuration lookup and the channel round trip.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use scanx_bridge::scanx_cv::{ARG_IMAGE, CHANNEL, METHOD_PROCESS_DOCUMENT};
use scanx_bridge::{
    BackgroundDispatcher, ChannelRegistry, MessageValue, MethodCall, MethodResult,
    register_channels,
};
use scanx_core::human_errors::{humanize_code, humanize_error};
use scanx_core::{Detection, ScanConfig, ScanReport, ScanxError};
use scanx_document::DocumentScanner;
use tracing::{debug, info};

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV: &str = "SCANX_CONFIG";

/// Failure of a CLI command.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Scan(#[from] ScanxError),

    /// An error envelope returned by the channel.
    #[error("{message}")]
    Channel { code: String, message: String },

    #[error("method not implemented on channel {0}")]
    NotImplemented(String),

    #[error("unexpected {0} result from channel")]
    UnexpectedResult(&'static str),
}

impl AppError {
    pub fn code(&self) -> &str {
        match self {
            AppError::Scan(e) => e.code(),
            AppError::Channel { code, .. } => code,
            AppError::NotImplemented(_) => "NOT_IMPLEMENTED",
            AppError::UnexpectedResult(_) => "INTERNAL",
        }
    }

    /// What the user could try next, when there is advice for this failure.
    pub fn hint(&self) -> Option<String> {
        match self {
            AppError::Scan(e) => Some(humanize_error(e).suggestion),
            AppError::Channel { code, .. } => humanize_code(code).map(|h| h.suggestion),
            AppError::NotImplemented(_) | AppError::UnexpectedResult(_) => None,
        }
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;

/// Resolve the effective configuration: `explicit`, then `$SCANX_CONFIG`,
/// then built-in defaults.
pub fn resolve_config(explicit: Option<&Path>) -> AppResult<ScanConfig> {
    resolve_config_from(explicit, std::env::var_os(CONFIG_ENV))
}

fn resolve_config_from(explicit: Option<&Path>, env: Option<OsString>) -> AppResult<ScanConfig> {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(|| env.filter(|v| !v.is_empty()).map(PathBuf::from));
    match path {
        Some(path) => {
            debug!(path = %path.display(), "Using config file");
            Ok(ScanConfig::load(&path)?)
        }
        None => {
            debug!("Using built-in configuration");
            Ok(ScanConfig::default())
        }
    }
}

/// Send `input` through the `scanx_cv` channel as a `processDocument` call,
/// off the calling task, and write the returned bytes to `output`.
pub async fn process_file(config: &ScanConfig, input: &Path, output: &Path) -> AppResult<usize> {
    let image = std::fs::read(input).map_err(ScanxError::from)?;
    info!(input = %input.display(), bytes = image.len(), "Processing document");

    let mut registry = ChannelRegistry::new();
    register_channels(&mut registry, config)?;
    let dispatcher = BackgroundDispatcher::current(Arc::new(registry))?;

    let call = MethodCall::new(
        METHOD_PROCESS_DOCUMENT,
        MessageValue::map([(ARG_IMAGE, MessageValue::Bytes(image))]),
    );
    let bytes = match dispatcher.invoke(CHANNEL, call).wait().await? {
        MethodResult::Success(MessageValue::Bytes(bytes)) => bytes,
        MethodResult::Success(other) => return Err(AppError::UnexpectedResult(other.type_name())),
        MethodResult::Error { code, message, .. } => {
            return Err(AppError::Channel {
                message: message.unwrap_or_else(|| code.clone()),
                code,
            });
        }
        MethodResult::NotImplemented => return Err(AppError::NotImplemented(CHANNEL.into())),
    };

    std::fs::write(output, &bytes).map_err(ScanxError::from)?;
    info!(output = %output.display(), bytes = bytes.len(), "Wrote processed document");
    Ok(bytes.len())
}

/// Run the scanner directly on `input`, write the result, and return the
/// processing report.
pub async fn process_file_with_report(
    config: &ScanConfig,
    input: &Path,
    output: &Path,
) -> AppResult<ScanReport> {
    let image = std::fs::read(input).map_err(ScanxError::from)?;
    let scanner = DocumentScanner::new(config.clone())?;
    let (bytes, report) = tokio::task::spawn_blocking(move || scanner.process_with_report(&image))
        .await
        .map_err(|e| ScanxError::Bridge(format!("scanner task failed: {e}")))??;
    std::fs::write(output, &bytes).map_err(ScanxError::from)?;
    info!(output = %output.display(), bytes = bytes.len(), "Wrote processed document");
    Ok(report)
}

/// Locate the document in `input` without transforming it.
pub fn detect_file(config: &ScanConfig, input: &Path) -> AppResult<Detection> {
    let image = std::fs::read(input).map_err(ScanxError::from)?;
    let scanner = DocumentScanner::new(config.clone())?;
    Ok(scanner.detect(&image)?)
}
