// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanx: document scanning from the command line.
//
// Entry point. Initialises logging, resolves configuration, and drives the
// scanx_cv channel the same way the mobile shell does.

mod cli;
mod services;

use std::process::ExitCode;

use clap::Parser;

use cli::{Cli, Command};
use services::{AppError, AppResult};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(code = err.code(), error = %err, "Command failed");
            eprintln!("error[{}]: {}", err.code(), err);
            if let Some(hint) = err.hint() {
                eprintln!("hint: {hint}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> AppResult<()> {
    match command {
        Command::Process {
            input,
            output,
            config,
            mode,
            format,
            enhance,
            report,
        } => {
            let mut config = services::resolve_config(config.as_deref())?;
            if let Some(mode) = mode {
                config.mode = mode.into();
            }
            if let Some(format) = format {
                config.output_format = format.into();
            }
            if let Some(enhance) = enhance {
                config.enhancement = enhance.resolve(config.enhancement);
            }
            config.validate()?;

            if report {
                let report = services::process_file_with_report(&config, &input, &output).await?;
                println!("{}", to_json(&report)?);
            } else {
                services::process_file(&config, &input, &output).await?;
            }
        }
        Command::Detect { input, config } => {
            let config = services::resolve_config(config.as_deref())?;
            let detection = services::detect_file(&config, &input)?;
            println!("{}", to_json(&detection)?);
        }
        Command::Config { config } => {
            let config = services::resolve_config(config.as_deref())?;
            println!("{}", to_json(&config)?);
        }
    }
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T) -> AppResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| AppError::Scan(e.into()))
}
