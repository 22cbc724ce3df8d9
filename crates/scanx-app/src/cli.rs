// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line surface of the `scanx` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use scanx_core::config::{Enhancement, OutputFormat, ProcessingMode};

#[derive(Parser, Debug)]
#[command(name = "scanx")]
#[command(version, about = "Crop and flatten photographed documents")]
pub struct Cli {
    /// Debug-level logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send an image through the scanx_cv channel and write the result
    Process {
        /// Encoded input image
        input: PathBuf,

        /// Where to write the processed image
        #[arg(short, long)]
        output: PathBuf,

        /// JSON configuration file [default: $SCANX_CONFIG, then built-in]
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        #[arg(long, value_enum)]
        format: Option<FormatArg>,

        #[arg(long, value_enum)]
        enhance: Option<EnhanceArg>,

        /// Print a JSON processing report to stdout
        #[arg(long)]
        report: bool,
    },

    /// Print the detected document corners as JSON
    Detect {
        input: PathBuf,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the effective configuration as JSON
    Config {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeArg {
    Scan,
    PassThrough,
}

impl From<ModeArg> for ProcessingMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Scan => ProcessingMode::Scan,
            ModeArg::PassThrough => ProcessingMode::PassThrough,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatArg {
    Same,
    Png,
    Jpeg,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Same => OutputFormat::SameAsInput,
            FormatArg::Png => OutputFormat::Png,
            FormatArg::Jpeg => OutputFormat::Jpeg,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnhanceArg {
    None,
    Grayscale,
    Contrast,
    Binarize,
    Otsu,
}

impl EnhanceArg {
    /// Map to an [`Enhancement`], keeping parameters from `current` when it is
    /// already the same kind.
    pub fn resolve(self, current: Enhancement) -> Enhancement {
        match (self, current) {
            (EnhanceArg::Contrast, c @ Enhancement::Contrast { .. }) => c,
            (EnhanceArg::Binarize, b @ Enhancement::Binarize { .. }) => b,
            (EnhanceArg::None, _) => Enhancement::None,
            (EnhanceArg::Grayscale, _) => Enhancement::Grayscale,
            (EnhanceArg::Contrast, _) => Enhancement::Contrast { factor: 1.5 },
            (EnhanceArg::Binarize, _) => Enhancement::Binarize {
                block_radius: 15,
                c: 10,
            },
            (EnhanceArg::Otsu, _) => Enhancement::Otsu,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_process_flags() {
        let cli = Cli::try_parse_from([
            "scanx", "-v", "process", "in.jpg", "-o", "out.png", "--mode", "pass-through",
            "--format", "png", "--enhance", "otsu", "--report",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::Process {
                input,
                output,
                mode,
                format,
                enhance,
                report,
                config,
            } => {
                assert_eq!(input, PathBuf::from("in.jpg"));
                assert_eq!(output, PathBuf::from("out.png"));
                assert_eq!(mode, Some(ModeArg::PassThrough));
                assert_eq!(format, Some(FormatArg::Png));
                assert_eq!(enhance, Some(EnhanceArg::Otsu));
                assert!(report);
                assert!(config.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn process_requires_output() {
        assert!(Cli::try_parse_from(["scanx", "process", "in.jpg"]).is_err());
    }

    #[test]
    fn enhance_keeps_configured_parameters() {
        let configured = Enhancement::Binarize {
            block_radius: 7,
            c: 3,
        };
        assert_eq!(EnhanceArg::Binarize.resolve(configured), configured);
        assert_eq!(
            EnhanceArg::Contrast.resolve(configured),
            Enhancement::Contrast { factor: 1.5 }
        );
        assert_eq!(EnhanceArg::None.resolve(configured), Enhancement::None);
    }
}
