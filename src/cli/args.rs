//! Command-line argument parsing for PlantDoc
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::PipelineConfig;

/// PlantDoc - Plant care diagnosis from photos
#[derive(Parser, Debug)]
#[command(name = "plantdoc")]
#[command(version = "0.3.0")]
#[command(about = "Diagnose plant health from photos with vision language models", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the API base URL
    #[arg(long, value_name = "URL")]
    pub api_base: Option<String>,

    /// Override the vision model
    #[arg(short, long)]
    pub model: Option<String>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress all output except results)
    #[arg(short, long)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check photo framing before spending a diagnosis on it
    Check {
        /// Path to the plant photo
        #[arg(value_name = "IMAGE")]
        image: PathBuf,
    },

    /// Diagnose plant health from a photo
    Diagnose {
        /// Path to the plant photo
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// Symptoms the owner has noticed
        #[arg(short, long)]
        symptoms: Option<String>,

        /// Diagnoses this user has already received, for explanation level
        #[arg(long, default_value_t = 0)]
        count: u32,

        /// Diagnose even when the photo fails the quality check
        #[arg(long)]
        force: bool,
    },

    /// Quick care tips for a plant type
    Tips {
        /// Plant name or species
        #[arg(value_name = "PLANT")]
        plant: String,
    },

    /// Run environment diagnostics and health checks
    Doctor,

    /// Display current configuration
    Config,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }

    /// Load configuration, honoring the path and field overrides
    pub fn load_config(&self) -> anyhow::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load_from(path)?,
            None => PipelineConfig::load()?,
        };

        self.apply_overrides(&mut config);
        Ok(config)
    }

    /// Push flag-level overrides into a loaded configuration
    pub fn apply_overrides(&self, config: &mut PipelineConfig) {
        if let Some(base) = &self.api_base {
            config.api.base_url = base.clone();
        }
        if let Some(model) = &self.model {
            config.models.vision = model.clone();
        }
    }
}

impl Verbosity {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Normal => "normal",
            Verbosity::Verbose => "verbose",
            Verbosity::VeryVerbose => "very_verbose",
        }
    }

    /// Tracing level for the log filter
    pub fn log_level(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "info",
            Verbosity::VeryVerbose => "debug",
        }
    }

    /// Check if should show progress spinners
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }

    /// Check if should show the session stats summary
    pub fn show_stats(&self) -> bool {
        matches!(self, Verbosity::Verbose | Verbosity::VeryVerbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_with(verbose: u8, quiet: bool) -> Args {
        Args {
            config: None,
            api_base: None,
            model: None,
            verbose,
            quiet,
            command: Commands::Doctor,
        }
    }

    #[test]
    fn test_verbosity_quiet() {
        assert_eq!(args_with(0, true).verbosity(), Verbosity::Quiet);
    }

    #[test]
    fn test_verbosity_normal() {
        assert_eq!(args_with(0, false).verbosity(), Verbosity::Normal);
    }

    #[test]
    fn test_verbosity_verbose() {
        assert_eq!(args_with(1, false).verbosity(), Verbosity::Verbose);
    }

    #[test]
    fn test_verbosity_very_verbose() {
        assert_eq!(args_with(2, false).verbosity(), Verbosity::VeryVerbose);
    }

    #[test]
    fn test_quiet_wins_over_verbose() {
        assert_eq!(args_with(3, true).verbosity(), Verbosity::Quiet);
    }

    #[test]
    fn test_overrides_reach_the_config() {
        let mut args = args_with(0, false);
        args.api_base = Some("http://localhost:8080/v1".to_string());
        args.model = Some("llava-v1.5-7b".to_string());

        let mut config = PipelineConfig::default();
        args.apply_overrides(&mut config);

        assert_eq!(config.api.base_url, "http://localhost:8080/v1");
        assert_eq!(config.models.vision, "llava-v1.5-7b");
    }

    #[test]
    fn test_no_overrides_leave_config_alone() {
        let args = args_with(0, false);
        let mut config = PipelineConfig::default();
        let before = config.models.vision.clone();

        args.apply_overrides(&mut config);
        assert_eq!(config.models.vision, before);
    }

    #[test]
    fn test_verbosity_methods() {
        assert!(!Verbosity::Quiet.show_progress());
        assert!(Verbosity::Normal.show_progress());

        assert!(!Verbosity::Normal.show_stats());
        assert!(Verbosity::Verbose.show_stats());

        assert_eq!(Verbosity::Quiet.log_level(), "error");
        assert_eq!(Verbosity::VeryVerbose.log_level(), "debug");
    }
}
