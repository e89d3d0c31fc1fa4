//! PUMA operator CLI.
//!
//! # Quick Start
//!
//! ```bash
//! # Check an application policy before deploying it
//! puma policy check policies/application-policy.xml
//!
//! # Ask the central decision point directly
//! puma probe --transport binary --attr subject:roles=helpdesk --attr action:id=read
//!
//! # Show the effective configuration
//! puma config show
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use puma_config::TransportKind;

/// PUMA - attribute-based authorization with central escalation.
#[derive(Parser)]
#[command(name = "puma")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Application policy commands.
    #[command(subcommand)]
    Policy(PolicyCommands),

    /// Ask the central decision point for a decision through one transport.
    Probe {
        /// Transport to reach the central decision point with.
        #[arg(short, long, value_enum, default_value = "binary")]
        transport: ProbeTransport,

        /// Policy reference to evaluate (defaults to the first supported id).
        #[arg(short, long)]
        reference: Option<String>,

        /// Attribute as id=value; repeat an id to send several values.
        /// `action:id` defaults to "probe".
        #[arg(short, long = "attr", value_name = "ID=VALUE")]
        attrs: Vec<String>,

        /// Project directory to load configuration from.
        #[arg(short, long, default_value = ".")]
        dir: String,
    },

    /// Configuration commands.
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum PolicyCommands {
    /// Parse a policy file and list its remote references.
    Check {
        /// Policy file.
        file: String,

        /// Fail unless the policy declares this id.
        #[arg(short, long)]
        expected_id: Option<String>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration as TOML.
    Show {
        /// Project directory.
        #[arg(short, long, default_value = ".")]
        dir: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ProbeTransport {
    Binary,
    Rest,
}

impl From<ProbeTransport> for TransportKind {
    fn from(transport: ProbeTransport) -> Self {
        match transport {
            ProbeTransport::Binary => Self::Binary,
            ProbeTransport::Rest => Self::Rest,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Policy(PolicyCommands::Check { file, expected_id }) => {
            commands::policy::check(&file, expected_id.as_deref())
        }
        Commands::Probe {
            transport,
            reference,
            attrs,
            dir,
        } => commands::probe::run(&dir, transport.into(), reference.as_deref(), &attrs),
        Commands::Config(ConfigCommands::Show { dir }) => commands::config::show(&dir),
    }
}
