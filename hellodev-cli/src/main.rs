// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! hellodev CLI
//!
//! Loads the device into an in-memory registration host and drives client
//! sessions against its node.

use clap::{Parser, Subcommand};

mod commands;
mod error;

/// hellodev - shared-buffer character device
#[derive(Parser)]
#[command(name = "hellodev")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Module parameter file (YAML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Instance id, overrides the file (`param=` module argument)
    #[arg(short, long)]
    pub param: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register the device, print its status, and unregister it
    Load {
        /// Print the status as JSON
        #[arg(long)]
        json: bool,

        /// Make one registration step fail, to exercise rollback
        #[arg(long, value_enum)]
        fail: Option<commands::load::FailStep>,
    },

    /// Write text through one session and read it back through another
    Echo {
        /// Text to write
        text: String,
    },

    /// Run concurrent writers on disjoint ranges and verify the buffer
    Stress {
        /// Number of concurrent writer sessions
        #[arg(short, long, default_value_t = 8)]
        writers: usize,

        /// Bytes per write call
        #[arg(long, default_value_t = 64)]
        chunk: usize,
    },

    /// Validate a module parameter file
    Validate {
        /// Path to the parameter file
        file: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(log_level).init();

    let params = commands::resolve_params(cli.config.as_deref(), cli.param.as_deref())?;

    // Dispatch to command handlers
    match cli.command {
        Commands::Load { json, fail } => commands::load::execute(params, json, fail).await,
        Commands::Echo { text } => commands::echo::execute(params, &text).await,
        Commands::Stress { writers, chunk } => {
            commands::stress::execute(params, writers, chunk).await
        }
        Commands::Validate { file } => commands::validate::execute(&file).await,
    }
}
