// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Embedding server client CLI
#[derive(Parser, Debug)]
#[command(name = "embedding-cli")]
#[command(version)]
#[command(about = "Client tools for the embedding server", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the effective client config and probe the server
    Doctor(commands::DoctorArgs),

    /// Embed texts and print the vectors as JSON
    Embed(commands::EmbedArgs),
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Doctor(args) => commands::doctor(args).await,
        Commands::Embed(args) => commands::embed(args).await,
    }
}
