// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// On-device retrieval-augmented chat
#[derive(Parser, Debug)]
#[command(name = "rag-chat")]
#[command(version)]
#[command(about = "Rank local documents and chat with a GGUF model over them", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rank documents against a query
    Search(commands::SearchArgs),

    /// Print the retrieval-augmented prompt for a query
    Prompt(commands::SearchArgs),

    /// Answer a query with a local model
    Chat(commands::ChatArgs),
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Search(args) => commands::search(args).await,
        Commands::Prompt(args) => commands::prompt(args).await,
        Commands::Chat(args) => commands::chat(args).await,
    }
}
