// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::config::ModelSettings;
use crate::rag::{compose, DocumentStore, FileTextSource, Retriever, TextSource, DEFAULT_TOP_K};

/// Arguments for the search and prompt commands
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Document to index (repeatable)
    #[arg(long = "doc", required = true)]
    pub docs: Vec<PathBuf>,

    /// Number of documents to retrieve
    #[arg(long, default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,

    /// Print machine-readable JSON
    #[arg(long)]
    pub json: bool,

    pub query: String,
}

/// Arguments for the chat command
#[derive(Args, Debug)]
pub struct ChatArgs {
    /// GGUF model file
    #[arg(long, env = "RAG_MODEL_PATH")]
    pub model: PathBuf,

    /// Document to index (repeatable)
    #[arg(long = "doc")]
    pub docs: Vec<PathBuf>,

    /// TOML settings file; the environment is used when absent
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Augment the prompt with retrieved documents
    #[arg(long)]
    pub rag: bool,

    pub query: String,
}

#[derive(Serialize)]
struct SearchHit<'a> {
    rank: usize,
    score: f32,
    name: &'a str,
    source_path: &'a str,
}

async fn index(docs: &[PathBuf]) -> Result<Arc<DocumentStore>> {
    let store = Arc::new(DocumentStore::new());
    let source = FileTextSource;
    for doc in docs {
        let text = source.read(&doc.to_string_lossy()).await?;
        // Embedding is CPU-bound; keep it off the runtime threads.
        let store = Arc::clone(&store);
        tokio::task::spawn_blocking(move || {
            store.add(text.name, text.source_path, text.content);
        })
        .await?;
    }
    info!(documents = store.count(), "Indexed documents");
    Ok(store)
}

pub async fn search(args: SearchArgs) -> Result<()> {
    let store = index(&args.docs).await?;
    let ranked = Retriever::new(store).rank(&args.query);
    let hits: Vec<SearchHit<'_>> = ranked
        .iter()
        .take(args.top_k)
        .enumerate()
        .map(|(i, scored)| SearchHit {
            rank: i + 1,
            score: scored.score,
            name: &scored.document.name,
            source_path: &scored.document.source_path,
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
    } else if hits.is_empty() {
        println!("No documents");
    } else {
        for hit in &hits {
            println!("{:>2}. {:.4}  {}  ({})", hit.rank, hit.score, hit.name, hit.source_path);
        }
    }
    Ok(())
}

pub async fn prompt(args: SearchArgs) -> Result<()> {
    let store = index(&args.docs).await?;
    let retrieved = Retriever::new(store).search(&args.query, args.top_k);
    let prompt = compose(&args.query, &retrieved);

    if args.json {
        println!("{}", serde_json::json!({ "prompt": prompt }));
    } else {
        println!("{prompt}");
    }
    Ok(())
}

fn load_settings(config: Option<&PathBuf>) -> Result<ModelSettings> {
    match config {
        Some(path) => Ok(ModelSettings::from_file(path)?),
        None => {
            dotenv::dotenv().ok();
            let settings = ModelSettings::from_env();
            settings.validate()?;
            Ok(settings)
        }
    }
}

#[cfg(feature = "llama")]
pub async fn chat(args: ChatArgs) -> Result<()> {
    use futures::StreamExt;
    use std::io::Write;

    use crate::chat::{ChatService, Role};
    use crate::inference::{LlamaConfig, LlamaGenerator};

    let mut settings = load_settings(args.config.as_ref())?;
    settings.enable_rag |= args.rag;

    let config = LlamaConfig {
        context_size: settings.context_length,
        ..LlamaConfig::default()
    };
    let generator = Arc::new(LlamaGenerator::new(config)?);
    let service = ChatService::new(generator, settings);

    for doc in &args.docs {
        service
            .try_add_document(&doc.to_string_lossy())
            .await
            .map_err(|e| anyhow!("{}: {}", doc.display(), e))?;
    }

    if !service.load_model(&args.model).await {
        return Err(anyhow!("Failed to load model {}", args.model.display()));
    }

    let mut snapshots = service
        .send_query(&args.query)
        .ok_or_else(|| anyhow!("Query rejected"))?;

    let mut printed = String::new();
    let mut stdout = std::io::stdout();
    while let Some(snapshot) = snapshots.next().await {
        let Some(last) = snapshot.last().filter(|m| m.role == Role::Assistant) else {
            continue;
        };
        match last.content.strip_prefix(printed.as_str()) {
            Some(delta) => write!(stdout, "{delta}")?,
            None => write!(stdout, "\n{}", last.content)?,
        }
        stdout.flush()?;
        printed = last.content.clone();
    }
    writeln!(stdout)?;

    service.unload_model();
    Ok(())
}

#[cfg(not(feature = "llama"))]
pub async fn chat(args: ChatArgs) -> Result<()> {
    load_settings(args.config.as_ref())?;
    Err(anyhow!(
        "rag-chat was built without llama support; rebuild with --features llama to chat with {}",
        args.model.display()
    ))
}
