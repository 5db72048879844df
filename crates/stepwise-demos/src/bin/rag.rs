//! Retrieval-Augmented Generation Demo
//!
//! Chunk a local text file, embed the chunks, rank them against the
//! question, stuff the best matches into the prompt, and stream the
//! answer.
//!
//! ```text
//! rag notes.txt "What does the document say about transcripts?"
//! ```

use std::io::Write;
use std::sync::Arc;

use futures::StreamExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stepwise_core::message::Message;
use stepwise_core::provider::GenerationOptions;
use stepwise_core::retrieval::{Document, InMemoryVectorStore, Retriever, split_text};
use stepwise_demos::provider_from_env;
use stepwise_runtime::OllamaEmbedder;

const CHUNK_SIZE: usize = 400;
const CHUNK_OVERLAP: usize = 80;
const TOP_K: usize = 2;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let mut args = std::env::args().skip(1);
    let (Some(path), Some(question)) = (args.next(), args.next()) else {
        eprintln!("usage: rag <file> <question>");
        std::process::exit(2);
    };

    // Index the document
    let text = std::fs::read_to_string(&path)?;
    let chunks = split_text(&text, CHUNK_SIZE, CHUNK_OVERLAP);
    tracing::info!(chunks = chunks.len(), %path, "split document");

    let embedder = Arc::new(OllamaEmbedder::from_env());
    let mut store = InMemoryVectorStore::new(embedder);
    store
        .add_documents(
            chunks
                .into_iter()
                .map(|chunk| Document::new(chunk).with_source(path.clone()))
                .collect(),
        )
        .await?;

    // Retrieve context for the question
    let hits = store.search(&question, TOP_K).await?;
    for hit in &hits {
        tracing::debug!(score = hit.score, "retrieved chunk");
    }
    let context: Vec<&str> = hits.iter().map(|h| h.document.content.as_str()).collect();

    // Chunk text can contain anything, so the system message is assembled
    // directly rather than through a placeholder template.
    let system = format!(
        "Answer the user's question using only the provided context.\n\nContext:\n{}",
        context.join("\n---\n")
    );
    let messages = vec![Message::system(system), Message::user(question.as_str())];

    let (provider, model) = provider_from_env();
    let options = GenerationOptions {
        model,
        ..Default::default()
    };

    // Stream the answer as it arrives
    let mut stream = provider.complete_stream(&messages, &options).await?;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        print!("{}", chunk.delta);
        std::io::stdout().flush()?;
        if chunk.done {
            break;
        }
    }
    println!();

    Ok(())
}
