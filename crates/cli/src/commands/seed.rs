//! `promptgate seed` — Recreate and populate the handbook collections.
//!
//! Destructive: existing collections of the same names are replaced.

use promptgate_retrieval::seed::{seed_handbook, NEGATIVE_COLLECTION, POSITIVE_COLLECTION};
use promptgate_retrieval::{OpenAiEmbedder, QdrantClient};

pub async fn run(
    qdrant_url: &str,
    qdrant_api_key: Option<&str>,
    openai_key: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let openai_key = openai_key
        .or_else(|| std::env::var("OPENAI_API_KEY").ok())
        .ok_or("OpenAI API key required: pass --openai-key or set OPENAI_API_KEY")?;

    let http = reqwest::Client::new();
    let qdrant = QdrantClient::new(http.clone(), qdrant_url, qdrant_api_key.unwrap_or(""));
    let embedder = OpenAiEmbedder::new(http, &openai_key);

    println!("Seeding handbook collections at {qdrant_url}");
    seed_handbook(&qdrant, &embedder).await?;

    println!("Done:");
    println!("   {POSITIVE_COLLECTION}");
    println!("   {NEGATIVE_COLLECTION}");

    Ok(())
}
