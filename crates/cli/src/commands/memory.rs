//! `oathlink write` / `oathlink search` — Direct memory access.

use oathlink_core::memory::{MemorySearch, MemoryStore};
use std::path::Path;

pub async fn write(
    config: Option<&Path>,
    content: &str,
    tags: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config)?;
    let store = oathlink_gateway::open_store(&config).await?;

    let result = store.store(content, tags).await;
    store.close().await;

    let id = result?;
    println!("✅ Stored memory {id}");
    Ok(())
}

pub async fn search(
    config: Option<&Path>,
    query: &str,
    top_k: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config)?;
    let store = oathlink_gateway::open_store(&config).await?;

    let limit = top_k.unwrap_or(config.memory.default_limit);
    let result = store.search(query, limit).await;
    store.close().await;
    let results = result?;

    println!("🔍 Searching memories for: \"{query}\"");
    println!();

    if results.is_empty() {
        println!("   No memories found.");
    } else {
        for (i, entry) in results.iter().enumerate() {
            println!("  {:>2}. {}  {}", i + 1, &entry.id[..8.min(entry.id.len())], entry.content);
            if !entry.tags.is_empty() {
                println!("      tags: {}", entry.tags.join(", "));
            }
        }
    }

    Ok(())
}
