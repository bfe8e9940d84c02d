//! `oathlink compose` — Build a prompt from stored memories.

use std::path::Path;

pub async fn run(
    config: Option<&Path>,
    input: &str,
    tags: &[String],
    top_k: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config)?;
    let store = oathlink_gateway::open_store(&config).await?;
    let generator = oathlink_providers::build_from_config(&config);
    let composer = oathlink_gateway::build_composer(&config, store.clone(), generator);

    let limit = top_k.unwrap_or(config.memory.default_limit);
    let result = composer.compose(input, tags, limit).await;
    store.close().await;
    let outcome = result?;

    println!("🧩 Composed prompt ({} memory hit(s))", outcome.hits.len());
    println!("========================================");
    println!("{}", outcome.prompt);

    if let Some(output) = &outcome.generated_output {
        println!();
        println!("🤖 Output ({})", outcome.model_used.as_deref().unwrap_or("unknown"));
        println!("========================================");
        println!("{output}");
    } else if composer.has_generator() {
        println!();
        println!("⚠️  Generation failed; see log for details.");
    }

    Ok(())
}
