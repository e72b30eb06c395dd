//! `asika doctor`: diagnose configuration, corpus, and provider health.

use asika_config::{AppConfig, KnowledgeMode};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("Asika Doctor: System Diagnostics");
    println!("================================\n");

    let mut issues = 0;

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  1 issue found. Fix the config and re-run.");
            return Ok(());
        }
    };

    let documents = asika_knowledge::load_corpus(&config.knowledge.corpus_dir);
    if documents.is_empty() {
        println!(
            "  ⚠️  No corpus documents in {}; replies will have no grounding",
            config.knowledge.corpus_dir.display()
        );
        issues += 1;
    } else {
        println!(
            "  ✅ Corpus: {} document(s) in {}",
            documents.len(),
            config.knowledge.corpus_dir.display()
        );
    }
    let mode = match config.knowledge.mode {
        KnowledgeMode::Static => "static",
        KnowledgeMode::Retrieval => "retrieval",
    };
    println!("  ✅ Knowledge mode: {mode}");

    match config.dispatch.url.as_deref() {
        Some(url) => println!("  ✅ Dispatch endpoint: {url}"),
        None => {
            println!("  ⚠️  No dispatch URL; confirmed registrations will not be sent");
            issues += 1;
        }
    }

    if !config.has_api_key() {
        println!("  ⚠️  No API key configured; set ASIKA_API_KEY or GROQ_API_KEY");
        issues += 1;
    } else {
        let router = asika_providers::build_from_config(&config)?;
        match router.default() {
            Some(provider) => match provider.health_check().await {
                Ok(true) => println!("  ✅ Provider '{}' reachable", provider.name()),
                Ok(false) => {
                    println!("  ⚠️  Provider '{}' answered but reported unhealthy", provider.name());
                    issues += 1;
                }
                Err(e) => {
                    println!("  ❌ Provider '{}' unreachable: {e}", provider.name());
                    issues += 1;
                }
            },
            None => {
                println!("  ❌ Provider '{}' is not available", config.default_provider);
                issues += 1;
            }
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
