//! tg-archive: archive channel messages from captured packets.
//!
//! Reads uploads as JSON lines on stdin and prints every newly archived
//! message as a JSON line on stdout:
//!
//!   tg-archive config.yml < packets.jsonl
//!
//! Logging: `RUST_LOG` wins over the config's `log_level`.

use std::collections::HashSet;
use std::sync::Arc;

use tgarchive::tl::SchemaRegistry;
use tgarchive::{MemoryStore, Pipeline};
use tgarchive_app::{config, drain, source};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("✗ {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cfg = config::load_from_file(config::config_path(std::env::args().nth(1)))?;

    let level = &cfg.log_level;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(format!(
        "tg_archive={level},tgarchive_app={level},tgarchive={level},tgarchive_tl={level},tgarchive_mtproto={level}"
    )))
    .init();

    let registry = SchemaRegistry::load_dir(&cfg.layers_dir)?;
    tracing::info!("[tg-archive] supported layers: {:?}", registry.supported_layers());

    let pipeline = Pipeline::new(Arc::new(registry)).with_max_depth(cfg.max_depth);
    let store = MemoryStore::new();
    let filter: HashSet<i64> = cfg.filter_chat_ids.iter().copied().collect();

    let rx = source::spawn_stdin(cfg.queue_capacity);
    drain(rx, &pipeline, &store, &filter, std::io::stdout().lock()).await?;
    Ok(())
}
