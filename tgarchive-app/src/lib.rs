//! tg-archive: the process around the archiving pipeline.
//!
//! Config loading, the stdin packet source, and the loop that feeds packets
//! through a [`Pipeline`] into a [`MessageStore`].

pub mod config;
pub mod output;
pub mod source;

use std::collections::HashSet;
use std::io::Write;

use tgarchive::{MessageStore, Packet, Pipeline, archive};
use tokio::sync::mpsc;

/// What one run of [`drain`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub packets:   usize,
    /// Packets discarded as a whole.
    pub rejected:  usize,
    pub archived:  usize,
    /// Records outside `filter_chat_ids`.
    pub filtered:  usize,
}

/// Run every packet from `rx` through `pipeline`, archive the records that
/// pass `filter` (empty means all chats) and print the new ones to `out`.
///
/// Returns when the channel closes. Rejected packets are logged and skipped;
/// storage and output failures end the loop.
pub async fn drain(
    mut rx: mpsc::Receiver<Packet>,
    pipeline: &Pipeline,
    store: &dyn MessageStore,
    filter: &HashSet<i64>,
    mut out: impl Write,
) -> Result<Stats, Box<dyn std::error::Error + Send + Sync>> {
    let mut stats = Stats::default();

    while let Some(packet) = rx.recv().await {
        stats.packets += 1;

        let processed = match pipeline.process(&packet) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!("[tg-archive] packet {} rejected: {e}", stats.packets);
                stats.rejected += 1;
                continue;
            }
        };

        let (records, skipped): (Vec<_>, Vec<_>) = processed
            .records
            .into_iter()
            .partition(|r| filter.is_empty() || filter.contains(&r.chat_id));
        stats.filtered += skipped.len();

        for record in archive(records, store)? {
            writeln!(out, "{}", output::to_json_line(&record)?)?;
            stats.archived += 1;
        }
    }

    tracing::info!(
        "[tg-archive] {} packets, {} rejected, {} archived in {}",
        stats.packets,
        stats.rejected,
        stats.archived,
        store.name()
    );
    Ok(stats)
}
