use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{self, JoinHandle};
use tracing::debug;

use super::{FileSearch, SearchHit};
use crate::error::Result;
use crate::storage::FilesManager;
use crate::types::SearchOptions;

/// Runs a search on a blocking worker and feeds its items into a bounded
/// channel.
///
/// The worker only advances while the channel has room, so the consumer's
/// pace throttles the traversal. Dropping the receiver stops the worker after
/// its current step. Must be called from within a tokio runtime.
pub fn spawn_search(
    manager: Arc<dyn FilesManager>,
    root: String,
    options: SearchOptions,
    capacity: usize,
) -> (mpsc::Receiver<Result<SearchHit>>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let handle = task::spawn_blocking(move || {
        let search = FileSearch::new(manager.as_ref(), root).options(&options);
        for item in search.iter() {
            if tx.blocking_send(item).is_err() {
                debug!("Search receiver dropped, stopping");
                break;
            }
        }
    });
    (rx, handle)
}
