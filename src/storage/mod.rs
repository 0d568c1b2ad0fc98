//! Persistence for the dedup store and run statistics.
//!
//! `SeenStore` holds the in-memory state for one run; `SeenStorage`
//! backends load it at the start and commit it once at the end.

pub mod local;
pub mod seen;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::RunSummary;

// Re-export for convenience
pub use local::LocalStorage;
pub use seen::{FINGERPRINT_LEN, SeenMap, SeenStore, identifier};

/// Trait for dedup snapshot backends.
#[async_trait]
pub trait SeenStorage: Send + Sync {
    /// Load the committed snapshot.
    ///
    /// A missing or unreadable snapshot yields an empty store, not an error.
    async fn load_seen(&self, max_entries: usize) -> Result<SeenStore>;

    /// Replace the committed snapshot atomically.
    async fn save_seen(&self, store: &SeenStore) -> Result<()>;

    /// Record the summary of the last run.
    async fn save_stats(&self, summary: &RunSummary) -> Result<()>;
}
