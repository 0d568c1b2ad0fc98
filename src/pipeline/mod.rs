//! Pipeline entry points for watcher operations.
//!
//! - `run_watch`: Check all sites once, notify, persist the dedup store

pub mod watch;

pub use watch::{NoticeWatcher, run_watch};
