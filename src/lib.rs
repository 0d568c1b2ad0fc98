// src/lib.rs

//! Notice watcher library.
//!
//! Polls notice listing pages, reports newly published notices to a
//! Telegram chat and remembers what was already reported.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
