//! Prediction-market feed composition engine.
//!
//! Turns a small catalog of heterogeneous market records into an
//! infinite-scroll feed: the catalog is amplified into a long sequence,
//! paginated behind an in-flight guard, and every record is normalized and
//! classified into a binary "chance" card or a multi-outcome card.
//!
//! # Pipeline
//!
//! ```text
//! catalog ──amplify──▶ window(page) ──800ms──▶ normalize ──▶ classify ──▶ render
//!   15 records          "r-id" keys              outcomes     binary/multi
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`catalog`]: Market records, mock data and the amplified view
//! - [`feed`]: Normalization, classification, pagination and the engine task
//! - [`detail`]: Market detail, comments and price history
//! - [`api`]: HTTP API for health, feed and metrics
//! - [`metrics`]: Prometheus metric names and recorders
//! - [`utils`]: Utility functions

pub mod api;
pub mod catalog;
pub mod config;
pub mod detail;
pub mod error;
pub mod feed;
pub mod metrics;
pub mod utils;

pub use config::Config;
pub use error::{FeedError, Result};
