//! SettleFlow Cloud
//!
//! Provider abstraction shared by every SettleFlow resource kind.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  settle CLI                      │
//! │            (validate / plan / apply)             │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               settleflow-cloud                   │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  trait ResourceClient { get, submit }     │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │    Drift     │  │   Settler    │            │
//! │  └──────────────┘  └──────────────┘            │
//! └───────┬─────────────────────────────────────────┘
//!         │
//! ┌───────▼────────────┐
//! │  settleflow-mssql  │
//! │  (SQL VM resource) │
//! └────────────────────┘
//! ```

pub mod action;
pub mod client;
pub mod drift;
pub mod error;
pub mod settle;

// Re-exports
pub use action::{Change, ChangeType, Plan, PlanSummary};
pub use client::ResourceClient;
pub use drift::{Drift, Settle, diff};
pub use error::{CloudError, Result};
pub use settle::{
    DEFAULT_DEBOUNCE, DEFAULT_POLL_INTERVAL, DEFAULT_SETTLE_TIMEOUT, PollOutcome, SettlePolicy,
    SettleTarget, Settler, classify_block,
};
