//! `xapp-client`: decision services for the uavsim harness.
//!
//! Every service answers one [`MeasurementReport`] with one [`Decision`]
//! through the [`DecisionService`] trait. The runner only ever sees that
//! trait, so the external xApp and the local baseline strategies are
//! interchangeable.
//!
//! ```text
//! MeasurementReport
//!     │
//!     ▼
//! DecisionService ── XappClient      POST {endpoint}/e2/indication
//!     │                               per-attempt timeout, retry + backoff
//!     ├──────────── RuleBased / Greedy / Conservative / RandomBaseline
//!     ▼
//! Decision  |  DecisionError::Unavailable
//! ```
//!
//! [`MeasurementReport`]: uavsim_core::report::MeasurementReport
//! [`Decision`]: uavsim_core::types::Decision

pub mod client;
pub mod error;
pub mod strategy;
pub mod types;

pub use client::{ClientConfig, XappClient};
pub use error::DecisionError;
pub use strategy::{build_service, DecisionService};
pub use uavsim_core::config::StrategyKind;
