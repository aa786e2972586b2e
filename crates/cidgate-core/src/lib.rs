#![deny(missing_docs)]

//! # cidgate-core: Foundational Types for cidgate
//!
//! This crate defines the types every other crate in the workspace depends
//! on. It has no internal crate dependencies, only `serde`, `thiserror`,
//! `chrono`, `url`, and `tokio` (sync primitives only) from the ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** A [`Cid`] is validated at
//!    construction and cannot be confused with an arbitrary string key.
//!
//! 2. **The gateway list is configuration, not state.** [`GatewayList`] is
//!    non-empty by construction and its order is significant: it is both the
//!    probe candidate set and the fallback order.
//!
//! 3. **Time is injected.** Freshness windows and eviction ages are computed
//!    against a [`Clock`], so every time-dependent rule is testable with a
//!    [`ManualClock`].
//!
//! 4. **Progress is a typed stream.** [`Progress`] emits monotonically
//!    non-decreasing percentages over a channel instead of invoking
//!    caller callbacks re-entrantly.

pub mod cid;
pub mod error;
pub mod gateway;
pub mod progress;
pub mod temporal;

pub use cid::Cid;
pub use error::ValidationError;
pub use gateway::{Gateway, GatewayHealth, GatewayList, GatewaySample};
pub use progress::{Progress, ProgressReceiver, ProgressWindow};
pub use temporal::{Clock, ManualClock, SystemClock, Timestamp, FRESHNESS_WINDOW};
