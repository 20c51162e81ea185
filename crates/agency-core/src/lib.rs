#![forbid(unsafe_code)]
//! agency-core library.
//!
//! Pure business rules shared by the agency forms and list views:
//!
//! - [`priority`]: Eisenhower urgency/importance scoring, badges, ranking.
//! - [`hierarchy`]: Client → Project → Set → Pitch cascading selection.
//! - [`throttle`]: caller-owned rate limiter, debouncer, and retry policy.
//!
//! # Conventions
//!
//! - **Errors**: Use `anyhow::Result` for return types where appropriate.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod config;
pub mod error;
pub mod hierarchy;
pub mod model;
pub mod priority;
pub mod throttle;
