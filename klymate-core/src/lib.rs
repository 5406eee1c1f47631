//! Core library for the Kly-mate weather dashboard.
//!
//! This crate defines:
//! - Configuration of the backend location and request timeout
//! - The HTTP boundary and its closed set of failure kinds
//! - Snapshot models for current weather, air quality and the next-day prediction
//! - The view controller that runs one interaction cycle
//!
//! It is used by `klymate-cli`, but the controller does no rendering itself and
//! can be driven by other front ends.

pub mod backend;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod model;

pub use backend::{BackendClient, Endpoint, Transport};
pub use config::Config;
pub use dashboard::{CycleOutcome, Dashboard, DashboardView};
pub use error::{ErrorDetail, FailureKind, FetchError};
pub use model::{AqiCategory, Coordinates, Section};
