#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Geo-dispatch: routes a geolocated report to the nearest active
//! response operation whose coverage radius contains it.
//!
//! The resolver is best-effort. [`dispatch_report`] never returns an
//! error: data-layer failures become a failed [`DispatchOutcome`] so the
//! report-creation flow that triggered it is never interrupted. When no
//! operation covers a report, system admins are notified so a human can
//! route it.
//!
//! All data access goes through the [`DispatchStore`] trait; the
//! `switchy_database` implementation lives in `relief_map_database`.

mod resolver;
mod store;
mod sweep;

#[cfg(test)]
mod test_store;

pub use relief_map_dispatch_models as models;
pub use resolver::{dispatch_report, dispatch_report_with, select_nearest};
pub use store::DispatchStore;
pub use sweep::sweep_unassigned;

use thiserror::Error;

/// A data-layer failure during dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A store call failed.
    #[error("{stage}: {reason}")]
    Store {
        /// Which step was running.
        stage: &'static str,
        /// The store's error message.
        reason: String,
    },
}

impl DispatchError {
    fn store(stage: &'static str, error: impl std::fmt::Display) -> Self {
        Self::Store {
            stage,
            reason: error.to_string(),
        }
    }
}
