//! regsync-upstream: release feed client for regsync.
//!
//! This crate owns everything that talks to the upstream vendor repository:
//! the typed release feed, the HTTP client that lists releases and fetches
//! per-release register manifests, and the [`ReleaseSource`] trait the sync
//! pipeline consumes (with an in-memory [`FixtureSource`] for tests).

pub mod client;
pub mod error;
pub mod release;
pub mod source;

pub use client::{UpstreamClient, UpstreamConfig};
pub use error::{Result, UpstreamError};
pub use release::{Asset, Release};
pub use source::{FixtureSource, ReleaseSource};
