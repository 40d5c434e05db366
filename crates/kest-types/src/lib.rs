//! # kest-types: Core types for kest
//!
//! Shared, dependency-light types used across the kest engine:
//! - The scenario event stream ([`Event`], [`ErrorSummary`], [`BddKeyword`])
//! - Go-like duration strings ([`parse_duration`], [`format_duration`])
//! - Cluster call contexts ([`ClusterContext`])
//! - Resource identity and manifest parsing ([`ResourceRef`], [`Manifest`],
//!   [`kubectl_type`])
//! - Random name generation ([`random_suffix`], [`generated_name`])
//!
//! Everything here is plain data: no IO, no clocks, no subprocesses. The
//! engine crate (`kest`) produces these values; the report crate
//! (`kest-report`) consumes them.

mod context;
mod duration;
mod event;
mod names;
mod resource;

pub use context::ClusterContext;
pub use duration::{InvalidDuration, format_duration, parse_duration};
pub use event::{BddKeyword, ErrorSummary, Event, RetryReason};
pub use names::{
    DEFAULT_NAME_PREFIX, NAME_ALPHABET, NAME_SUFFIX_LEN, generated_name, random_suffix,
    random_suffix_with,
};
pub use resource::{InvalidManifest, KindRef, Manifest, ManifestSource, ResourceRef, kubectl_type};
