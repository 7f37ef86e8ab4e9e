//! Conflict resolution.
//!
//! A policy ranks layers by authority; the resolver then decides, feature by
//! feature, which overlap regions are ceded to more authoritative features.

mod authority;
mod policies;
mod resolver;

pub use authority::{layer_max_timestamp, AuthorityRanking};
pub(crate) use authority::warn_missing_temporal_keys;
pub use policies::{ResolutionPolicy, TemporalMode};
pub use resolver::{AreasToRemove, ConflictResolver, RemovalSet};
