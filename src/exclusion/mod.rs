//! # Non-land Exclusions
//!
//! Rules that mark a parcel as not land, and the resolver that reports one
//! primary reason per excluded parcel.

pub mod resolver;
pub mod rules;

pub use resolver::{ExclusionResolver, ExclusionSummary, ResolutionMode};
pub use rules::{primary_reason, ExclusionCandidate, ExclusionReason, ExclusionRule};
