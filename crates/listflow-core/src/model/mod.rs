//! Modelos neutrales (Context, snapshots, payloads de artifacts, insights).

pub mod artifact;
pub mod context;
pub mod insight;

pub use artifact::{ArtifactData, SavedArtifact};
pub use context::{Context, ContextSnapshot, ValuePath};
pub use insight::{clamp_confidence, Insight};
