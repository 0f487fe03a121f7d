// src/services/mod.rs

pub mod gates; // shared decision markers + fixed cycle
pub mod stamp; // checkpoint codec: compact wire form, full render, rehydrate
pub mod tiers; // recursive tier promotion engine

// Public API
pub use gates::{Gate, GateState};
pub use stamp::{ConvState, Stamp};
pub use tiers::{Artifact, ArtifactOrigin, ArtifactStatus, Branch, ForkType, Project, Tier};
