//! Core data model for Somatic: body parts, anatomy, components, nodes and
//! the shared resource pool.
//!
//! This crate knows nothing about ticks or events. It defines the state that
//! the simulation engine in `sm-simulation` mutates, plus the static
//! anatomical graph every subsystem walks for propagation.

/// The static anatomical graph and per-part traits.
pub mod anatomy;
/// Clamped scalar attributes.
pub mod component;
/// Error types used at the parsing boundary.
pub mod error;
/// Per-body-part state containers.
pub mod node;
/// The closed set of body parts.
pub mod part;
/// The shared resource ledger.
pub mod resource;
/// Node status flags.
pub mod status;

/// Re-export anatomy types.
pub use anatomy::{AnatomicalGraph, PartTraits, anatomy};
/// Re-export component types.
pub use component::{Component, ComponentKind};
/// Re-export error types.
pub use error::{CoreError, CoreResult};
/// Re-export node types.
pub use node::{Node, StatusChange};
/// Re-export the body part enum.
pub use part::BodyPart;
/// Re-export resource types.
pub use resource::{ResourceKind, ResourcePool};
/// Re-export status flags.
pub use status::NodeStatus;
