//! Tick-based physiological simulation for Somatic.
//!
//! A [`Body`] owns eight subsystems, a shared [`sm_core::ResourcePool`] and an
//! [`EventHub`] that queues events per subscriber. Each tick first drains
//! every queue in the configured order, then runs every subsystem's
//! metabolism. Subsystems never hold references to each other: all
//! cross-system effects travel as [`BodyEvent`]s.

/// The body orchestrator and its command surface.
pub mod body;
/// Tunable parameters for a body and its subsystems.
pub mod config;
/// Mutable context passed to subsystems while they run.
pub mod context;
/// Error types for the simulation crate.
pub mod error;
/// Events exchanged between subsystems.
pub mod event;
/// Read-only snapshots for rendering and JSON export.
pub mod export;
/// The bounded log of notable occurrences.
pub mod history;
/// Per-subscriber event queues.
pub mod hub;
/// The trait every subsystem implements.
pub mod system;
/// The eight subsystems.
pub mod systems;
/// Shared node bookkeeping used by every subsystem.
pub mod template;

/// Re-export of [`body::Body`].
pub use body::Body;
/// Re-exports of [`config::BodyConfig`] and [`config::PoolConfig`].
pub use config::{BodyConfig, PoolConfig};
/// Re-export of [`context::TickContext`].
pub use context::TickContext;
/// Re-exports of [`error::SimError`] and [`error::SimResult`].
pub use error::{SimError, SimResult};
/// Re-exports of event types.
pub use event::{BodyEvent, Effect, EffectKind, EventType};
/// Re-exports of snapshot types.
pub use export::{BodySnapshot, PartSnapshot, Vitals};
/// Re-exports of log types.
pub use history::{EventLog, LogEntry, Occurrence};
/// Re-export of [`hub::EventHub`].
pub use hub::EventHub;
/// Re-exports of [`system::BodySystem`] and [`system::SystemId`].
pub use system::{BodySystem, SystemId};
/// Re-exports of template types.
pub use template::{SystemTemplate, TemplateParams};
