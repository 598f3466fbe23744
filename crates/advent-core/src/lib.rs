//! Advent core: platform-agnostic card unlock logic and the confetti engine.

pub mod calendar;
pub mod card;
pub mod config;
pub mod confetti;
pub mod countdown;
pub mod error;
pub mod particle;
pub mod physics;
pub mod render;
pub mod schedule;
pub mod state;
pub mod store;
pub mod tracker;

pub use calendar::{Calendar, OpenOutcome};
pub use card::{Card, CardId, ContentDocument, Schedule, SiteInfo};
pub use config::{AdventConfig, ConfettiPreset, UnlockConfig};
pub use confetti::{ConfettiEngine, EngineState};
pub use countdown::Countdown;
pub use error::{ConfigError, ContentError, PersistenceError, ScheduleError, SurfaceError};
pub use particle::{Particle, ShapeKind};
pub use render::ParticleInstance;
pub use schedule::{CooperativeScheduler, Task};
pub use state::{derive_state, sort_cards, CardState, SortOrder};
pub use store::{CommitOutcome, MemoryStore, OpenedSet, OpenedStore};
pub use tracker::{Cadence, StateChange, UnlockTracker};
