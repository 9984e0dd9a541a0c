//! Hot Module Update Coordinator
//!
//! Keeps live browser sessions in sync with server-rendered fragments and
//! client modules as sources change.
//!
//! # Architecture
//!
//! ```text
//! TransformActor --artifact--> ConnectionGate --module-import--> Connection
//!        |                         |    ^                           (outbox)
//!        |                     record  first connection                 |
//!        |                         v    |                               v
//!        +--rsc/full/hot-----> UpdateChannel --clear_all--> SessionRegistry
//!                                                                |
//!                     page render <-- InjectionPlanner <---------+
//! ```
//!
//! # Modules
//!
//! - `artifact` - Update unit (script, stylesheet, CSS-module script)
//! - `connection` - Live connection handle and outbox
//! - `registry` - Per-connection delivered artifacts (weakly keyed)
//! - `gate` - Deferred, deduplicated `module-import` delivery
//! - `channel` - Broadcast events and the first-connection signal
//! - `planner` - Initial-render injection plan and HTML splicing
//! - `listeners` - Reload listener list with fragment/route slots
//! - `patch` - Reload hook injection into generated client modules
//! - `message` - Wire format
//! - `hub` - Facade wiring the above

pub mod artifact;
pub mod channel;
pub mod connection;
pub mod gate;
pub mod hub;
pub mod listeners;
pub mod message;
pub mod patch;
pub mod planner;
pub mod registry;

pub use artifact::{Artifact, ArtifactKind};
pub use connection::{Connection, Outbox};
pub use hub::Hmr;
pub use listeners::Slot;
pub use message::UpdateEvent;
pub use patch::SourcePatchInjector;
pub use planner::{InjectTo, InjectableElement};
