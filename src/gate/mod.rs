//! The gate: the online, per-session engine built on top of the skill-net
//! schema. [`auto_advance`] implements §4.3, [`single`] implements §4.4's
//! one-net gate, and [`manager`] implements §4.5's multi-net composition.

pub mod auto_advance;
pub mod manager;
pub mod single;

pub use auto_advance::auto_advance;
pub use manager::{DecisionObserver, GateManager};
pub use single::{PendingEntry, SkillNetState};
