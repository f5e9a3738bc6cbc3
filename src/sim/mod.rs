//! Deterministic race simulation
//!
//! Plain state in [`state`], pure-ish stepping functions everywhere else,
//! orchestrated by [`tick`]. Nothing in here touches a renderer, a socket or
//! a clock; callers own time and feed timestamps in.

pub mod ai;
pub mod body;
pub mod collision;
pub mod items;
pub mod kinematics;
pub mod progress;
pub mod state;
pub mod tick;
pub mod track;
pub mod venom;
