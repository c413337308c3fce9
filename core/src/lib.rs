//! Idle-progress score tracking.
//!
//! A score grows from user actions and from elapsed wall-clock time,
//! including time the process was not running. Idle time found at
//! activation is offered as a claimable reward before it is merged
//! into the permanent score.

pub mod clock;
pub mod config;
pub mod driver;
pub mod error;
pub mod event;
pub mod persistence;
pub mod session;
pub mod state;
pub mod store;
pub mod ticker;
pub mod transition;
pub mod types;
pub mod writer;
