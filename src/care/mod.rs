//! Care actions, the append-only care log, and care resolution

pub mod action;
pub mod log;
pub mod projection;
pub mod resolver;

pub use action::{CareAction, CareActionType};
pub use log::CareLog;
pub use resolver::CareRejection;
