//! Shared Pet - lifecycle and care sync engine for a pet shared by two partners
//!
//! Stats decay with elapsed time and recover through care actions. Care days
//! build streaks, streaks drive stage evolution, and milestones are unlocked
//! from the combined history. Each partner's device applies care optimistically
//! and reconciles with a remote authority through [`sync::SyncCoordinator`].

pub mod care;
pub mod core;
pub mod lifecycle;
pub mod pet;
pub mod sync;
