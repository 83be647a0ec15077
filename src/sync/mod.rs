//! Reconciliation between local optimistic state and the remote authority

pub mod coordinator;
pub mod events;
pub mod memory;
pub mod outbox;
pub mod remote;

pub use coordinator::{
    CareReceipt, EvolutionReceipt, FlushReport, PetState, SyncCoordinator, SyncError, SyncReport,
};
pub use events::RemoteEvent;
pub use memory::InMemoryRemote;
pub use outbox::{Outbox, PendingOp};
pub use remote::{RemoteError, RemoteStore, StatsUpdate};
