use crate::domain::errors::StateStoreError;
use crate::domain::models::KernelSnapshot;

/// Port for persisting kernel state across host restarts.
///
/// The kernel saves a snapshot at the end of every epoch when a store is
/// injected. Failures are logged by the kernel and never abort an epoch.
pub trait StateStore {
    /// Load the most recent snapshot, `None` when nothing was saved yet.
    fn load(&self) -> Result<Option<KernelSnapshot>, StateStoreError>;

    /// Replace the stored snapshot.
    fn save(&self, snapshot: &KernelSnapshot) -> Result<(), StateStoreError>;
}
