//! One-way synchronization from the local vault to the remote folder.

pub mod deletion;
pub mod engine;
pub mod incoming;

pub use deletion::{DeletionOutcome, DeletionPropagator};
pub use engine::{PassProgressEvent, PassReport, SyncEngine, UploadOutcome};
pub use incoming::{IncomingOutcome, IncomingProcessor};
