pub mod clock;
pub mod document_store;
pub mod error;
pub mod status_store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use document_store::DocumentStore;
pub use error::StoreError;
pub use status_store::StatusStore;
