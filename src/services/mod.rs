pub mod document_service;
pub mod sign_service;

pub use document_service::{DeleteOutcome, DocumentService};
pub use sign_service::{CompleteOutcome, SignService};
