pub mod document;
pub mod sign_record;

pub use document::{
    DocStatus, Document, DocumentFilter, DocumentPatch, NewDocument, ReleaseBasic, ReleaseOptions,
    SignPlacement, StatusTransition, TimeRange,
};
pub use sign_record::{SignKey, SignRecord, SignStatus, SignerProgress};
