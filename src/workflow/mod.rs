pub mod release_flow;
pub mod upload_flow;

pub use release_flow::ReleaseFlow;
pub use upload_flow::UploadFlow;
