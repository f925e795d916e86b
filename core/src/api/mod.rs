pub mod endpoints;
pub mod http;
pub mod source;

pub use endpoints::{pick_structure_file, Endpoints, DOWNLOAD_FILE, STRUCTURE_FILE};
pub use http::HttpJobApi;
pub use source::{JobSource, JobSubmitter, StructureSource};
