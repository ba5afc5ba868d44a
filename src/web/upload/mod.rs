pub mod multipart;
pub mod reconcile;
pub mod upload_handler;

pub use upload_handler::upload_handler;
