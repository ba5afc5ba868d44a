pub mod forward;
pub mod proxy;
pub mod upload;
