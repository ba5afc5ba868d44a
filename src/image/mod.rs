pub mod dimensions;
pub mod image_rs_processor;
pub mod pipeline;
pub mod preprocess;
pub mod processor;
