pub mod process;
pub mod reformat;

pub use process::ProcessError;
pub use reformat::ReformatError;
