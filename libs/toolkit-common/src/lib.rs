pub mod image;
pub mod paths;
pub mod types;
