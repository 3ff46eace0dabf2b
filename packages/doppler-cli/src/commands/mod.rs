pub mod analyze;
pub mod batch;
pub mod generate;
pub mod info;
pub mod summary;
