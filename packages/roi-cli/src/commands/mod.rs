pub mod batch;
pub mod concat;
pub mod extract;
pub mod info;
pub mod validate;
