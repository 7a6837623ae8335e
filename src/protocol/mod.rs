pub mod document;
pub mod markers;
