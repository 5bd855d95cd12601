pub mod mem_object_store;

pub use mem_object_store::*;
