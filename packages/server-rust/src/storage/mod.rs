//! Backend implementations of [`easystore_core::EasyStore`].

pub mod memory;

pub use memory::MemoryStore;
