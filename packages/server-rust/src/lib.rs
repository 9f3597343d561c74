//! EasyStore web service: HTTP access to an object store with per-object
//! serialization of every single-object operation.

pub mod cli;
pub mod network;
pub mod service;
pub mod storage;

pub use network::NetworkModule;
pub use service::{ObjectGateway, Outcome};
pub use storage::MemoryStore;
