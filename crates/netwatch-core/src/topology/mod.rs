//! Fleet directory: address classification and the directory registry.

pub mod address;
pub mod registry;

pub use registry::{RegistrationReport, TopologyRegistry};
