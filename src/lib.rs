pub mod application;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod infrastructure;
pub mod observer;
pub mod ports;

pub use domain::*;
pub use engine::Engine;
pub use error::{JcfError, JcfResult};
