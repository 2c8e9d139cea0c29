pub mod aggregate;
pub mod config;
pub mod energy;
pub mod error;
pub mod io;
pub mod paths;
pub mod report;
pub mod result;
pub mod scenario;
pub mod store;
pub mod trajectory;
pub mod types;

pub use error::{Result, SimError};
