pub mod config;
pub mod error;
pub mod goal;
pub mod health;
pub mod io;
pub mod paths;
pub mod project;
pub mod query;
pub mod report;
pub mod tracker;
pub mod types;

pub use error::{GoalkitError, Result};
