pub mod api;
pub mod app;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod resource;
pub mod schema;
pub mod shape;
pub mod storage;

pub use error::{Error, Result};
