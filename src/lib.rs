pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod service;
pub mod types;
pub mod validation;

pub use error::LeafError;
pub use router::{LeafState, leaf_router};
