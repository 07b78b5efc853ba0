pub mod api;
pub mod client;
pub mod config;
pub mod model;
pub mod stats;
pub mod store;
