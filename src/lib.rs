pub mod auth;
pub mod config;
pub mod error;
pub mod etag;
pub mod schema;
pub mod service;
pub mod store;
