pub mod config;
pub mod domain;
pub mod error;
pub mod identity;
pub mod pdf;
pub mod policy;
pub mod registry;
pub mod routes;
pub mod state;
pub mod storage;
pub mod store;
