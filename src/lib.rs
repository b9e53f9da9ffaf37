// Library exports for Folio
// Integration tests drive the router through these modules

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod extractors;
pub mod mail;
pub mod policy;
pub mod routes;
pub mod slug;
pub mod state;
pub mod store;
pub mod threading;
pub mod uploads;
