//! Publishers and publications API.
//!
//! Publications of type `rss` are registered with an external feed registrar
//! when created. If registration fails the local row is deleted again, and a
//! failed deletion is reported alongside the registration error.

pub mod api;
pub mod apiclient;
pub mod config;
pub mod entity;
pub mod feeds;
pub mod importer;
pub mod logging;
pub mod metrics;
pub mod server;
pub mod service;
pub mod storage;
pub mod validation;
