pub mod api;
pub mod api_client;
pub mod config;
pub mod csv_history;
pub mod domain;
pub mod error;
pub mod infra;
pub mod sources;
pub mod usecases;
pub mod utils;
