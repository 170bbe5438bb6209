pub mod api;
pub mod app;
pub mod bands;
pub mod cache;
pub mod client;
pub mod config;
pub mod forecast;
pub mod history;
pub mod models;
pub mod pm25;
pub mod provider;
pub mod provider_error;
pub mod services;
pub mod utils;
