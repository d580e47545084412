pub mod actions;
pub mod agent;
pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod generate;
pub mod hass;
pub mod models;
pub mod prompt;
pub mod session;
pub mod ui;
