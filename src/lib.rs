pub mod cache;
pub mod config;
pub mod constants;
pub mod data_series;
pub mod delivery;
pub mod delivery_errors;
pub mod echelle;
pub mod env_state;
pub mod fits;
pub mod mission;
pub mod missions;
pub mod plot_service;
pub mod registry;
pub mod request;
pub mod text_table;
