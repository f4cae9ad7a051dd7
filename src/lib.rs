pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repos;
pub mod rest;
pub mod services;
pub mod state;
pub mod token;

pub use state::AppState;
