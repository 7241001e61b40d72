pub mod api;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod recommender;
pub mod similarity;
pub mod store;
