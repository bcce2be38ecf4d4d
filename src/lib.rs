pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod server;
pub mod store;
pub mod tasks;
pub mod voting;

#[cfg(test)]
mod test_support;
