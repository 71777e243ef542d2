pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod download;
pub mod fetch;
pub mod output;
