pub mod app;
pub mod chunk;
pub mod config;
pub mod domain;
pub mod error;
pub mod export;
pub mod loader;
pub mod mutation;
pub mod output;
pub mod pipeline;
pub mod store;
pub mod theme;
pub mod tui;
pub mod version;
