pub mod app;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod models;
pub mod playback;
pub mod sources;
pub mod status;
pub mod storage;
pub mod utils;
