pub mod assistant;
pub mod assistant_planner;
pub mod config;
mod config_env;
pub mod llm;
pub mod media;
pub mod models;
pub mod storage;
pub mod voice;
