// src/handlers/mod.rs

pub mod sessions;
pub mod test_config;
