// src/store/mod.rs

pub mod answer_keys;
pub mod sessions;
