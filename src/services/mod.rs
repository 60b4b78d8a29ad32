// src/services/mod.rs

pub mod grading;
