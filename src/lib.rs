// src/lib.rs

//! Resale ticket watcher library.

pub mod error;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod render;
pub mod services;
pub mod storage;
pub mod utils;
