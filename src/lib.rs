//! voicebot library — voice-driven developer advisor pipeline.

pub mod advisor;
pub mod config;
pub mod context;
pub mod errors;
pub mod gateway;
pub mod pipeline;
pub mod providers;
pub mod services;
pub mod store;
pub mod transcribe;
