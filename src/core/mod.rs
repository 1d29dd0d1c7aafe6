// DrainSleuth - core/mod.rs
//
// Core business logic layer.
// Dependencies: standard library, serde, tracing.
// Must NOT depend on: app, platform, or open files directly; byte access goes
// through `Read + Seek` sources handed in by the app layer.

pub mod drain;
pub mod export;
pub mod model;
pub mod position;
pub mod preprocess;
pub mod sink;
