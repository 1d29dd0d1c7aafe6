// DrainSleuth - platform/mod.rs
//
// Platform abstraction layer.
// Dependencies: standard library, directories, memmap2; core name parsers
// for config validation.
// Must NOT depend on: app.

pub mod config;
pub mod fs;
