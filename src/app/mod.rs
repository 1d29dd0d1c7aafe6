// DrainSleuth - app/mod.rs
//
// Application layer: tail reading lifecycle and the mining run loop.
// Dependencies: core, platform, util.

pub mod pipeline;
pub mod tail;
