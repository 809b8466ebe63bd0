//! Draftly inference engine.
//!
//! Owns everything between the HTTP layer and the accelerator: the device
//! probe, the pipeline abstraction, the single-slot residency manager that
//! swaps pipelines in and out of accelerator memory, the built-in synthesis
//! backend, artifact persistence, and the generation service that ties them
//! together.

pub mod artifacts;
pub mod device;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod procedural;
pub mod residency;
pub mod service;
