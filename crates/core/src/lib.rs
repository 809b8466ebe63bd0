//! Pure domain logic for the Draftly local inference service.
//!
//! Parameter clamping, seed resolution, and artifact naming. Everything in
//! this crate is synchronous and I/O-free so it can be tested in isolation.

pub mod error;
pub mod naming;
pub mod params;
