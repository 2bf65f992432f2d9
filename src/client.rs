//! Client facade: one object owning transport, cache and event sink.
//!
//! Implementation details are split into submodules under `src/client/`.

pub mod builder;
pub mod core;

pub use builder::FetchClientBuilder;
pub use core::{FetchClient, Invalidation};
