//! Deterministic random number generation for the reference engines
//!
//! Every reference engine draws from its own [`EngineRng`], seeded through
//! the adapter's `set_seed`. Same seed → same event sequence.

mod xorshift;

pub use xorshift::EngineRng;
