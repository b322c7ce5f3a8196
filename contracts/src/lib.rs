//! The standard contract library: five predicate-gated applications built
//! as data over `covenant-primitives` and evaluated by `covenant-vm`.
//!
//! Each module exposes a builder returning either a complete
//! [`covenant_primitives::Application`] or, for the stateless contracts, a
//! bare [`covenant_primitives::Predicate`] attached to transactions as a
//! logic signature.

pub mod escrow;
pub mod faucet;
pub mod royalty;
pub mod swapper;
pub mod timed_vault;
