//! Host extension contracts.
//!
//! The gateway never navigates or renders anything itself; hosts plug their own reaction to a
//! lost session in through [`SignOutHandler`].

pub mod sign_out;

pub use sign_out::*;
