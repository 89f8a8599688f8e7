//! Shared types and error codes for the confidential survey contracts.
//!
//! This crate provides:
//! - [`fhe_types`] — ciphertext handles, encrypted types, the FHE executor
//!   client interface, and the sealing/input wire helpers used on both sides
//!   of that interface.
//! - [`storage`] — persistent-entry TTL policy.
//!
//! Survey error codes are grouped in ranges:
//!
//! | Range   | Purpose                        |
//! |---------|--------------------------------|
//! | 1 – 9   | Lifecycle / initialisation     |
//! | 10 – 19 | Authentication & authorisation |
//! | 30 – 39 | Validation / input             |
//! | 40 – 49 | Contract state                 |

#![no_std]
#![allow(clippy::arithmetic_side_effects)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

// ── Modules ──────────────────────────────────────────────────────────────────

pub mod fhe_types;
pub mod storage;

pub use fhe_types::*;
pub use storage::*;
