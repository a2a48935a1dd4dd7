//! Core business logic for Trestle.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and calculations live here.
//!
//! # Modules
//!
//! - `ledger` - Double-entry journal entries, validation and posting plans
//! - `workflow` - Entry lifecycle state machine and reversing entries
//! - `evm` - Earned value metrics and forecasts

pub mod evm;
pub mod ledger;
pub mod workflow;
