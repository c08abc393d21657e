//! Core domain types and logic.

pub mod trade;
pub mod position;
pub mod settlement;
pub mod risk;
pub mod reflection;
pub mod error;
