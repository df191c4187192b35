//! Core types and utilities for the harbor console.
//!
//! This crate provides the error-handling foundation and the identifier
//! types shared by the console's libraries.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::AttemptId;
