//! Type definitions module.
//!
//! Contains shared types used across the application.

pub mod operation;
pub mod swap;
pub mod token;

pub use operation::*;
pub use swap::*;
pub use token::*;
