//! Password lookup
//!
//! This module handles:
//! * Password file parsing (escape-aware field splitting, permission gate)
//! * First-match password resolution across endpoints

pub mod passfile;
mod password;

pub use passfile::{Passfile, PassfileEntry};
pub use password::{resolve_password, PasswordSource};
