//! Domain data types.

pub mod chunk;
pub mod config;
pub mod document;
pub mod hit;
pub mod raptor;
pub mod user;
