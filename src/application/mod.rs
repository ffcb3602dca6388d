//! Application services layer.

pub mod error;
pub mod events;
pub mod properties;
pub mod repos;
