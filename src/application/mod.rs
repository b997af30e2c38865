//! Application services layer.

pub mod auth;
pub mod error;
pub mod images;
pub mod pagination;
pub mod posts;
pub mod repos;
pub mod side_effects;
