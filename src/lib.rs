//! Scriptorium: a small blog backend with a cache-aside content repository.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
