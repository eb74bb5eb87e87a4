//! Resilient upstream REST client core for Toolgate.
//!
//! This crate is the layer the tool-dispatch server calls to perform an
//! upstream HTTP operation: it owns the pooled client, a TTL response cache
//! with pattern invalidation, retry with exponential backoff, and concurrent
//! batch fan-out. Callers hand it a method, a path, and an optional JSON
//! body, and get a normalized envelope back.
//!
//! It intentionally contains **no** tool/prompt registration, **no** route
//! classification, and **no** server surface; those live in the dispatch
//! layer on top.

pub mod batch;
pub mod cache;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod gateway;
pub mod retry;
