//! RSS Reader - feed ingestion core
//!
//! This crate fetches RSS 2.0 and RDF/RSS 1.0 feeds from many sources at once,
//! normalizes them into one [`Feed`](model::Feed)/[`Post`](model::Post) model and keeps
//! a local SQLite copy fresh. A small JSON API exposes the stored feeds.

pub mod config;
pub mod db;
pub mod error;
pub mod fetcher;
pub mod model;
pub mod normalize;
pub mod parser;
pub mod reader;
pub mod routes;
