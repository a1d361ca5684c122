//! JobHarvest - job posting acquisition and tracking system.
//!
//! Harvests listings from large employers' career sites into a local
//! SQLite store. The crawl engine tolerates markup drift via per-field
//! selector chains, traverses infinite scroll and pagination with pacing,
//! and degrades gracefully when individual cards fail to parse.

pub mod cli;
pub mod config;
pub mod crawler;
pub mod export;
pub mod models;
pub mod repository;
