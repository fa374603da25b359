//! Station discovery against a remote radio directory: facet vocabularies,
//! server-side search with latest-wins consistency, client-side refinement
//! and pagination.

pub mod config;
pub mod controller;
pub mod directory;
pub mod error;
pub mod facets;
pub mod models;
pub mod pagination;
pub mod query;
pub mod radio_browser;
pub mod refine;
pub mod validity;
