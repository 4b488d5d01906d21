//! Article scrapers.
//!
//! One submodule per publisher. Each scraper turns an article URL into a
//! [`crate::models::Story`] ready for rendering.
//!
//! # Supported Sources
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | NZ Herald | [`nzherald`] | Embedded JSON | Content blob inside the `fusion-metadata` script |
//!
//! # Common Patterns
//!
//! Scrapers use:
//! - `reqwest` for fetching, with the page treated as a full HTML document
//! - `scraper` selectors to locate the content-bearing node
//! - Graceful failure: any miss along the pipeline surfaces one error the
//!   caller maps to a static "can't parse that URL" message

pub mod nzherald;
