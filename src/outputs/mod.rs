//! Story rendering modules.
//!
//! This module contains submodules responsible for turning a parsed
//! [`crate::models::Story`] into something readable:
//!
//! # Submodules
//!
//! - [`html`]: Fragments for the web application's story pages
//! - [`markdown`]: Plain Markdown for the `fetch` command's stdout
//!
//! Both renderers walk the same element list and share one rule: internal
//! links are rewritten to stay on-site, so following a story-to-story link
//! keeps the reader inside the application.

pub mod html;
pub mod markdown;
