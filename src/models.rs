//! Data models for stories and users.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Story`]: The embedded content blob extracted from an article page
//! - [`StoryElement`]: One heterogeneous content element (text / image / other)
//! - [`User`]: A row in the `user` table backing the login check
//!
//! The element field names (`additional_properties`, `originalUrl`, `caption`)
//! match the JSON shape the publisher embeds in its pages, hence the serde
//! renames rather than crate-side naming.

use serde::Deserialize;

/// The parsed content of a single article page.
///
/// Produced by [`crate::scrapers::nzherald::fetch_story`]. The `elements`
/// list may be empty: pages without an `elements` key still render their
/// title and nothing else.
#[derive(Debug, Default, Deserialize)]
pub struct Story {
    /// Content elements in publication order.
    #[serde(default)]
    pub elements: Vec<StoryElement>,
    /// The page `<title>`, captured from the document rather than the blob.
    #[serde(skip)]
    pub title: Option<String>,
}

/// One content element from the story blob, tagged by its `type` field.
///
/// The publisher's element list is heterogeneous; only `text` and `image`
/// are rendered. Every other tag deserializes to [`StoryElement::Unknown`]
/// and is skipped by the renderers.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum StoryElement {
    /// An HTML fragment of body text.
    #[serde(rename = "text")]
    Text {
        /// The fragment itself. Internal links still point at the publisher.
        #[serde(default)]
        content: String,
    },
    /// An inline image with an optional caption.
    #[serde(rename = "image")]
    Image {
        #[serde(default)]
        caption: Option<String>,
        #[serde(default)]
        additional_properties: ImageProperties,
    },
    /// Any element type this application does not render.
    #[serde(other)]
    Unknown,
}

/// The subset of an image element's `additional_properties` we render.
#[derive(Debug, Default, Deserialize)]
pub struct ImageProperties {
    /// Full-resolution source URL.
    #[serde(rename = "originalUrl", default)]
    pub original_url: String,
}

/// A registered user.
///
/// Mirrors the three-column `user` table: unique username, unique email,
/// and the argon2 hash stored in `password`.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Password hash in PHC string format. Never the plaintext.
    pub password: String,
}
