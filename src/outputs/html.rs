//! HTML rendering for the web application's story pages.
//!
//! Text elements arrive from the publisher as HTML fragments; they are
//! embedded after link rewriting. Images become full-width `<img>` tags with
//! an italicised caption underneath. Unknown element types are skipped.

use crate::models::{Story, StoryElement};
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::fmt::Write;

/// Substring replaced to keep story-to-story links on-site.
const INTERNAL_HREF: &str = "href=\"https://www.nzherald.co.nz/";

/// Rewrite the publisher's absolute story links to local paths.
///
/// `href="https://www.nzherald.co.nz/..."` becomes `href="/..."`, so a
/// click on a related story routes back through this application.
pub fn rewrite_internal_links(html: &str) -> String {
    html.replace(INTERNAL_HREF, "href=\"/")
}

/// Render a story into the page body fragment.
///
/// The result is the content column only; the caller wraps it in the page
/// chrome. Produces the title as an `<h3>` followed by one fragment per
/// renderable element.
pub fn render_story(story: &Story) -> String {
    let mut out = String::new();
    if let Some(title) = &story.title {
        writeln!(out, "<h3>{}</h3>", encode_text(title)).unwrap();
    }
    for element in &story.elements {
        match element {
            StoryElement::Text { content } => {
                writeln!(out, "{}", rewrite_internal_links(content)).unwrap();
            }
            StoryElement::Image {
                caption,
                additional_properties,
            } => {
                if additional_properties.original_url.is_empty() {
                    continue;
                }
                writeln!(
                    out,
                    "<img src=\"{}\" width=\"100%\">",
                    encode_double_quoted_attribute(&additional_properties.original_url)
                )
                .unwrap();
                if let Some(caption) = caption {
                    let trimmed = caption.trim();
                    if !trimmed.is_empty() {
                        writeln!(out, "<p><em>{}</em></p>", encode_text(trimmed)).unwrap();
                    }
                }
            }
            StoryElement::Unknown => {}
        }
    }
    out
}

/// The static message shown whenever any stage of the story pipeline fails.
pub fn render_fallback() -> String {
    "<p>Sorry, can't parse that URL</p>".to_string()
}
