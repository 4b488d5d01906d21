//! Markdown rendering for the `fetch` command.
//!
//! Turns a story into plain Markdown on stdout: the title as a heading, a
//! fetch date line, text fragments converted from HTML, and images as
//! Markdown image links with an italicised caption.

use crate::models::{Story, StoryElement};
use crate::outputs::html::rewrite_internal_links;
use chrono::Local;
use html2md::parse_html;
use std::fmt::Write;

/// Convert a story to a Markdown document.
///
/// Link rewriting happens before the HTML-to-Markdown conversion, matching
/// what the web renderer shows.
pub fn story_to_markdown(story: &Story) -> String {
    let mut out = String::new();
    if let Some(title) = &story.title {
        writeln!(out, "# {title}\n").unwrap();
    }
    writeln!(out, "Fetched {}\n", Local::now().date_naive()).unwrap();
    for element in &story.elements {
        match element {
            StoryElement::Text { content } => {
                let fragment = parse_html(&rewrite_internal_links(content));
                let trimmed = fragment.trim();
                if !trimmed.is_empty() {
                    writeln!(out, "{trimmed}\n").unwrap();
                }
            }
            StoryElement::Image {
                caption,
                additional_properties,
            } => {
                if additional_properties.original_url.is_empty() {
                    continue;
                }
                writeln!(out, "![]({})\n", additional_properties.original_url).unwrap();
                if let Some(caption) = caption {
                    let trimmed = caption.trim();
                    if !trimmed.is_empty() {
                        writeln!(out, "_{trimmed}_\n").unwrap();
                    }
                }
            }
            StoryElement::Unknown => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImageProperties;

    fn story() -> Story {
        Story {
            title: Some("A headline".to_string()),
            elements: vec![
                StoryElement::Text {
                    content: "<p><strong>Bold</strong> start.</p>".to_string(),
                },
                StoryElement::Image {
                    caption: Some(" The waterfront. ".to_string()),
                    additional_properties: ImageProperties {
                        original_url: "https://www.nzherald.co.nz/resizer/a.jpg".to_string(),
                    },
                },
                StoryElement::Unknown,
            ],
        }
    }

    #[test]
    fn test_story_to_markdown_structure() {
        let md = story_to_markdown(&story());
        assert!(md.starts_with("# A headline\n"));
        assert!(md.contains("**Bold** start."));
        assert!(md.contains("![](https://www.nzherald.co.nz/resizer/a.jpg)"));
        assert!(md.contains("_The waterfront._"));
    }

    #[test]
    fn test_story_to_markdown_rewrites_links() {
        let story = Story {
            title: None,
            elements: vec![StoryElement::Text {
                content: r#"<p><a href="https://www.nzherald.co.nz/nz/x/ID/">more</a></p>"#
                    .to_string(),
            }],
        };
        let md = story_to_markdown(&story);
        assert!(md.contains("(/nz/x/ID/)"));
        assert!(!md.contains("nzherald.co.nz"));
    }
}
