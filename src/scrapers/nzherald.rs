//! NZ Herald article scraper.
//!
//! The publisher renders articles client-side from a JSON blob embedded in
//! the page markup: a `<script>` fragment with id `fusion-metadata` assigns
//! the full story to `Fusion.globalContent`. This scraper fetches the page,
//! slices that assignment out of the script text, repairs the blob's
//! non-standard boolean literals, and parses it into a [`Story`].
//!
//! # Pipeline
//!
//! 1. Resolve the input: a site path (`/nz/...`) or any URL on
//!    `nzherald.co.nz`; everything else is rejected up front.
//! 2. HTTP GET; only a 200 response is accepted.
//! 3. Locate `#fusion-metadata`, slice between `Fusion.globalContent=` and
//!    `;Fusion.globalContentConfig`.
//! 4. Patch `:true`/`:false` to quoted strings, then `serde_json` parse.

use crate::models::Story;
use crate::utils::truncate_for_log;
use once_cell::sync::Lazy;
use reqwest::get;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Base URL used to resolve bare site paths pasted or routed into the app.
pub const SITE: &str = "https://nzherald.co.nz";

/// Host fragment a query URL must carry to be fetched at all.
const HOST_FRAGMENT: &str = "nzherald.co.nz";

/// Opening marker of the content assignment inside the metadata script.
const CONTENT_START: &str = "Fusion.globalContent=";

/// Closing marker; the assignment runs up to the next config assignment.
const CONTENT_END: &str = ";Fusion.globalContentConfig";

static FUSION_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("#fusion-metadata").unwrap());
static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static BASE_URL: Lazy<Url> = Lazy::new(|| Url::parse(SITE).unwrap());

/// Everything that can go wrong between a pasted URL and a parsed [`Story`].
///
/// Callers collapse all of these into the one static fallback message; the
/// variants exist so the logs say which stage missed.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// The query URL does not point at the publisher.
    #[error("not an NZ Herald URL: {0}")]
    UnsupportedUrl(String),
    /// The page fetch itself failed.
    #[error("fetch failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The publisher answered with a non-200 status.
    #[error("unexpected response status: {0}")]
    Status(reqwest::StatusCode),
    /// No `#fusion-metadata` element in the document.
    #[error("page has no fusion-metadata script")]
    MissingMetadata,
    /// The metadata script does not carry the expected assignment.
    #[error("marker not found in metadata script: {0}")]
    MissingMarker(&'static str),
    /// The sliced blob did not parse.
    #[error("content blob is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Resolve user input into an absolute article URL.
///
/// Site-relative paths are joined onto [`SITE`]; absolute URLs must contain
/// the publisher's host. Anything else is refused before any network I/O.
pub fn resolve_story_url(input: &str) -> Result<String, ScrapeError> {
    let trimmed = input.trim();
    if trimmed.starts_with('/') {
        return match BASE_URL.join(trimmed) {
            Ok(resolved) => Ok(resolved.to_string()),
            Err(_) => Err(ScrapeError::UnsupportedUrl(trimmed.to_string())),
        };
    }
    if trimmed.contains(HOST_FRAGMENT) {
        return Ok(trimmed.to_string());
    }
    Err(ScrapeError::UnsupportedUrl(trimmed.to_string()))
}

/// Fetch and parse a single NZ Herald story.
///
/// # Arguments
///
/// * `input` - A full article URL or a site-relative path.
///
/// # Returns
///
/// The parsed [`Story`] with the page title attached, or a [`ScrapeError`]
/// naming the stage that failed.
#[instrument(level = "info", skip_all, fields(%input))]
pub async fn fetch_story(input: &str) -> Result<Story, ScrapeError> {
    let url = resolve_story_url(input)?;
    let response = get(&url).await?;
    let status = response.status();
    if status != reqwest::StatusCode::OK {
        warn!(%url, %status, "Publisher returned non-200");
        return Err(ScrapeError::Status(status));
    }
    let body = response.text().await?;
    let story = parse_story_page(&body)?;
    info!(
        %url,
        elements = story.elements.len(),
        title = story.title.as_deref().unwrap_or("<untitled>"),
        "Fetched NZ Herald story"
    );
    Ok(story)
}

/// Parse a full article page into a [`Story`].
///
/// Split out from [`fetch_story`] so the slicing and patching logic is
/// testable against fixture documents.
pub fn parse_story_page(html: &str) -> Result<Story, ScrapeError> {
    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|t| t.text().collect::<String>())
        .filter(|t| !t.is_empty());

    let script = document
        .select(&FUSION_SELECTOR)
        .next()
        .ok_or(ScrapeError::MissingMetadata)?
        .text()
        .collect::<String>();

    let blob = slice_content_blob(&script)?;
    let patched = patch_literal_booleans(blob);
    debug!(bytes = patched.len(), "Sliced content blob");

    let mut story: Story = serde_json::from_str(&patched).inspect_err(|e| {
        warn!(
            error = %e,
            preview = %truncate_for_log(&patched, 300),
            "Content blob failed to parse"
        );
    })?;
    story.title = title;
    Ok(story)
}

/// Slice the `Fusion.globalContent` assignment out of the script text.
fn slice_content_blob(script: &str) -> Result<&str, ScrapeError> {
    let (_, rest) = script
        .split_once(CONTENT_START)
        .ok_or(ScrapeError::MissingMarker(CONTENT_START))?;
    let (blob, _) = rest
        .split_once(CONTENT_END)
        .ok_or(ScrapeError::MissingMarker(CONTENT_END))?;
    Ok(blob)
}

/// Quote the blob's bare boolean literals.
///
/// The embedded blob writes `:true`/`:false` where the original runtime
/// expected quoted strings; the substitution is kept byte-for-byte so the
/// parsed shape matches what the rest of the pipeline reads.
fn patch_literal_booleans(blob: &str) -> String {
    blob.replace(":false", ":\"False\"").replace(":true", ":\"True\"")
}
