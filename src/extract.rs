//! Best-effort recovery of an article body from a rendered HTML page.
//!
//! The legacy site renders its actualités with a page builder, and its REST
//! API frequently returns an empty `content.rendered`. This module locates the
//! part of the raw markup most likely to hold the human-written body, using
//! ordered pattern-matching strategies over the text. It never builds a DOM.
//!
//! # Strategy Order
//!
//! | # | Strategy | Scope | Acceptance |
//! |---|----------|-------|------------|
//! | 1 | [`Strategy::StructuredBlock`] | window after the title | longest non-boilerplate block, text > 100 |
//! | 2 | [`Strategy::GenericMain`] | window after the title | first `main` container, text > 100 |
//! | 3 | [`Strategy::EntryContent`] | whole document | text > 100 |
//! | 4 | [`Strategy::ArticleTag`] | whole document | text > 100 |
//! | 5 | [`Strategy::HeuristicSlice`] | cleaned window | cleaned text > 500, middle 80% returned |
//!
//! The window starts at the first occurrence of the title and ends at the
//! first `<footer` or `</main>` after it. When the title cannot be found the
//! structured-block strategy is skipped and the window starts at the top of
//! the document.
//!
//! Everything here is pure: no I/O, no shared state, identical inputs give
//! identical outputs.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::fmt;
use std::ops::Range;

/// Minimum stripped-text length for a structural candidate to be accepted.
pub const MIN_CONTENT_CHARS: usize = 100;

/// Minimum stripped-text length of the cleaned window before slicing it.
pub const MIN_SLICE_CHARS: usize = 500;

/// Case-insensitive substrings that mark a block as site chrome.
const BOILERPLATE_MARKERS: &[&str] = &["menu", "navigation", "header", "footer"];

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

static BOUNDARY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<footer|</main\s*>").unwrap());

// Used for depth counting when looking for the close tag of an element.
static ANY_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<(/?)([a-z][a-z0-9-]*)\b[^>]*>").unwrap());

// Page-builder marker for the primary content container.
static STRUCTURED_BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)<([a-z][a-z0-9-]*)\b[^>]*\sdata-elementor-type\s*=\s*(?:["'][^"']*["']|[^\s>]+)[^>]*>"#,
    )
    .unwrap()
});

static MAIN_LANDMARK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<(main)(?:[\s/][^>]*)?>").unwrap());

static MAIN_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<([a-z][a-z0-9-]*)\b[^>]*\sid\s*=\s*["'][^"']*main[^"']*["'][^>]*>"#).unwrap()
});

static MAIN_CLASS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<([a-z][a-z0-9-]*)\b[^>]*\sclass\s*=\s*["'][^"']*main[^"']*["'][^>]*>"#)
        .unwrap()
});

static ENTRY_CONTENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)<([a-z][a-z0-9-]*)\b[^>]*\sclass\s*=\s*["'][^"']*(?:entry|post)-content[^"']*["'][^>]*>"#,
    )
    .unwrap()
});

static ARTICLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<(article)(?:[\s/][^>]*)?>").unwrap());

// Paired blocks deleted from the window before the heuristic slice. Names
// are matched exactly, so `<nav-menu>` is not a `<nav>`.
static CHROME_BLOCK_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    ["script", "style", "nav", "header"]
        .iter()
        .map(|tag| Regex::new(&format!(r"(?is)<{tag}(?:[\s/][^>]*)?>.*?</{tag}\s*>")).unwrap())
        .collect()
});

/// The strategy that proposed a [`Candidate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// A page-builder container (`data-elementor-type`) after the title.
    StructuredBlock,
    /// A `<main>` landmark, or an element whose id or class contains "main".
    GenericMain,
    /// An element classed `entry-content` or `post-content`.
    EntryContent,
    /// An `<article>` element.
    ArticleTag,
    /// The middle 80% of the cleaned window.
    HeuristicSlice,
}

impl Strategy {
    /// Stable kebab-case name used in logs and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::StructuredBlock => "structured-block",
            Strategy::GenericMain => "generic-main",
            Strategy::EntryContent => "entry-content",
            Strategy::ArticleTag => "article-tag",
            Strategy::HeuristicSlice => "heuristic-slice",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A region of markup proposed by one strategy.
///
/// Structural candidates borrow straight from the document. The heuristic
/// slice is cut from a cleaned copy of the window, so it owns its markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate<'a> {
    pub strategy: Strategy,
    pub markup: Cow<'a, str>,
    /// Character count of `markup` with tags removed and whitespace trimmed.
    pub text_len: usize,
    /// Whether the stripped text contains a boilerplate marker.
    pub boilerplate: bool,
}

impl<'a> Candidate<'a> {
    fn new(strategy: Strategy, markup: Cow<'a, str>) -> Self {
        let text = stripped_text(&markup);
        let lowered = text.to_lowercase();
        Self {
            strategy,
            text_len: text.chars().count(),
            boilerplate: BOILERPLATE_MARKERS.iter().any(|m| lowered.contains(m)),
            markup,
        }
    }

    /// Length of the raw markup in characters.
    pub fn markup_len(&self) -> usize {
        self.markup.chars().count()
    }

    /// Whether this candidate clears the bar its strategy sets.
    ///
    /// Only structured blocks are screened for boilerplate. A heuristic slice
    /// is only ever built once the cleaned window passed its own threshold.
    pub fn is_confident(&self) -> bool {
        match self.strategy {
            Strategy::StructuredBlock => !self.boilerplate && self.text_len > MIN_CONTENT_CHARS,
            Strategy::HeuristicSlice => true,
            _ => self.text_len > MIN_CONTENT_CHARS,
        }
    }
}

/// The region chosen by [`extract_content_region`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub markup: String,
    pub strategy: Strategy,
    pub text_len: usize,
}

impl From<Candidate<'_>> for Extraction {
    fn from(candidate: Candidate<'_>) -> Self {
        Self {
            markup: candidate.markup.into_owned(),
            strategy: candidate.strategy,
            text_len: candidate.text_len,
        }
    }
}

/// Locate the article body inside `html`, using `title` as the anchor.
///
/// Strategies are tried in order and the first confident one wins. See the
/// module documentation for the order and thresholds.
///
/// # Arguments
///
/// * `html` - The full markup of the rendered page
/// * `title` - The article title as it appears verbatim in the page
///
/// # Returns
///
/// The chosen region, or `None` when no strategy found enough content. `None`
/// is an expected outcome: callers should fall back to another content source
/// or flag the post for manual review.
pub fn extract_content_region(html: &str, title: &str) -> Option<Extraction> {
    if html.is_empty() {
        return None;
    }
    let window = Window::locate(html, title);

    let structured = if window.anchored {
        longest_structured_block(html, &window)
    } else {
        None
    };

    structured
        .or_else(|| generic_main(html, &window).filter(Candidate::is_confident))
        .or_else(|| entry_content(html).filter(Candidate::is_confident))
        .or_else(|| article_tag(html).filter(Candidate::is_confident))
        .or_else(|| heuristic_slice(html, &window))
        .map(Extraction::from)
}

/// Every candidate each strategy produced for `html`, accepted or not.
///
/// Intended for diagnostics: the output shows what each strategy saw so a
/// person can judge why a page was or was not recovered. Structured blocks
/// are listed individually, in document order.
pub fn candidates<'a>(html: &'a str, title: &str) -> Vec<Candidate<'a>> {
    if html.is_empty() {
        return Vec::new();
    }
    let window = Window::locate(html, title);

    let mut out = Vec::new();
    if window.anchored {
        out.extend(structured_blocks(html, &window));
    }
    out.extend(generic_main(html, &window));
    out.extend(entry_content(html));
    out.extend(article_tag(html));
    out.extend(heuristic_slice(html, &window));
    out
}

/// Remove every tag from `markup` and trim surrounding whitespace.
pub fn stripped_text(markup: &str) -> String {
    TAG_RE.replace_all(markup, "").trim().to_string()
}

/// Span of the document the windowed strategies look at.
#[derive(Debug)]
struct Window {
    range: Range<usize>,
    anchored: bool,
}

impl Window {
    fn locate(html: &str, title: &str) -> Self {
        let anchor = if title.is_empty() { None } else { html.find(title) };
        let start = anchor.unwrap_or(0);
        let end = BOUNDARY_RE
            .find_at(html, start)
            .map(|m| m.start())
            .unwrap_or(html.len());
        Self {
            range: start..end,
            anchored: anchor.is_some(),
        }
    }
}

fn longest_structured_block<'a>(html: &'a str, window: &Window) -> Option<Candidate<'a>> {
    structured_blocks(html, window)
        .into_iter()
        .filter(|c| !c.boilerplate)
        // first wins on equal length
        .fold(None, |best: Option<Candidate<'a>>, c| match best {
            Some(b) if b.text_len >= c.text_len => Some(b),
            _ => Some(c),
        })
        .filter(Candidate::is_confident)
}

fn structured_blocks<'a>(html: &'a str, window: &Window) -> Vec<Candidate<'a>> {
    open_tags(&STRUCTURED_BLOCK_RE, html, &window.range)
        .map(|open| Candidate::new(Strategy::StructuredBlock, Cow::Borrowed(element(html, &open))))
        .collect()
}

fn generic_main<'a>(html: &'a str, window: &Window) -> Option<Candidate<'a>> {
    [&*MAIN_LANDMARK_RE, &*MAIN_ID_RE, &*MAIN_CLASS_RE]
        .into_iter()
        .find_map(|re| open_tags(re, html, &window.range).next())
        .map(|open| Candidate::new(Strategy::GenericMain, Cow::Borrowed(element(html, &open))))
}

fn entry_content(html: &str) -> Option<Candidate<'_>> {
    open_tags(&ENTRY_CONTENT_RE, html, &(0..html.len()))
        .next()
        .map(|open| Candidate::new(Strategy::EntryContent, Cow::Borrowed(element(html, &open))))
}

fn article_tag(html: &str) -> Option<Candidate<'_>> {
    open_tags(&ARTICLE_RE, html, &(0..html.len()))
        .next()
        .map(|open| Candidate::new(Strategy::ArticleTag, Cow::Borrowed(element(html, &open))))
}

fn heuristic_slice<'a>(html: &'a str, window: &Window) -> Option<Candidate<'a>> {
    let cleaned = strip_chrome(&html[window.range.clone()]);
    if stripped_text(&cleaned).chars().count() <= MIN_SLICE_CHARS {
        return None;
    }

    let total = cleaned.chars().count();
    let middle = char_slice(&cleaned, total / 10, total * 9 / 10).to_string();
    Some(Candidate::new(Strategy::HeuristicSlice, Cow::Owned(middle)))
}

/// `markup` without its paired `script`, `style`, `nav` and `header` blocks.
fn strip_chrome(markup: &str) -> String {
    CHROME_BLOCK_RES
        .iter()
        .fold(markup.to_string(), |acc, re| re.replace_all(&acc, "").into_owned())
}

/// An opening tag matched by one of the strategy patterns.
#[derive(Debug)]
struct OpenTag {
    name: String,
    start: usize,
    end: usize,
}

/// Opening tags matched by `re` that start inside `range`, in document order.
fn open_tags<'r, 'h>(
    re: &'r Regex,
    html: &'h str,
    range: &Range<usize>,
) -> impl Iterator<Item = OpenTag> + use<'r, 'h> {
    let offset = range.start;
    re.captures_iter(&html[range.clone()])
        .filter_map(move |caps: Captures<'h>| {
            let whole = caps.get(0)?;
            Some(OpenTag {
                name: caps.get(1)?.as_str().to_ascii_lowercase(),
                start: offset + whole.start(),
                end: offset + whole.end(),
            })
        })
}

/// The full element opened by `open`, up to its balancing close tag.
///
/// Only tags with the same name are counted. An element that is never closed
/// runs to the end of the document.
fn element<'a>(html: &'a str, open: &OpenTag) -> &'a str {
    if open.end >= html.len() || html[open.start..open.end].ends_with("/>") {
        return &html[open.start..open.end];
    }

    let mut depth = 1usize;
    for caps in ANY_TAG_RE.captures_iter(&html[open.end..]) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(2)) else {
            continue;
        };
        if !name.as_str().eq_ignore_ascii_case(&open.name) {
            continue;
        }
        let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        if closing {
            depth -= 1;
            if depth == 0 {
                return &html[open.start..open.end + whole.end()];
            }
        } else if !whole.as_str().ends_with("/>") {
            depth += 1;
        }
    }
    &html[open.start..]
}

/// Slice `s` between two character offsets.
fn char_slice(s: &str, from: usize, to: usize) -> &str {
    let byte_at = |n: usize| s.char_indices().nth(n).map(|(i, _)| i).unwrap_or(s.len());
    &s[byte_at(from)..byte_at(to)]
}
