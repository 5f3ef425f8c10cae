//! Read helpers for a front-end consuming the WordPress REST API.
//!
//! Every function here degrades instead of failing: an unreachable CMS yields
//! an empty list or `None` and a warning in the logs, so a page rendering
//! from these helpers never crashes because of the API.
//!
//! # Actualités Endpoints
//!
//! Depending on how the site is set up, actualités are exposed in one of
//! three places. They are tried in this order and the first one answering
//! with a success status wins:
//!
//! 1. the `actualites` custom post type (`/wp/v2/actualites`)
//! 2. the ACF to REST API plugin (`/acf/v3/posts`)
//! 3. standard posts with ACF fields (`/wp/v2/posts?acf_format=standard`)

use super::{ACF_V3, ListQuery, WP_V2, WpClient, WpError};
use crate::models::{Page, Post, Term, WpPost};
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use tracing::{debug, instrument, warn};

const WORDS_PER_MINUTE: usize = 200;
const DEFAULT_IMAGE_WIDTH: u64 = 800;
const DEFAULT_IMAGE_HEIGHT: u64 = 600;

/// Which kind of entry is being normalized; decides the fallback slug.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostKind {
    Post,
    Actualite,
}

impl PostKind {
    fn default_slug(self) -> &'static str {
        match self {
            PostKind::Post => "article",
            PostKind::Actualite => "actualite",
        }
    }
}

/// Estimated reading time of some HTML, e.g. `"3 min"`.
///
/// Tags are stripped, words are whitespace-separated runs, and the count is
/// divided by 200 words per minute, rounded up, never below one minute.
pub fn reading_time(html: &str) -> String {
    let text = crate::extract::stripped_text(html);
    let words = text.split_whitespace().count();
    let minutes = words.div_ceil(WORDS_PER_MINUTE).max(1);
    format!("{minutes} min")
}

/// Format a WordPress date (`2025-11-05T09:30:00`) the French way (`05/11/2025`).
///
/// Unparseable input is returned unchanged.
pub fn french_date(raw: &str) -> String {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .map(|dt| dt.date())
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// Flatten a REST entry into the front-end [`Post`] shape.
///
/// Text fields fall back to their ACF equivalents (`titre`, `resume`,
/// `contenu`), the image to `acf.image` / `acf.image_url`, and the image
/// size to 800×600.
pub fn normalize(post: &WpPost, kind: PostKind) -> Post {
    let acf = post.acf_fields().cloned().unwrap_or_default();
    let acf_image = acf.get("image");

    let title = first_non_empty([Some(post.title_html()), post.acf_str("titre")])
        .unwrap_or("Sans titre");
    let excerpt = first_non_empty([Some(post.excerpt_html()), post.acf_str("resume")]).unwrap_or("");
    let content = first_non_empty([Some(post.content_html()), post.acf_str("contenu")]).unwrap_or("");

    let featured_image = first_non_empty([
        post.featured_image_url(),
        acf_image.and_then(|i| i.get("url")).and_then(Value::as_str),
        acf.get("image_url").and_then(Value::as_str),
    ])
    .unwrap_or("");

    let media_details = post.featured_media_entry().and_then(|m| m.get("media_details"));
    let dimension = |key: &str, default: u64| {
        media_details
            .and_then(|d| d.get(key))
            .and_then(Value::as_u64)
            .or_else(|| acf_image.and_then(|i| i.get(key)).and_then(Value::as_u64))
            .filter(|n| *n > 0)
            .unwrap_or(default)
    };

    let reading_source = first_non_empty([Some(content), Some(excerpt)]).unwrap_or("");

    Post {
        id: post.id,
        title: title.to_string(),
        slug: post
            .slug
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| kind.default_slug().to_string()),
        excerpt: excerpt.to_string(),
        date: post
            .date
            .clone()
            .or_else(|| post.acf_str("date").map(str::to_string))
            .unwrap_or_default(),
        content: content.to_string(),
        featured_image: featured_image.to_string(),
        image_width: dimension("width", DEFAULT_IMAGE_WIDTH),
        image_height: dimension("height", DEFAULT_IMAGE_HEIGHT),
        reading_time: reading_time(reading_source),
        categories: post.categories.clone(),
        tags: post.tags.clone(),
        author: post.author_name().unwrap_or_default().to_string(),
        acf,
    }
}

fn first_non_empty<'a, const N: usize>(options: [Option<&'a str>; N]) -> Option<&'a str> {
    options.into_iter().flatten().find(|s| !s.trim().is_empty())
}

async fn list_or_empty<T: serde::de::DeserializeOwned>(
    client: &WpClient,
    path: &str,
    query: &ListQuery,
) -> Vec<T> {
    match client.list::<T>(path, query).await {
        Ok(Page { items, .. }) => items,
        Err(e) => {
            warn!(%path, error = %e, "API request failed; returning an empty list");
            Vec::new()
        }
    }
}

/// Latest posts.
#[instrument(level = "info", skip(client))]
pub async fn get_all_posts(client: &WpClient, limit: usize) -> Vec<Post> {
    let query = ListQuery::per_page(limit).embedded();
    list_or_empty::<WpPost>(client, &format!("{WP_V2}/posts"), &query)
        .await
        .iter()
        .map(|p| normalize(p, PostKind::Post))
        .collect()
}

/// Latest posts of one category.
#[instrument(level = "info", skip(client))]
pub async fn get_posts_by_category(client: &WpClient, category: u64, limit: usize) -> Vec<Post> {
    let query = ListQuery::per_page(limit).category(category).embedded();
    list_or_empty::<WpPost>(client, &format!("{WP_V2}/posts"), &query)
        .await
        .iter()
        .map(|p| normalize(p, PostKind::Post))
        .collect()
}

/// A single post by slug, with its date formatted `dd/mm/yyyy`.
#[instrument(level = "info", skip(client))]
pub async fn get_post_by_slug(client: &WpClient, slug: &str) -> Option<Post> {
    let query = ListQuery::default().slug(slug).embedded();
    let post = list_or_empty::<WpPost>(client, &format!("{WP_V2}/posts"), &query)
        .await
        .into_iter()
        .next()?;
    Some(with_french_date(normalize(&post, PostKind::Post)))
}

pub async fn get_categories(client: &WpClient) -> Vec<Term> {
    list_or_empty(client, &format!("{WP_V2}/categories"), &ListQuery::per_page(100)).await
}

pub async fn get_tags(client: &WpClient) -> Vec<Term> {
    list_or_empty(client, &format!("{WP_V2}/tags"), &ListQuery::per_page(100)).await
}

pub async fn get_pages(client: &WpClient) -> Vec<WpPost> {
    list_or_empty(client, &format!("{WP_V2}/pages"), &ListQuery::per_page(100)).await
}

/// Candidate `(path, query)` pairs for actualités, in fallback order.
fn actualites_endpoints(base: ListQuery) -> [(String, ListQuery); 3] {
    [
        (format!("{WP_V2}/actualites"), base.clone()),
        (format!("{ACF_V3}/posts"), base.clone()),
        (format!("{WP_V2}/posts"), base.acf_format("standard")),
    ]
}

async fn list_actualites(client: &WpClient, base: ListQuery) -> Result<Vec<WpPost>, WpError> {
    let mut last_err = None;
    for (path, query) in actualites_endpoints(base) {
        match client.list::<WpPost>(&path, &query).await {
            Ok(page) => {
                debug!(%path, count = page.items.len(), "Actualités endpoint answered");
                return Ok(page.items);
            }
            Err(e) => {
                debug!(%path, error = %e, "Actualités endpoint unavailable; trying next");
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| WpError::UnexpectedShape("no endpoint tried".into())))
}

/// All actualités, using the first endpoint that answers.
#[instrument(level = "info", skip(client))]
pub async fn get_all_actualites(client: &WpClient, limit: usize) -> Vec<Post> {
    match list_actualites(client, ListQuery::per_page(limit).embedded()).await {
        Ok(items) => items.iter().map(|p| normalize(p, PostKind::Actualite)).collect(),
        Err(e) => {
            warn!(error = %e, "No actualités endpoint answered");
            Vec::new()
        }
    }
}

/// One actualité by slug, with its date formatted `dd/mm/yyyy`.
#[instrument(level = "info", skip(client))]
pub async fn get_actualite_by_slug(client: &WpClient, slug: &str) -> Option<Post> {
    match list_actualites(client, ListQuery::default().slug(slug).embedded()).await {
        Ok(items) => items
            .first()
            .map(|p| with_french_date(normalize(p, PostKind::Actualite))),
        Err(e) => {
            warn!(%slug, error = %e, "No actualités endpoint answered");
            None
        }
    }
}

/// First raw payload returned by any of the endpoints where ACF data may
/// live, with the name of that endpoint. Used to see how a site exposes
/// its ACF fields.
#[instrument(level = "info", skip(client))]
pub async fn debug_acf_structure(client: &WpClient, limit: usize) -> Option<(&'static str, Value)> {
    let endpoints = [
        ("ACF to REST API (posts)", format!("{ACF_V3}/posts?per_page={limit}")),
        ("Custom post type actualites", format!("{WP_V2}/actualites?per_page={limit}&_embed")),
        ("Standard posts with ACF", format!("{WP_V2}/posts?per_page={limit}&_embed")),
        ("WordPress namespace index", WP_V2.to_string()),
    ];
    for (name, path) in endpoints {
        match client.get_json::<Value>(&path).await {
            Ok(data) => return Some((name, data)),
            Err(e) => debug!(endpoint = name, error = %e, "Endpoint unavailable"),
        }
    }
    None
}

fn with_french_date(mut post: Post) -> Post {
    post.date = french_date(&post.date);
    post
}
