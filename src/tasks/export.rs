//! Export actualités from the legacy site.
//!
//! The legacy site lists actualités without their body (`content` is absent
//! or empty on the listing), so every new post goes through up to three
//! steps:
//!
//! 1. fetch the single record (`/actualites/{id}?_embed`) and merge it over
//!    the listing entry
//! 2. if there is still no body, fetch the public page (`link`)
//! 3. run [`extract_content_region`] on that page, anchored on the title
//!
//! Posts whose body cannot be recovered are kept anyway and reported at the
//! end for manual review.
//!
//! The listing is paged with `offset` in batches of `batch_size`. The export
//! file is rewritten after each batch, and posts already in it are skipped,
//! so a run can be interrupted and resumed.

use super::ACTUALITES;
use crate::api::RetryPolicy;
use crate::config::Settings;
use crate::extract::extract_content_region;
use crate::models::{Rendered, WpPost};
use crate::outputs::json::{date_range, known_ids, load_export, merge_new, missing_content, write_export};
use crate::utils::{ensure_parent_writable, plain_text};
use crate::wordpress::{ListQuery, WP_V2, WpClient, WpError};
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub export_file: PathBuf,
    pub batch_size: usize,
    pub post_pause: Duration,
    pub batch_pause: Duration,
    pub retry: RetryPolicy,
}

impl ExportOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            export_file: settings.export_file.clone(),
            batch_size: settings.batch_size.max(1),
            post_pause: settings.pauses.export_post(),
            batch_pause: settings.pauses.export_batch(),
            retry: settings.retry_policy(),
        }
    }
}

/// Outcome of one listing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportBatch {
    /// Entries the listing returned.
    pub count: usize,
    /// Entries that were not in the export file yet.
    pub added: usize,
    /// A full page came back, so there may be more.
    pub has_more: bool,
}

/// Totals for a whole export run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub total: usize,
    pub added: usize,
    /// Slugs of exported posts that still have no body.
    pub missing_content: Vec<String>,
}

/// Export every actualité to the export file.
///
/// A listing that keeps failing after retries ends the run early; what was
/// exported so far stays in the file.
///
/// # Errors
///
/// Returns an error if the export file cannot be read or written.
#[instrument(level = "info", skip_all, fields(file = %opts.export_file.display()))]
pub async fn export_all(source: &WpClient, opts: &ExportOptions) -> Result<ExportSummary, Box<dyn Error>> {
    ensure_parent_writable(&opts.export_file).await?;
    let mut posts = load_export(&opts.export_file).await?;
    let mut offset = 0usize;
    let mut added = 0usize;

    info!(
        source = source.root(),
        batch_size = opts.batch_size,
        already_exported = posts.len(),
        "Starting export"
    );

    loop {
        let batch = match export_batch(source, opts, &mut posts, offset).await {
            Ok(batch) => batch,
            Err(e) => {
                error!(offset, error = %e, "Listing failed; stopping export");
                break;
            }
        };
        if batch.count == 0 {
            break;
        }

        added += batch.added;
        write_export(&opts.export_file, &posts).await?;
        info!(offset, listed = batch.count, added = batch.added, total = posts.len(), "Batch exported");

        if !batch.has_more {
            break;
        }
        offset += opts.batch_size;
        sleep(opts.batch_pause).await;
    }

    let summary = ExportSummary {
        total: posts.len(),
        added,
        missing_content: missing_content(&posts),
    };
    print_summary(&posts, &summary);
    Ok(summary)
}

/// Export one listing page starting at `offset`, appending new posts to
/// `posts`.
///
/// # Errors
///
/// Returns the listing error once retries are exhausted. Errors on single
/// posts are logged and never returned.
#[instrument(level = "info", skip(source, opts, posts))]
pub async fn export_batch(
    source: &WpClient,
    opts: &ExportOptions,
    posts: &mut Vec<WpPost>,
    offset: usize,
) -> Result<ExportBatch, WpError> {
    let path = format!("{WP_V2}/{ACTUALITES}");
    let query = ListQuery::per_page(opts.batch_size)
        .offset(offset)
        .embedded()
        .context("view");

    let listed = match opts
        .retry
        .run("list actualites", || source.list::<WpPost>(&path, &query))
        .await
    {
        Ok(page) => page.items,
        Err(WpError::UnexpectedShape(msg)) => {
            warn!(%msg, "Listing is not an array; treating as empty");
            Vec::new()
        }
        Err(e) => return Err(e),
    };
    let count = listed.len();

    let known = known_ids(posts);
    let fresh: Vec<WpPost> = listed
        .into_iter()
        .filter(|p| !known.contains(&p.id))
        .unique_by(|p| p.id)
        .collect();
    debug!(count, fresh = fresh.len(), "Listing page received");

    let enriched: Vec<WpPost> = stream::iter(fresh)
        .then(|post| async move {
            let post = complete_post(source, &opts.retry, post).await;
            sleep(opts.post_pause).await;
            post
        })
        .collect()
        .await;

    Ok(ExportBatch {
        count,
        added: merge_new(posts, enriched),
        has_more: count == opts.batch_size,
    })
}

/// Fill in a listed post: single record first, then the public page.
#[instrument(level = "info", skip_all, fields(id = post.id))]
async fn complete_post(source: &WpClient, retry: &RetryPolicy, post: WpPost) -> WpPost {
    let id = post.id;
    let mut post = match retry.run("get actualite", || source.get_post(ACTUALITES, id)).await {
        Ok(detail) => {
            let fallback = post.clone();
            post.merged_with(detail).unwrap_or_else(|e| {
                warn!(error = %e, "Could not merge single record; keeping listing entry");
                fallback
            })
        }
        Err(e) if e.is_not_found() => {
            debug!("No single record; keeping listing entry");
            post
        }
        Err(e) => {
            warn!(error = %e, "Single record unavailable; keeping listing entry");
            post
        }
    };

    if post.has_content() {
        debug!("Body present in the API");
        return post;
    }

    let Some(link) = post.link.clone() else {
        warn!("No body and no public link; needs manual review");
        return post;
    };

    let recovered = recover_content(source, retry, &link, post.title_html()).await;
    match recovered {
        Some(markup) => post.content = Some(Rendered::from_markup(markup)),
        None => warn!(%link, "Body not found in the public page; needs manual review"),
    }
    post
}

/// Fetch the public page and extract the article body from it.
async fn recover_content(source: &WpClient, retry: &RetryPolicy, link: &str, title: &str) -> Option<String> {
    let html = match retry.run("fetch page", || source.fetch_html(link)).await {
        Ok(html) => html,
        Err(e) => {
            warn!(%link, error = %e, "Public page unavailable");
            return None;
        }
    };
    let found = extract_content_region(&html, title)?;
    info!(
        strategy = %found.strategy,
        text_chars = found.text_len,
        markup_bytes = found.markup.len(),
        "Recovered body from the public page"
    );
    Some(found.markup)
}

fn print_summary(posts: &[WpPost], summary: &ExportSummary) {
    println!("Export finished: {} actualités ({} new)", summary.total, summary.added);
    if let Some((newest, oldest)) = date_range(posts) {
        println!("  newest: {newest}");
        println!("  oldest: {oldest}");
    }
    if !summary.missing_content.is_empty() {
        println!("  without body ({}), to review manually:", summary.missing_content.len());
        for slug in &summary.missing_content {
            println!("    - {slug}");
        }
    }
    if let Some(latest) = posts.first() {
        println!("  latest title: {}", plain_text(latest.title_html()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn options(export_file: PathBuf, batch_size: usize) -> ExportOptions {
        ExportOptions {
            export_file,
            batch_size,
            post_pause: Duration::ZERO,
            batch_pause: Duration::ZERO,
            retry: RetryPolicy {
                max_retries: 1,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(1),
                max_jitter: Duration::ZERO,
            },
        }
    }

    fn article_page(title: &str) -> String {
        let body = "Le groupe a signé un nouvel accord d'entreprise portant sur la qualité de vie au travail. ".repeat(4);
        format!(
            "<html><body><header><nav>Menu</nav></header><main><h1>{title}</h1>\
             <div data-elementor-type=\"wp-post\" class=\"elementor\"><p>{body}</p></div>\
             </main><footer>Mentions légales</footer></body></html>"
        )
    }

    #[tokio::test]
    async fn test_export_recovers_bodies_and_skips_known_ids() {
        let server = MockServer::start().await;
        let uri = server.uri();

        Mock::given(method("GET"))
            .and(path("/wp-json/wp/v2/actualites"))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 1, "date": "2025-11-05T09:30:00", "title": { "rendered": "Déjà là" } },
                { "id": 2, "date": "2025-10-01T09:00:00", "slug": "deux", "title": { "rendered": "Deux" } },
                {
                    "id": 3,
                    "date": "2025-09-01T09:00:00",
                    "slug": "trois",
                    "title": { "rendered": "NEWSLETTER TROIS" },
                    "link": format!("{uri}/actualites/trois/")
                }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/wp-json/wp/v2/actualites"))
            .and(query_param("offset", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/wp-json/wp/v2/actualites/2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 2,
                "content": { "rendered": "<p>Corps depuis l'API</p>" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/wp-json/wp/v2/actualites/3"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "code": "rest_post_invalid_id",
                "message": "Invalid post ID."
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/actualites/trois/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(article_page("NEWSLETTER TROIS")))
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("exports").join("actualites.json");
        let existing: Vec<WpPost> = vec![serde_json::from_value(json!({ "id": 1, "slug": "un" })).unwrap()];
        write_export(&file, &existing).await.unwrap();

        let client = WpClient::new(&format!("{uri}/wp-json")).unwrap();
        let summary = export_all(&client, &options(file.clone(), 3)).await.unwrap();

        assert_eq!(summary.total, 3);
        assert_eq!(summary.added, 2);
        assert_eq!(summary.missing_content, vec!["un".to_string()]);

        let saved = load_export(&file).await.unwrap();
        assert_eq!(saved.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(saved[0].slug.as_deref(), Some("un"));
        assert_eq!(saved[1].content_html(), "<p>Corps depuis l'API</p>");
        assert_eq!(saved[1].slug.as_deref(), Some("deux"));
        assert!(saved[2].content_html().starts_with("<div data-elementor-type=\"wp-post\""));
        assert!(saved[2].content_html().contains("qualité de vie"));
    }

    #[tokio::test]
    async fn test_short_page_ends_export() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wp-json/wp/v2/actualites"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 9, "content": { "rendered": "<p>ok</p>" } }
            ])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/wp-json/wp/v2/actualites/9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 9 })))
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let client = WpClient::new(&format!("{}/wp-json", server.uri())).unwrap();
        let opts = options(tmp.path().join("a.json"), 20);
        let mut posts = Vec::new();

        let batch = export_batch(&client, &opts, &mut posts, 0).await.unwrap();
        assert_eq!(
            batch,
            ExportBatch {
                count: 1,
                added: 1,
                has_more: false
            }
        );
        assert_eq!(posts[0].content_html(), "<p>ok</p>");
    }

    #[tokio::test]
    async fn test_listing_failure_stops_gracefully() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wp-json/wp/v2/actualites"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let client = WpClient::new(&format!("{}/wp-json", server.uri())).unwrap();
        let summary = export_all(&client, &options(tmp.path().join("a.json"), 5)).await.unwrap();
        assert_eq!(summary.total, 0);
    }
}
