//! Delete what an import created on the new site.
//!
//! By default each post of the export file is looked up by slug and the
//! first match is force-deleted. With `all`, or when there is no export file,
//! every post of the collection is deleted.

use super::import::detect_collection;
use crate::config::Settings;
use crate::models::WpPost;
use crate::outputs::json::load_export;
use crate::outputs::report::RunSummary;
use crate::utils::plain_text;
use crate::wordpress::{ListQuery, WP_V2, WpClient, WpError};
use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

const DELETE_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct CleanOptions {
    pub export_file: PathBuf,
    /// Delete every post, not only the imported ones.
    pub all: bool,
    pub post_pause: Duration,
}

impl CleanOptions {
    pub fn from_settings(settings: &Settings, all: bool) -> Self {
        Self {
            export_file: settings.export_file.clone(),
            all,
            post_pause: settings.pauses.clean_post(),
        }
    }
}

/// Run the clean-up against `target`, which must carry credentials.
#[instrument(level = "info", skip_all, fields(target = target.root(), all = opts.all))]
pub async fn clean(target: &WpClient, opts: &CleanOptions) -> Result<RunSummary, Box<dyn Error>> {
    let collection = detect_collection(target).await;

    if opts.all {
        warn!(collection, "Deleting EVERY post of the collection");
        return Ok(delete_all(target, collection, opts.post_pause).await);
    }
    if !fs::try_exists(&opts.export_file).await? {
        warn!(
            file = %opts.export_file.display(),
            "Export file not found; deleting every post instead"
        );
        return Ok(delete_all(target, collection, opts.post_pause).await);
    }

    let posts = load_export(&opts.export_file).await?;
    Ok(delete_imported(target, collection, &posts, opts.post_pause).await)
}

/// Delete, by slug, the posts an import created from `posts`.
#[instrument(level = "info", skip_all, fields(count = posts.len()))]
pub async fn delete_imported(
    target: &WpClient,
    collection: &str,
    posts: &[WpPost],
    pause: Duration,
) -> RunSummary {
    let total = posts.len();
    let mut summary = RunSummary::default();
    println!("Deleting {total} imported post(s)");

    for (i, post) in posts.iter().enumerate() {
        let title = match plain_text(post.title_html()) {
            t if t.is_empty() => format!("id {}", post.id),
            t => t,
        };
        let Some(slug) = post.slug.as_deref().filter(|s| !s.is_empty()) else {
            summary.not_found += 1;
            println!("[{}/{total}] no slug, skipped: {title}", i + 1);
            continue;
        };

        match delete_by_slug(target, collection, slug).await {
            Ok(true) => {
                summary.success += 1;
                println!("[{}/{total}] deleted: {title}", i + 1);
            }
            Ok(false) => {
                summary.not_found += 1;
                println!("[{}/{total}] not found: {title}", i + 1);
            }
            Err(e) => {
                summary.errors += 1;
                error!(%slug, error = %e, "Deletion failed");
                println!("[{}/{total}] FAILED {title}: {e}", i + 1);
            }
        }
        sleep(pause).await;
    }

    println!("Clean finished: {summary}");
    summary
}

/// Force-delete the first post with `slug`. `Ok(false)` when none exists.
async fn delete_by_slug(target: &WpClient, collection: &str, slug: &str) -> Result<bool, WpError> {
    let path = format!("{WP_V2}/{collection}");
    let page = target.list::<WpPost>(&path, &ListQuery::default().slug(slug)).await?;
    match page.items.first() {
        Some(found) => {
            target.delete_post(collection, found.id, true).await?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Force-delete every post of `collection`, page by page.
///
/// Deleted posts drop out of the listing, so the next page is read from the
/// number of posts that could not be deleted rather than from a running
/// offset.
#[instrument(level = "info", skip(target, pause))]
pub async fn delete_all(target: &WpClient, collection: &str, pause: Duration) -> RunSummary {
    let path = format!("{WP_V2}/{collection}");
    let mut summary = RunSummary::default();

    loop {
        let query = ListQuery::per_page(DELETE_PAGE_SIZE).offset(summary.errors);
        let page = match target.list::<WpPost>(&path, &query).await {
            Ok(page) => page.items,
            Err(e) => {
                error!(error = %e, "Listing failed; stopping");
                break;
            }
        };
        if page.is_empty() {
            break;
        }

        let full = page.len() == DELETE_PAGE_SIZE;
        for post in &page {
            match target.delete_post(collection, post.id, true).await {
                Ok(()) => {
                    summary.success += 1;
                    println!("deleted: {}", plain_text(post.title_html()));
                }
                Err(e) => {
                    summary.errors += 1;
                    error!(id = post.id, error = %e, "Deletion failed");
                }
            }
            sleep(pause).await;
        }
        if !full {
            break;
        }
    }

    info!(deleted = summary.success, failed = summary.errors, "Collection emptied");
    println!("{} post(s) deleted in total", summary.success);
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outputs::json::write_export;
    use crate::wordpress::Credentials;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn authed(server: &MockServer) -> WpClient {
        WpClient::new(&format!("{}/wp-json", server.uri()))
            .unwrap()
            .with_credentials(Credentials {
                username: "root".into(),
                app_password: "abcd".into(),
            })
    }

    async fn posts_collection(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/wp-json/wp/v2/actualites"))
            .respond_with(ResponseTemplate::new(404))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_clean_deletes_by_slug() {
        let server = MockServer::start().await;
        posts_collection(&server).await;
        Mock::given(method("GET"))
            .and(path("/wp-json/wp/v2/posts"))
            .and(query_param("slug", "present"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 31 }])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/wp-json/wp/v2/posts"))
            .and(query_param("slug", "absent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/wp-json/wp/v2/posts/31"))
            .and(query_param("force", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "deleted": true })))
            .expect(1)
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("actualites.json");
        let posts: Vec<WpPost> = serde_json::from_value(json!([
            { "id": 1, "slug": "present" },
            { "id": 2, "slug": "absent" }
        ]))
        .unwrap();
        write_export(&file, &posts).await.unwrap();

        let opts = CleanOptions {
            export_file: file,
            all: false,
            post_pause: Duration::ZERO,
        };
        let summary = clean(&authed(&server), &opts).await.unwrap();
        assert_eq!(
            summary,
            RunSummary {
                success: 1,
                errors: 0,
                not_found: 1
            }
        );
    }

    #[tokio::test]
    async fn test_missing_export_falls_back_to_delete_all() {
        let server = MockServer::start().await;
        posts_collection(&server).await;
        Mock::given(method("GET"))
            .and(path("/wp-json/wp/v2/posts"))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 1 }, { "id": 2 }])))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/wp-json/wp/v2/posts/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "deleted": true })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/wp-json/wp/v2/posts/2"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let opts = CleanOptions {
            export_file: tmp.path().join("absent.json"),
            all: false,
            post_pause: Duration::ZERO,
        };
        let summary = clean(&authed(&server), &opts).await.unwrap();
        assert_eq!(summary.success, 1);
        assert_eq!(summary.errors, 1);
    }
}
