//! Import the export file into the new site.
//!
//! Before anything is written the credentials are checked end to end: the
//! user is resolved, and a draft is created and force-deleted, which proves
//! the application password can publish. Each exported post is then created
//! with `status=publish`, its ACF fields are pushed through the ACF to REST
//! API plugin, and its featured image URL is reported for manual upload.

use super::{ACTUALITES, POSTS};
use crate::config::Settings;
use crate::models::{NewPost, WpPost, WpUser};
use crate::outputs::json::require_export;
use crate::outputs::report::RunSummary;
use crate::utils::plain_text;
use crate::wordpress::{WP_V2, WpClient, WpError};
use chrono::Local;
use serde_json::{Map, Value};
use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

const PROBE_TITLE: &str = "Test de permission - import";

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub export_file: PathBuf,
    pub post_pause: Duration,
}

impl ImportOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            export_file: settings.export_file.clone(),
            post_pause: settings.pauses.import_post(),
        }
    }
}

/// Import every exported post into `target`, which must carry credentials.
///
/// # Errors
///
/// Fails before writing anything if the export file is missing or the
/// credentials cannot create posts. Failures on single posts are counted in
/// the returned summary instead.
#[instrument(level = "info", skip_all, fields(target = target.root()))]
pub async fn import_all(target: &WpClient, opts: &ImportOptions) -> Result<RunSummary, Box<dyn Error>> {
    let posts = require_export(&opts.export_file).await?;

    let user = match verify_auth(target).await {
        Ok(user) => user,
        Err(e) => {
            print_auth_help();
            return Err(e);
        }
    };
    info!(user = user.display_name(), "Credentials can create posts");

    let collection = detect_collection(target).await;
    println!(
        "Importing {} actualités into {}",
        posts.len(),
        target.url(&format!("{WP_V2}/{collection}"))
    );

    let total = posts.len();
    let mut summary = RunSummary::default();
    for (i, post) in posts.iter().enumerate() {
        let title = plain_text(post.title_html());
        match import_post(target, collection, post).await {
            Ok(created) => {
                summary.success += 1;
                println!("[{}/{total}] ok {title} (id {})", i + 1, created.id);
            }
            Err(e) => {
                summary.errors += 1;
                error!(source_id = post.id, error = %e, "Import failed");
                println!("[{}/{total}] FAILED {title}: {e}", i + 1);
            }
        }
        sleep(opts.post_pause).await;
    }

    println!("Import finished: {summary}");
    Ok(summary)
}

/// Check that the credentials resolve to a user that can create posts.
///
/// Roles are read on a best-effort basis; the draft round trip is what
/// decides.
#[instrument(level = "info", skip_all)]
pub async fn verify_auth(target: &WpClient) -> Result<WpUser, Box<dyn Error>> {
    let mut user = target
        .current_user()
        .await
        .map_err(|e| format!("authentication failed: {e}"))?;

    match target.user_with_roles(user.id).await {
        Ok(detail) => user.roles = detail.roles,
        Err(e) => debug!(error = %e, "Roles unavailable; relying on the creation test"),
    }

    let probe = target
        .create_post(POSTS, &NewPost::permission_probe(PROBE_TITLE))
        .await
        .map_err(|e| format!("test post creation failed: {e}"))?;
    if let Err(e) = target.delete_post(POSTS, probe.id, true).await {
        warn!(probe_id = probe.id, error = %e, "Could not delete the test post; remove it by hand");
    }

    let roles = if user.roles.is_empty() {
        "N/A".to_string()
    } else {
        user.roles.join(", ")
    };
    println!("Authenticated as {} ({roles})", user.display_name());
    Ok(user)
}

/// Collection to create posts in: `actualites` when the custom post type
/// answers with a JSON array, `posts` otherwise.
#[instrument(level = "info", skip_all)]
pub async fn detect_collection(target: &WpClient) -> &'static str {
    match target
        .get_json::<Value>(&format!("{WP_V2}/{ACTUALITES}?per_page=1"))
        .await
    {
        Ok(Value::Array(_)) => {
            info!("Custom post type `actualites` found");
            ACTUALITES
        }
        Ok(_) => {
            warn!("`actualites` did not answer with a list; using `posts`");
            POSTS
        }
        Err(e) => {
            info!(error = %e, "No `actualites` post type; using `posts`");
            POSTS
        }
    }
}

/// Create one exported post, then carry over its ACF fields.
#[instrument(level = "info", skip_all, fields(source_id = post.id))]
pub async fn import_post(target: &WpClient, collection: &str, post: &WpPost) -> Result<WpPost, WpError> {
    let now = Local::now().format("%Y-%m-%dT%H:%M:%S").to_string();
    let created = target.create_post(collection, &NewPost::from_export(post, &now)).await?;

    if let Some(fields) = post.acf_fields().filter(|f| !f.is_empty()) {
        if !push_acf(target, created.id, fields).await {
            warn!(id = created.id, "ACF fields not imported; fill them in by hand");
        }
    }

    if let Some(url) = post.featured_image_url() {
        info!(id = created.id, %url, "Featured image to import manually");
        println!("  featured image: {url} (attach it to post {} by hand)", created.id);
    }
    Ok(created)
}

/// Write ACF fields, trying the `actualites` route before `posts`.
async fn push_acf(target: &WpClient, id: u64, fields: &Map<String, Value>) -> bool {
    for collection in [ACTUALITES, POSTS] {
        match target.update_acf(collection, id, fields).await {
            Ok(()) => {
                debug!(id, collection, "ACF fields written");
                return true;
            }
            Err(e) => debug!(id, collection, error = %e, "ACF route refused the fields"),
        }
    }
    false
}

fn print_auth_help() {
    println!("Authentication check failed. To fix it:");
    println!("  1. check the username and application password (--username / --app-password)");
    println!("  2. create an application password in WordPress under Users > Profile > Application Passwords");
    println!("     and use it instead of the account password");
    println!("  3. make sure the user has the Administrator role");
    println!("  4. run `test-auth` for a detailed report");
}
