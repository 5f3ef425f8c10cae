//! Checks to run before a migration.
//!
//! - [`test_connection`]: the legacy API answers and lists actualités
//! - [`test_auth`]: the credentials can read, create, publish and delete on
//!   the new site
//! - [`check_acf`]: where a legacy actualité keeps its fields and its body
//! - [`probe`]: what each extraction strategy sees on one page
//!
//! Reports go to stdout; progress and failures go to the logs.

use super::{ACTUALITES, POSTS};
use crate::extract::{Extraction, candidates, extract_content_region, stripped_text};
use crate::models::{NewPost, PostStatus, Rendered, WpPost};
use crate::utils::{plain_text, preview};
use crate::wordpress::content::debug_acf_structure;
use crate::wordpress::{ListQuery, WP_V2, WpClient};
use chrono::Local;
use serde_json::Value;
use std::error::Error;
use tracing::{info, instrument, warn};

const PREVIEW_CHARS: usize = 100;

/// Check that the legacy API is reachable and lists actualités.
#[instrument(level = "info", skip_all, fields(source = source.root()))]
pub async fn test_connection(source: &WpClient) -> Result<(), Box<dyn Error>> {
    let namespace = source.root_namespace().await?;
    println!("Connected to {} (namespace {namespace})", source.root());

    let page = source
        .list::<WpPost>(
            &format!("{WP_V2}/{ACTUALITES}"),
            &ListQuery::per_page(1).embedded(),
        )
        .await?;

    match page.items.first() {
        Some(first) => {
            println!("First actualité:");
            println!("  id: {}", first.id);
            println!("  title: {}", plain_text(first.title_html()));
            println!("  date: {}", first.date.as_deref().unwrap_or("-"));
            println!("  slug: {}", first.slug.as_deref().unwrap_or("-"));
            println!(
                "  ACF fields: {}",
                first.acf_fields().map(|f| f.len()).unwrap_or(0)
            );
            println!(
                "  featured image: {}",
                if first.featured_image_url().is_some() { "yes" } else { "no" }
            );
        }
        None => println!("No actualité found"),
    }
    if let Some(total) = page.total {
        println!("Total actualités: {total}");
    }
    if let Some(pages) = page.total_pages {
        println!("Pages (1 per page): {pages}");
    }
    Ok(())
}

/// Walk through every permission an import needs, cleaning up after itself.
///
/// `target` must carry credentials.
#[instrument(level = "info", skip_all, fields(target = target.root()))]
pub async fn test_auth(target: &WpClient) -> Result<(), Box<dyn Error>> {
    let posts_path = format!("{WP_V2}/{POSTS}");

    match target
        .anonymous()
        .list::<WpPost>(&posts_path, &ListQuery::per_page(1))
        .await
    {
        Ok(_) => println!("[1/5] public read: ok"),
        Err(e) => println!("[1/5] public read: FAILED ({e})"),
    }

    let user = target.current_user().await?;
    println!("[2/5] authenticated as {} (id {})", user.display_name(), user.id);

    match target.user_with_roles(user.id).await {
        Ok(detail) => {
            println!("      roles: {}", detail.roles.join(", "));
            if !detail.is_administrator() {
                warn!("User is not an administrator; imports may be refused");
            }
        }
        Err(e) => println!("      roles unavailable ({e})"),
    }

    let title = format!("Test auth {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
    let draft = target
        .create_post(POSTS, &NewPost::permission_probe(&title))
        .await?;
    println!("[3/5] draft created (id {})", draft.id);

    let outcome = target.update_status(POSTS, draft.id, PostStatus::Publish).await;
    match &outcome {
        Ok(_) => println!("[4/5] draft published"),
        Err(e) => println!("[4/5] publishing FAILED ({e})"),
    }

    target.delete_post(POSTS, draft.id, true).await?;
    println!("[5/5] test post deleted");

    outcome?;
    println!("All checks passed");
    Ok(())
}

/// Report where the first legacy actualité keeps its data.
#[instrument(level = "info", skip_all, fields(source = source.root()))]
pub async fn check_acf(source: &WpClient) -> Result<(), Box<dyn Error>> {
    let listing = source
        .list::<Value>(
            &format!("{WP_V2}/{ACTUALITES}"),
            &ListQuery::per_page(1).embedded(),
        )
        .await;

    let raw = match listing {
        Ok(page) => match page.items.into_iter().next() {
            Some(raw) => raw,
            None => {
                println!("No actualité found");
                return Ok(());
            }
        },
        Err(e) => {
            warn!(error = %e, "Actualités listing unavailable; probing other endpoints");
            return match debug_acf_structure(source, 1).await {
                Some((endpoint, data)) => {
                    println!("Data found through: {endpoint}");
                    println!("{}", serde_json::to_string_pretty(&data)?);
                    Ok(())
                }
                None => Err(e.into()),
            };
        }
    };

    if let Value::Object(fields) = &raw {
        println!("Fields:");
        for (key, value) in fields {
            println!("  - {key}: {}", describe_value(value));
        }
    }

    let post: WpPost = serde_json::from_value(raw)?;
    println!("\nActualité {} ({})", post.id, plain_text(post.title_html()));

    println!("\nACF fields:");
    match post.acf_fields().filter(|f| !f.is_empty()) {
        Some(acf) => {
            for (key, value) in acf {
                println!("  - {key}: {}", describe_value(value));
            }
        }
        None => {
            println!("  none in the API response");
            println!("  (the ACF to REST API plugin may be needed)");
        }
    }

    let (rendered, raw_body) = match &post.content {
        Some(Rendered::Object { rendered, raw, .. }) => {
            (!rendered.trim().is_empty(), raw.as_deref().is_some_and(|r| !r.is_empty()))
        }
        Some(Rendered::Plain(s)) => (!s.trim().is_empty(), false),
        None => (false, false),
    };
    println!("\nStandard content:");
    println!("  content.rendered: {}", presence(rendered));
    println!("  content.raw: {}", presence(raw_body));

    if let Some(Value::Object(embedded)) = &post.embedded {
        println!("\nEmbedded:");
        for (key, value) in embedded {
            println!("  - {key}: {}", describe_value(value));
        }
    }

    if let Some(link) = &post.link {
        println!("\nPublic page: {link}");
        match source.fetch_html(link).await {
            Ok(html) => match extract_content_region(&html, post.title_html()) {
                Some(found) => print_extraction(&found),
                None => println!("  no content region found"),
            },
            Err(e) => println!("  cannot fetch the page ({e})"),
        }
    }
    Ok(())
}

/// Fetch `url` and show what every extraction strategy finds for `title`.
///
/// Returns the region the export would keep.
#[instrument(level = "info", skip(client))]
pub async fn probe(client: &WpClient, url: &str, title: &str) -> Result<Option<Extraction>, Box<dyn Error>> {
    let html = client.fetch_html(url).await?;
    match html.find(title) {
        Some(at) => println!("Title found at byte {at}"),
        None => println!("Title not found; using document-wide strategies"),
    }

    let all = candidates(&html, title);
    info!(count = all.len(), "Candidates collected");
    for c in &all {
        println!(
            "{:<16} markup={:>7} text={:>6} boilerplate={:<5} accepted={:<5} | {}",
            c.strategy.as_str(),
            c.markup_len(),
            c.text_len,
            c.boilerplate,
            c.is_confident(),
            preview(&stripped_text(&c.markup), 200)
        );
    }

    let chosen = extract_content_region(&html, title);
    match &chosen {
        Some(found) => print_extraction(found),
        None => println!("No content region found"),
    }
    Ok(chosen)
}

/// One-line, type-aware summary of a JSON value.
pub fn describe_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("bool {b}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) if s.is_empty() => "empty string".to_string(),
        Value::String(s) => format!("string \"{}\"", preview(s, PREVIEW_CHARS)),
        Value::Array(items) => format!("array of {} item(s)", items.len()),
        Value::Object(map) => format!("object with {} key(s)", map.len()),
    }
}

fn presence(present: bool) -> &'static str {
    if present { "present" } else { "absent" }
}

fn print_extraction(found: &Extraction) {
    println!(
        "Chosen: {} ({} markup bytes, {} text chars)",
        found.strategy,
        found.markup.len(),
        found.text_len
    );
    println!("  {}", preview(&stripped_text(&found.markup), 200));
}
