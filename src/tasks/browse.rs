//! Read-only views of a site through the front-end helpers.

use crate::models::Post;
use crate::utils::{plain_text, preview};
use crate::wordpress::WpClient;
use crate::wordpress::content::{
    get_actualite_by_slug, get_all_actualites, get_all_posts, get_categories, get_pages,
    get_post_by_slug, get_posts_by_category, get_tags,
};
use std::error::Error;
use tracing::instrument;

/// What to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    Posts { category: Option<u64> },
    Actualites,
}

/// Print the latest posts or actualités, one line each.
#[instrument(level = "info", skip(client))]
pub async fn list(client: &WpClient, listing: Listing, limit: usize) -> Vec<Post> {
    let posts = match listing {
        Listing::Posts { category: Some(id) } => get_posts_by_category(client, id, limit).await,
        Listing::Posts { category: None } => get_all_posts(client, limit).await,
        Listing::Actualites => get_all_actualites(client, limit).await,
    };
    if posts.is_empty() {
        println!("Nothing found");
    }
    for post in &posts {
        println!("{}", summary_line(post));
    }
    posts
}

/// Print one post or actualité as pretty JSON.
///
/// # Errors
///
/// Returns an error when nothing has this slug.
#[instrument(level = "info", skip(client))]
pub async fn show(client: &WpClient, slug: &str, actualite: bool) -> Result<Post, Box<dyn Error>> {
    let found = if actualite {
        get_actualite_by_slug(client, slug).await
    } else {
        get_post_by_slug(client, slug).await
    };
    let post = found.ok_or_else(|| format!("nothing found with slug `{slug}`"))?;
    println!("{}", serde_json::to_string_pretty(&post)?);
    Ok(post)
}

/// Print categories, tags and pages.
#[instrument(level = "info", skip_all)]
pub async fn catalog(client: &WpClient) {
    println!("Categories:");
    for term in get_categories(client).await {
        println!("  {:>5}  {} ({}) [{}]", term.id, term.name, term.slug, term.count);
    }
    println!("Tags:");
    for term in get_tags(client).await {
        println!("  {:>5}  {} ({}) [{}]", term.id, term.name, term.slug, term.count);
    }
    println!("Pages:");
    for page in get_pages(client).await {
        println!(
            "  {:>5}  {} ({})",
            page.id,
            plain_text(page.title_html()),
            page.slug.as_deref().unwrap_or("-")
        );
    }
}

fn summary_line(post: &Post) -> String {
    format!(
        "{:>6}  {}  {}  [{}] {}",
        post.id,
        post.date,
        plain_text(&post.title),
        post.reading_time,
        preview(&plain_text(&post.excerpt), 80)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> WpClient {
        WpClient::new(&format!("{}/wp-json", server.uri())).unwrap()
    }

    #[tokio::test]
    async fn test_list_by_category() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wp-json/wp/v2/posts"))
            .and(query_param("categories", "4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 1, "title": { "rendered": "Accord &amp; avenant" }, "date": "2025-01-02T10:00:00" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let posts = list(&client(&server), Listing::Posts { category: Some(4) }, 5).await;
        assert_eq!(posts.len(), 1);
        assert!(summary_line(&posts[0]).contains("Accord & avenant"));
    }

    #[tokio::test]
    async fn test_show_formats_french_date() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wp-json/wp/v2/posts"))
            .and(query_param("slug", "accord"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 1, "slug": "accord", "date": "2025-01-02T10:00:00" }
            ])))
            .mount(&server)
            .await;

        let post = show(&client(&server), "accord", false).await.unwrap();
        assert_eq!(post.date, "02/01/2025");
    }

    #[tokio::test]
    async fn test_show_unknown_slug_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wp-json/wp/v2/posts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        assert!(show(&client(&server), "absent", false).await.is_err());
    }
}
