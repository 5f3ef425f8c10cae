//! Typed client for the WordPress REST API.
//!
//! [`WpClient`] wraps a `reqwest::Client` rooted at a site's `/wp-json`
//! prefix. Paths passed to it are relative to that root, e.g.
//! `wp/v2/actualites` or `acf/v3/posts/12`. Writes authenticate with HTTP
//! Basic using a WordPress application password.
//!
//! The read helpers a front-end needs (normalized posts, reading time,
//! endpoint fallback for custom post types) live in [`content`].

pub mod content;
pub mod error;

use crate::models::{NewPost, Page, PostStatus, WpPost, WpUser};
use crate::utils::truncate_for_log;
use reqwest::header::HeaderMap;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

pub use error::WpError;

/// Core REST namespace.
pub const WP_V2: &str = "wp/v2";
/// Namespace exposed by the "ACF to REST API" plugin.
pub const ACF_V3: &str = "acf/v3";

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Query parameters accepted by collection listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub per_page: Option<usize>,
    pub offset: Option<usize>,
    pub slug: Option<String>,
    pub categories: Option<u64>,
    /// Adds `_embed` so authors and featured media come inline.
    pub embed: bool,
    pub context: Option<&'static str>,
    pub acf_format: Option<&'static str>,
}

impl ListQuery {
    pub fn per_page(n: usize) -> Self {
        Self {
            per_page: Some(n),
            ..Self::default()
        }
    }

    pub fn embedded(mut self) -> Self {
        self.embed = true;
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn category(mut self, id: u64) -> Self {
        self.categories = Some(id);
        self
    }

    pub fn context(mut self, context: &'static str) -> Self {
        self.context = Some(context);
        self
    }

    pub fn acf_format(mut self, format: &'static str) -> Self {
        self.acf_format = Some(format);
        self
    }

    /// Render as a query string (without the leading `?`).
    pub fn to_query_string(&self) -> String {
        let mut parts = Vec::new();
        if let Some(n) = self.per_page {
            parts.push(format!("per_page={n}"));
        }
        if let Some(n) = self.offset {
            parts.push(format!("offset={n}"));
        }
        if let Some(slug) = &self.slug {
            parts.push(format!("slug={}", urlencoding::encode(slug)));
        }
        if let Some(id) = self.categories {
            parts.push(format!("categories={id}"));
        }
        if self.embed {
            parts.push("_embed".to_string());
        }
        if let Some(ctx) = self.context {
            parts.push(format!("context={ctx}"));
        }
        if let Some(fmt) = self.acf_format {
            parts.push(format!("acf_format={fmt}"));
        }
        parts.join("&")
    }
}

/// HTTP Basic credentials (user + application password).
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub app_password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("app_password", &"<redacted>")
            .finish()
    }
}

/// Client for one WordPress site.
#[derive(Debug, Clone)]
pub struct WpClient {
    http: reqwest::Client,
    root: String,
    credentials: Option<Credentials>,
}

impl WpClient {
    /// Create a client for the REST root of a site.
    ///
    /// # Arguments
    ///
    /// * `api_root` - The `/wp-json` URL. A trailing `/wp/v2` is tolerated
    ///   and removed, so the same value works for both core and plugin
    ///   namespaces.
    ///
    /// # Errors
    ///
    /// Returns [`WpError::Url`] if `api_root` is not an absolute URL, or
    /// [`WpError::Http`] if the HTTP client cannot be built.
    pub fn new(api_root: &str) -> Result<Self, WpError> {
        let root = normalize_root(api_root);
        Url::parse(&root)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            root,
            credentials: None,
        })
    }

    /// Authenticate every request with these credentials.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Same site, no credentials.
    pub fn anonymous(&self) -> Self {
        Self {
            credentials: None,
            ..self.clone()
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Absolute URL for a path relative to the REST root.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.root, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.credentials {
            Some(c) => builder.basic_auth(&c.username, Some(&c.app_password)),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<(T, HeaderMap), WpError> {
        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;
        if !status.is_success() {
            debug!(
                status = status.as_u16(),
                body = %truncate_for_log(&body, 300),
                "API returned an error status"
            );
            return Err(WpError::status(status.as_u16(), &body));
        }
        Ok((serde_json::from_str(&body)?, headers))
    }

    /// `GET` any path under the REST root and decode the body.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, WpError> {
        let url = self.url(path);
        self.send(self.request(Method::GET, &url)).await.map(|(v, _)| v)
    }

    /// List a collection, e.g. `wp/v2/posts`.
    ///
    /// # Errors
    ///
    /// [`WpError::UnexpectedShape`] if the body is JSON but not an array.
    #[instrument(level = "debug", skip(self))]
    pub async fn list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &ListQuery,
    ) -> Result<Page<T>, WpError> {
        let qs = query.to_query_string();
        let url = if qs.is_empty() {
            self.url(path)
        } else {
            format!("{}?{}", self.url(path), qs)
        };
        let (value, headers): (Value, _) = self.send(self.request(Method::GET, &url)).await?;
        if !value.is_array() {
            return Err(WpError::UnexpectedShape(format!("{path} did not return an array")));
        }
        Ok(Page {
            items: serde_json::from_value(value)?,
            total: header_u64(&headers, "x-wp-total"),
            total_pages: header_u64(&headers, "x-wp-totalpages"),
        })
    }

    /// Fetch one entry of a `wp/v2` collection with embeds.
    pub async fn get_post(&self, collection: &str, id: u64) -> Result<WpPost, WpError> {
        self.get_json(&format!("{WP_V2}/{collection}/{id}?_embed")).await
    }

    /// Create an entry in a `wp/v2` collection.
    #[instrument(level = "debug", skip(self, post), fields(title = %post.title))]
    pub async fn create_post(&self, collection: &str, post: &NewPost) -> Result<WpPost, WpError> {
        let url = self.url(&format!("{WP_V2}/{collection}"));
        let (created, _) = self.send(self.request(Method::POST, &url).json(post)).await?;
        Ok(created)
    }

    pub async fn update_status(
        &self,
        collection: &str,
        id: u64,
        status: PostStatus,
    ) -> Result<WpPost, WpError> {
        let url = self.url(&format!("{WP_V2}/{collection}/{id}"));
        let body = json!({ "status": status });
        let (updated, _) = self.send(self.request(Method::POST, &url).json(&body)).await?;
        Ok(updated)
    }

    /// Delete an entry. With `force` the post skips the trash.
    pub async fn delete_post(&self, collection: &str, id: u64, force: bool) -> Result<(), WpError> {
        let url = self.url(&format!("{WP_V2}/{collection}/{id}?force={force}"));
        let _: (Value, _) = self.send(self.request(Method::DELETE, &url)).await?;
        Ok(())
    }

    /// The user the credentials belong to.
    pub async fn current_user(&self) -> Result<WpUser, WpError> {
        self.get_json(&format!("{WP_V2}/users/me")).await
    }

    /// Full user record (`context=edit`), which includes roles.
    pub async fn user_with_roles(&self, id: u64) -> Result<WpUser, WpError> {
        self.get_json(&format!("{WP_V2}/users/{id}?context=edit")).await
    }

    /// `namespace` field of the `wp/v2` index, e.g. `"wp/v2"`.
    pub async fn root_namespace(&self) -> Result<String, WpError> {
        let index: Value = self.get_json(WP_V2).await?;
        index
            .get("namespace")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| WpError::UnexpectedShape(format!("{WP_V2} index has no namespace")))
    }

    /// Write ACF fields through the "ACF to REST API" plugin.
    pub async fn update_acf(
        &self,
        collection: &str,
        id: u64,
        fields: &serde_json::Map<String, Value>,
    ) -> Result<(), WpError> {
        let url = self.url(&format!("{ACF_V3}/{collection}/{id}"));
        let body = json!({ "fields": fields });
        let _: (Value, _) = self.send(self.request(Method::POST, &url).json(&body)).await?;
        Ok(())
    }

    /// Fetch a public page as text.
    #[instrument(level = "debug", skip(self))]
    pub async fn fetch_html(&self, url: &str) -> Result<String, WpError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(WpError::status(status.as_u16(), &body));
        }
        Ok(body)
    }
}

fn normalize_root(api_root: &str) -> String {
    let trimmed = api_root.trim().trim_end_matches('/');
    trimmed
        .strip_suffix("/wp/v2")
        .unwrap_or(trimmed)
        .to_string()
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}
