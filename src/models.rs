//! Data models for WordPress REST payloads and their normalized forms.
//!
//! This module defines the structures that flow through the migration:
//! - [`WpPost`]: a post as returned by `/wp/v2/{posts,actualites,pages}`
//! - [`Rendered`]: the `{rendered, raw}` wrapper WordPress uses for text fields
//! - [`Post`]: the flattened shape a front-end consumes
//! - [`NewPost`]: the payload created on the destination site
//! - [`WpUser`], [`Term`], [`Page`]: supporting REST resources
//!
//! `WpPost` keeps every field it does not model in `extra`, so an export file
//! written from it still carries the full API payload.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A WordPress text field.
///
/// The REST API returns `{"rendered": "...", "raw": "..."}` for titles,
/// contents and excerpts, but some plugins and older exports hold a bare
/// string instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Rendered {
    Object {
        #[serde(default)]
        rendered: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        raw: Option<String>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    Plain(String),
}

impl Rendered {
    /// Build a field whose rendered and raw forms are the same markup.
    pub fn from_markup(markup: impl Into<String>) -> Self {
        let markup = markup.into();
        Rendered::Object {
            raw: Some(markup.clone()),
            rendered: markup,
            extra: Map::new(),
        }
    }

    /// The rendered HTML, or the bare string.
    pub fn as_html(&self) -> &str {
        match self {
            Rendered::Object { rendered, .. } => rendered,
            Rendered::Plain(s) => s,
        }
    }
}

/// A post, page or custom post type entry from the REST API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WpPost {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<Rendered>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Rendered>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<Rendered>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured_media: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<u64>,
    /// ACF fields. WordPress sends `[]` rather than `{}` when there are none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acf: Option<Value>,
    #[serde(default, rename = "_embedded", skip_serializing_if = "Option::is_none")]
    pub embedded: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WpPost {
    pub fn title_html(&self) -> &str {
        self.title.as_ref().map(Rendered::as_html).unwrap_or("")
    }

    pub fn content_html(&self) -> &str {
        self.content.as_ref().map(Rendered::as_html).unwrap_or("")
    }

    pub fn excerpt_html(&self) -> &str {
        self.excerpt.as_ref().map(Rendered::as_html).unwrap_or("")
    }

    /// Whether the API delivered a non-blank body.
    pub fn has_content(&self) -> bool {
        !self.content_html().trim().is_empty()
    }

    /// ACF fields as a map, looking at `acf` then `acf_fields`.
    pub fn acf_fields(&self) -> Option<&Map<String, Value>> {
        self.acf
            .as_ref()
            .and_then(Value::as_object)
            .or_else(|| self.extra.get("acf_fields").and_then(Value::as_object))
    }

    /// A string ACF field, if present and non-empty.
    pub fn acf_str(&self, key: &str) -> Option<&str> {
        self.acf_fields()?
            .get(key)?
            .as_str()
            .filter(|s| !s.is_empty())
    }

    /// First entry of `_embedded["wp:featuredmedia"]`.
    pub fn featured_media_entry(&self) -> Option<&Value> {
        self.embedded.as_ref()?.get("wp:featuredmedia")?.get(0)
    }

    pub fn featured_image_url(&self) -> Option<&str> {
        self.featured_media_entry()?
            .get("source_url")?
            .as_str()
            .filter(|s| !s.is_empty())
    }

    /// Name of the first embedded author.
    pub fn author_name(&self) -> Option<&str> {
        self.embedded.as_ref()?.get("author")?.get(0)?.get("name")?.as_str()
    }

    /// Shallow merge: every field present in `detail` replaces ours.
    pub fn merged_with(self, detail: WpPost) -> Result<WpPost, serde_json::Error> {
        let mut base = serde_json::to_value(self)?;
        if let (Some(base), Value::Object(over)) = (base.as_object_mut(), serde_json::to_value(detail)?) {
            base.extend(over);
        }
        serde_json::from_value(base)
    }
}

/// One page of a collection listing, with the pagination headers WordPress sends.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// `X-WP-Total`
    pub total: Option<u64>,
    /// `X-WP-TotalPages`
    pub total_pages: Option<u64>,
}

/// A category or tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub count: u64,
}

/// A WordPress user as seen by `/users/me` or `/users/{id}?context=edit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WpUser {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl WpUser {
    pub fn display_name(&self) -> &str {
        if !self.name.is_empty() {
            &self.name
        } else if !self.slug.is_empty() {
            &self.slug
        } else {
            "Utilisateur"
        }
    }

    pub fn is_administrator(&self) -> bool {
        self.roles.iter().any(|r| r == "administrator")
    }
}

/// Publication status sent when creating or updating a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Publish,
    Draft,
}

/// Payload for `POST /wp/v2/{collection}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub status: PostStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

impl NewPost {
    /// Build the destination payload for an exported post.
    ///
    /// A missing date falls back to `now`.
    pub fn from_export(post: &WpPost, now: &str) -> Self {
        let title = match post.title_html() {
            "" => "Sans titre".to_string(),
            t => t.to_string(),
        };
        Self {
            title,
            content: post.content_html().to_string(),
            excerpt: post.excerpt_html().to_string(),
            status: PostStatus::Publish,
            date: Some(post.date.clone().unwrap_or_else(|| now.to_string())),
            slug: post.slug.clone(),
        }
    }

    /// A throwaway draft used to check write permissions.
    pub fn permission_probe(title: &str) -> Self {
        Self {
            title: title.to_string(),
            content: "Ceci est un test".to_string(),
            excerpt: String::new(),
            status: PostStatus::Draft,
            date: None,
            slug: None,
        }
    }
}

/// The flattened post shape consumed by the front-end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: u64,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub date: String,
    pub content: String,
    pub featured_image: String,
    pub image_width: u64,
    pub image_height: u64,
    pub reading_time: String,
    pub categories: Vec<u64>,
    pub tags: Vec<u64>,
    pub author: String,
    pub acf: Map<String, Value>,
}
