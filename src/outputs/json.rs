//! Export file persistence.
//!
//! The export file is a pretty-printed JSON array of [`WpPost`] objects, in
//! the order the legacy API listed them (newest first). It is rewritten after
//! every batch, so an interrupted export resumes where it stopped: posts whose
//! `id` is already in the file are skipped on the next run.

use crate::models::WpPost;
use itertools::Itertools;
use std::collections::HashSet;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

/// Read the export file.
///
/// A missing file is an empty export, not an error.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or is not a JSON
/// array of posts.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_export(path: &Path) -> Result<Vec<WpPost>, Box<dyn Error>> {
    if !fs::try_exists(path).await? {
        debug!("No export file yet");
        return Ok(Vec::new());
    }
    let raw = fs::read_to_string(path).await?;
    let posts: Vec<WpPost> = serde_json::from_str(&raw)?;
    info!(count = posts.len(), "Loaded existing export");
    Ok(posts)
}

/// Like [`load_export`], but a missing file is an error carrying a hint.
pub async fn require_export(path: &Path) -> Result<Vec<WpPost>, Box<dyn Error>> {
    if !fs::try_exists(path).await? {
        return Err(format!(
            "export file {} not found; run the `export` command first",
            path.display()
        )
        .into());
    }
    load_export(path).await
}

/// Write posts as pretty JSON, replacing the file.
#[instrument(level = "info", skip_all, fields(path = %path.display(), count = posts.len()))]
pub async fn write_export(path: &Path, posts: &[WpPost]) -> Result<(), Box<dyn Error>> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).await?;
    }
    let json = serde_json::to_string_pretty(posts)?;
    fs::write(path, json).await?;
    info!("Wrote export file");
    Ok(())
}

/// Append the posts of `incoming` whose id is not in `existing`.
///
/// Duplicates inside `incoming` are dropped too; the first occurrence wins.
/// Returns the number of posts added.
pub fn merge_new(existing: &mut Vec<WpPost>, incoming: Vec<WpPost>) -> usize {
    let known: HashSet<u64> = existing.iter().map(|p| p.id).collect();
    let before = existing.len();
    existing.extend(
        incoming
            .into_iter()
            .filter(|p| !known.contains(&p.id))
            .unique_by(|p| p.id),
    );
    existing.len() - before
}

/// Ids already present in an export.
pub fn known_ids(posts: &[WpPost]) -> HashSet<u64> {
    posts.iter().map(|p| p.id).collect()
}

/// Newest and oldest `date` values, compared as ISO-8601 strings.
pub fn date_range(posts: &[WpPost]) -> Option<(&str, &str)> {
    let dates = posts.iter().filter_map(|p| p.date.as_deref());
    match dates.minmax() {
        itertools::MinMaxResult::NoElements => None,
        itertools::MinMaxResult::OneElement(d) => Some((d, d)),
        itertools::MinMaxResult::MinMax(oldest, newest) => Some((newest, oldest)),
    }
}

/// Posts that still have no body after export, by slug or id.
pub fn missing_content(posts: &[WpPost]) -> Vec<String> {
    let missing: Vec<String> = posts
        .iter()
        .filter(|p| !p.has_content())
        .map(|p| p.slug.clone().unwrap_or_else(|| p.id.to_string()))
        .collect();
    if !missing.is_empty() {
        warn!(count = missing.len(), "Exported posts without content");
    }
    missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn post(id: u64, date: &str) -> WpPost {
        serde_json::from_value(json!({ "id": id, "date": date, "slug": format!("p-{id}") })).unwrap()
    }

    #[test]
    fn test_merge_new_skips_known_and_repeated_ids() {
        let mut existing = vec![post(1, "2025-01-01T00:00:00"), post(2, "2025-01-02T00:00:00")];
        let added = merge_new(
            &mut existing,
            vec![
                post(2, "2025-01-02T00:00:00"),
                post(3, "2025-01-03T00:00:00"),
                post(3, "2025-01-03T00:00:00"),
            ],
        );
        assert_eq!(added, 1);
        assert_eq!(existing.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_date_range() {
        assert_eq!(date_range(&[]), None);
        let posts = vec![
            post(1, "2024-06-01T08:00:00"),
            post(2, "2025-11-05T09:30:00"),
            post(3, "2023-02-10T10:00:00"),
        ];
        assert_eq!(
            date_range(&posts),
            Some(("2025-11-05T09:30:00", "2023-02-10T10:00:00"))
        );
    }

    #[test]
    fn test_missing_content_lists_slugs() {
        let mut with_body = post(1, "2025-01-01T00:00:00");
        with_body.content = Some(crate::models::Rendered::from_markup("<p>corps</p>"));
        let posts = vec![with_body, post(2, "2025-01-02T00:00:00")];
        assert_eq!(missing_content(&posts), vec!["p-2".to_string()]);
    }

    #[tokio::test]
    async fn test_export_file_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("exports").join("actualites.json");

        assert!(load_export(&path).await.unwrap().is_empty());
        assert!(require_export(&path).await.is_err());

        let posts = vec![post(7, "2025-11-05T09:30:00")];
        write_export(&path, &posts).await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\n  {"), "expected pretty JSON, got {raw}");
        assert_eq!(require_export(&path).await.unwrap(), posts);
    }

    #[tokio::test]
    async fn test_load_export_rejects_garbage() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(load_export(&path).await.is_err());
    }
}
