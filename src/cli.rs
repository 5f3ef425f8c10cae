//! Command-line interface definitions.
//!
//! Site URLs, credentials and the export path can be given as flags or as
//! `WP_*` environment variables; either way they override the config file.

use crate::config::Overrides;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Migrate actualités from the legacy WordPress site to the new one.
///
/// # Examples
///
/// ```sh
/// # Export from the legacy site (read-only)
/// wp_actualites export
///
/// # Import into the new site with an application password
/// WP_USERNAME=admin WP_APP_PASSWORD="abcd efgh ijkl mnop" wp_actualites import
///
/// # See what the extractor finds on one page
/// wp_actualites probe --url https://example.org/actualites/newsletter/ --title "NEWSLETTER"
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Optional path to a YAML config file (default: wp_actualites.yaml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// REST root of the legacy site, e.g. https://old.example.org/wp-json
    #[arg(long, env = "WP_SOURCE_URL", global = true)]
    pub source_url: Option<String>,

    /// REST root of the new site
    #[arg(long, env = "WP_TARGET_URL", global = true)]
    pub target_url: Option<String>,

    /// WordPress user on the new site
    #[arg(long, env = "WP_USERNAME", global = true)]
    pub username: Option<String>,

    /// Application password of that user
    #[arg(long, env = "WP_APP_PASSWORD", global = true, hide_env_values = true)]
    pub app_password: Option<String>,

    /// Path of the export file
    #[arg(long, env = "WP_EXPORT_FILE", global = true)]
    pub export_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Export actualités from the legacy site to the export file
    Export {
        /// Posts requested per listing page
        #[arg(long)]
        batch_size: Option<usize>,
    },
    /// Create the exported actualités on the new site
    Import,
    /// Delete imported posts from the new site
    Clean {
        /// Delete every post, not only the imported ones
        #[arg(long)]
        all: bool,
    },
    /// Check that the legacy API answers
    TestConnection,
    /// Check that the credentials can create, publish and delete posts
    TestAuth,
    /// Show where the legacy site keeps ACF fields and bodies
    CheckAcf,
    /// Show what each extraction strategy finds on one page
    Probe {
        /// Public URL of the page
        #[arg(long)]
        url: String,
        /// Article title as it appears in the page
        #[arg(long)]
        title: String,
    },
    /// List the latest posts of the legacy site
    List {
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Only posts of this category id
        #[arg(long, conflicts_with = "actualites")]
        category: Option<u64>,
        /// List actualités instead of posts
        #[arg(long)]
        actualites: bool,
    },
    /// Show one post of the legacy site as JSON
    Show {
        slug: String,
        /// Look the slug up among actualités
        #[arg(long)]
        actualite: bool,
    },
    /// List categories, tags and pages of the legacy site
    Catalog,
}

impl Cli {
    /// Values that override the config file.
    pub fn overrides(&self) -> Overrides {
        let batch_size = match self.command {
            Command::Export { batch_size } => batch_size,
            _ => None,
        };
        Overrides {
            source_url: self.global.source_url.clone(),
            target_url: self.global.target_url.clone(),
            username: self.global.username.clone(),
            app_password: self.global.app_password.clone(),
            export_file: self.global.export_file.clone(),
            batch_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "wp_actualites",
            "--source-url",
            "https://old.example.org/wp-json",
            "export",
            "--batch-size",
            "50",
        ]);

        assert_eq!(cli.command, Command::Export { batch_size: Some(50) });
        let o = cli.overrides();
        assert_eq!(o.source_url.as_deref(), Some("https://old.example.org/wp-json"));
        assert_eq!(o.batch_size, Some(50));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "wp_actualites",
            "clean",
            "--all",
            "-c",
            "/tmp/conf.yaml",
            "--export-file",
            "/tmp/a.json",
        ]);

        assert_eq!(cli.command, Command::Clean { all: true });
        assert_eq!(cli.global.config, Some(PathBuf::from("/tmp/conf.yaml")));
        assert_eq!(cli.overrides().export_file, Some(PathBuf::from("/tmp/a.json")));
        assert_eq!(cli.overrides().batch_size, None);
    }

    #[test]
    fn test_probe_and_list() {
        let cli = Cli::parse_from(["wp_actualites", "probe", "--url", "https://x.org/a/", "--title", "A B"]);
        assert_eq!(
            cli.command,
            Command::Probe {
                url: "https://x.org/a/".into(),
                title: "A B".into()
            }
        );

        let cli = Cli::parse_from(["wp_actualites", "list", "--actualites"]);
        assert_eq!(
            cli.command,
            Command::List {
                limit: 10,
                category: None,
                actualites: true
            }
        );
    }

    #[test]
    fn test_category_conflicts_with_actualites() {
        let res = Cli::try_parse_from(["wp_actualites", "list", "--category", "3", "--actualites"]);
        assert!(res.is_err());
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(Cli::try_parse_from(["wp_actualites"]).is_err());
    }
}
