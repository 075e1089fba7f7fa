pub mod cli;
pub mod toml_config;

use crate::core::link::{EmptyLinkResolverFactory, PathLinkResolverFactory};
use crate::core::structured_text::DefaultHtmlSerializerFactory;
use crate::domain::model::{Document, ImageField};
use crate::domain::ports::{HtmlSerializerFactory, LinkResolverFactory};
use crate::domain::schema::Schemas;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "cli")]
use clap::Parser;

pub const DEFAULT_TYPE_PATHS_FILENAME_PREFIX: &str = "prismic-typepaths---";

/// Everything an image policy predicate gets to look at.
#[derive(Debug, Clone, Copy)]
pub struct ImageContext<'a> {
    pub key: &'a str,
    pub path: &'a [String],
    pub node: &'a Document,
    pub value: &'a ImageField,
}

type ImagePredicate = dyn Fn(&ImageContext<'_>) -> bool + Send + Sync;

/// Decides per image whether to download or normalize it.
#[derive(Clone)]
pub enum ImagePolicy {
    Always(bool),
    Predicate(Arc<ImagePredicate>),
}

impl ImagePolicy {
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&ImageContext<'_>) -> bool + Send + Sync + 'static,
    {
        ImagePolicy::Predicate(Arc::new(f))
    }

    pub fn allows(&self, ctx: &ImageContext<'_>) -> bool {
        match self {
            ImagePolicy::Always(value) => *value,
            ImagePolicy::Predicate(f) => f(ctx),
        }
    }
}

impl fmt::Debug for ImagePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImagePolicy::Always(value) => f.debug_tuple("Always").field(value).finish(),
            ImagePolicy::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl From<bool> for ImagePolicy {
    fn from(value: bool) -> Self {
        ImagePolicy::Always(value)
    }
}

#[derive(Clone)]
pub struct PluginOptions {
    pub repository_name: String,
    pub access_token: String,
    pub link_resolver: Arc<dyn LinkResolverFactory>,
    pub html_serializer: Arc<dyn HtmlSerializerFactory>,
    pub fetch_links: Vec<String>,
    pub schemas: Schemas,
    /// Locale to keep, or `*` for every locale.
    pub lang: String,
    pub should_download_image: ImagePolicy,
    pub should_normalize_image: ImagePolicy,
    pub type_paths_filename_prefix: String,
}

impl PluginOptions {
    pub fn new(repository_name: impl Into<String>, access_token: impl Into<String>) -> Self {
        PluginOptions {
            repository_name: repository_name.into(),
            access_token: access_token.into(),
            link_resolver: Arc::new(EmptyLinkResolverFactory),
            html_serializer: Arc::new(DefaultHtmlSerializerFactory),
            fetch_links: Vec::new(),
            schemas: Schemas::default(),
            lang: "*".to_string(),
            should_download_image: ImagePolicy::Always(false),
            should_normalize_image: ImagePolicy::Always(true),
            type_paths_filename_prefix: DEFAULT_TYPE_PATHS_FILENAME_PREFIX.to_string(),
        }
    }

    pub fn with_schemas(mut self, schemas: Schemas) -> Self {
        self.schemas = schemas;
        self
    }

    pub fn with_link_resolver(mut self, factory: Arc<dyn LinkResolverFactory>) -> Self {
        self.link_resolver = factory;
        self
    }

    /// Resolves document links to `<base_path><lang>/<type>/<uid>`.
    pub fn with_path_links(self, base_path: impl Into<String>, include_lang: bool) -> Self {
        self.with_link_resolver(Arc::new(PathLinkResolverFactory::new(base_path, include_lang)))
    }

    pub fn with_html_serializer(mut self, factory: Arc<dyn HtmlSerializerFactory>) -> Self {
        self.html_serializer = factory;
        self
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    pub fn with_fetch_links(mut self, fetch_links: Vec<String>) -> Self {
        self.fetch_links = fetch_links;
        self
    }

    pub fn with_image_download(mut self, policy: impl Into<ImagePolicy>) -> Self {
        self.should_download_image = policy.into();
        self
    }

    pub fn with_image_normalization(mut self, policy: impl Into<ImagePolicy>) -> Self {
        self.should_normalize_image = policy.into();
        self
    }

    pub fn with_type_paths_filename_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.type_paths_filename_prefix = prefix.into();
        self
    }

    pub fn accepts_lang(&self, lang: &str) -> bool {
        self.lang == "*" || self.lang == lang
    }

    /// The CDN endpoint documents of this repository are served from.
    pub fn api_endpoint(&self) -> String {
        format!("https://{}.cdn.prismic.io/api/v2", self.repository_name)
    }
}

impl fmt::Debug for PluginOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginOptions")
            .field("repository_name", &self.repository_name)
            .field("access_token", &"***")
            .field("fetch_links", &self.fetch_links)
            .field("schemas", &self.schemas.len())
            .field("lang", &self.lang)
            .field("should_download_image", &self.should_download_image)
            .field("should_normalize_image", &self.should_normalize_image)
            .field("type_paths_filename_prefix", &self.type_paths_filename_prefix)
            .finish()
    }
}

impl Validate for PluginOptions {
    fn validate(&self) -> Result<()> {
        validation::validate_repository_name("repository_name", &self.repository_name)?;
        validation::validate_non_empty_string("access_token", &self.access_token)?;
        validation::validate_non_empty_string("lang", &self.lang)?;
        validation::validate_fetch_links("fetch_links", &self.fetch_links)?;
        validation::validate_path("type_paths_filename_prefix", &self.type_paths_filename_prefix)?;
        validation::validate_url("repository_name", &self.api_endpoint())?;
        Ok(())
    }
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "prismic-nodes")]
#[command(about = "Normalize Prismic documents into graph nodes")]
pub struct CliConfig {
    /// Path to the TOML plugin configuration
    #[arg(short, long, default_value = "prismic.toml")]
    pub config: String,

    /// JSON file holding the documents to normalize
    #[arg(short, long)]
    pub documents: String,

    /// Directory receiving nodes.json and the type paths file
    #[arg(short, long, default_value = "./output")]
    pub output_path: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("config", &self.config)?;
        validation::validate_path("documents", &self.documents)?;
        validation::validate_path("output_path", &self.output_path)?;
        Ok(())
    }
}
