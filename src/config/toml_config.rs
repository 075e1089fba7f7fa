use crate::config::{PluginOptions, DEFAULT_TYPE_PATHS_FILENAME_PREFIX};
use crate::domain::schema::Schemas;
use crate::utils::error::{PrismicError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub plugin: PluginSection,
    #[serde(default)]
    pub images: ImagesSection,
    pub links: Option<LinksSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginSection {
    pub repository_name: String,
    pub access_token: Option<String>,
    pub lang: Option<String>,
    #[serde(default)]
    pub fetch_links: Vec<String>,
    /// Directory of `<custom_type>.json` schema files, relative to the config file.
    pub schemas_dir: Option<String>,
    pub type_paths_filename_prefix: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesSection {
    #[serde(default)]
    pub should_download: bool,
    #[serde(default = "default_true")]
    pub should_normalize: bool,
}

impl Default for ImagesSection {
    fn default() -> Self {
        ImagesSection {
            should_download: false,
            should_normalize: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinksSection {
    #[serde(default = "default_base_path")]
    pub base_path: String,
    #[serde(default)]
    pub include_lang: bool,
}

fn default_true() -> bool {
    true
}

fn default_base_path() -> String {
    "/".to_string()
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static pattern is valid"))
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(PrismicError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| PrismicError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${PRISMIC_ACCESS_TOKEN})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        env_var_pattern()
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    /// Builds plugin options, loading schemas relative to `base_dir`.
    pub fn into_plugin_options<P: AsRef<Path>>(self, base_dir: P) -> Result<PluginOptions> {
        let access_token =
            validation::validate_required_field("plugin.access_token", &self.plugin.access_token)?
                .clone();

        let schemas = match &self.plugin.schemas_dir {
            Some(dir) => {
                let dir = PathBuf::from(dir);
                let dir = if dir.is_absolute() {
                    dir
                } else {
                    base_dir.as_ref().join(dir)
                };
                Schemas::from_dir(dir)?
            }
            None => Schemas::default(),
        };

        let mut options = PluginOptions::new(self.plugin.repository_name, access_token)
            .with_schemas(schemas)
            .with_fetch_links(self.plugin.fetch_links)
            .with_lang(self.plugin.lang.unwrap_or_else(|| "*".to_string()))
            .with_image_download(self.images.should_download)
            .with_image_normalization(self.images.should_normalize)
            .with_type_paths_filename_prefix(
                self.plugin
                    .type_paths_filename_prefix
                    .unwrap_or_else(|| DEFAULT_TYPE_PATHS_FILENAME_PREFIX.to_string()),
            );

        if let Some(links) = self.links {
            options = options.with_path_links(links.base_path, links.include_lang);
        }

        options.validate()?;
        Ok(options)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_repository_name("plugin.repository_name", &self.plugin.repository_name)?;

        let token =
            validation::validate_required_field("plugin.access_token", &self.plugin.access_token)?;
        if token.contains("${") {
            return Err(PrismicError::InvalidConfigValueError {
                field: "plugin.access_token".to_string(),
                value: token.clone(),
                reason: "Environment variable is not set".to_string(),
            });
        }
        validation::validate_non_empty_string("plugin.access_token", token)?;

        validation::validate_fetch_links("plugin.fetch_links", &self.plugin.fetch_links)?;

        if let Some(dir) = &self.plugin.schemas_dir {
            validation::validate_path("plugin.schemas_dir", dir)?;
        }

        if let Some(links) = &self.links {
            if !links.base_path.starts_with('/') {
                return Err(PrismicError::InvalidConfigValueError {
                    field: "links.base_path".to_string(),
                    value: links.base_path.clone(),
                    reason: "Base path must start with '/'".to_string(),
                });
            }
        }

        Ok(())
    }
}
