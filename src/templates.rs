//! Prompt template persistence.
//!
//! Templates live as a JSON list under the config directory. Name
//! uniqueness and ordering are conventions, not invariants: the store is a
//! plain list and rewrites are whole-file truncate-and-write.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::config::DriveConfig;

/// Errors reading or writing the template store.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Filesystem failure at the template store.
    #[error("IO error at {path}: {source}")]
    Io {
        /// The store path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The store exists but is not valid JSON.
    #[error("invalid template store {path}: {source}")]
    Parse {
        /// The store path.
        path: PathBuf,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },
}

impl TemplateError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// A named prompt template with a single `{prompt}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    /// Display name, unique by convention.
    pub name: String,
    /// Template string carrying the `{prompt}` placeholder.
    pub template: String,
    /// Category label for grouping.
    pub category: String,
}

impl PromptTemplate {
    /// Creates a template record.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        template: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
            category: category.into(),
        }
    }

    /// Substitutes the prompt into the template placeholder.
    #[must_use]
    pub fn render(&self, prompt: &str) -> String {
        self.template.replace("{prompt}", prompt)
    }
}

/// Seed set written when the store does not exist yet.
#[must_use]
pub fn default_templates() -> Vec<PromptTemplate> {
    vec![
        PromptTemplate::new("Photorealistic", "Photorealistic photo of {prompt}", "General"),
        PromptTemplate::new("Cinematic", "Cinematic poster of {prompt}", "General"),
        PromptTemplate::new("Studio Portrait", "Studio portrait of {prompt}", "Portrait"),
        PromptTemplate::new("Fantasy", "Fantasy illustration of {prompt}", "Art"),
        PromptTemplate::new("Minimal", "{prompt}", "General"),
    ]
}

async fn write_store(path: &Path, templates: &[PromptTemplate]) -> Result<(), TemplateError> {
    let rendered = serde_json::to_vec_pretty(templates).map_err(|e| {
        TemplateError::io(path, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })?;
    tokio::fs::write(path, rendered)
        .await
        .map_err(|e| TemplateError::io(path, e))
}

/// Loads the template list, seeding the store with defaults when absent.
///
/// # Errors
///
/// Returns [`TemplateError`] when the store cannot be read, seeded, or
/// parsed.
#[instrument(skip(config))]
pub async fn load_templates(config: &DriveConfig) -> Result<Vec<PromptTemplate>, TemplateError> {
    let path = config.templates_path();
    if !path.exists() {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| TemplateError::io(parent, e))?;
        }
        let defaults = default_templates();
        write_store(&path, &defaults).await?;
        return Ok(defaults);
    }
    let raw = tokio::fs::read(&path)
        .await
        .map_err(|e| TemplateError::io(&path, e))?;
    serde_json::from_slice(&raw).map_err(|source| TemplateError::Parse { path, source })
}

/// Overwrites the template list.
///
/// # Errors
///
/// Returns [`TemplateError::Io`] when the store cannot be written.
#[instrument(skip(templates, config), fields(count = templates.len()))]
pub async fn save_templates(
    templates: &[PromptTemplate],
    config: &DriveConfig,
) -> Result<(), TemplateError> {
    let path = config.templates_path();
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| TemplateError::io(parent, e))?;
    }
    write_store(&path, templates).await
}

/// Appends a template to the store.
///
/// No uniqueness check is made: a duplicate name is appended as-is.
///
/// # Errors
///
/// Returns [`TemplateError`] from loading or saving the list.
pub async fn add_template(
    template: PromptTemplate,
    config: &DriveConfig,
) -> Result<(), TemplateError> {
    let mut templates = load_templates(config).await?;
    templates.push(template);
    save_templates(&templates, config).await
}

/// Deletes every template with the given name.
///
/// # Returns
///
/// `true` when at least one record was removed.
///
/// # Errors
///
/// Returns [`TemplateError`] from loading or saving the list.
pub async fn delete_template(name: &str, config: &DriveConfig) -> Result<bool, TemplateError> {
    let templates = load_templates(config).await?;
    let before = templates.len();
    let remaining: Vec<PromptTemplate> = templates
        .into_iter()
        .filter(|template| template.name != name)
        .collect();
    let changed = remaining.len() != before;
    if changed {
        save_templates(&remaining, config).await?;
    }
    Ok(changed)
}

/// Returns the sorted, deduplicated category labels of a template list.
#[must_use]
pub fn list_categories(templates: &[PromptTemplate]) -> Vec<String> {
    let mut categories: Vec<String> = templates
        .iter()
        .map(|template| template.category.clone())
        .collect();
    categories.sort();
    categories.dedup();
    categories
}
