// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Template rendering.
//!
//! Deployment scripts usually need a handful of configuration files that only
//! differ by a few values between targets. Two flavors are supported:
//!
//! 1. Text templates rendered through [`tera`] with a context mapping.
//! 2. Structured JSON or YAML documents, where an override mapping is deep
//!    merged into a base document and the result is written out as JSON.
//!
//! # Template Naming
//!
//! A text template may be written next to its output. In that case its file
//! name must start with [`TEMPLATE_MARKER`], which is stripped to derive the
//! name of the rendered file, e.g., `template_nginx.conf` renders to
//! `nginx.conf`.

use serde_json::{Map, Value};
use std::{
    fs::{read_to_string, write},
    path::{Path, PathBuf},
};
use tera::{Context, Tera};
use tracing::{debug, info, instrument};

/// Marker a template name must carry when its output path is derived.
pub const TEMPLATE_MARKER: &str = "template_";

/// Context mapping handed to text templates.
pub type TemplateContext = Map<String, Value>;

/// Render text template and write result to target path.
///
/// If `target_path` is `None`, it is derived from the template name by
/// stripping [`TEMPLATE_MARKER`]. A `warning` key noting where the file came
/// from is added to the context unless the caller already supplied one. The
/// context is visible to the template both at the top-level and under the
/// `context` key.
///
/// Returns rendered text.
///
/// # Errors
///
/// - Return [`TemplateError::NoParentDir`] if template path has no parent
///   directory.
/// - Return [`TemplateError::InvalidTemplateName`] if target path must be
///   derived, but template name does not carry the marker exactly once.
/// - Return [`TemplateError::Render`] if template cannot be loaded or
///   rendered.
/// - Return [`TemplateError::Write`] if result cannot be written.
#[instrument(skip(template_path, context, target_path), level = "debug")]
pub fn render_template(
    template_path: impl AsRef<Path>,
    context: &TemplateContext,
    target_path: Option<&Path>,
) -> Result<String> {
    let template_path = template_path.as_ref();
    let (dir, name) = split_template_path(template_path)?;
    let target_path = match target_path {
        Some(path) => path.to_path_buf(),
        None => dir.join(derive_target_name(&name)?),
    };

    let mut tera = Tera::default();
    tera.autoescape_on(vec![]);
    tera.add_template_file(template_path, Some(name.as_str()))?;

    let mut context = context.clone();
    context
        .entry("warning")
        .or_insert_with(|| Value::String(format!("This file was autogenerated from the template: {name}")));
    let mut tera_context = Context::from_serialize(&context)?;
    tera_context.insert("context", &context);

    let rendered = tera.render(name.as_str(), &tera_context)?;
    write_with_parents(&target_path, &rendered)?;
    info!("rendered {:?} to {:?}", template_path.display(), target_path.display());

    Ok(rendered)
}

/// Supported structured data formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DataFormat {
    /// JSON document.
    Json,

    /// YAML document.
    Yaml,
}

impl DataFormat {
    /// Infer format from file extension.
    ///
    /// # Errors
    ///
    /// - Return [`TemplateError::UnknownFormat`] if extension is not
    ///   recognized.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let extension = path
            .as_ref()
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase());

        match extension.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("yml" | "yaml") => Ok(Self::Yaml),
            _ => Err(TemplateError::UnknownFormat {
                path: path.as_ref().to_path_buf(),
            }),
        }
    }

    /// Parse document in this format.
    ///
    /// # Errors
    ///
    /// - Return [`TemplateError::Json`] or [`TemplateError::Yaml`] if document
    ///   is malformed.
    pub fn parse(self, data: &str) -> Result<Value> {
        match self {
            Self::Json => Ok(serde_json::from_str(data)?),
            Self::Yaml => Ok(serde_yml::from_str(data)?),
        }
    }
}

/// Deep merge overrides into base data document and write result as JSON.
///
/// Format of base document is inferred from its extension unless given.
/// Returns merged document.
///
/// # Errors
///
/// - Return [`TemplateError::UnknownFormat`] if format cannot be inferred.
/// - Return [`TemplateError::Read`] if base document cannot be read.
/// - Return [`TemplateError::NotAMapping`] if base document is not a mapping.
/// - Return [`TemplateError::Write`] if result cannot be written.
#[instrument(skip(base_path, overrides, target_path), level = "debug")]
pub fn render_structured_template(
    base_path: impl AsRef<Path>,
    overrides: &Map<String, Value>,
    target_path: impl AsRef<Path>,
    format: Option<DataFormat>,
) -> Result<Value> {
    let base_path = base_path.as_ref();
    let format = match format {
        Some(format) => format,
        None => DataFormat::from_path(base_path)?,
    };

    let data = read_to_string(base_path).map_err(|err| TemplateError::Read {
        source: err,
        path: base_path.to_path_buf(),
    })?;
    let mut document = format.parse(&data)?;
    let Value::Object(base) = &mut document else {
        return Err(TemplateError::NotAMapping {
            path: base_path.to_path_buf(),
        });
    };
    merge_mappings(base, overrides);

    let rendered = serde_json::to_string_pretty(&document)?;
    write_with_parents(target_path.as_ref(), &rendered)?;
    info!(
        "merged {:?} into {:?}",
        base_path.display(),
        target_path.as_ref().display()
    );

    Ok(document)
}

/// Deep merge override mapping into base mapping.
///
/// Keys holding mappings on both sides are merged recursively. Otherwise the
/// override value wins.
pub fn merge_mappings(base: &mut Map<String, Value>, overrides: &Map<String, Value>) {
    for (key, value) in overrides {
        match (base.get_mut(key), value) {
            (Some(Value::Object(inner)), Value::Object(inner_overrides)) => {
                merge_mappings(inner, inner_overrides)
            }
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

fn split_template_path(template_path: &Path) -> Result<(PathBuf, String)> {
    let dir = template_path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .ok_or_else(|| TemplateError::NoParentDir {
            path: template_path.to_path_buf(),
        })?;

    let name = template_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| TemplateError::InvalidTemplateName {
            name: template_path.display().to_string(),
        })?;

    Ok((dir.to_path_buf(), name))
}

fn derive_target_name(name: &str) -> Result<String> {
    let is_valid = name.starts_with(TEMPLATE_MARKER)
        && name.matches(TEMPLATE_MARKER).count() == 1
        && name.len() > TEMPLATE_MARKER.len();

    if !is_valid {
        return Err(TemplateError::InvalidTemplateName { name: name.into() });
    }

    Ok(name.replacen(TEMPLATE_MARKER, "", 1))
}

fn write_with_parents(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        debug!("ensure {:?} exists", parent.display());
        mkdirp::mkdirp(parent).map_err(|err| TemplateError::Write {
            source: err,
            path: path.to_path_buf(),
        })?;
    }

    write(path, contents).map_err(|err| TemplateError::Write {
        source: err,
        path: path.to_path_buf(),
    })
}

/// All possible error types for template rendering.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// Template path lacks a directory part.
    #[error("template {:?} must reside in a directory", path.display())]
    NoParentDir { path: PathBuf },

    /// Template name cannot be used to derive output name.
    #[error("template name {name:?} must start with \"template_\" exactly once and not be empty otherwise")]
    InvalidTemplateName { name: String },

    /// Data format of base document cannot be inferred.
    #[error("cannot infer data format of {:?}, expected .json, .yml, or .yaml", path.display())]
    UnknownFormat { path: PathBuf },

    /// Base document is not a mapping.
    #[error("base document {:?} must be a mapping at the top-level", path.display())]
    NotAMapping { path: PathBuf },

    /// Base document cannot be read.
    #[error("failed to read {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Output cannot be written.
    #[error("failed to write {:?}", path.display())]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Template cannot be loaded or rendered.
    #[error(transparent)]
    Render(#[from] tera::Error),

    /// JSON document cannot be parsed or serialized.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML document cannot be parsed.
    #[error(transparent)]
    Yaml(#[from] serde_yml::Error),
}

/// Friendly result alias :3
pub type Result<T, E = TemplateError> = std::result::Result<T, E>;
