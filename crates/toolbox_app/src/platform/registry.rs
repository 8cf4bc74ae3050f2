use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use toolbox_core::{ToolKind, ToolRegistry, ToolSpec};
use toolbox_logging::{toolbox_info, toolbox_warn};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("could not read tool registry {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid tool registry: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("tool registry lists {0:?} more than once")]
    DuplicateTool(String),
    #[error("tool {0:?} must allow at least 1 MB")]
    ZeroLimit(String),
    #[error("could not render tool registry: {0}")]
    Render(#[from] ron::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RegistryFile {
    tools: Vec<ToolEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ToolEntry {
    id: String,
    kind: ToolKindEntry,
    accepted_formats: Vec<String>,
    max_file_size_mb: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
enum ToolKindEntry {
    ImageConverter,
    ImageResizer,
    ImageCompressor,
    SvgRasterizer,
}

impl From<ToolKindEntry> for ToolKind {
    fn from(entry: ToolKindEntry) -> Self {
        match entry {
            ToolKindEntry::ImageConverter => ToolKind::ImageConverter,
            ToolKindEntry::ImageResizer => ToolKind::ImageResizer,
            ToolKindEntry::ImageCompressor => ToolKind::ImageCompressor,
            ToolKindEntry::SvgRasterizer => ToolKind::SvgRasterizer,
        }
    }
}

impl From<ToolKind> for ToolKindEntry {
    fn from(kind: ToolKind) -> Self {
        match kind {
            ToolKind::ImageConverter => ToolKindEntry::ImageConverter,
            ToolKind::ImageResizer => ToolKindEntry::ImageResizer,
            ToolKind::ImageCompressor => ToolKindEntry::ImageCompressor,
            ToolKind::SvgRasterizer => ToolKindEntry::SvgRasterizer,
        }
    }
}

/// Loads the registry at `path`, or the built-in one when no path is given or
/// the file does not exist.
pub fn load_registry(path: Option<&Path>) -> Result<ToolRegistry, RegistryError> {
    let Some(path) = path else {
        return Ok(ToolRegistry::builtin());
    };
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            toolbox_warn!("Tool registry {:?} not found, using built-in tools", path);
            return Ok(ToolRegistry::builtin());
        }
        Err(source) => {
            return Err(RegistryError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let registry = parse_registry(&content)?;
    toolbox_info!("Loaded {} tools from {:?}", registry.len(), path);
    Ok(registry)
}

pub fn parse_registry(content: &str) -> Result<ToolRegistry, RegistryError> {
    let file: RegistryFile = ron::from_str(content)?;
    let mut seen = HashSet::new();
    let mut registry = ToolRegistry::new();
    for entry in file.tools {
        if !seen.insert(entry.id.clone()) {
            return Err(RegistryError::DuplicateTool(entry.id));
        }
        if entry.max_file_size_mb == 0 {
            return Err(RegistryError::ZeroLimit(entry.id));
        }
        registry.insert(ToolSpec {
            tool_id: entry.id,
            kind: entry.kind.into(),
            accepted_formats: entry.accepted_formats,
            max_file_size_mb: entry.max_file_size_mb,
        });
    }
    Ok(registry)
}

pub fn render_registry(registry: &ToolRegistry) -> Result<String, RegistryError> {
    let file = RegistryFile {
        tools: registry
            .iter()
            .map(|spec| ToolEntry {
                id: spec.tool_id.clone(),
                kind: spec.kind.into(),
                accepted_formats: spec.accepted_formats.clone(),
                max_file_size_mb: spec.max_file_size_mb,
            })
            .collect(),
    };
    Ok(ron::ser::to_string_pretty(
        &file,
        ron::ser::PrettyConfig::new(),
    )?)
}
