use std::collections::BTreeMap;

use crate::TransformKind;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Tool category, resolved once when the registry is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    ImageConverter,
    ImageResizer,
    ImageCompressor,
    SvgRasterizer,
}

impl ToolKind {
    pub fn supports(self, kind: TransformKind) -> bool {
        match self {
            ToolKind::ImageConverter => kind == TransformKind::Convert,
            ToolKind::ImageResizer => kind == TransformKind::Resize,
            ToolKind::ImageCompressor => kind == TransformKind::Compress,
            ToolKind::SvgRasterizer => kind == TransformKind::Rasterize,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSpec {
    pub tool_id: String,
    pub kind: ToolKind,
    pub accepted_formats: Vec<String>,
    pub max_file_size_mb: u32,
}

impl ToolSpec {
    pub fn new(
        tool_id: impl Into<String>,
        kind: ToolKind,
        accepted_formats: &[&str],
        max_file_size_mb: u32,
    ) -> Self {
        Self {
            tool_id: tool_id.into(),
            kind,
            accepted_formats: accepted_formats.iter().map(|f| f.to_string()).collect(),
            max_file_size_mb,
        }
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        u64::from(self.max_file_size_mb) * BYTES_PER_MB
    }

    /// Case-insensitive extension check used to filter the file picker.
    pub fn accepts(&self, file_name: &str) -> bool {
        let Some((_, ext)) = file_name.rsplit_once('.') else {
            return false;
        };
        self.accepted_formats
            .iter()
            .any(|accepted| accepted.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolSpec>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let raster = ["png", "jpg", "jpeg", "webp", "bmp", "gif", "ico", "tif", "tiff"];
        let mut registry = Self::new();
        registry.insert(ToolSpec::new(
            "image-converter",
            ToolKind::ImageConverter,
            &raster,
            50,
        ));
        registry.insert(ToolSpec::new(
            "image-resizer",
            ToolKind::ImageResizer,
            &raster,
            50,
        ));
        registry.insert(ToolSpec::new(
            "image-compressor",
            ToolKind::ImageCompressor,
            &["png", "jpg", "jpeg", "webp"],
            50,
        ));
        registry.insert(ToolSpec::new(
            "svg-to-png",
            ToolKind::SvgRasterizer,
            &["svg"],
            10,
        ));
        registry
    }

    /// Inserts or replaces the tool with the same id.
    pub fn insert(&mut self, spec: ToolSpec) -> Option<ToolSpec> {
        self.tools.insert(spec.tool_id.clone(), spec)
    }

    pub fn get(&self, tool_id: &str) -> Option<&ToolSpec> {
        self.tools.get(tool_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolSpec> {
        self.tools.values()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
