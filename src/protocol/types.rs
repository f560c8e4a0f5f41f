//! Payload value types shared by requests.

use serde::{Deserialize, Serialize};

/// First word of every SPIR-V module
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Shader pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShaderStage {
    Vertex,
    TessellationControl,
    TessellationEvaluation,
    Geometry,
    Fragment,
    Compute,
}

impl ShaderStage {
    /// Conventional file extension, also the stage name glslang expects
    pub fn extension(&self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vert",
            ShaderStage::TessellationControl => "tesc",
            ShaderStage::TessellationEvaluation => "tese",
            ShaderStage::Geometry => "geom",
            ShaderStage::Fragment => "frag",
            ShaderStage::Compute => "comp",
        }
    }

    /// Parse a stage from its extension name
    pub fn from_extension(name: &str) -> Option<Self> {
        match name {
            "vert" => Some(ShaderStage::Vertex),
            "tesc" => Some(ShaderStage::TessellationControl),
            "tese" => Some(ShaderStage::TessellationEvaluation),
            "geom" => Some(ShaderStage::Geometry),
            "frag" => Some(ShaderStage::Fragment),
            "comp" => Some(ShaderStage::Compute),
            _ => None,
        }
    }
}

/// Shader program handed to the compiler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShaderSource {
    /// GLSL source for a single stage
    Glsl { stage: ShaderStage, source: String },

    /// SPIR-V assembly text
    SpirvAssembly { source: String },

    /// Already compiled SPIR-V, returned unchanged once validated
    Spirv { binary: Vec<u8> },
}

impl ShaderSource {
    /// Short name for log lines
    pub fn kind(&self) -> &'static str {
        match self {
            ShaderSource::Glsl { .. } => "glsl",
            ShaderSource::SpirvAssembly { .. } => "spirv-asm",
            ShaderSource::Spirv { .. } => "spirv",
        }
    }
}

/// Severity attached to client log messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Pipeline bind point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineKind {
    Graphics,
    Compute,
}

impl PipelineKind {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineKind::Graphics => "graphics",
            PipelineKind::Compute => "compute",
        }
    }
}

/// SPIR-V module bound to one stage of a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineShader {
    pub stage: ShaderStage,
    pub spirv: Vec<u8>,
}

/// One pipeline recorded by a test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineDescription {
    /// Pipeline identifier (UUID) the cache entry is keyed by
    pub identifier: [u8; 16],

    pub kind: PipelineKind,

    /// Pipeline description in the offline compiler's JSON schema
    pub json: String,

    pub shaders: Vec<PipelineShader>,

    pub device_extensions: Vec<String>,

    /// Max number of simultaneously alive instances
    pub max_count: u32,

    /// Total number of instances created by the test
    pub all_count: u32,
}

/// Everything needed to build one pipeline cache
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineCacheInput {
    pub pipelines: Vec<PipelineDescription>,
}
