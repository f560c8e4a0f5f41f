//! Shader compiler front end
//!
//! Writes the source into a scratch directory, runs the matching tool and
//! reads the SPIR-V it produced.

use std::fs;
use std::path::{Path, PathBuf};

use super::process::{run_tool, split_args};
use crate::error::{Result, VkscError};
use crate::protocol::{ShaderSource, SPIRV_MAGIC};

/// SPIR-V header is five words
const SPIRV_HEADER_SIZE: usize = 20;

/// Compiles shader sources through external tools
#[derive(Debug, Clone)]
pub struct ShaderCompiler {
    /// GLSL to SPIR-V compiler (glslangValidator compatible)
    glsl_compiler: PathBuf,

    /// SPIR-V assembler (spirv-as compatible)
    spirv_assembler: PathBuf,
}

impl ShaderCompiler {
    pub fn new(glsl_compiler: impl Into<PathBuf>, spirv_assembler: impl Into<PathBuf>) -> Self {
        Self {
            glsl_compiler: glsl_compiler.into(),
            spirv_assembler: spirv_assembler.into(),
        }
    }

    /// Compile `source` into a SPIR-V binary.
    ///
    /// `command_line` is split on whitespace and passed to the tool before
    /// the input file.
    pub fn compile(&self, source: &ShaderSource, command_line: &str) -> Result<Vec<u8>> {
        match source {
            ShaderSource::Glsl { stage, source } => {
                let extension = stage.extension();
                self.run_in_scratch(&format!("shader.{}", extension), source, |input, output| {
                    let mut args = vec![
                        "-V".to_string(),
                        "-S".to_string(),
                        extension.to_string(),
                        "-o".to_string(),
                        output.display().to_string(),
                    ];
                    args.extend(split_args(command_line));
                    args.push(input.display().to_string());
                    (&self.glsl_compiler, args)
                })
            }
            ShaderSource::SpirvAssembly { source } => {
                self.run_in_scratch("shader.spvasm", source, |input, output| {
                    let mut args = split_args(command_line);
                    args.push("-o".to_string());
                    args.push(output.display().to_string());
                    args.push(input.display().to_string());
                    (&self.spirv_assembler, args)
                })
            }
            ShaderSource::Spirv { binary } => {
                validate_spirv(binary)?;
                Ok(binary.clone())
            }
        }
    }

    fn run_in_scratch<'a, F>(&'a self, file_name: &str, source: &str, command: F) -> Result<Vec<u8>>
    where
        F: FnOnce(&Path, &Path) -> (&'a PathBuf, Vec<String>),
    {
        let scratch = tempfile::Builder::new().prefix("vksc-shader-").tempdir()?;
        let input = scratch.path().join(file_name);
        let output = scratch.path().join("shader.spv");
        fs::write(&input, source)?;

        let (program, args) = command(&input, &output);
        let result = run_tool(program, &args).map_err(|e| {
            VkscError::Compilation(format!("cannot run {}: {}", program.display(), e))
        })?;

        if !result.success() {
            return Err(VkscError::Compilation(result.diagnostics()));
        }

        let binary = fs::read(&output).map_err(|e| {
            VkscError::Compilation(format!("{} produced no output: {}", program.display(), e))
        })?;
        validate_spirv(&binary)?;

        Ok(binary)
    }
}

/// Check that `binary` looks like a SPIR-V module.
///
/// Accepts either byte order of the magic number.
pub fn validate_spirv(binary: &[u8]) -> Result<()> {
    if binary.len() < SPIRV_HEADER_SIZE || binary.len() % 4 != 0 {
        return Err(VkscError::Compilation(format!(
            "invalid SPIR-V size: {} bytes",
            binary.len()
        )));
    }

    let word = [binary[0], binary[1], binary[2], binary[3]];
    if u32::from_le_bytes(word) != SPIRV_MAGIC && u32::from_be_bytes(word) != SPIRV_MAGIC {
        return Err(VkscError::Compilation(
            "missing SPIR-V magic number".to_string(),
        ));
    }

    Ok(())
}
