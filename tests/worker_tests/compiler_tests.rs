//! Shader Compiler Tests

#![cfg(unix)]

use tempfile::TempDir;
use vksc_server::protocol::{ShaderSource, ShaderStage};
use vksc_server::worker::ShaderCompiler;
use vksc_server::VkscError;

use crate::common::{spirv_header, write_tool, FAKE_GLSLANG, FAKE_SPIRV_AS};

fn fake_compiler(dir: &TempDir) -> ShaderCompiler {
    let glsl = write_tool(dir.path(), "glslang", FAKE_GLSLANG);
    let spirv_as = write_tool(dir.path(), "spirv-as", FAKE_SPIRV_AS);
    ShaderCompiler::new(glsl, spirv_as)
}

fn glsl(stage: ShaderStage, source: &str) -> ShaderSource {
    ShaderSource::Glsl {
        stage,
        source: source.to_string(),
    }
}

#[test]
fn test_glsl_compiles_for_every_stage() {
    let dir = TempDir::new().unwrap();
    let compiler = fake_compiler(&dir);

    for stage in [
        ShaderStage::Vertex,
        ShaderStage::TessellationControl,
        ShaderStage::TessellationEvaluation,
        ShaderStage::Geometry,
        ShaderStage::Fragment,
        ShaderStage::Compute,
    ] {
        let binary = compiler
            .compile(&glsl(stage, "#version 450\nvoid main() {}\n"), "")
            .unwrap();
        assert_eq!(binary, spirv_header(), "stage {:?}", stage);
    }
}

#[test]
fn test_glsl_error_carries_diagnostics() {
    let dir = TempDir::new().unwrap();
    let compiler = fake_compiler(&dir);

    let result = compiler.compile(&glsl(ShaderStage::Fragment, "syntax error here"), "");
    match result {
        Err(VkscError::Compilation(message)) => assert!(message.contains("syntax error")),
        other => panic!("expected compilation error, got {:?}", other),
    }
}

#[test]
fn test_command_line_reaches_the_tool() {
    let dir = TempDir::new().unwrap();
    let compiler = fake_compiler(&dir);
    let source = glsl(ShaderStage::Vertex, "void main() {}");

    assert!(compiler.compile(&source, "--target-env vulkan1.2").is_ok());
    assert!(matches!(
        compiler.compile(&source, "--target-env vulkan1.2 --reject-me"),
        Err(VkscError::Compilation(_))
    ));
}

#[test]
fn test_spirv_assembly() {
    let dir = TempDir::new().unwrap();
    let compiler = fake_compiler(&dir);

    let ok = ShaderSource::SpirvAssembly {
        source: "OpCapability Shader\nOpMemoryModel Logical GLSL450\n".to_string(),
    };
    assert_eq!(compiler.compile(&ok, "").unwrap(), spirv_header());

    let bad = ShaderSource::SpirvAssembly {
        source: "OpNop".to_string(),
    };
    assert!(matches!(
        compiler.compile(&bad, ""),
        Err(VkscError::Compilation(_))
    ));
}

#[test]
fn test_tool_without_output_is_error() {
    let dir = TempDir::new().unwrap();
    let silent = write_tool(dir.path(), "silent", "#!/bin/sh\nexit 0\n");
    let compiler = ShaderCompiler::new(&silent, &silent);

    assert!(matches!(
        compiler.compile(&glsl(ShaderStage::Compute, "void main() {}"), ""),
        Err(VkscError::Compilation(_))
    ));
}

#[test]
fn test_precompiled_binary_is_validated() {
    let compiler = ShaderCompiler::new("unused", "unused");

    let good = ShaderSource::Spirv {
        binary: spirv_header(),
    };
    assert_eq!(compiler.compile(&good, "").unwrap(), spirv_header());

    let bad = ShaderSource::Spirv {
        binary: vec![0xFF; 24],
    };
    assert!(compiler.compile(&bad, "").is_err());
}
