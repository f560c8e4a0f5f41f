//! End-to-End Tests
//!
//! A real server on a loopback port, driven through `Client`.

use std::fs;

use vksc_server::protocol::{PipelineCacheInput, PipelineDescription, PipelineKind, Severity};
use vksc_server::Client;

use crate::common::TestServer;

// =============================================================================
// Content Tests
// =============================================================================

#[test]
fn test_store_overwrite_get_remove_scenario() {
    let server = TestServer::start();
    let mut client = Client::connect(&server.address()).unwrap();

    assert!(client.store_content("@test1", &[1, 2, 3, 4]).unwrap());
    assert!(client.store_content("@test1", &[5, 6, 7, 8, 9]).unwrap());

    let first = client.get_content("@test1", true).unwrap();
    assert!(first.status);
    assert_eq!(first.data, vec![5, 6, 7, 8, 9]);

    let second = client.get_content("@test1", false).unwrap();
    assert!(!second.status);
    assert!(second.data.is_empty());
}

#[test]
fn test_content_is_shared_between_connections() {
    let server = TestServer::start();
    let mut writer = Client::connect(&server.address()).unwrap();
    let mut reader = Client::connect(&server.address()).unwrap();

    assert!(writer.store_content("@shared", b"hello").unwrap());
    let response = reader.get_content("@shared", false).unwrap();
    assert!(response.status);
    assert_eq!(response.data, b"hello".to_vec());
}

#[test]
fn test_append_then_get_on_same_connection() {
    let server = TestServer::start();
    let mut client = Client::connect(&server.address()).unwrap();

    client.append("results/log.txt", b"first\n", true).unwrap();
    client.append("results/log.txt", b"second\n", false).unwrap();

    let response = client.get_content("results/log.txt", false).unwrap();
    assert!(response.status);
    assert_eq!(response.data, b"first\nsecond\n".to_vec());
    assert!(server.dir.path().join("content/results/log.txt").is_file());
}

#[test]
fn test_escaping_name_is_refused() {
    let server = TestServer::start();
    let mut client = Client::connect(&server.address()).unwrap();

    assert!(!client.store_content("../escape", b"x").unwrap());
    assert!(!server.dir.path().join("escape").exists());

    // Connection survives the refusal
    assert!(client.store_content("@fine", b"x").unwrap());
}

#[test]
fn test_log_has_no_response() {
    let server = TestServer::start_with(|builder, dir| {
        builder.log_file(Some(dir.join("client.log")))
    });
    let mut client = Client::connect(&server.address()).unwrap();

    client.log(Severity::Warning, "device lost").unwrap();
    client.log(Severity::Info, "second line").unwrap();

    // The next response must belong to this store, not to the logs
    assert!(client.store_content("@after-log", b"x").unwrap());

    let log = fs::read_to_string(server.dir.path().join("client.log")).unwrap();
    assert!(log.contains("WARNING: device lost"));
    assert!(log.contains("INFO: second line"));
    // Lines name the peer the message came from
    assert!(log.lines().all(|line| line.contains("127.0.0.1:")));
}

// =============================================================================
// Worker Tests
// =============================================================================

#[cfg(unix)]
#[test]
fn test_compile_failure_then_success() {
    use vksc_server::protocol::{ShaderSource, ShaderStage};

    use crate::common::{spirv_header, write_tool, FAKE_GLSLANG};

    let server = TestServer::start_with(|builder, dir| {
        builder.glsl_compiler(write_tool(dir, "glslang", FAKE_GLSLANG))
    });
    let mut client = Client::connect(&server.address()).unwrap();

    let broken = ShaderSource::Glsl {
        stage: ShaderStage::Fragment,
        source: "syntax error".to_string(),
    };
    let response = client.compile_shader(broken, "").unwrap();
    assert!(!response.status);
    assert!(response.binary.is_empty());

    let valid = ShaderSource::Glsl {
        stage: ShaderStage::Fragment,
        source: "#version 450\nvoid main() {}\n".to_string(),
    };
    let response = client.compile_shader(valid, "").unwrap();
    assert!(response.status);
    assert_eq!(response.binary, spirv_header());
}

fn cache_input(json: &str) -> PipelineCacheInput {
    PipelineCacheInput {
        pipelines: vec![PipelineDescription {
            identifier: [0u8; 16],
            kind: PipelineKind::Graphics,
            json: json.to_string(),
            shaders: Vec::new(),
            device_extensions: Vec::new(),
            max_count: 1,
            all_count: 1,
        }],
    }
}

#[test]
fn test_create_cache_without_compiler_fails_softly() {
    let server = TestServer::start();
    let mut client = Client::connect(&server.address()).unwrap();

    let response = client.create_cache(cache_input("{}"), -1).unwrap();
    assert!(!response.status);
    assert!(response.binary.is_empty());

    assert!(client.store_content("@still-alive", b"x").unwrap());
}

#[cfg(unix)]
#[test]
fn test_create_cache_with_offline_compiler() {
    use vksc_server::PipelineCompilerParams;

    use crate::common::{write_tool, FAKE_PIPELINE_COMPILER};

    let server = TestServer::start_with(|builder, dir| {
        builder.pipeline(PipelineCompilerParams {
            compiler_path: write_tool(dir, "pipeline-compiler", FAKE_PIPELINE_COMPILER),
            data_dir: dir.join("pipelines"),
            output_file: Default::default(),
            log_file: None,
            args: String::new(),
        })
    });
    let mut client = Client::connect(&server.address()).unwrap();

    let response = client.create_cache(cache_input("{\"id\":1}"), 2).unwrap();
    assert!(response.status);
    assert_eq!(response.binary, b"{\"id\":1}".to_vec());

    let response = client.create_cache(cache_input("invalid"), 2).unwrap();
    assert!(!response.status);
}
