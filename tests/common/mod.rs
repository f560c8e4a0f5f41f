//! Shared test helpers: fake external tools and a throwaway server.

#![allow(dead_code)]

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tempfile::TempDir;
use vksc_server::config::ServerConfigBuilder;
use vksc_server::protocol::SPIRV_MAGIC;
use vksc_server::{Result, Server, ServerConfig, Services, ShutdownHandle};

// =============================================================================
// SPIR-V
// =============================================================================

/// Smallest buffer `validate_spirv` accepts
pub fn spirv_header() -> Vec<u8> {
    let mut binary = SPIRV_MAGIC.to_le_bytes().to_vec();
    binary.extend_from_slice(&[0, 0, 1, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0]);
    binary
}

// =============================================================================
// Fake Tools
// =============================================================================

/// glslangValidator stand-in: writes a SPIR-V header to `-o`, fails when the
/// source contains "syntax error" or an argument is `--reject-me`.
#[cfg(unix)]
pub const FAKE_GLSLANG: &str = r#"#!/bin/sh
[ $# -eq 0 ] && exit 0
out=""
input=""
all="$*"
while [ $# -gt 0 ]; do
  case "$1" in
    -o) out="$2"; shift 2 ;;
    -V) shift ;;
    -S) shift 2 ;;
    *) input="$1"; shift ;;
  esac
done
if grep -q "syntax error" "$input"; then
  echo "ERROR: $input:1: syntax error" >&2
  exit 1
fi
case "$all" in
  *--reject-me*) echo "unknown option --reject-me" >&2; exit 3 ;;
esac
printf '\003\002\043\007\000\000\001\000\000\000\000\000\001\000\000\000\000\000\000\000' > "$out"
"#;

/// spirv-as stand-in: same output contract as the GLSL stand-in
#[cfg(unix)]
pub const FAKE_SPIRV_AS: &str = r#"#!/bin/sh
[ $# -eq 0 ] && exit 0
out=""
input=""
while [ $# -gt 0 ]; do
  case "$1" in
    -o) out="$2"; shift 2 ;;
    *) input="$1"; shift ;;
  esac
done
if ! grep -q "OpCapability" "$input"; then
  echo "error: expected OpCapability" >&2
  exit 1
fi
printf '\003\002\043\007\000\000\001\000\000\000\000\000\001\000\000\000\000\000\000\000' > "$out"
"#;

/// Offline pipeline compiler stand-in: concatenates the exported pipeline
/// JSON files with the requested prefix into `--out`; fails on "invalid".
#[cfg(unix)]
pub const FAKE_PIPELINE_COMPILER: &str = r#"#!/bin/sh
[ $# -eq 0 ] && exit 0
dir=""
out=""
prefix=""
while [ $# -gt 0 ]; do
  case "$1" in
    --path) dir="$2"; shift 2 ;;
    --out) out="$2"; shift 2 ;;
    --prefix) prefix="$2"; shift 2 ;;
    --log) shift 2 ;;
    *) shift ;;
  esac
done
if grep -q invalid "$dir"/"$prefix"*pipeline_*.json; then
  echo "invalid pipeline" >&2
  exit 1
fi
cat "$dir"/"$prefix"*pipeline_*.json > "$out"
"#;

/// Write an executable script into `dir`
#[cfg(unix)]
pub fn write_tool(dir: &Path, name: &str, script: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    wait_until_executable(&path);
    path
}

/// A concurrently forked test thread can briefly hold the script's write
/// handle open, making exec fail with ETXTBSY. Retry until it runs.
#[cfg(unix)]
fn wait_until_executable(path: &Path) {
    const ETXTBSY: i32 = 26;

    for _ in 0..100 {
        match std::process::Command::new(path)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
        {
            Err(e) if e.raw_os_error() == Some(ETXTBSY) => {
                thread::sleep(Duration::from_millis(10));
            }
            _ => return,
        }
    }
}

// =============================================================================
// Server
// =============================================================================

/// Server running on a background thread, stopped on drop
pub struct TestServer {
    pub addr: SocketAddr,
    pub dir: TempDir,
    shutdown: ShutdownHandle,
    handle: Option<JoinHandle<Result<()>>>,
}

impl TestServer {
    /// Start with default settings
    pub fn start() -> Self {
        Self::start_with(|builder, _| builder)
    }

    /// Start with extra configuration. The closure receives the scratch
    /// directory owned by the server.
    pub fn start_with<F>(configure: F) -> Self
    where
        F: FnOnce(ServerConfigBuilder, &Path) -> ServerConfigBuilder,
    {
        let dir = TempDir::new().unwrap();
        let builder = ServerConfig::builder()
            .listen_addr("127.0.0.1:0")
            .content_root(dir.path().join("content"));
        let config = configure(builder, dir.path()).build();

        let services = Arc::new(Services::open(&config).unwrap());
        let mut server = Server::bind(config, services).unwrap();
        let addr = server.local_addr().unwrap();
        let shutdown = server.shutdown_handle();
        let handle = thread::spawn(move || server.run());

        Self {
            addr,
            dir,
            shutdown,
            handle: Some(handle),
        }
    }

    /// `host:port` string for `Client::connect`
    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    /// Stop the server and return the result of `run`
    pub fn stop(mut self) -> Result<()> {
        self.shutdown.shutdown();
        let handle = self.handle.take().unwrap();
        handle.join().unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
