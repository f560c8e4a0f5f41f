//! Offline pipeline cache builder
//!
//! ## Flow
//! 1. Remove files a previous run left behind (same prefix only)
//! 2. Export every pipeline as JSON plus its SPIR-V modules
//! 3. Run the offline compiler over the export directory
//! 4. Read the cache file it wrote
//!
//! ## Exported Layout
//! ```text
//!   {data_dir}/
//!     ├── {prefix}graphics_pipeline_0.json
//!     ├── {prefix}shader_0_0.vert
//!     ├── {prefix}shader_0_1.frag
//!     └── {prefix}compute_pipeline_1.json ...
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use super::process::{run_tool, split_args};
use crate::config::PipelineCompilerParams;
use crate::error::{Result, VkscError};
use crate::protocol::PipelineCacheInput;

/// Cache file name used when no output file is configured
const DEFAULT_OUTPUT_FILE: &str = "pipeline_cache.bin";

/// File prefix for a case fraction.
///
/// `3` → `"sub_3_"`; negative fractions mean the whole run and use no prefix.
pub fn file_prefix(case_fraction: i32) -> String {
    if case_fraction >= 0 {
        format!("sub_{}_", case_fraction)
    } else {
        String::new()
    }
}

/// Build a pipeline cache with the offline compiler described by `params`.
///
/// Returns an empty cache when `input` holds no pipelines.
pub fn build_pipeline_cache(
    input: &PipelineCacheInput,
    case_fraction: i32,
    params: &PipelineCompilerParams,
) -> Result<Vec<u8>> {
    if params.compiler_path.as_os_str().is_empty() {
        return Err(VkscError::CacheBuild(
            "no offline pipeline compiler configured".to_string(),
        ));
    }
    if !params.compiler_path.is_file() {
        return Err(VkscError::CacheBuild(format!(
            "Can't find pipeline compiler {}",
            params.compiler_path.display()
        )));
    }
    if params.data_dir.as_os_str().is_empty() {
        return Err(VkscError::CacheBuild(
            "no pipeline data directory configured".to_string(),
        ));
    }

    let prefix = file_prefix(case_fraction);
    fs::create_dir_all(&params.data_dir)?;
    remove_exported_files(&params.data_dir, &prefix)?;

    let exported = export_pipelines(input, &params.data_dir, &prefix)?;
    if exported == 0 {
        return Ok(Vec::new());
    }

    let output_file = if params.output_file.as_os_str().is_empty() {
        params.data_dir.join(format!("{}{}", prefix, DEFAULT_OUTPUT_FILE))
    } else {
        prefixed(&params.output_file, &prefix)
    };
    // A stale cache must never be mistaken for this run's output
    if output_file.exists() {
        fs::remove_file(&output_file)?;
    }

    let mut args = vec![
        "--path".to_string(),
        params.data_dir.display().to_string(),
        "--out".to_string(),
        output_file.display().to_string(),
    ];
    if let Some(log_file) = &params.log_file {
        args.push("--log".to_string());
        args.push(prefixed(log_file, &prefix).display().to_string());
    }
    if !prefix.is_empty() {
        args.push("--prefix".to_string());
        args.push(prefix.clone());
    }
    args.extend(split_args(&params.args));

    tracing::debug!(
        "Running offline pipeline compiler on {} pipelines (prefix {:?})",
        exported,
        prefix
    );

    let result = run_tool(&params.compiler_path, &args).map_err(|e| {
        VkscError::CacheBuild(format!(
            "cannot run {}: {}",
            params.compiler_path.display(),
            e
        ))
    })?;
    if !result.success() {
        return Err(VkscError::CacheBuild(format!(
            "offline pipeline compilation failed: {}",
            result.diagnostics()
        )));
    }

    fs::read(&output_file).map_err(|e| {
        VkscError::CacheBuild(format!("Cannot open file {}: {}", output_file.display(), e))
    })
}

/// Write every pipeline of `input` into `dir`, returning how many were written
pub fn export_pipelines(input: &PipelineCacheInput, dir: &Path, prefix: &str) -> Result<usize> {
    for (index, pipeline) in input.pipelines.iter().enumerate() {
        let json_path = dir.join(format!(
            "{}{}_pipeline_{}.json",
            prefix,
            pipeline.kind.name(),
            index
        ));
        fs::write(&json_path, &pipeline.json)?;

        for (stage_index, shader) in pipeline.shaders.iter().enumerate() {
            let shader_path = dir.join(format!(
                "{}shader_{}_{}.{}",
                prefix,
                index,
                stage_index,
                shader.stage.extension()
            ));
            fs::write(&shader_path, &shader.spirv)?;
        }
    }

    Ok(input.pipelines.len())
}

/// Delete regular files in `dir` whose name starts with `prefix`.
/// An empty prefix matches every file.
fn remove_exported_files(dir: &Path, prefix: &str) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with(prefix) {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

/// `/a/cache.bin` + `sub_1_` → `/a/sub_1_cache.bin`
fn prefixed(path: &Path, prefix: &str) -> PathBuf {
    if prefix.is_empty() {
        return path.to_path_buf();
    }
    match path.file_name() {
        Some(name) => path.with_file_name(format!("{}{}", prefix, name.to_string_lossy())),
        None => path.to_path_buf(),
    }
}
