//! Adapters backed by host binaries (ffmpeg, LibreOffice, rsvg-convert).
//!
//! Each invocation stages the input in a private temporary directory, runs
//! the tool to completion and reads the produced file back. Adapters are
//! registered whether or not the binary exists; a missing binary surfaces as
//! [`AdapterError::ToolMissing`] at conversion time.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use super::adapter::{AdapterRef, Converted};
use super::error::AdapterError;

const SOFFICE_CANDIDATES: &[&str] = &["soffice", "libreoffice"];
pub(crate) const RSVG_CANDIDATES: &[&str] = &["rsvg-convert"];

/// Locates a binary, preferring an explicit path when it exists.
pub fn locate_tool(configured: Option<&Path>, candidates: &[&str]) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Some(path.to_path_buf());
        }
        if let Ok(found) = which::which(path) {
            return Some(found);
        }
    }
    candidates
        .iter()
        .find_map(|name| which::which(name).ok())
}

/// Builds an ffmpeg adapter for one `source -> target` pair.
pub fn ffmpeg_adapter(
    ffmpeg_path: PathBuf,
    source: &'static str,
    target: &'static str,
    extra_args: &'static [&'static str],
) -> AdapterRef {
    AdapterRef::new(move |content, _hint| {
        let program = locate_tool(Some(ffmpeg_path.as_path()), &["ffmpeg"])
            .ok_or_else(|| AdapterError::tool_missing("ffmpeg"))?;
        let workdir = tempfile::tempdir()?;
        let input = workdir.path().join(format!("input.{}", source));
        let output = workdir.path().join(format!("output.{}", target));
        std::fs::write(&input, content)?;

        let mut args: Vec<String> = vec![
            "-y".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
        ];
        args.extend(extra_args.iter().map(|a| a.to_string()));
        args.push(output.to_string_lossy().to_string());

        run_tool("ffmpeg", &program, &args)?;
        read_output("ffmpeg", &output, target)
    })
}

/// Builds a LibreOffice adapter that exports `source` documents to `target`.
pub fn soffice_adapter(
    soffice_path: Option<PathBuf>,
    source: &'static str,
    target: &'static str,
) -> AdapterRef {
    AdapterRef::new(move |content, _hint| {
        let program = locate_tool(soffice_path.as_deref(), SOFFICE_CANDIDATES)
            .ok_or_else(|| AdapterError::tool_missing("LibreOffice"))?;
        let workdir = tempfile::tempdir()?;
        let input = workdir.path().join(format!("document.{}", source));
        std::fs::write(&input, content)?;

        // A private profile keeps concurrent invocations from fighting over
        // the user's LibreOffice lock file.
        let profile = format!(
            "-env:UserInstallation=file://{}",
            workdir.path().join("profile").to_string_lossy()
        );
        let args = vec![
            profile,
            "--headless".to_string(),
            "--convert-to".to_string(),
            target.to_string(),
            "--outdir".to_string(),
            workdir.path().to_string_lossy().to_string(),
            input.to_string_lossy().to_string(),
        ];

        run_tool("LibreOffice", &program, &args)?;
        let output = workdir.path().join(format!("document.{}", target));
        read_output("LibreOffice", &output, target)
    })
}

/// Builds an rsvg-convert adapter rendering SVG to `target` (png or pdf).
pub fn rsvg_adapter(rsvg_path: Option<PathBuf>, target: &'static str) -> AdapterRef {
    AdapterRef::new(move |content, _hint| {
        let program = locate_tool(rsvg_path.as_deref(), RSVG_CANDIDATES)
            .ok_or_else(|| AdapterError::tool_missing("rsvg-convert"))?;
        let workdir = tempfile::tempdir()?;
        let input = workdir.path().join("drawing.svg");
        let output = workdir.path().join(format!("drawing.{}", target));
        std::fs::write(&input, content)?;

        let args = vec![
            "--format".to_string(),
            target.to_string(),
            "--output".to_string(),
            output.to_string_lossy().to_string(),
            input.to_string_lossy().to_string(),
        ];

        run_tool("rsvg-convert", &program, &args)?;
        read_output("rsvg-convert", &output, target)
    })
}

fn run_tool(tool: &str, program: &Path, args: &[String]) -> Result<(), AdapterError> {
    debug!(tool, program = %program.display(), ?args, "Running external converter");

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => AdapterError::tool_missing(tool),
            _ => AdapterError::Io(e),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let reason = match stderr.trim() {
            "" => format!("exited with code: {:?}", output.status.code()),
            message => message.lines().last().unwrap_or(message).to_string(),
        };
        return Err(AdapterError::tool_failed(tool, reason));
    }

    Ok(())
}

fn read_output(tool: &str, output: &Path, target: &str) -> Result<Converted, AdapterError> {
    if !output.exists() {
        return Err(AdapterError::NoOutput {
            tool: tool.to_string(),
            path: output.to_path_buf(),
        });
    }
    let content = std::fs::read(output)?;
    let mime = mime_guess::from_ext(target).first_or_octet_stream();
    Ok(Converted::new(content, mime.essence_str()))
}
