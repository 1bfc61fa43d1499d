use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::Path;

use super::{Handler, StepContext, Verb, required};
use crate::error::ProbeError;

/// `FILE LIST <dir>` / `FILE READ <path>` / `FILE WRITE <path> <content>`.
///
/// A path that does not exist is reported as text, not as a failure.
pub struct FileHandler;

fn not_found(path: &str) -> String {
    format!("Path not found: {path}")
}

async fn list(dir: &str) -> Result<String, ProbeError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(not_found(dir)),
        Err(e) => return Err(e.into()),
    };

    let mut lines = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        let meta = entry.metadata().await?;
        if meta.is_dir() {
            lines.push((name.clone(), format!("DIR: {name}")));
        } else {
            lines.push((name.clone(), format!("FILE: {name} ({} bytes)", meta.len())));
        }
    }
    lines.sort();
    Ok(lines
        .into_iter()
        .map(|(_, line)| line)
        .collect::<Vec<_>>()
        .join("\n"))
}

async fn read(path: &str) -> Result<String, ProbeError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(super::blob::render_bytes(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(not_found(path)),
        Err(e) => Err(e.into()),
    }
}

async fn write(path: &str, content: &str) -> Result<String, ProbeError> {
    let parent = Path::new(path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty());
    if let Some(parent) = parent {
        if !tokio::fs::try_exists(parent).await? {
            return Ok(not_found(path));
        }
    }
    tokio::fs::write(path, content).await?;
    Ok(format!("Wrote {} bytes to {path}", content.len()))
}

#[async_trait]
impl Handler for FileHandler {
    fn verb(&self) -> Verb {
        Verb::File
    }

    fn usage(&self) -> &str {
        "LIST <dir> | READ <path> | WRITE <path> <content>"
    }

    async fn execute(&self, args: &[String], _ctx: &StepContext<'_>) -> Result<String, ProbeError> {
        let op = required(Verb::File, args, 0, "operation")?;
        let path = required(Verb::File, args, 1, "path")?;
        match op {
            "LIST" => list(path).await,
            "READ" => read(path).await,
            "WRITE" => write(path, required(Verb::File, args, 2, "content")?).await,
            other => Err(ProbeError::invalid(
                Verb::File,
                format!("unsupported operation {other:?} (expected LIST, READ or WRITE)"),
            )),
        }
    }
}
