//! XSLT execution through the `xsltproc` command-line tool.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{bail, Context};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::traits::XsltEngine;

/// Runs `xsltproc <stylesheet> -` with the document on stdin.
#[derive(Debug, Clone)]
pub struct XsltProcEngine {
    program: PathBuf,
}

impl XsltProcEngine {
    /// Uses `xsltproc` from `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_program("xsltproc")
    }

    #[must_use]
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for XsltProcEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl XsltEngine for XsltProcEngine {
    async fn transform(&self, stylesheet: &Path, document: &str) -> anyhow::Result<String> {
        let mut child = Command::new(&self.program)
            .arg(stylesheet)
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {}", self.program.display()))?;

        let mut stdin = child.stdin.take().context("xsltproc stdin not captured")?;
        let input = document.as_bytes().to_vec();
        // Feed stdin concurrently so a large reply cannot block the writer.
        let writer = tokio::spawn(async move {
            stdin.write_all(&input).await?;
            stdin.shutdown().await
        });

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            bail!(
                "xsltproc failed on {} ({}): {}",
                stylesheet.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        writer.await??;
        String::from_utf8(output.stdout).context("xsltproc produced non-UTF-8 output")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_program_is_an_error() {
        let engine = XsltProcEngine::with_program("/nonexistent/bin/xsltproc");
        let result = engine
            .transform(Path::new("/tmp/none.xslt"), "<a/>")
            .await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("failed to spawn"));
    }
}
