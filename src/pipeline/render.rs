//! Rasterization of the first page of a PDF.

use std::process::Stdio;

use async_trait::async_trait;
use axum::body::Bytes;
use image::DynamicImage;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::FetchError;

/// Turns a document into an image of its first page.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render_first_page(&self, document: Bytes, dpi: u32) -> Result<DynamicImage, FetchError>;
}

/// Renders with poppler's `pdftoppm`, streaming the document through stdin
/// and reading a PNG back from stdout.
#[derive(Debug, Clone)]
pub struct PdftoppmRenderer {
    program: String,
}

impl PdftoppmRenderer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, dpi: u32) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-png")
            .arg("-r")
            .arg(dpi.to_string())
            .args(["-f", "1", "-l", "1", "-singlefile", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl Default for PdftoppmRenderer {
    fn default() -> Self {
        Self::new("pdftoppm")
    }
}

#[async_trait]
impl PageRenderer for PdftoppmRenderer {
    async fn render_first_page(&self, document: Bytes, dpi: u32) -> Result<DynamicImage, FetchError> {
        if document.is_empty() {
            return Err(FetchError::Render("empty document".to_string()));
        }

        let mut child = self
            .command(dpi)
            .spawn()
            .map_err(|e| FetchError::Render(format!("spawning {}: {e}", self.program)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| FetchError::Render("renderer stdin unavailable".to_string()))?;

        // Feed stdin concurrently so a full stdout pipe cannot deadlock the child.
        let writer = tokio::spawn(async move {
            let res = stdin.write_all(&document).await;
            drop(stdin);
            res
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| FetchError::Render(format!("waiting for {}: {e}", self.program)))?;

        if let Ok(Err(e)) = writer.await {
            debug!("renderer closed stdin early: {}", e);
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FetchError::Render(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        image::load_from_memory(&output.stdout)
            .map_err(|e| FetchError::Render(format!("decoding rendered page: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_document_is_render_error() {
        let renderer = PdftoppmRenderer::default();
        let err = renderer.render_first_page(Bytes::new(), 72).await.unwrap_err();
        assert!(matches!(err, FetchError::Render(_)));
    }

    #[tokio::test]
    async fn missing_program_is_render_error() {
        let renderer = PdftoppmRenderer::new("definitely-not-a-real-pdftoppm");
        let err = renderer
            .render_first_page(Bytes::from_static(b"%PDF-1.4"), 72)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Render(msg) if msg.contains("spawning")));
    }

    #[test]
    fn command_requests_first_page_only() {
        let renderer = PdftoppmRenderer::default();
        let cmd = renderer.command(150);
        let args: Vec<String> = cmd
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(
            args,
            vec!["-png", "-r", "150", "-f", "1", "-l", "1", "-singlefile", "-"]
        );
    }
}
