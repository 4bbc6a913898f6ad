//! PDF page probing and rendering via external poppler-style binaries.
//!
//! PDF decoding is an external collaborator: page counts come from a
//! `pdfinfo`-compatible probe and pages are rasterized to PNG by a
//! `pdftoppm`-compatible renderer, both spawned per upload with bounded
//! execution time.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Timeout for each spawned PDF process.
const PDF_TIMEOUT: Duration = Duration::from_secs(60);

/// Rendered output resolution bounds (dpi). Guards against settings that
/// would produce absurd rasters.
const MIN_RENDER_DPI: u32 = 36;
const MAX_RENDER_DPI: u32 = 600;

/// Errors from the PDF pipeline.
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF probe failed: {0}")]
    Probe(String),

    #[error("PDF render failed: {0}")]
    Render(String),
}

/// Wrapper around the configured probe/render binaries.
#[derive(Debug, Clone)]
pub struct PdfRenderer {
    info_binary: PathBuf,
    render_binary: PathBuf,
}

impl PdfRenderer {
    pub fn new(info_binary: impl Into<PathBuf>, render_binary: impl Into<PathBuf>) -> Self {
        Self {
            info_binary: info_binary.into(),
            render_binary: render_binary.into(),
        }
    }

    /// Reads the number of pages in a PDF file.
    pub async fn page_count(&self, pdf_path: &Path) -> Result<u32, PdfError> {
        let output = run_with_timeout(
            Command::new(&self.info_binary).arg(pdf_path),
            "probe",
        )
        .await
        .map_err(PdfError::Probe)?;

        let stdout = String::from_utf8_lossy(&output);
        parse_page_count(&stdout)
            .ok_or_else(|| PdfError::Probe("no page count in probe output".to_string()))
    }

    /// Renders every page of a PDF to PNG at the given zoom factor
    /// (1.0 = 72 dpi), returning the encoded pages in order.
    pub async fn render_pages(
        &self,
        pdf_path: &Path,
        scale: f32,
    ) -> Result<Vec<Vec<u8>>, PdfError> {
        let out_dir = pdf_path
            .parent()
            .ok_or_else(|| PdfError::Render("pdf path has no parent directory".to_string()))?;
        let prefix = out_dir.join("page");

        let dpi = ((72.0 * scale).round() as u32).clamp(MIN_RENDER_DPI, MAX_RENDER_DPI);

        run_with_timeout(
            Command::new(&self.render_binary)
                .arg("-png")
                .arg("-r")
                .arg(dpi.to_string())
                .arg(pdf_path)
                .arg(&prefix),
            "render",
        )
        .await
        .map_err(PdfError::Render)?;

        // The renderer writes page-1.png, page-2.png, ... (zero-padded to a
        // uniform width), so a lexical sort restores page order.
        let mut page_files: Vec<PathBuf> = std::fs::read_dir(out_dir)
            .map_err(|e| PdfError::Render(format!("failed to read output dir: {e}")))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension().is_some_and(|ext| ext == "png")
                    && path
                        .file_stem()
                        .and_then(|stem| stem.to_str())
                        .is_some_and(|stem| stem.starts_with("page-"))
            })
            .collect();
        page_files.sort();

        if page_files.is_empty() {
            return Err(PdfError::Render("renderer produced no pages".to_string()));
        }

        let mut pages = Vec::with_capacity(page_files.len());
        for file in page_files {
            let bytes = std::fs::read(&file)
                .map_err(|e| PdfError::Render(format!("failed to read {file:?}: {e}")))?;
            pages.push(bytes);
        }
        Ok(pages)
    }
}

/// Runs a command with output capture and the shared timeout. Returns
/// stdout on success, a descriptive message otherwise.
async fn run_with_timeout(command: &mut Command, what: &str) -> Result<Vec<u8>, String> {
    let child = command
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("failed to spawn {what} binary: {e}"))?;

    let output = tokio::time::timeout(PDF_TIMEOUT, child.wait_with_output())
        .await
        .map_err(|_| {
            format!(
                "{what} process timed out after {} seconds",
                PDF_TIMEOUT.as_secs()
            )
        })?
        .map_err(|e| format!("failed to wait for {what} binary: {e}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("{what} binary failed: {stderr}"));
    }

    Ok(output.stdout)
}

/// Extracts the page count from `pdfinfo`-style output.
fn parse_page_count(output: &str) -> Option<u32> {
    output.lines().find_map(|line| {
        let rest = line.strip_prefix("Pages:")?;
        rest.trim().parse().ok()
    })
}
