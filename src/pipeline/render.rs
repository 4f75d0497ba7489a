//! PDF rasterisation: render pages to [`PageRaster`]s via pdfium.
//!
//! pdfium keeps thread-local state and is not async-safe, so every entry
//! point here is blocking; async callers run it inside
//! `tokio::task::spawn_blocking`. Pages are rendered one at a time on demand
//! through [`PdfRenderer::render_page`], so only one full-resolution raster
//! is resident while the caller tiles it.

use crate::error::Pdf2TilesError;
use crate::output::DocumentMetadata;
use crate::pipeline::raster::PageRaster;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// PDF user space is 72 points per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// Bind to a pdfium library.
///
/// Search order: `PDFIUM_LIB_PATH`, the current directory, then the system
/// library path.
pub fn bind_pdfium() -> Result<Pdfium, Pdf2TilesError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(path) if !path.is_empty() => Pdfium::bind_to_library(&path),
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| Pdf2TilesError::PdfiumBindingFailed(format!("{e:?}")))?;
    Ok(Pdfium::new(bindings))
}

/// Open `pdf_path`, mapping pdfium load failures onto library errors.
pub fn open_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, Pdf2TilesError> {
    pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                Pdf2TilesError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                Pdf2TilesError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            Pdf2TilesError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}

/// Renders pages of one open document at a fixed DPI.
pub struct PdfRenderer<'a> {
    document: PdfDocument<'a>,
    render_config: PdfRenderConfig,
    dpi: u32,
}

impl<'a> PdfRenderer<'a> {
    /// Open `pdf_path` for rendering at `dpi`.
    pub fn open(
        pdfium: &'a Pdfium,
        pdf_path: &Path,
        password: Option<&'a str>,
        dpi: u32,
    ) -> Result<Self, Pdf2TilesError> {
        let document = open_document(pdfium, pdf_path, password)?;
        info!("PDF loaded: {} pages", document.pages().len());

        let render_config = PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / POINTS_PER_INCH);
        Ok(Self {
            document,
            render_config,
            dpi,
        })
    }

    pub fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    /// Render the page at 0-indexed `idx` and flatten it to RGB.
    pub fn render_page(&self, idx: usize) -> Result<PageRaster, Pdf2TilesError> {
        let total = self.page_count();
        if idx >= total {
            return Err(Pdf2TilesError::PageOutOfRange {
                page: idx + 1,
                total,
            });
        }

        let page = self.document.pages().get(idx as u16).map_err(|e| {
            Pdf2TilesError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            }
        })?;

        let bitmap = page.render_with_config(&self.render_config).map_err(|e| {
            Pdf2TilesError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} at {} DPI → {}x{} px",
            idx + 1,
            self.dpi,
            image.width(),
            image.height()
        );

        PageRaster::from_dynamic(idx + 1, image)
    }
}

/// Extract document metadata from a PDF without rendering pages.
pub fn extract_metadata(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentMetadata, Pdf2TilesError> {
    let pdfium = bind_pdfium()?;
    let document = open_document(&pdfium, pdf_path, password)?;

    let metadata = document.metadata();
    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    Ok(DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        page_count: document.pages().len() as usize,
        pdf_version: format!("{:?}", document.version()),
    })
}
