//! Representative-figure extraction.
//!
//! Downloads the paper PDF and saves the first embedded JPEG image that is
//! large enough to be a real figure. Anything that goes wrong here degrades
//! to "no figure": a missing image never blocks posting the summary.

use async_trait::async_trait;
use lopdf::{Dictionary, Document, Object};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::ArxivConfig;
use crate::sources::arxiv::download_pdf;
use crate::types::Result;

/// Streams smaller than this are decoration (rules, logos), not figures.
const MIN_IMAGE_BYTES: usize = 1024;

/// Finds a representative figure for a paper, if one exists.
#[async_trait]
pub trait FigureExtractor: Send + Sync {
    /// Path to a local image for `arxiv_id`, or `None` when there is nothing
    /// worth attaching. Never fails the run.
    async fn extract(&self, arxiv_id: &str) -> Option<PathBuf>;
}

/// No-op extractor for dry runs and tests.
pub struct NoFigures;

#[async_trait]
impl FigureExtractor for NoFigures {
    async fn extract(&self, _arxiv_id: &str) -> Option<PathBuf> {
        None
    }
}

/// Downloads the paper PDF and pulls the first embedded JPEG out of it.
pub struct PdfFigureExtractor {
    client: reqwest::Client,
    config: ArxivConfig,
    workdir: PathBuf,
}

impl PdfFigureExtractor {
    pub fn new(config: ArxivConfig, workdir: PathBuf) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("arxiv-trends/0.1")
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            config,
            workdir,
        }
    }
}

#[async_trait]
impl FigureExtractor for PdfFigureExtractor {
    async fn extract(&self, arxiv_id: &str) -> Option<PathBuf> {
        let pdf_path =
            match download_pdf(&self.client, &self.config, arxiv_id, &self.workdir).await {
                Ok(path) => path,
                Err(err) => {
                    warn!("Could not download PDF for {}: {}", arxiv_id, err);
                    return None;
                }
            };

        let figure_path = self.workdir.join(format!("{}_figure.jpg", arxiv_id));
        match first_jpeg_in_pdf(&pdf_path) {
            Ok(Some(bytes)) => {
                if let Err(err) = std::fs::write(&figure_path, &bytes) {
                    warn!("Could not save figure for {}: {}", arxiv_id, err);
                    return None;
                }
                info!(
                    "Saved first figure for {} ({} bytes) to {}",
                    arxiv_id,
                    bytes.len(),
                    figure_path.display()
                );
                Some(figure_path)
            }
            Ok(None) => {
                info!("No embedded figure found for {}", arxiv_id);
                None
            }
            Err(err) => {
                warn!("Could not read PDF for {}: {}", arxiv_id, err);
                None
            }
        }
    }
}

/// Walk the pages in order and return the first DCT-encoded (JPEG) image
/// XObject whose stream is at least [`MIN_IMAGE_BYTES`] long.
pub fn first_jpeg_in_pdf(pdf_path: &Path) -> Result<Option<Vec<u8>>> {
    let doc = Document::load(pdf_path)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err.to_string()))?;

    for (page_number, page_id) in doc.get_pages() {
        let Ok(page) = doc.get_dictionary(page_id) else { continue };
        let Ok(resources_obj) = page.get(b"Resources") else { continue };
        let Some(resources) = resolve_dict(&doc, resources_obj) else { continue };
        let Ok(xobjects_obj) = resources.get(b"XObject") else { continue };
        let Some(xobjects) = resolve_dict(&doc, xobjects_obj) else { continue };

        for (_name, object) in xobjects.iter() {
            let stream = match object {
                Object::Reference(id) => match doc.get_object(*id) {
                    Ok(Object::Stream(stream)) => stream,
                    _ => continue,
                },
                Object::Stream(stream) => stream,
                _ => continue,
            };

            if !is_jpeg_image(&stream.dict) {
                continue;
            }
            if stream.content.len() < MIN_IMAGE_BYTES {
                continue;
            }

            debug!("Found bitmap image on page {}", page_number);
            return Ok(Some(stream.content.clone()));
        }
    }

    Ok(None)
}

fn resolve_dict<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    match object {
        Object::Dictionary(dict) => Some(dict),
        Object::Reference(id) => match doc.get_object(*id) {
            Ok(Object::Dictionary(dict)) => Some(dict),
            _ => None,
        },
        _ => None,
    }
}

/// An image XObject whose (possibly chained) filter ends in DCTDecode is a
/// ready-to-use JPEG payload.
fn is_jpeg_image(dict: &Dictionary) -> bool {
    let is_image = matches!(dict.get(b"Subtype"), Ok(Object::Name(name)) if name == b"Image");
    if !is_image {
        return false;
    }

    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => name == b"DCTDecode",
        Ok(Object::Array(filters)) => filters
            .iter()
            .any(|f| matches!(f, Object::Name(name) if name == b"DCTDecode")),
        _ => false,
    }
}
