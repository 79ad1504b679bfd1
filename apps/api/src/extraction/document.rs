//! Uploaded-file handling: type classification, text decoding, and the
//! filename heuristics used when a file's content cannot be read.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Kind of source a record was created from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Text,
    Pdf,
    Image,
    Manual,
    Unknown,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Text => "text",
            FileType::Pdf => "pdf",
            FileType::Image => "image",
            FileType::Manual => "manual",
            FileType::Unknown => "unknown",
        }
    }

    /// Parses a stored value; anything unrecognised reads back as `Unknown`.
    pub fn parse(raw: &str) -> FileType {
        match raw {
            "text" => FileType::Text,
            "pdf" => FileType::Pdf,
            "image" => FileType::Image,
            "manual" => FileType::Manual,
            _ => FileType::Unknown,
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw bytes plus the declared MIME type and filename of an upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn file_type(&self) -> FileType {
        classify(&self.content_type, &self.file_name)
    }
}

const TEXT_EXTENSIONS: &[&str] = &["txt", "csv", "tsv", "json", "md", "xml"];

/// MIME type first, file extension as a tie-breaker for generic MIME types.
pub fn classify(content_type: &str, file_name: &str) -> FileType {
    let mime = content_type.to_ascii_lowercase();
    if mime.contains("image") {
        return FileType::Image;
    }
    if mime.contains("pdf") {
        return FileType::Pdf;
    }
    if mime.starts_with("text/") || mime.contains("json") || mime.contains("csv") {
        return FileType::Text;
    }

    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => FileType::Pdf,
        "png" | "jpg" | "jpeg" | "gif" | "webp" | "heic" => FileType::Image,
        ext if TEXT_EXTENSIONS.contains(&ext) => FileType::Text,
        _ => FileType::Unknown,
    }
}

/// Returns readable text for the upload, or `None` when the content cannot be
/// decoded without OCR. PDF text layers are extracted on a blocking thread.
pub async fn decode_text(file: &UploadedFile) -> Option<String> {
    let text = match file.file_type() {
        FileType::Text => String::from_utf8_lossy(&file.bytes).into_owned(),
        FileType::Pdf => {
            let bytes = file.bytes.clone();
            let extracted =
                tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
                    .await;
            match extracted {
                Ok(Ok(text)) => text,
                Ok(Err(e)) => {
                    debug!("PDF text extraction failed for {}: {e:?}", file.file_name);
                    return None;
                }
                Err(e) => {
                    warn!("PDF text extraction aborted for {}: {e}", file.file_name);
                    return None;
                }
            }
        }
        FileType::Image | FileType::Manual | FileType::Unknown => return None,
    };

    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Assumed reading inferred from the filename alone.
pub fn filename_hint(file_name: &str) -> Option<&'static str> {
    let name = file_name.to_lowercase();
    if ["electric", "power", "utility"].iter().any(|k| name.contains(k)) {
        Some("Electricity bill: 150 kWh usage")
    } else if ["gas", "fuel", "petrol"].iter().any(|k| name.contains(k)) {
        Some("Gasoline purchase: 10 gallons")
    } else {
        None
    }
}
