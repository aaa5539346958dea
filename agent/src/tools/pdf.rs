use crate::{Error, Result};
use lopdf::{Document, Object};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const NAME: &str = "parse_pdf";

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Deserialize, JsonSchema, Debug)]
pub struct ParsePdfArgs {
    /// URL to the PDF document
    pub url: String,
    /// Optional path to save the PDF locally
    #[serde(default)]
    pub save_path: Option<String>,
}

#[derive(Serialize, Default, Debug)]
pub struct PdfMetadata {
    pub title: String,
    pub author: String,
    pub subject: String,
    pub creator: String,
    pub producer: String,
    pub created: String,
}

#[derive(Serialize, Debug)]
pub struct ParsePdfOutput {
    pub url: String,
    pub text: String,
    pub pages: usize,
    pub metadata: PdfMetadata,
    pub saved_path: Option<String>,
    pub word_count: usize,
}

pub async fn run(client: &reqwest::Client, args: ParsePdfArgs) -> Result<ParsePdfOutput> {
    let response = client
        .get(&args.url)
        .timeout(DOWNLOAD_TIMEOUT)
        .send()
        .await?
        .error_for_status()?;

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_lowercase();

    if !content_type.contains("application/pdf") {
        return Err(Error::ToolError(format!(
            "URL does not point to a PDF (Content-Type: {content_type})"
        )));
    }

    let bytes = response.bytes().await?.to_vec();

    let saved_path = match &args.save_path {
        Some(path) => Some(save_copy(Path::new(path), &bytes).await?),
        None => None,
    };

    let (text, pages, metadata) = tokio::task::spawn_blocking(move || {
        let text = pdf_extract::extract_text_from_mem(&bytes)
            .map_err(|err| Error::PdfError(err.to_string()))?;

        let (pages, metadata) = match Document::load_mem(&bytes) {
            Ok(document) => (document.get_pages().len(), document_info(&document)),
            Err(_) => (0, PdfMetadata::default()),
        };

        Ok::<_, Error>((text, pages, metadata))
    })
    .await??;

    let word_count = text.split_whitespace().count();

    Ok(ParsePdfOutput {
        url: args.url,
        text,
        pages,
        metadata,
        saved_path,
        word_count,
    })
}

async fn save_copy(path: &Path, bytes: &[u8]) -> Result<String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(path, bytes).await?;

    let absolute = std::path::absolute(path).unwrap_or_else(|_| PathBuf::from(path));
    Ok(absolute.to_string_lossy().into_owned())
}

/// Pull the document information dictionary out of the trailer, tolerating
/// any missing or malformed entries.
fn document_info(document: &Document) -> PdfMetadata {
    let mut metadata = PdfMetadata::default();

    let Ok(info) = document.trailer.get(b"Info") else {
        return metadata;
    };

    let dict = match info {
        Object::Reference(id) => document
            .get_object(*id)
            .ok()
            .and_then(|object| object.as_dict().ok()),
        other => other.as_dict().ok(),
    };

    let Some(dict) = dict else {
        return metadata;
    };

    metadata.title = info_string(dict, b"Title");
    metadata.author = info_string(dict, b"Author");
    metadata.subject = info_string(dict, b"Subject");
    metadata.creator = info_string(dict, b"Creator");
    metadata.producer = info_string(dict, b"Producer");
    metadata.created = info_string(dict, b"CreationDate");

    metadata
}

fn info_string(dict: &lopdf::Dictionary, key: &[u8]) -> String {
    match dict.get(key) {
        Ok(Object::String(bytes, _)) => decode_pdf_string(bytes),
        _ => String::new(),
    }
}

/// PDF text strings are UTF-16BE when they carry a BOM, otherwise close
/// enough to latin-1 for a lossy decode.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_pdf_string_utf16() {
        let bytes = [0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69];
        assert_eq!(decode_pdf_string(&bytes), "Hi");
    }

    #[test]
    fn test_decode_pdf_string_plain() {
        assert_eq!(decode_pdf_string(b"A Paper"), "A Paper");
    }

    #[test]
    fn test_args_save_path_optional() {
        let args: ParsePdfArgs =
            serde_json::from_value(serde_json::json!({"url": "https://a/x.pdf"})).unwrap();
        assert!(args.save_path.is_none());
    }
}
