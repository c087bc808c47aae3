//! Validation and storage of scanned slips and cash receipt images.
//!
//! Files are checked before any database work starts and stored under a
//! content-addressed key, so re-uploading the same scan reuses one object and an
//! object left behind by a failed write is harmless.

use std::path::Path;

use bytes::Bytes;
use image::ImageFormat;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{error, info};

use crate::storage::ObjectStorage;

pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "jpg", "jpeg", "png"];

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("uploaded file is empty")]
    Empty,
    #[error("file type '{0}' is not allowed; expected PDF, JPG, JPEG or PNG")]
    UnsupportedType(String),
    #[error("file is {size} bytes, which exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },
    #[error("file content does not match its .{0} extension")]
    ContentMismatch(&'static str),
    #[error("storage failure: {0}")]
    Storage(anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    DispatchSlip,
    CashReceipt,
}

impl UploadKind {
    fn prefix(self) -> &'static str {
        match self {
            UploadKind::DispatchSlip => "slips",
            UploadKind::CashReceipt => "cash-receipts",
        }
    }
}

/// A file part received with a request, before validation.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone)]
pub struct ValidatedUpload {
    file_name: String,
    bytes: Bytes,
    extension: &'static str,
}

pub fn validate(upload: Upload, limit: usize) -> Result<ValidatedUpload, UploadError> {
    if upload.bytes.is_empty() {
        return Err(UploadError::Empty);
    }
    if upload.bytes.len() > limit {
        return Err(UploadError::TooLarge {
            size: upload.bytes.len(),
            limit,
        });
    }

    let raw_extension = Path::new(&upload.file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    let extension = ALLOWED_EXTENSIONS
        .iter()
        .copied()
        .find(|allowed| *allowed == raw_extension)
        .ok_or_else(|| UploadError::UnsupportedType(raw_extension.clone()))?;

    let content_matches = match extension {
        "pdf" => upload.bytes.starts_with(b"%PDF-"),
        "png" => matches!(image::guess_format(&upload.bytes), Ok(ImageFormat::Png)),
        _ => matches!(image::guess_format(&upload.bytes), Ok(ImageFormat::Jpeg)),
    };
    if !content_matches {
        return Err(UploadError::ContentMismatch(extension));
    }

    Ok(ValidatedUpload {
        file_name: upload.file_name,
        bytes: upload.bytes,
        extension,
    })
}

impl ValidatedUpload {
    pub fn object_key(&self, kind: UploadKind) -> String {
        let checksum = hex::encode(Sha256::digest(&self.bytes));
        format!("{}/{}.{}", kind.prefix(), checksum, self.extension)
    }

    pub fn content_type(&self) -> String {
        mime_guess::from_ext(self.extension)
            .first_or_octet_stream()
            .to_string()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Writes the file to object storage and returns the key to persist.
pub async fn store(
    storage: &dyn ObjectStorage,
    kind: UploadKind,
    upload: ValidatedUpload,
) -> Result<String, UploadError> {
    let key = upload.object_key(kind);
    let content_type = upload.content_type();
    let disposition = inline_content_disposition(&upload.file_name);
    let size = upload.len();

    storage
        .put_object(&key, upload.bytes.to_vec(), Some(content_type), disposition)
        .await
        .map_err(|err| {
            error!(error = %err, key = %key, "failed to store upload");
            UploadError::Storage(err)
        })?;

    info!(key = %key, size_bytes = size, "stored upload");
    Ok(key)
}

fn inline_content_disposition(filename: &str) -> Option<String> {
    if filename.is_empty() {
        return None;
    }

    let sanitized: String = filename
        .chars()
        .map(|ch| match ch {
            '"' | '\\' => '_',
            _ => ch,
        })
        .collect();

    let encoded =
        percent_encoding::utf8_percent_encode(&sanitized, percent_encoding::NON_ALPHANUMERIC);
    Some(format!(
        "inline; filename=\"{}\"; filename*=UTF-8''{}",
        sanitized, encoded
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG_HEADER: &[u8] = b"\xFF\xD8\xFF\xE0\0\x10JFIF\0";

    fn upload(name: &str, bytes: &[u8]) -> Upload {
        Upload {
            file_name: name.to_string(),
            bytes: Bytes::copy_from_slice(bytes),
        }
    }

    #[test]
    fn accepts_allowed_types_case_insensitively() {
        assert!(validate(upload("slip.PDF", b"%PDF-1.7 body"), 1024).is_ok());
        assert!(validate(upload("slip.png", PNG_HEADER), 1024).is_ok());
        assert!(validate(upload("slip.Jpeg", JPEG_HEADER), 1024).is_ok());
        assert!(validate(upload("slip.jpg", JPEG_HEADER), 1024).is_ok());
    }

    #[test]
    fn rejects_other_extensions() {
        let err = validate(upload("slip.gif", b"GIF89a"), 1024).unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedType(ext) if ext == "gif"));

        let err = validate(upload("slip", b"%PDF-"), 1024).unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedType(ext) if ext.is_empty()));
    }

    #[test]
    fn enforces_size_ceiling() {
        let mut body = b"%PDF-".to_vec();
        body.resize(2048, b' ');
        let err = validate(upload("big.pdf", &body), 2047).unwrap_err();
        assert!(matches!(err, UploadError::TooLarge { size: 2048, limit: 2047 }));
        assert!(validate(upload("big.pdf", &body), 2048).is_ok());
    }

    #[test]
    fn rejects_empty_and_mismatched_content() {
        assert!(matches!(
            validate(upload("slip.pdf", b""), 1024).unwrap_err(),
            UploadError::Empty
        ));
        assert!(matches!(
            validate(upload("slip.png", b"%PDF-1.4"), 1024).unwrap_err(),
            UploadError::ContentMismatch("png")
        ));
    }

    #[test]
    fn object_keys_are_content_addressed() {
        let first = validate(upload("a.pdf", b"%PDF-same"), 1024).unwrap();
        let second = validate(upload("b.PDF", b"%PDF-same"), 1024).unwrap();
        assert_eq!(
            first.object_key(UploadKind::DispatchSlip),
            second.object_key(UploadKind::DispatchSlip)
        );
        assert!(first.object_key(UploadKind::CashReceipt).starts_with("cash-receipts/"));
        assert!(first.object_key(UploadKind::DispatchSlip).ends_with(".pdf"));
        assert_eq!(first.content_type(), "application/pdf");
    }

    #[test]
    fn content_disposition_escapes_quotes() {
        let value = inline_content_disposition("weigh \"slip\".pdf").unwrap();
        assert!(value.starts_with("inline; filename=\"weigh _slip_.pdf\""));
        assert!(inline_content_disposition("").is_none());
    }
}
