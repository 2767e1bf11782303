//! Evidence upload validation and storage.
//!
//! Uploaded evidence is checked before anything touches the disk: size,
//! extension allowlist, and the real content type sniffed from the leading
//! bytes. Accepted files are stored under a random name so the client's
//! filename never reaches the filesystem.

use std::borrow::Cow;
use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

/// Maximum accepted evidence size (5 MiB).
pub const MAX_EVIDENCE_BYTES: usize = 5 * 1024 * 1024;

/// Number of leading bytes inspected when sniffing the content type.
pub const SNIFF_LEN: usize = 2048;

/// Directory (relative to the media root) holding stored evidence.
pub const EVIDENCE_DIR: &str = "evidencias";

/// Extensions accepted for evidence files, lower-case.
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "txt"];

const MIME_JPEG: &str = "image/jpeg";
const MIME_PNG: &str = "image/png";
const MIME_TEXT: &str = "text/plain";
const MIME_BINARY: &str = "application/octet-stream";

/// Reasons an evidence file is refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EvidenceError {
    #[error("The submitted file is empty")]
    Empty,
    #[error("File too large ({size} bytes); the limit is 5 MB")]
    TooLarge { size: usize },
    #[error("File extension '{extension}' is not allowed; use .jpg, .jpeg, .png or .txt")]
    ExtensionNotAllowed { extension: String },
    #[error("File type not allowed: {mime_type}. Use an image (JPEG/PNG) or TXT")]
    ContentNotAllowed { mime_type: String },
    #[error("File content ({mime_type}) does not match the '.{extension}' extension")]
    ContentMismatch {
        extension: String,
        mime_type: String,
    },
}

/// An evidence file that passed validation and is ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedEvidence {
    /// Lower-cased original extension
    pub extension: String,
    /// Sniffed content type
    pub mime_type: &'static str,
    /// Path relative to the media root: `evidencias/<uuid>.<ext>`
    pub relative_path: String,
    pub size: usize,
}

/// Validate an uploaded evidence file.
///
/// Checks run in order: empty, size, extension, sniffed content type, and
/// agreement between the content type and the extension.
pub fn validate_evidence(filename: &str, bytes: &[u8]) -> Result<AcceptedEvidence, EvidenceError> {
    if bytes.is_empty() {
        return Err(EvidenceError::Empty);
    }

    if bytes.len() > MAX_EVIDENCE_BYTES {
        return Err(EvidenceError::TooLarge { size: bytes.len() });
    }

    let extension = extension_of(filename);
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(EvidenceError::ExtensionNotAllowed { extension });
    }

    let mime_type = sniff_mime_type(bytes);
    if !matches!(mime_type, MIME_JPEG | MIME_PNG | MIME_TEXT) {
        return Err(EvidenceError::ContentNotAllowed {
            mime_type: mime_type.to_string(),
        });
    }

    let expected = match extension.as_str() {
        "jpg" | "jpeg" => MIME_JPEG,
        "png" => MIME_PNG,
        _ => MIME_TEXT,
    };
    if mime_type != expected {
        return Err(EvidenceError::ContentMismatch {
            extension,
            mime_type: mime_type.to_string(),
        });
    }

    let relative_path = format!("{}/{}.{}", EVIDENCE_DIR, Uuid::new_v4(), extension);

    Ok(AcceptedEvidence {
        extension,
        mime_type,
        relative_path,
        size: bytes.len(),
    })
}

/// Lower-cased extension after the last dot, or an empty string.
fn extension_of(filename: &str) -> String {
    // Browsers may send a full client path; only the final component matters.
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);

    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
        _ => String::new(),
    }
}

/// Determine the content type of `bytes` from their leading bytes only.
pub fn sniff_mime_type(bytes: &[u8]) -> &'static str {
    let head = &bytes[..bytes.len().min(SNIFF_LEN)];

    if let Some(kind) = infer::get(head) {
        return kind.mime_type();
    }

    classify_text(head)
}

/// Decode the sniffed head as text: UTF-16 with a byte order mark, UTF-8,
/// or 8-bit single-byte text (Latin-1 / Windows-1252) without NUL bytes.
fn decode_text(head: &[u8]) -> Option<Cow<'_, str>> {
    if let Some(rest) = head.strip_prefix(&[0xFF, 0xFE]) {
        return Some(decode_utf16(rest, u16::from_le_bytes));
    }
    if let Some(rest) = head.strip_prefix(&[0xFE, 0xFF]) {
        return Some(decode_utf16(rest, u16::from_be_bytes));
    }

    match std::str::from_utf8(head) {
        Ok(text) => Some(Cow::Borrowed(text)),
        // A multi-byte character cut at the sniff boundary is still text.
        Err(err) if err.error_len().is_none() => std::str::from_utf8(&head[..err.valid_up_to()])
            .ok()
            .map(Cow::Borrowed),
        Err(_) if head.contains(&0) => None,
        // 0x80..=0x9F are printable in Windows-1252 but C1 controls in Latin-1.
        Err(_) => Some(Cow::Owned(
            head.iter()
                .map(|&b| match b {
                    0x80..=0x9F => char::REPLACEMENT_CHARACTER,
                    _ => char::from(b),
                })
                .collect(),
        )),
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Cow<'static, str> {
    let units = bytes.chunks_exact(2).map(|pair| unit([pair[0], pair[1]]));
    Cow::Owned(
        char::decode_utf16(units)
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect(),
    )
}

fn classify_text(head: &[u8]) -> &'static str {
    let Some(text) = decode_text(head) else {
        return MIME_BINARY;
    };

    // ESC is allowed for logs carrying ANSI colour codes.
    let has_control = text.chars().any(|c| {
        c.is_control() && !matches!(c, '\n' | '\r' | '\t' | '\u{000C}' | '\u{001B}')
    });
    if has_control {
        return MIME_BINARY;
    }

    let trimmed = text.trim_start_matches('\u{feff}').trim_start();
    if trimmed.starts_with("#!") {
        return "text/x-shellscript";
    }

    let lowered: String = trimmed.chars().take(64).collect::<String>().to_ascii_lowercase();
    if lowered.starts_with("<?xml") {
        return "text/xml";
    }
    if lowered.starts_with("<!doctype html")
        || lowered.starts_with("<html")
        || lowered.starts_with("<script")
        || lowered.starts_with("<head")
        || lowered.starts_with("<body")
    {
        return "text/html";
    }

    MIME_TEXT
}

/// Filesystem store for accepted evidence, rooted at the media directory.
#[derive(Debug, Clone)]
pub struct EvidenceStore {
    root: PathBuf,
}

impl EvidenceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Absolute location of a stored relative path.
    pub fn resolve(&self, relative_path: &str) -> PathBuf {
        self.root.join(relative_path)
    }

    /// Write accepted evidence, returning its path relative to the media root.
    pub async fn save(
        &self,
        evidence: &AcceptedEvidence,
        bytes: &[u8],
    ) -> std::io::Result<String> {
        let target = self.resolve(&evidence.relative_path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;

        tracing::debug!(
            path = %evidence.relative_path,
            size = evidence.size,
            mime_type = evidence.mime_type,
            "Stored evidence file"
        );

        Ok(evidence.relative_path.clone())
    }

    /// Remove a stored file; a file that is already gone is not an error.
    pub async fn remove(&self, relative_path: &str) -> std::io::Result<()> {
        match tokio::fs::remove_file(self.resolve(relative_path)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    const JPEG_HEADER: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];
    const ELF_HEADER: &[u8] = &[0x7F, b'E', b'L', b'F', 0x02, 0x01, 0x01, 0x00];

    fn padded(header: &[u8], total: usize) -> Vec<u8> {
        let mut bytes = header.to_vec();
        bytes.resize(total, 0);
        bytes
    }

    #[test]
    fn accepts_small_jpeg() {
        let bytes = padded(JPEG_HEADER, 200 * 1024);
        let accepted = validate_evidence("backup.jpg", &bytes).unwrap();

        assert_eq!(accepted.mime_type, "image/jpeg");
        assert_eq!(accepted.extension, "jpg");
        assert!(accepted.relative_path.starts_with("evidencias/"));
        assert!(accepted.relative_path.ends_with(".jpg"));
        assert!(!accepted.relative_path.contains("backup"));
    }

    #[test]
    fn accepts_upper_case_extension() {
        let bytes = padded(PNG_HEADER, 1024);
        let accepted = validate_evidence("SCREEN.PNG", &bytes).unwrap();

        assert_eq!(accepted.extension, "png");
        assert!(accepted.relative_path.ends_with(".png"));
    }

    #[test]
    fn accepts_plain_text_log() {
        let log = "2025-01-10 02:00 backup finished\nfiles: 1200\terrors: 0\n";
        let accepted = validate_evidence("job.txt", log.as_bytes()).unwrap();
        assert_eq!(accepted.mime_type, "text/plain");
    }

    #[test]
    fn rejects_oversized_file_before_sniffing() {
        let bytes = padded(PNG_HEADER, 10 * 1024 * 1024);
        let err = validate_evidence("big.png", &bytes).unwrap_err();

        assert_eq!(err, EvidenceError::TooLarge { size: bytes.len() });
        assert!(err.to_string().contains("5 MB"));
    }

    #[test]
    fn accepts_file_at_exact_limit() {
        let bytes = padded(PNG_HEADER, MAX_EVIDENCE_BYTES);
        assert!(validate_evidence("limit.png", &bytes).is_ok());
    }

    #[test]
    fn rejects_renamed_executable() {
        let bytes = padded(ELF_HEADER, 4096);
        let err = validate_evidence("photo.png", &bytes).unwrap_err();

        match err {
            EvidenceError::ContentNotAllowed { mime_type } => {
                assert_ne!(mime_type, "image/png");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_shell_script_named_txt() {
        let script = b"#!/bin/sh\nrm -rf /tmp/backups\n";
        let err = validate_evidence("notes.txt", script).unwrap_err();

        assert!(matches!(err, EvidenceError::ContentNotAllowed { .. }));
        assert!(err.to_string().contains("shellscript"));
    }

    #[test]
    fn rejects_html_named_txt() {
        let page = b"<!DOCTYPE html><html><body>hi</body></html>";
        let err = validate_evidence("page.txt", page).unwrap_err();
        assert!(matches!(err, EvidenceError::ContentNotAllowed { .. }));
    }

    #[test]
    fn rejects_disallowed_and_missing_extensions() {
        let bytes = padded(PNG_HEADER, 64);

        assert_eq!(
            validate_evidence("report.pdf", &bytes).unwrap_err(),
            EvidenceError::ExtensionNotAllowed {
                extension: "pdf".to_string()
            }
        );
        assert!(matches!(
            validate_evidence("README", &bytes).unwrap_err(),
            EvidenceError::ExtensionNotAllowed { .. }
        ));
        assert!(matches!(
            validate_evidence(".png", &bytes).unwrap_err(),
            EvidenceError::ExtensionNotAllowed { .. }
        ));
    }

    #[test]
    fn rejects_png_named_jpg() {
        let bytes = padded(PNG_HEADER, 512);
        let err = validate_evidence("screenshot.jpg", &bytes).unwrap_err();

        assert_eq!(
            err,
            EvidenceError::ContentMismatch {
                extension: "jpg".to_string(),
                mime_type: "image/png".to_string(),
            }
        );
    }

    #[test]
    fn rejects_text_named_png() {
        let err = validate_evidence("fake.png", b"just some words").unwrap_err();
        assert!(matches!(err, EvidenceError::ContentMismatch { .. }));
    }

    #[test]
    fn rejects_empty_file() {
        assert_eq!(
            validate_evidence("empty.txt", b"").unwrap_err(),
            EvidenceError::Empty
        );
    }

    #[test]
    fn binary_garbage_is_octet_stream() {
        assert_eq!(sniff_mime_type(&[0x00, 0x01, 0x02, 0xFE]), MIME_BINARY);
    }

    #[test]
    fn utf8_split_at_sniff_boundary_is_text() {
        let mut text = "a".repeat(SNIFF_LEN - 1);
        text.push('é');
        text.push_str(" tail");
        assert_eq!(sniff_mime_type(text.as_bytes()), MIME_TEXT);
    }

    #[test]
    fn latin1_log_is_text() {
        let log = b"Backup conclu\xedo com sucesso\nVerifica\xe7\xe3o OK\n";
        let accepted = validate_evidence("log.txt", log).unwrap();
        assert_eq!(accepted.mime_type, MIME_TEXT);
    }

    #[test]
    fn windows_1252_punctuation_is_text() {
        // 0x93/0x94 are curly quotes and 0x80 the euro sign.
        let log = b"Job \x93Servidor\x94 custo \x80 12\r\n";
        assert_eq!(sniff_mime_type(log), MIME_TEXT);
    }

    #[test]
    fn utf16_with_bom_is_text() {
        let mut le = vec![0xFF, 0xFE];
        le.extend("Backup OK\r\n".encode_utf16().flat_map(u16::to_le_bytes));
        assert_eq!(validate_evidence("log.txt", &le).unwrap().mime_type, MIME_TEXT);

        let mut be = vec![0xFE, 0xFF];
        be.extend("Verificação OK\n".encode_utf16().flat_map(u16::to_be_bytes));
        assert_eq!(sniff_mime_type(&be), MIME_TEXT);
    }

    #[test]
    fn ansi_coloured_log_is_text() {
        let log = b"\x1b[32mJob finished: Success\x1b[0m\n";
        assert_eq!(validate_evidence("job.txt", log).unwrap().mime_type, MIME_TEXT);
    }

    #[test]
    fn eight_bit_data_with_nul_is_binary() {
        assert_eq!(sniff_mime_type(b"conclu\xedo\x00\x00"), MIME_BINARY);
    }

    #[test]
    fn latin1_and_utf16_markup_is_still_rejected() {
        assert_eq!(sniff_mime_type(b"#!/bin/sh\necho conclu\xedo\n"), "text/x-shellscript");

        let mut html = vec![0xFF, 0xFE];
        html.extend("<html><body>x</body></html>".encode_utf16().flat_map(u16::to_le_bytes));
        assert_eq!(sniff_mime_type(&html), "text/html");
    }

    #[test]
    fn client_paths_are_ignored() {
        assert_eq!(extension_of(r"C:\Users\ops\Desktop\log.TXT"), "txt");
        assert_eq!(extension_of("../../etc/passwd"), "");
    }

    #[tokio::test]
    async fn store_writes_and_removes_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = EvidenceStore::new(dir.path());
        let bytes = b"backup ok\n";
        let accepted = validate_evidence("ok.txt", bytes).unwrap();

        let relative = store.save(&accepted, bytes).await.unwrap();
        let on_disk = tokio::fs::read(store.resolve(&relative)).await.unwrap();
        assert_eq!(on_disk, bytes);

        store.remove(&relative).await.unwrap();
        assert!(!store.resolve(&relative).exists());
        // Removing twice is fine.
        store.remove(&relative).await.unwrap();
    }
}
