use std::fs;
use std::path::Path;

use rand::Rng;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::ui::format::format_file_size;

/// A local file picked for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct FileUpload {
    pub name: String,
    pub size: u64,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let content_type = UploadService::detect_content_type(&bytes, &name);
        Self { size: bytes.len() as u64, name, content_type, bytes }
    }

    /// Reads a file from disk, typing it from its magic bytes.
    pub fn from_path(path: &Path) -> AppResult<Self> {
        let bytes = fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| AppError::Validation(format!("'{}' is not a file", path.display())))?;
        Ok(Self::new(name, bytes))
    }

    /// Text after the last dot, or the whole name when there is none.
    pub fn extension(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

/// Service for upload validation and storage naming
pub struct UploadService;

impl UploadService {
    /// Every reason the file cannot be uploaded; empty when it is acceptable.
    pub fn validate_file(file: Option<&FileUpload>, config: &Config) -> Vec<String> {
        let Some(file) = file else {
            return vec!["No file selected".to_string()];
        };
        let mut errors = Vec::new();
        if file.size > config.max_file_size {
            errors.push(format!("File size must be less than {}", format_file_size(config.max_file_size)));
        }
        if !config.allowed_file_types.iter().any(|t| *t == file.content_type) {
            errors.push("Only image files are allowed".to_string());
        }
        errors
    }

    /// Detect content type from magic bytes, falling back to the file extension
    pub fn detect_content_type(data: &[u8], name: &str) -> String {
        // PNG
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return "image/png".to_string();
        }
        // JPEG
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return "image/jpeg".to_string();
        }
        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return "image/gif".to_string();
        }
        // RIFF....WEBP
        if data.len() >= 12 && data[0..4] == [0x52, 0x49, 0x46, 0x46] && data[8..12] == [0x57, 0x45, 0x42, 0x50] {
            return "image/webp".to_string();
        }

        let ext = name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
        match ext.as_deref() {
            Some("png") => "image/png",
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("gif") => "image/gif",
            Some("webp") => "image/webp",
            Some("txt") => "text/plain",
            Some("pdf") => "application/pdf",
            _ => "application/octet-stream",
        }
        .to_string()
    }

    /// `<millis>-<random base36>.<ext>`
    pub fn generate_file_name<R: Rng>(extension: &str, now_millis: i64, rng: &mut R) -> String {
        const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
        let suffix: String = (0..11)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        format!("{}-{}.{}", now_millis, suffix, extension)
    }

    pub fn storage_path(config: &Config, file_name: &str) -> String {
        format!("{}/{}", config.upload_prefix.trim_end_matches('/'), file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const PNG: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn missing_file_is_rejected() {
        assert_eq!(UploadService::validate_file(None, &Config::default()), vec!["No file selected"]);
    }

    #[test]
    fn accepts_small_png() {
        let file = FileUpload::new("cat.png", PNG.to_vec());
        assert!(UploadService::validate_file(Some(&file), &Config::default()).is_empty());
    }

    #[test]
    fn reports_size_and_type_together() {
        let config = Config { max_file_size: 4, ..Config::default() };
        let file = FileUpload::new("notes.txt", b"hello world".to_vec());
        assert_eq!(
            UploadService::validate_file(Some(&file), &config),
            vec!["File size must be less than 4 Bytes", "Only image files are allowed"]
        );
    }

    #[test]
    fn default_limit_message_reads_5_mb() {
        let file = FileUpload::new("big.png", PNG.to_vec());
        let big = FileUpload { size: 6 * 1024 * 1024, ..file };
        assert_eq!(
            UploadService::validate_file(Some(&big), &Config::default()),
            vec!["File size must be less than 5 MB"]
        );
    }

    #[test]
    fn magic_bytes_win_over_extension() {
        assert_eq!(UploadService::detect_content_type(&PNG, "photo.jpg"), "image/png");
        assert_eq!(UploadService::detect_content_type(b"RIFF\0\0\0\0WEBPVP8 ", "x"), "image/webp");
        assert_eq!(UploadService::detect_content_type(b"??", "x.JPEG"), "image/jpeg");
        assert_eq!(UploadService::detect_content_type(b"??", "noext"), "application/octet-stream");
    }

    #[test]
    fn file_names_are_timestamped_and_distinct() {
        let mut rng = StdRng::seed_from_u64(7);
        let a = UploadService::generate_file_name("png", 1_700_000_000_000, &mut rng);
        let b = UploadService::generate_file_name("png", 1_700_000_000_000, &mut rng);
        assert!(a.starts_with("1700000000000-"));
        assert!(a.ends_with(".png"));
        assert_eq!(a.len(), "1700000000000-".len() + 11 + ".png".len());
        assert_ne!(a, b);
    }

    #[test]
    fn extension_falls_back_to_name() {
        assert_eq!(FileUpload::new("a.tar.gz", vec![]).extension(), "gz");
        assert_eq!(FileUpload::new("README", vec![]).extension(), "README");
    }

    #[test]
    fn storage_path_uses_prefix() {
        assert_eq!(UploadService::storage_path(&Config::default(), "f.png"), "uploads/f.png");
    }
}
