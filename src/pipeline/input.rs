//! Input resolution: read a user-supplied path or URL into memory and work
//! out what kind of image it is.
//!
//! Slide images are small (a few MB at most), so everything is kept in
//! memory; nothing is written to disk. The media type is sniffed from the
//! magic bytes first because file names lie (screenshots saved as `.png`
//! that are really JPEG are common), then from the extension.

use crate::error::Img2PptxError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// An image read into memory.
#[derive(Debug, Clone)]
pub struct SourceImage {
    /// Path or URL the bytes came from, for messages.
    pub name: String,
    pub bytes: Vec<u8>,
    /// `image/png`, `image/jpeg`, `image/gif` or `image/webp`.
    pub media_type: &'static str,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to an in-memory image.
///
/// If the input is a URL, download it; otherwise read the local file.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<SourceImage, Img2PptxError> {
    if input.trim().is_empty() {
        return Err(Img2PptxError::InvalidInput {
            input: input.to_string(),
        });
    }
    let bytes = if is_url(input) {
        download_url(input, timeout_secs).await?
    } else {
        read_local(input).await?
    };
    from_bytes(input, bytes)
}

/// Wrap bytes that are already in memory. `name` is used for the extension
/// fallback and for messages.
pub fn from_bytes(name: &str, bytes: Vec<u8>) -> Result<SourceImage, Img2PptxError> {
    let media_type = sniff_media_type(&bytes)
        .or_else(|| media_type_from_extension(name))
        .ok_or_else(|| {
            let mut magic = [0u8; 4];
            let n = bytes.len().min(4);
            magic[..n].copy_from_slice(&bytes[..n]);
            Img2PptxError::NotAnImage {
                source_name: name.to_string(),
                magic,
            }
        })?;

    debug!("{}: {} bytes, {}", name, bytes.len(), media_type);
    Ok(SourceImage {
        name: name.to_string(),
        bytes,
        media_type,
    })
}

/// Identify PNG, JPEG, GIF and WEBP from their signatures.
pub fn sniff_media_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

/// Media type implied by a file name's extension (URL query strings are ignored).
pub fn media_type_from_extension(name: &str) -> Option<&'static str> {
    let name = name.split(['?', '#']).next().unwrap_or(name);
    let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Read a local file, mapping I/O failures onto actionable errors.
async fn read_local(path_str: &str) -> Result<Vec<u8>, Img2PptxError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(Img2PptxError::FileNotFound { path });
    }
    if path.is_dir() {
        return Err(Img2PptxError::InvalidInput {
            input: path_str.to_string(),
        });
    }

    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            debug!("Read local image: {}", path.display());
            Ok(bytes)
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(Img2PptxError::PermissionDenied { path })
        }
        Err(_) => Err(Img2PptxError::FileNotFound { path }),
    }
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<Vec<u8>, Img2PptxError> {
    info!("Downloading image from: {}", url);

    if reqwest::Url::parse(url).is_err() {
        return Err(Img2PptxError::InvalidInput {
            input: url.to_string(),
        });
    }

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Img2PptxError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let map_err = |e: reqwest::Error| {
        if e.is_timeout() {
            Img2PptxError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            Img2PptxError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(url).send().await.map_err(map_err)?;

    if !response.status().is_success() {
        return Err(Img2PptxError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response.bytes().await.map_err(map_err)?;
    info!("Downloaded {} bytes", bytes.len());
    Ok(bytes.to_vec())
}
