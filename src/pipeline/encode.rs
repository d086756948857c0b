//! Image encoding: source bytes → base64 `ImageData` for the VLM request.
//!
//! Images within `max_image_pixels` are sent exactly as read, in their
//! original encoding, so the model sees the same pixels the user has.
//! Larger images are downscaled and re-encoded as PNG: lossless keeps small
//! slide text crisp. `detail: "high"` asks OpenAI-style APIs for the full
//! tile budget; without it footnotes and axis labels are lost.

use super::input::SourceImage;
use crate::error::Img2PptxError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::imageops::FilterType;
use image::DynamicImage;
use std::io::Cursor;
use tracing::{debug, warn};

/// Decode the source for cropping and size checks.
///
/// A decode failure is not fatal: the VLM may still read formats or
/// variants the `image` crate cannot, so the caller just loses downscaling
/// and cropping.
pub fn decode(source: &SourceImage) -> Option<DynamicImage> {
    match image::load_from_memory(&source.bytes) {
        Ok(img) => {
            debug!("{}: decoded {}x{}", source.name, img.width(), img.height());
            Some(img)
        }
        Err(e) => {
            warn!("{}: could not decode image ({}); sending it unchanged", source.name, e);
            None
        }
    }
}

/// Build the `ImageData` attachment for `source`.
///
/// `decoded` is the result of [`decode`]; when present and larger than
/// `max_pixels` on its longest edge, the image is downscaled first.
pub fn encode_for_vlm(
    source: &SourceImage,
    decoded: Option<&DynamicImage>,
    max_pixels: u32,
) -> Result<ImageData, Img2PptxError> {
    if let Some(img) = decoded {
        if img.width().max(img.height()) > max_pixels {
            let resized = img.resize(max_pixels, max_pixels, FilterType::Lanczos3);
            debug!(
                "Downscaled {}x{} → {}x{}",
                img.width(),
                img.height(),
                resized.width(),
                resized.height()
            );
            return encode_png(&resized).map_err(|e| Img2PptxError::ImageDecodeFailed {
                source_name: source.name.clone(),
                detail: format!("PNG re-encoding failed: {e}"),
            });
        }
    }

    let b64 = STANDARD.encode(&source.bytes);
    debug!("Encoded image → {} bytes base64", b64.len());
    Ok(ImageData::new(b64, source.media_type).with_detail("high"))
}

/// Encode an image as a base64 PNG.
pub fn encode_png(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded image → {} bytes base64", b64.len());

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}
