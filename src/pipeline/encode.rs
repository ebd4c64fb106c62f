//! Image encoding: `DynamicImage` → base64 PNG wrapped in an [`ImageAsset`].
//!
//! Embedded PDF images arrive in whatever format the document stored them
//! (JPEG, JBIG2, raw bitmaps). Everything is re-encoded to PNG so the
//! Markdown data URIs and the stored `.png` objects agree on one format.

use crate::model::{ImageAsset, ImageEncoding};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode an image as PNG bytes.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

/// Build the asset for the `index`-th image (1-indexed) on page `page_num`
/// (1-indexed), named `image_{page}_{index}.png`.
pub fn encode_image_asset(
    img: &DynamicImage,
    page_num: usize,
    index: usize,
) -> Result<ImageAsset, image::ImageError> {
    let png = encode_png(img)?;
    let b64 = STANDARD.encode(&png);
    let filename = format!("image_{}_{}.png", page_num, index);
    debug!("Encoded {} → {} bytes base64", filename, b64.len());

    Ok(ImageAsset {
        filename,
        content: b64.into_bytes(),
        encoding: ImageEncoding::Base64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encode_small_image() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])));
        let asset = encode_image_asset(&img, 2, 3).expect("encode should succeed");
        assert_eq!(asset.filename, "image_2_3.png");
        assert_eq!(asset.encoding, ImageEncoding::Base64);

        let decoded = asset.decoded().expect("valid base64");
        assert_eq!(&decoded[..4], b"\x89PNG");
    }
}
