//! Images picked by the user for a new pin.
//!
//! This covers checking that an upload really is an image, previewing it, and
//! squeezing it under the upload ceiling before it's sent to the blob store.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage, ImageReader};

use crate::error::ImageError;

/// JPEG qualities tried, in order, before we start shrinking the image.
const QUALITY_STEPS: [u8; 5] = [90, 80, 70, 55, 40];

/// How much each downscale pass shrinks the image by.
const DOWNSCALE_FACTOR: f64 = 0.75;

/// Give up after this many downscale passes.
const MAX_DOWNSCALES: usize = 8;

/// A file the user picked, as it arrived.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageUpload {
    /// The file's name on the user's machine.
    pub file_name: String,

    /// The media type the file claimed to be (e.g. `image/png`).
    pub media_type: String,

    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(
        file_name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// The media type we'll trust for this file.
    ///
    /// Uses the declared type unless it's missing or generic, in which case
    /// the content is sniffed with `infer`.
    pub fn effective_media_type(&self) -> String {
        let declared = self.media_type.trim();
        if !declared.is_empty() && declared != "application/octet-stream" {
            return declared.to_lowercase();
        }

        infer::get(&self.bytes)
            .map(|kind| kind.mime_type().to_string())
            .unwrap_or_else(|| String::from("application/octet-stream"))
    }

    /// Whether this file classifies as an image.
    pub fn is_image(&self) -> bool {
        self.effective_media_type().starts_with("image/")
    }

    /// A `data:` url for previewing the file without uploading it.
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.effective_media_type(),
            STANDARD.encode(&self.bytes)
        )
    }

    /// The image's width and height, if its header can be read.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        ImageReader::new(Cursor::new(&self.bytes))
            .with_guessed_format()
            .ok()?
            .into_dimensions()
            .inspect_err(|e| tracing::debug!("Couldn't read image dimensions. err: {e}"))
            .ok()
    }
}

/// An image that's ready for the blob store.
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedImage {
    pub media_type: String,
    pub bytes: Vec<u8>,
}

/// Shrinks `upload` until it fits in `max_bytes`.
///
/// Uploads that already fit are passed through untouched. Otherwise, the
/// image is re-encoded as JPEG at decreasing quality, then downscaled until
/// some attempt fits.
#[tracing::instrument(skip(upload), fields(file = %upload.file_name, len = upload.bytes.len()))]
pub async fn compress(upload: &ImageUpload, max_bytes: usize) -> Result<PreparedImage, ImageError> {
    if upload.bytes.len() <= max_bytes {
        tracing::debug!("Image already fits under the ceiling. No compression needed.");
        return Ok(PreparedImage {
            media_type: upload.effective_media_type(),
            bytes: upload.bytes.clone(),
        });
    }

    let bytes = upload.bytes.clone();
    let compressed =
        tokio::task::spawn_blocking(move || compress_blocking(&bytes, max_bytes)).await??;

    tracing::debug!(
        "Compressed image from {} to {} bytes.",
        upload.bytes.len(),
        compressed.len()
    );

    Ok(PreparedImage {
        media_type: String::from("image/jpeg"),
        bytes: compressed,
    })
}

fn compress_blocking(bytes: &[u8], max_bytes: usize) -> Result<Vec<u8>, ImageError> {
    let mut img = image::load_from_memory(bytes).map_err(ImageError::DecodeFailed)?;
    let mut smallest = usize::MAX;

    for pass in 0..=MAX_DOWNSCALES {
        if pass > 0 {
            img = downscale(&img);
        }

        for quality in QUALITY_STEPS {
            let encoded = encode_jpeg(&img, quality)?;
            if encoded.len() <= max_bytes {
                return Ok(encoded);
            }
            smallest = smallest.min(encoded.len());
        }
    }

    Err(ImageError::TooLarge {
        max_bytes,
        smallest,
    })
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, ImageError> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality)
        .encode_image(&img.to_rgb8())
        .map_err(ImageError::EncodeFailed)?;
    Ok(buf)
}

fn downscale(img: &DynamicImage) -> DynamicImage {
    let width = ((img.width() as f64) * DOWNSCALE_FACTOR).max(1.0) as u32;
    let height = ((img.height() as f64) * DOWNSCALE_FACTOR).max(1.0) as u32;
    img.resize(width, height, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{ImageFormat, RgbImage};

    use crate::error::ImageError;

    use super::{compress, ImageUpload};

    /// A noisy PNG, which doesn't compress well.
    fn noisy_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            let v = (x.wrapping_mul(7919) ^ y.wrapping_mul(104_729)) as u8;
            image::Rgb([v, v.wrapping_mul(3), v.wrapping_add(91)])
        });

        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn plain_text_isnt_an_image() {
        let upload = ImageUpload::new("notes.txt", "text/plain", b"hello there".to_vec());
        assert!(!upload.is_image());
    }

    #[test]
    fn sniffs_when_media_type_is_missing() {
        let upload = ImageUpload::new("mystery", "", noisy_png(4, 4));
        assert_eq!(upload.effective_media_type(), "image/png");
        assert!(upload.is_image());
        assert_eq!(upload.dimensions(), Some((4, 4)));
    }

    #[test]
    fn data_url_has_media_type_prefix() {
        let upload = ImageUpload::new("a.png", "image/png", vec![1, 2, 3]);
        assert_eq!(upload.data_url(), "data:image/png;base64,AQID");
    }

    #[tokio::test]
    async fn small_images_pass_through() {
        let bytes = noisy_png(8, 8);
        let upload = ImageUpload::new("small.png", "image/png", bytes.clone());

        let prepared = compress(&upload, 1024 * 1024).await.unwrap();
        assert_eq!(prepared.bytes, bytes);
        assert_eq!(prepared.media_type, "image/png");
    }

    #[tokio::test]
    async fn large_images_get_squeezed() {
        let bytes = noisy_png(512, 512);
        let ceiling = bytes.len() / 4;
        let upload = ImageUpload::new("big.png", "image/png", bytes);

        let prepared = compress(&upload, ceiling).await.unwrap();
        assert!(prepared.bytes.len() <= ceiling);
        assert_eq!(prepared.media_type, "image/jpeg");
        image::load_from_memory(&prepared.bytes).expect("still a valid image");
    }

    #[tokio::test]
    async fn impossible_ceilings_are_too_large() {
        let upload = ImageUpload::new("noise.png", "image/png", noisy_png(64, 64));

        let res = compress(&upload, 8).await;
        assert!(matches!(
            res,
            Err(ImageError::TooLarge { max_bytes: 8, smallest }) if smallest > 8
        ));
    }

    #[tokio::test]
    async fn oversized_garbage_cant_be_decoded() {
        let upload = ImageUpload::new("fake.png", "image/png", vec![0xAB; 4096]);

        let res = compress(&upload, 1024).await;
        assert!(matches!(res, Err(ImageError::DecodeFailed(_))));
    }
}
