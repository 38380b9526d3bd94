//! "Random pin" generation.
//!
//! Boards don't care how a random pin comes to be: a generator gets the
//! gateway and creates whatever it likes through it. The board only sees the
//! result on its next refresh.

use std::{future::Future, io::Cursor, sync::Mutex};

use image::{ImageFormat, Rgb, RgbImage};
use rand::{rngs::StdRng, seq::SliceRandom as _, Rng as _, SeedableRng as _};

use crate::{
    config::Config,
    database::DocumentStore,
    error::{GatewayError, ImageError},
    gateway::Gateway,
    models::{
        image::ImageUpload,
        pin::{PinDraft, PinSize},
    },
    storage::BlobStore,
};

/// Something that can add a surprise pin to the board.
pub trait RandomPinGenerator: Send + Sync {
    fn generate<D: DocumentStore, B: BlobStore>(
        &self,
        gateway: &Gateway<D, B>,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;
}

const ADJECTIVES: &[&str] = &[
    "Quiet", "Golden", "Misty", "Bright", "Hidden", "Wild", "Cozy", "Electric",
];
const NOUNS: &[&str] = &[
    "Lake", "Forest", "Kitchen", "Harbor", "Garden", "Street", "Canyon", "Studio",
];
const TAGS: &[&str] = &[
    "Nature", "Travel", "Food", "Art", "Design", "Architecture", "Photography", "DIY",
];

/// Makes pins with a made-up title, a few tags, and a gradient for an image.
#[derive(Debug)]
pub struct SampleGenerator {
    rng: Mutex<StdRng>,
}

impl SampleGenerator {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// A generator that always makes the same sequence of pins.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Picks everything about the next pin, except who made it.
    fn roll(&self) -> (PinDraft, RgbImage) {
        // a poisoned rng is still an rng
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let adjective = ADJECTIVES.choose(&mut *rng).copied().unwrap_or("Random");
        let noun = NOUNS.choose(&mut *rng).copied().unwrap_or("Pin");
        let tag_count = rng.gen_range(1..=3);
        let tags = TAGS
            .choose_multiple(&mut *rng, tag_count)
            .map(|t| t.to_string())
            .collect();
        let size = [PinSize::Small, PinSize::Medium, PinSize::Large]
            .choose(&mut *rng)
            .copied()
            .unwrap_or_default();
        let seed: u32 = rng.gen();

        let draft = PinDraft {
            title: format!("{adjective} {noun}"),
            description: format!("A randomly generated {} pin.", noun.to_lowercase()),
            destination: format!("https://picsum.photos/seed/{seed}/600/800"),
            size,
            tags,
            ..Default::default()
        };

        let (width, height) = (rng.gen_range(120..=360), rng.gen_range(120..=480));
        let from: [u8; 3] = rng.gen();
        let to: [u8; 3] = rng.gen();
        let img = RgbImage::from_fn(width, height, |_x, y| {
            let t = y as f32 / height as f32;
            Rgb(std::array::from_fn(|c| {
                (from[c] as f32 + (to[c] as f32 - from[c] as f32) * t) as u8
            }))
        });

        (draft, img)
    }
}

impl Default for SampleGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomPinGenerator for SampleGenerator {
    #[tracing::instrument(skip_all)]
    async fn generate<D: DocumentStore, B: BlobStore>(
        &self,
        gateway: &Gateway<D, B>,
    ) -> Result<(), GatewayError> {
        let (mut draft, img) = self.roll();
        {
            let conf = Config::read().await;
            draft.author = conf.author.clone();
            draft.board = conf.board.clone();
        }

        let upload = ImageUpload::new("random.png", "image/png", encode_png(&img)?);
        let pin = gateway.create(draft, &upload).await?;
        tracing::info!("Generated random pin `{}` (`{}`).", pin.id, pin.title);
        Ok(())
    }
}

/// Encodes a generated image. Nothing has been saved yet if this fails.
fn encode_png(img: &RgbImage) -> Result<Vec<u8>, GatewayError> {
    let mut png = Cursor::new(Vec::new());
    img.write_to(&mut png, ImageFormat::Png)
        .inspect_err(|e| tracing::error!("Failed to encode the generated image. err: {e}"))
        .map_err(|e| GatewayError::Generator(ImageError::EncodeFailed(e)))?;

    Ok(png.into_inner())
}

#[cfg(test)]
mod tests {
    use image::RgbImage;

    use crate::error::{GatewayError, ImageError};

    use super::{encode_png, SampleGenerator};

    #[test]
    fn seeded_generators_repeat_themselves() {
        let (a, a_img) = SampleGenerator::seeded(7).roll();
        let (b, b_img) = SampleGenerator::seeded(7).roll();

        assert_eq!(a, b);
        assert_eq!(a_img, b_img);
        assert!(!a.title.is_empty());
        assert!((1..=3).contains(&a.tags.len()));
    }

    #[test]
    fn unencodable_images_are_generator_errors() {
        let empty = RgbImage::new(0, 0);

        assert!(matches!(
            encode_png(&empty),
            Err(GatewayError::Generator(ImageError::EncodeFailed(_)))
        ));
        assert!(encode_png(&RgbImage::new(4, 4)).is_ok());
    }
}
