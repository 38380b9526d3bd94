//! Putting together a new pin.
//!
//! A [`Composer`] holds the user's in-progress pin: typed-in fields, tags,
//! and the picked image. It's handed to the gateway on [`Composer::submit`].

use crate::{
    config::Config,
    database::DocumentStore,
    error::ComposerError,
    gateway::Gateway,
    models::{
        image::ImageUpload,
        pin::{Pin, PinDraft, PinSize},
    },
    storage::BlobStore,
};

/// The text fields of the new-pin form, kept up to date as the user types.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormState {
    pub title: String,
    pub description: String,
    pub destination: String,
    pub size: PinSize,
}

/// How a preview image should be constrained inside its container.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreviewFit {
    MaxWidth,
    MaxHeight,
}

/// Picks how to fit an `image` (width, height) into a `container`.
///
/// The image is first limited to the container's width. If that leaves any
/// of the container uncovered, it's limited by height instead.
pub fn fit_preview(image: (u32, u32), container: (u32, u32)) -> PreviewFit {
    let (iw, ih) = (image.0 as f64, image.1 as f64);
    let (cw, ch) = (container.0 as f64, container.1 as f64);
    if iw <= 0.0 || ih <= 0.0 {
        return PreviewFit::MaxWidth;
    }

    // max-width never scales an image up
    let scale = (cw / iw).min(1.0);
    let (shown_w, shown_h) = (iw * scale, ih * scale);

    if shown_w < cw || shown_h < ch {
        PreviewFit::MaxHeight
    } else {
        PreviewFit::MaxWidth
    }
}

/// The image picked for the pin, plus what's needed to show it.
#[derive(Clone, Debug, PartialEq)]
struct AttachedImage {
    upload: ImageUpload,
    preview_url: String,
    dimensions: Option<(u32, u32)>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Composer {
    form: FormState,
    tags: Vec<String>,
    image: Option<AttachedImage>,
    saving: bool,
}

impl Composer {
    /// A blank composer with no tags.
    pub fn new() -> Self {
        Self::default()
    }

    /// A blank composer that starts with the given tags.
    pub fn with_tags(tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    /// The form, for updating on each keystroke.
    pub fn form_mut(&mut self) -> &mut FormState {
        &mut self.form
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Appends a tag. Blank input is ignored.
    ///
    /// Returns whether a tag was added. Clearing the input box is up to the
    /// caller.
    pub fn add_tag(&mut self, text: &str) -> bool {
        let tag = text.trim();
        if tag.is_empty() {
            return false;
        }

        self.tags.push(tag.to_string());
        true
    }

    /// Removes the tag at `index`, if there is one.
    pub fn remove_tag(&mut self, index: usize) -> Option<String> {
        (index < self.tags.len()).then(|| self.tags.remove(index))
    }

    /// Attaches the image for this pin.
    ///
    /// Files that aren't images are rejected, and the composer is left as it
    /// was.
    #[tracing::instrument(skip_all, fields(file = %upload.file_name, media_type = %upload.media_type))]
    pub fn attach_image(&mut self, upload: ImageUpload) -> Result<(), ComposerError> {
        if !upload.is_image() {
            tracing::debug!("Rejected a file that isn't an image.");
            return Err(ComposerError::NotAnImage {
                media_type: upload.effective_media_type(),
                file_name: upload.file_name,
            });
        }

        self.image = Some(AttachedImage {
            preview_url: upload.data_url(),
            dimensions: upload.dimensions(),
            upload,
        });
        Ok(())
    }

    /// The `data:` url for previewing the attached image.
    pub fn preview_url(&self) -> Option<&str> {
        self.image.as_ref().map(|i| i.preview_url.as_str())
    }

    pub fn image(&self) -> Option<&ImageUpload> {
        self.image.as_ref().map(|i| &i.upload)
    }

    /// Whether the image preview is shown.
    pub fn preview_visible(&self) -> bool {
        self.image.is_some()
    }

    /// Whether the "click to upload" prompt is shown.
    pub fn upload_label_visible(&self) -> bool {
        self.image.is_none()
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    /// How the preview should fit in a container of the given size.
    ///
    /// `None` without an image or when its size can't be read.
    pub fn preview_fit(&self, container: (u32, u32)) -> Option<PreviewFit> {
        let dimensions = self.image.as_ref()?.dimensions?;
        Some(fit_preview(dimensions, container))
    }

    /// The pin this composer would create, stamped with `author` and `board`.
    pub fn draft(&self, author: &str, board: &str) -> PinDraft {
        PinDraft {
            author: author.to_string(),
            board: board.to_string(),
            title: self.form.title.clone(),
            description: self.form.description.clone(),
            destination: self.form.destination.clone(),
            size: self.form.size,
            tags: self.tags.clone(),
        }
    }

    /// Saves the pin through `gateway`.
    ///
    /// The returned pin has its image url set. If the image upload fails
    /// after the pin was inserted, the error says which pin was left without
    /// an image.
    #[tracing::instrument(skip_all)]
    pub async fn submit<D: DocumentStore, B: BlobStore>(
        &mut self,
        gateway: &Gateway<D, B>,
    ) -> Result<Pin, ComposerError> {
        let image = self
            .image
            .as_ref()
            .map(|i| i.upload.clone())
            .ok_or(ComposerError::NoImage)?;

        let draft = {
            let conf = Config::read().await;
            self.draft(&conf.author, &conf.board)
        };

        self.saving = true;
        let res = gateway.create(draft, &image).await;
        self.saving = false;

        Ok(res?)
    }
}
