//! Pins: the only thing a board is made of.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A pin's identifier. The backend hands these out on insert.
///
/// It's also the key of the pin's image in the blob store.
pub type PinId = Uuid;

/// How much room a pin takes up in the grid.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PinSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl PinSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            PinSize::Small => "small",
            PinSize::Medium => "medium",
            PinSize::Large => "large",
        }
    }
}

impl std::fmt::Display for PinSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PinSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "small" => Ok(PinSize::Small),
            "medium" => Ok(PinSize::Medium),
            "large" => Ok(PinSize::Large),
            other => Err(format!("`{other}` isn't a pin size")),
        }
    }
}

/// A pin, as stored in the pin collection.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize, sqlx::FromRow)]
pub struct Pin {
    /// Assigned by the backend. Never changes.
    pub id: PinId,

    pub author: String,

    /// The board this pin belongs to. Currently always "default".
    pub board: String,

    pub title: String,
    pub description: String,

    /// Where the pin links to.
    pub destination: String,

    /// Public url of the pin's image.
    ///
    /// Empty between the pin's insertion and its image upload finishing. If
    /// the upload fails, it stays empty.
    pub image_url: String,

    pub size: PinSize,

    /// In the order they were typed. Duplicates are kept.
    #[sqlx(json)]
    pub tags: Vec<String>,

    /// When the backend first saw this pin.
    pub created_at: DateTime<Utc>,
}

impl Pin {
    /// Whether the pin's image has finished uploading.
    pub fn has_image(&self) -> bool {
        !self.image_url.is_empty()
    }

    /// The tag list serialized as JSON, which is what searches run against.
    pub fn tags_json(&self) -> String {
        serde_json::to_string(&self.tags).unwrap_or_else(|e| {
            tracing::warn!("Failed to serialize tags for pin `{}`. err: {e}", self.id);
            String::new()
        })
    }
}

/// Everything needed to create a pin, minus what the backend assigns.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PinDraft {
    pub author: String,
    pub board: String,
    pub title: String,
    pub description: String,
    pub destination: String,
    pub size: PinSize,
    pub tags: Vec<String>,
}

impl PinDraft {
    /// Turns this draft into a stored pin with the given id.
    ///
    /// The image url starts out empty.
    pub fn into_pin(self, id: PinId, created_at: DateTime<Utc>) -> Pin {
        Pin {
            id,
            author: self.author,
            board: self.board,
            title: self.title,
            description: self.description,
            destination: self.destination,
            image_url: String::new(),
            size: self.size,
            tags: self.tags,
            created_at,
        }
    }
}

/// A partial change to a pin. Only the `Some` fields are written.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PinPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub destination: Option<String>,
    pub image_url: Option<String>,
    pub size: Option<PinSize>,
    pub tags: Option<Vec<String>>,
}

impl PinPatch {
    /// A patch that only sets the image url.
    pub fn image_url(url: impl Into<String>) -> Self {
        Self {
            image_url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merges this patch into `pin`.
    pub fn apply(self, pin: &mut Pin) {
        if let Some(title) = self.title {
            pin.title = title;
        }
        if let Some(description) = self.description {
            pin.description = description;
        }
        if let Some(destination) = self.destination {
            pin.destination = destination;
        }
        if let Some(image_url) = self.image_url {
            pin.image_url = image_url;
        }
        if let Some(size) = self.size {
            pin.size = size;
        }
        if let Some(tags) = self.tags {
            pin.tags = tags;
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::{PinDraft, PinPatch, PinSize};

    #[test]
    fn size_parses_form_values() {
        assert_eq!("small".parse::<PinSize>(), Ok(PinSize::Small));
        assert_eq!(" Large ".parse::<PinSize>(), Ok(PinSize::Large));
        assert!("huge".parse::<PinSize>().is_err());
        assert_eq!(PinSize::default(), PinSize::Medium);
    }

    #[test]
    fn patch_only_touches_given_fields() {
        let mut pin = PinDraft {
            title: "sunset".into(),
            description: "over the lake".into(),
            tags: vec!["nature".into()],
            ..Default::default()
        }
        .into_pin(Uuid::new_v4(), Utc::now());
        assert!(!pin.has_image());

        PinPatch::image_url("file:///blobs/1").apply(&mut pin);

        assert_eq!(pin.image_url, "file:///blobs/1");
        assert_eq!(pin.title, "sunset");
        assert_eq!(pin.description, "over the lake");
        assert_eq!(pin.tags, vec!["nature"]);
        assert!(pin.has_image());
    }

    #[test]
    fn tags_serialize_as_json_array() {
        let pin = PinDraft {
            tags: vec!["Nature".into(), "travel".into()],
            ..Default::default()
        }
        .into_pin(Uuid::nil(), Utc::now());

        assert_eq!(pin.tags_json(), r#"["Nature","travel"]"#);
    }
}
