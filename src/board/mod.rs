//! The board: every pin, the ones currently shown, and what the user is
//! looking at.
//!
//! A [`Board`] owns the canonical list of pins (as last fetched) and the
//! displayed list (the canonical one, maybe filtered). After anything changes
//! the backend, it re-fetches the whole collection.
//!
//! Every operation takes `&mut self`, so one board never has two backend
//! operations in flight at once.

pub mod filter;
pub mod random;

use crate::{
    composer::Composer,
    config::Config,
    database::DocumentStore,
    error::{ComposerError, GatewayError},
    gateway::Gateway,
    models::pin::{Pin, PinId},
    storage::BlobStore,
};

use filter::filter_pins;
use random::RandomPinGenerator;

/// Which modal (if any) is open. Only one can be at a time.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Modal {
    #[default]
    None,
    /// The new-pin form.
    Create(Composer),
    /// A single pin, opened from the grid.
    Detail(Pin),
    /// The usage guidelines.
    Help,
}

/// What the board is currently waiting on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Activity {
    #[default]
    Idle,
    LoadingList,
    Saving,
    Deleting,
    GeneratingRandom,
}

pub struct Board<D, B, R> {
    gateway: Gateway<D, B>,
    generator: R,

    /// Every pin, as of the last successful fetch.
    pins: Vec<Pin>,
    /// The pins being shown.
    displayed: Vec<Pin>,
    /// The current search text.
    query: String,

    modal: Modal,
    activity: Activity,
    last_error: Option<String>,
}

impl<D: DocumentStore, B: BlobStore, R: RandomPinGenerator> Board<D, B, R> {
    /// Creates an empty board. Call [`Board::load_all`] to fill it.
    pub fn new(gateway: Gateway<D, B>, generator: R) -> Self {
        Self {
            gateway,
            generator,
            pins: Vec::new(),
            displayed: Vec::new(),
            query: String::new(),
            modal: Modal::None,
            activity: Activity::Idle,
            last_error: None,
        }
    }

    pub fn gateway(&self) -> &Gateway<D, B> {
        &self.gateway
    }

    /// The canonical list: every pin from the last fetch.
    pub fn pins(&self) -> &[Pin] {
        &self.pins
    }

    /// The pins that should be on screen.
    pub fn displayed(&self) -> &[Pin] {
        &self.displayed
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn modal(&self) -> &Modal {
        &self.modal
    }

    pub fn activity(&self) -> Activity {
        self.activity
    }

    /// The most recent failure's message, so it can be shown to the user.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.last_error = None;
    }

    /// Replaces both lists with a fresh copy of the collection.
    ///
    /// The search text is cleared, unless the config asks to keep it. On
    /// failure, the previous lists stay as they were.
    #[tracing::instrument(skip(self))]
    pub async fn load_all(&mut self) -> Result<(), GatewayError> {
        let previous = std::mem::replace(&mut self.activity, Activity::LoadingList);
        let res = self.gateway.fetch_all().await;
        self.activity = previous;

        let pins = self.record(res)?;
        let keep_filter = Config::read().await.keep_filter_on_refresh;

        self.pins = pins;
        if keep_filter {
            self.displayed = filter_pins(&self.pins, &self.query);
        } else {
            self.query.clear();
            self.displayed = self.pins.clone();
        }

        tracing::debug!("Board now holds {} pins.", self.pins.len());
        Ok(())
    }

    /// Closes the new-pin form (if open) and reloads the list.
    pub async fn refresh(&mut self) -> Result<(), GatewayError> {
        if matches!(self.modal, Modal::Create(_)) {
            self.modal = Modal::None;
        }
        self.load_all().await
    }

    /// Shows only the pins whose tags match `query`. See [`filter_pins`].
    pub fn filter(&mut self, query: &str) {
        self.query = query.to_string();
        self.displayed = filter_pins(&self.pins, query);
    }

    /// Opens a pin, replacing whatever modal was open.
    pub fn open_detail(&mut self, pin: Pin) {
        self.modal = Modal::Detail(pin);
    }

    /// Opens the new-pin form, starting with the configured default tags.
    pub async fn open_create(&mut self) {
        let tags = Config::read().await.default_tags.clone();
        self.modal = Modal::Create(Composer::with_tags(tags));
    }

    pub fn open_help(&mut self) {
        self.modal = Modal::Help;
    }

    pub fn close_modal(&mut self) {
        self.modal = Modal::None;
    }

    /// The composer of the open new-pin form.
    pub fn composer_mut(&mut self) -> Option<&mut Composer> {
        match &mut self.modal {
            Modal::Create(composer) => Some(composer),
            _ => None,
        }
    }

    /// Saves the pin in the open new-pin form, then refreshes.
    ///
    /// If the pin couldn't be inserted at all, the form stays open so nothing
    /// typed is lost. Otherwise the form closes, even when the image upload
    /// failed (the pin exists, just without an image).
    #[tracing::instrument(skip(self))]
    pub async fn save(&mut self) -> Result<Pin, ComposerError> {
        let Modal::Create(composer) = &mut self.modal else {
            tracing::warn!("Asked to save a pin, but the new-pin form isn't open.");
            return Err(ComposerError::NotOpen);
        };

        let previous = std::mem::replace(&mut self.activity, Activity::Saving);
        let res = composer.submit(&self.gateway).await;
        self.activity = previous;

        match res {
            Ok(pin) => {
                // the pin is saved either way. a failed reload is in `last_error`
                _ = self.refresh().await;
                Ok(pin)
            }
            Err(ComposerError::Gateway(e)) => {
                let mut message = e.to_string();
                if matches!(e, GatewayError::UploadFailure { .. }) {
                    if let Err(reload) = self.refresh().await {
                        message = format!("{message} Reloading the board failed too: {reload}");
                    }
                }

                self.last_error = Some(message);
                Err(ComposerError::Gateway(e))
            }
            Err(e) => Err(e),
        }
    }

    /// Deletes a pin, reloads the list, and closes the pin's modal.
    ///
    /// The list is reloaded even if the delete failed, so it shows what the
    /// backend really has.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&mut self, id: PinId) -> Result<(), GatewayError> {
        self.activity = Activity::Deleting;
        let res = self.gateway.remove(id).await;
        self.activity = Activity::Idle;

        let removed = self.record(res);
        let reloaded = self.load_all().await;
        if matches!(self.modal, Modal::Detail(_)) {
            self.modal = Modal::None;
        }

        removed.and(reloaded)
    }

    /// Asks the generator for a random pin, then reloads the list.
    ///
    /// The list is reloaded whether or not the generator succeeded, and the
    /// board goes back to idle either way.
    #[tracing::instrument(skip(self))]
    pub async fn generate_random(&mut self) -> Result<(), GatewayError> {
        self.activity = Activity::GeneratingRandom;
        let res = self.generator.generate(&self.gateway).await;
        let generated = self.record(res);

        let reloaded = self.load_all().await;
        self.activity = Activity::Idle;

        generated.and(reloaded)
    }

    /// Keeps a failure's message around for the UI before passing it on.
    fn record<T>(&mut self, res: Result<T, GatewayError>) -> Result<T, GatewayError> {
        res.inspect_err(|e| {
            tracing::warn!("Board operation failed. err: {e}");
            self.last_error = Some(e.to_string());
        })
    }
}
