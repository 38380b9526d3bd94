/*! # `pinboard`

A library crate for a pin board: users save images with a title, description,
destination link, size, and tags, browse them in a grid, search them by tag,
open and delete them, or add a random one.

## Layout

- [`gateway::Gateway`] talks to the backend: a document store for pins
  ([`database`]) and a blob store for their images ([`storage`]).
- [`board::Board`] holds the pins on screen and drives every user action.
- [`composer::Composer`] builds a new pin from the new-pin form.

The stores are traits. This crate ships SQLite ([`database::SqliteStore`]) and
plain-folder ([`storage::FsBlobStore`]) backends, wired together by
[`gateway::Gateway::open`] from the [`config::Config`].

## Consistency

Creating a pin isn't atomic. The pin is inserted first with an empty image url,
and the url is only filled in once its image is uploaded. If that upload fails,
the pin stays without an image; [`error::GatewayError::UploadFailure`] tells
you which one.
*/

pub mod board;
pub mod composer;
pub mod config;
pub mod database;
pub mod error;
pub mod gateway;
pub mod models;
pub mod storage;
