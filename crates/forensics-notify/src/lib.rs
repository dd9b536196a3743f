//! `forensics-notify` — the notification renderer (C5): turns a verdict
//! into a message body + action keyboard (§4.6), and services the
//! scenario-tuned follow-up callbacks that keyboard exposes.

pub mod callbacks;
pub mod format;
pub mod geocode;
pub mod render;
pub mod types;

pub use callbacks::{render_callback, CallbackContext};
pub use geocode::{GeoResolver, NoopGeoResolver};
pub use render::render_result;
pub use types::{Button, CallbackAction, Keyboard, RenderInput, RenderedMessage};
