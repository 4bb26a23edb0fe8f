//! Templates controller for Trellis.
//!
//! Sits between application actions and a [`ViewEngine`]:
//!
//! - actions build a [`View`] with [`Templates::render`],
//!   [`Templates::render_error`], [`Templates::redirect`], and friends
//! - [`Templates::respond`] writes the view to a [`ResponseSink`], falling
//!   back to the internal-error page and then to a fixed body on failure
//!
//! [`settings`] maps a loaded [`trellis_config::Config`] onto the view loader
//! and the controller.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use trellis_config::Config;
//! use trellis_templates::{ControllerSettings, RecordedResponse, Templates, load_views};
//! use trellis_views::RenderContext;
//!
//! let config = Config::load(None, None)?;
//! let templates = Templates::new(load_views(&config)?, ControllerSettings::from_config(&config));
//!
//! let view = templates.render("App", "Index", RenderContext::new().with("name", "Ann"));
//! let mut response = RecordedResponse::new();
//! templates.respond(&view, &mut response);
//! ```
//!
//! [`ViewEngine`]: trellis_views::ViewEngine

mod controller;
mod response;
pub mod settings;

pub use controller::{
    INTERNAL_ERROR_BODY, Outcome, STATUS_INTERNAL_ERROR, STATUS_NOT_FOUND, STATUS_OK,
    STATUS_SEE_OTHER, Target, Templates, View,
};
pub use response::{RecordedResponse, ResponseSink};
pub use settings::{ControllerSettings, load_views, loader, views_config};
