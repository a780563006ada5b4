//! Desktop interface for the homework helper.
//!
//! # Architecture
//!
//! The UI is split into focused submodules:
//! - [`state`]: crop editor state and background events
//! - [`settings`]: user preferences and persistence
//! - [`rendering`]: crop overlay and answer formatting
//! - [`selection`]: drag handling and display-space mapping
//! - [`helper_app`]: main application logic
//!
//! # Usage
//!
//! ```ignore
//! use homework_helper_core::{ui, Config};
//!
//! let config = Config::load()?;
//! ui::run_helper_ui(config, None)?;
//! ```

mod helper_app;
mod rendering;
mod selection;
mod settings;
mod state;

pub use helper_app::HelperApp;
pub use settings::{AVAILABLE_MODELS, Settings};

use crate::config::Config;
use crate::error::Result;
use image::DynamicImage;

/// Opens the helper window and blocks until it is closed.
///
/// With `initial_image` the window starts in the crop editor, as if the
/// image had just been picked.
pub fn run_helper_ui(config: Config, initial_image: Option<DynamicImage>) -> Result<()> {
    helper_app::run(config, initial_image)
}
