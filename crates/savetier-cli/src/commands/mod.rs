//! Command handlers grouped by concern.

mod config;
mod press;
mod save;

pub(crate) use config::handle_config;
pub(crate) use press::handle_press;
pub(crate) use save::{handle_prepare, handle_save};
