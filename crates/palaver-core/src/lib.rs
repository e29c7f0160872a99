pub mod config;
pub mod error;
pub mod i18n;
pub mod types;

pub use config::PalaverConfig;
pub use error::{PalaverError, Result};
pub use i18n::{Language, MessageKey};
pub use types::*;
