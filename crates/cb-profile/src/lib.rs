//! Filter list profiles.
//!
//! A [`ContentBlockingProfile`] owns one filter list file, its compiled
//! rules and its update state. [`ProfileManager`] combines several profiles
//! into one verdict.

pub mod config;
pub mod error;
pub mod event;
pub mod manager;
pub mod profile;
pub mod transport;

pub use config::{ContentBlockingConfig, ProfileConfig};
pub use error::{ConfigError, ProfileError, TransportError};
pub use event::{ProfileEvent, ProfileOption, ProfileState};
pub use manager::ProfileManager;
pub use profile::{ContentBlockingInformation, ContentBlockingProfile, DownloadHandle};
pub use transport::Transport;
