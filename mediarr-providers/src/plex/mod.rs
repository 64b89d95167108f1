//! plex.tv account client
//!
//! Only the device-pairing surface: issue a PIN, poll it, fetch the
//! account profile once a token is granted. Authentication against the
//! owner's media server is out of scope.

pub mod client;
pub mod types;

pub use client::PlexClient;
pub use types::{PinResponse, PlexUser};
