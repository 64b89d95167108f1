// Mediarr Core
//
// Service layer on top of the provider clients:
// - config:      application configuration (file + env)
// - logging:     tracing bootstrap
// - registry:    live provider instances keyed by instance id
// - pin_session: Plex PIN pairing session state machine + expiry sweep
//
// The route layer talks to this crate; it never constructs provider
// clients directly.

pub mod config;
pub mod logging;
pub mod pin_session;
pub mod registry;

pub use config::{Config, LoggingConfig, PinAuthConfig};
pub use pin_session::{PinAuthError, PinAuthPoll, PinAuthStart, PinSessionManager};
pub use registry::{ProviderKind, ProviderRegistry};
