pub mod config;
pub mod error;
pub mod listener;
pub mod provider;
pub mod registry;
pub mod render;
pub mod request;
pub mod viewer;

pub use config::{RelayConfig, DEFAULT_PORT, PORT_RETRY_RANGE};
pub use error::RelayError;
pub use listener::RelayServer;
pub use provider::MarkContentProvider;
pub use registry::ViewerRegistry;
pub use render::{escape_non_ascii, render_response};
pub use request::{decode, encode_display, encode_handshake, Decoded, DisplayRequest};
pub use viewer::ContentSource;
