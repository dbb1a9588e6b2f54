#![warn(missing_docs)]

//! Embed analytics views (a full application, a liveboard or one of its
//! visualizations, or search) in an iframe on a host page, and exchange
//! typed messages with them.
//!
//! An [`Sdk`] is initialised once per page with an [`EmbedConfig`]. That
//! resolves the analytics host and starts authenticating. Each embed it
//! creates builds its frame URL, waits for the shared auth result, mounts
//! the frame into its target and dispatches the frame's messages to the
//! handlers registered with [`Embed::on`].
//!
//! The page itself is abstracted behind [`browser::Browser`]. On
//! `wasm32-unknown-unknown` `Sdk::web()` drives the real DOM; elsewhere
//! [`browser::memory::MemoryBrowser`] emulates a page.

pub mod auth;
pub mod browser;
pub mod config;
pub mod embed;
mod error;
pub mod http;
pub mod query;
pub mod queue;
mod sdk;
pub mod telemetry;
mod types;

pub use auth::{AuthFuture, AuthManager, AuthStatus, SessionInfo};
pub use config::{AuthType, EmbedConfig, TokenProvider};
pub use embed::{
    AnswerService, AppViewConfig, Embed, EmbedMessage, FrameParams, LiveboardViewConfig, Page,
    Responder, SearchOptions, SearchViewConfig, Variant, ViewConfig,
};
pub use error::*;
pub use sdk::Sdk;
pub use types::*;
