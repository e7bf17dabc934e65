//! Alert mailer sends email alerts through a configurable SMTP provider.
//!
//! The host stores a small configuration naming either a known provider
//! (`gmail`, `yahoo`, `outlook`) together with credentials, or a custom
//! server. Before each send, that configuration is resolved into concrete
//! connection parameters, the message is validated and composed, and a
//! fresh SMTP session delivers it. Every failure is reported as a typed
//! error the host can show to the user.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use alert_mailer::{
//!     config::{store::MemoryStore, StoredConfig},
//!     transport::smtp::SmtpTransport,
//!     EmailService, SendOptions,
//! };
//!
//! # use std::error::Error;
//! # fn main() -> Result<(), Box<dyn Error>> {
//! let store = MemoryStore::new(StoredConfig {
//!     provider: "gmail".to_owned(),
//!     login: Some("me@gmail.com".to_owned()),
//!     password: Some("app-password".to_owned()),
//!     sender: Some("me@gmail.com".to_owned()),
//!     ..StoredConfig::default()
//! });
//!
//! let service = EmailService::new(store, SmtpTransport::new());
//! service.send_email(
//!     "Water leak",
//!     "A leak was detected in the <b>basement</b>",
//!     "me@example.com, family@example.com",
//!     SendOptions::default(),
//! )?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! * **native-tls** (default): TLS through the system library
//! * **rustls**: TLS through `rustls`, with the `webpki-roots` certificates
//! * **boring-tls**: TLS through BoringSSL
//! * **tracing** (default): logging through `tracing`
//!
//! Without any TLS feature, profiles asking for `ssl` or `tls` fail at send
//! time.

#![doc(html_root_url = "https://docs.rs/alert-mailer/0.3.0")]
#![forbid(unsafe_code)]
#![deny(
    missing_docs,
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces,
    rust_2018_idioms
)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod alert;
pub mod config;
pub mod dispatch;
mod error;
pub mod message;
pub mod provider;
pub mod service;
pub mod transport;

pub use crate::{
    config::{ResolvedProfile, StoredConfig},
    dispatch::{MailDispatcher, MailError},
    error::Error,
    message::OutgoingMessage,
    service::{EmailService, SendOptions, SenderFallback},
};

/// Boxed error used as the source of transport failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
