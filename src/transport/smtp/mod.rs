//! The SMTP transport sends emails using the SMTP protocol.
//!
//! It is built on [`lettre`]'s low level [`SmtpConnection`], so that each
//! protocol step can be attributed its own failure: a refused `MAIL FROM`
//! is a refused sender, a refused `RCPT TO` a refused recipient, and so on.
//!
//! Every call to [`Transport::connect`] opens a fresh connection. There is no
//! pooling and no retry; the only time bound is the command timeout.
//!
//! #### Encryption
//!
//! * `ssl`: the connection is encrypted from the start (implicit TLS,
//!   usually port 465)
//! * `tls`: the connection starts in plaintext and is upgraded with
//!   `STARTTLS` before credentials are sent (usually port 587)
//! * neither: plaintext, only suitable for local relays
//!
//! TLS support comes from the `native-tls` (default), `rustls` or
//! `boring-tls` feature. Without any of them, encrypted connections fail.

use std::time::Duration;

use lettre::transport::smtp::{
    client::{SmtpConnection, TlsParameters},
    extension::ClientId,
};

use super::{Fault, Transport};
use crate::config::ResolvedProfile;

mod session;

pub use self::session::SmtpSession;

/// Default timeout of smtp commands
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Sends emails using the SMTP protocol
#[derive(Debug, Clone)]
pub struct SmtpTransport {
    hello_name: ClientId,
    timeout: Option<Duration>,
}

impl Default for SmtpTransport {
    fn default() -> Self {
        SmtpTransport {
            hello_name: ClientId::default(),
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }
}

impl SmtpTransport {
    /// Creates a new SMTP transport
    ///
    /// Defaults are:
    ///
    /// * The local host name in `EHLO`
    /// * A 60-seconds timeout for smtp commands
    pub fn new() -> SmtpTransport {
        SmtpTransport::default()
    }

    /// Set the name used during EHLO
    pub fn hello_name(mut self, name: ClientId) -> Self {
        self.hello_name = name;
        self
    }

    /// Set the timeout duration
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Transport for SmtpTransport {
    type Session = SmtpSession;

    fn connect(&self, profile: &ResolvedProfile) -> Result<SmtpSession, Fault> {
        let tls_parameters = if profile.ssl {
            Some(tls_parameters(&profile.server)?)
        } else {
            None
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "connecting to {}:{} ({})",
            profile.server,
            profile.port,
            if profile.ssl { "implicit tls" } else { "plaintext" }
        );

        let connection = SmtpConnection::connect(
            (profile.server.as_str(), profile.port),
            self.timeout,
            &self.hello_name,
            tls_parameters.as_ref(),
            None,
        )
        .map_err(|err| Fault::Connect(Box::new(err)))?;

        Ok(SmtpSession::new(
            connection,
            profile.server.clone(),
            self.hello_name.clone(),
        ))
    }
}

#[cfg(any(feature = "native-tls", feature = "rustls", feature = "boring-tls"))]
pub(crate) fn tls_parameters(server: &str) -> Result<TlsParameters, Fault> {
    TlsParameters::new(server.to_owned()).map_err(|err| Fault::Other(Box::new(err)))
}

#[cfg(not(any(feature = "native-tls", feature = "rustls", feature = "boring-tls")))]
pub(crate) fn tls_parameters(_server: &str) -> Result<TlsParameters, Fault> {
    Err(Fault::Other("TLS support not compiled in".into()))
}
