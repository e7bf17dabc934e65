//! ### Transports
//!
//! A transport opens sessions with a mail server. A session is driven step
//! by step by the [dispatcher](crate::dispatch): optional STARTTLS upgrade,
//! optional authentication, then one message. Every step reports failures
//! as a [`Fault`], the transport level condition that caused it.
//!
//! The following transports are available:
//!
//! * The [`SmtpTransport`](smtp::SmtpTransport) talks SMTP to a real server,
//!   in plaintext, with STARTTLS or over implicit TLS.
//! * The [`StubTransport`](stub::StubTransport) records what it is asked to
//!   do and can be told to fail at a given step. It is useful for testing.

use std::{
    error::Error as StdError,
    fmt::{self, Display, Formatter},
};

use lettre::address::Envelope;

use crate::{config::ResolvedProfile, BoxError};

pub mod smtp;
pub mod stub;

/// Opens sessions with a mail server
pub trait Transport {
    /// Session produced by the transport
    type Session: Session;

    /// Connects to the server of `profile`
    ///
    /// Uses implicit TLS when `profile.ssl` is set.
    fn connect(&self, profile: &ResolvedProfile) -> Result<Self::Session, Fault>;
}

impl<T: Transport + ?Sized> Transport for &T {
    type Session = T::Session;

    fn connect(&self, profile: &ResolvedProfile) -> Result<Self::Session, Fault> {
        (**self).connect(profile)
    }
}

/// An open connection to a mail server
pub trait Session {
    /// Upgrades the plaintext connection with STARTTLS
    fn starttls(&mut self) -> Result<(), Fault>;

    /// Authenticates with the given credentials
    fn authenticate(&mut self, login: &str, password: &str) -> Result<(), Fault>;

    /// Sends one message to every recipient of the envelope
    fn send(&mut self, envelope: &Envelope, email: &[u8]) -> Result<(), Fault>;

    /// Closes the connection
    ///
    /// Must be safe to call on a broken connection.
    fn close(&mut self);
}

/// A transport level failure
#[derive(Debug)]
pub enum Fault {
    /// The server dropped the connection during the session
    Disconnected(BoxError),
    /// The server refused the sender address
    SenderRefused(BoxError),
    /// The server refused one or more recipients
    RecipientsRefused {
        /// Every refused address
        recipients: Vec<String>,
        /// Last refusal
        source: BoxError,
    },
    /// The server refused the message content
    Data(BoxError),
    /// No session could be established with the server
    Connect(BoxError),
    /// The server refused the credentials
    Authentication(BoxError),
    /// Any other transport or protocol failure
    Other(BoxError),
}

impl Fault {
    fn source_ref(&self) -> &(dyn StdError + Send + Sync + 'static) {
        match self {
            Fault::Disconnected(e)
            | Fault::SenderRefused(e)
            | Fault::Data(e)
            | Fault::Connect(e)
            | Fault::Authentication(e)
            | Fault::Other(e)
            | Fault::RecipientsRefused { source: e, .. } => e.as_ref(),
        }
    }
}

impl Display for Fault {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Fault::Disconnected(_) => f.write_str("server disconnected")?,
            Fault::SenderRefused(_) => f.write_str("sender refused")?,
            Fault::RecipientsRefused { recipients, .. } => {
                write!(f, "recipients refused ({})", recipients.join(", "))?
            }
            Fault::Data(_) => f.write_str("message content refused")?,
            Fault::Connect(_) => f.write_str("connection failed")?,
            Fault::Authentication(_) => f.write_str("authentication refused")?,
            Fault::Other(_) => f.write_str("transport error")?,
        };

        write!(f, ": {}", self.source_ref())
    }
}

impl StdError for Fault {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.source_ref())
    }
}
