//! Error type for message dispatch

use std::{error::Error as StdError, fmt};

use crate::{transport::Fault, BoxError};

/// The errors that may occur while sending a composed message
pub struct MailError {
    inner: Box<Inner>,
}

struct Inner {
    kind: Kind,
    recipients: Vec<String>,
    source: Option<BoxError>,
}

/// What went wrong during dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// The server closed the connection during the session
    Disconnected,
    /// The server refused the sender address
    SenderRejected,
    /// The server refused one or more recipients
    RecipientsRejected,
    /// The server refused the message content
    ContentRejected,
    /// The connection could not be established
    ConnectFailed,
    /// The server refused the credentials
    AuthFailed,
    /// Any other transport or protocol failure
    Unknown,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Kind::Disconnected => "Server disconnected",
            Kind::SenderRejected => "Email sender must be a valid email address",
            Kind::RecipientsRejected => "Some recipients were refused",
            Kind::ContentRejected => "Problem with email content",
            Kind::ConnectFailed => {
                "Unable to establish connection with smtp server. Please check server address"
            }
            Kind::AuthFailed => "Authentication failed. Please check credentials.",
            Kind::Unknown => "Unable to send email. Please check configuration",
        })
    }
}

impl MailError {
    pub(crate) fn new<E>(kind: Kind, source: Option<E>) -> MailError
    where
        E: Into<BoxError>,
    {
        MailError {
            inner: Box::new(Inner {
                kind,
                recipients: Vec::new(),
                source: source.map(Into::into),
            }),
        }
    }

    /// What went wrong
    pub fn kind(&self) -> Kind {
        self.inner.kind
    }

    /// Recipients refused by the server
    ///
    /// Only filled for [`Kind::RecipientsRejected`].
    pub fn recipients(&self) -> &[String] {
        &self.inner.recipients
    }

    /// Returns true if the server closed the connection
    pub fn is_disconnected(&self) -> bool {
        matches!(self.inner.kind, Kind::Disconnected)
    }

    /// Returns true if the server could not be reached
    pub fn is_connect(&self) -> bool {
        matches!(self.inner.kind, Kind::ConnectFailed)
    }

    /// Returns true if the credentials were refused
    pub fn is_auth(&self) -> bool {
        matches!(self.inner.kind, Kind::AuthFailed)
    }

    /// Returns true if the server refused the sender, a recipient or the content
    pub fn is_rejection(&self) -> bool {
        matches!(
            self.inner.kind,
            Kind::SenderRejected | Kind::RecipientsRejected | Kind::ContentRejected
        )
    }
}

impl From<Fault> for MailError {
    fn from(fault: Fault) -> MailError {
        let (kind, source) = match fault {
            Fault::Disconnected(e) => (Kind::Disconnected, e),
            Fault::SenderRefused(e) => (Kind::SenderRejected, e),
            Fault::RecipientsRefused { recipients, source } => {
                let mut err = MailError::new(Kind::RecipientsRejected, Some(source));
                err.inner.recipients = recipients;
                return err;
            }
            Fault::Data(e) => (Kind::ContentRejected, e),
            Fault::Connect(e) => (Kind::ConnectFailed, e),
            Fault::Authentication(e) => (Kind::AuthFailed, e),
            Fault::Other(e) => (Kind::Unknown, e),
        };
        MailError::new(kind, Some(source))
    }
}

impl fmt::Debug for MailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = f.debug_struct("alert_mailer::dispatch::MailError");

        builder.field("kind", &self.inner.kind);

        if !self.inner.recipients.is_empty() {
            builder.field("recipients", &self.inner.recipients);
        }

        if let Some(ref source) = self.inner.source {
            builder.field("source", source);
        }

        builder.finish()
    }
}

impl fmt::Display for MailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner.kind, f)?;

        if !self.inner.recipients.is_empty() {
            write!(f, " ({})", self.inner.recipients.join(", "))?;
        }

        if let Some(ref e) = self.inner.source {
            write!(f, ": {e}")?;
        }

        Ok(())
    }
}

impl StdError for MailError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source.as_ref().map(|e| {
            let r: &(dyn StdError + 'static) = &**e;
            r
        })
    }
}
