//! Outgoing messages and their MIME composition
//!
//! An [`OutgoingMessage`] is what a caller wants to send: a subject, a body,
//! recipients and attachment paths. [`OutgoingMessage::compose`] validates
//! it and turns it into a [`lettre::Message`] using the sender of a
//! [`ResolvedProfile`].
//!
//! The composed message is a `multipart/mixed` document holding a
//! `multipart/alternative` part (the raw body as plain text and the body
//! wrapped in a minimal HTML shell), followed by one part per attachment.
//! `Bcc` recipients only end up in the envelope, never in a header.
//!
//! ```rust
//! use alert_mailer::{config::ResolvedProfile, message::OutgoingMessage};
//!
//! # use std::error::Error;
//! # fn main() -> Result<(), Box<dyn Error>> {
//! let profile = ResolvedProfile {
//!     server: "localhost".to_owned(),
//!     port: 25,
//!     tls: false,
//!     ssl: false,
//!     sender: Some("device@example.com".to_owned()),
//!     login: None,
//!     password: None,
//! };
//!
//! let message = OutgoingMessage::new("Door opened", "The garage door is <b>open</b>")
//!     .to("me@example.com")
//!     .bcc("archive@example.com")
//!     .compose(&profile)?;
//!
//! assert_eq!(message.envelope().to().len(), 2);
//! # Ok(())
//! # }
//! ```

use std::{
    error::Error as StdError,
    fmt::{self, Display, Formatter},
    io,
    path::PathBuf,
};

use lettre::{
    address::AddressError,
    message::{Mailbox, MultiPart},
    Message,
};

use crate::config::ResolvedProfile;

pub mod attachment;

/// An email to send
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Subject header
    pub subject: String,
    /// HTML or plain text, always embedded in a minimal HTML document
    pub body: String,
    /// Primary recipients, shown in the `To` header
    pub to: Vec<String>,
    /// Carbon copy recipients, shown in the `Cc` header
    pub cc: Vec<String>,
    /// Blind carbon copy recipients, only used for delivery
    pub bcc: Vec<String>,
    /// Files to attach, missing ones are skipped
    pub attachments: Vec<PathBuf>,
    /// Overrides the sender of the profile
    pub sender: Option<String>,
}

impl OutgoingMessage {
    /// Creates a message without recipients
    pub fn new<S: Into<String>, B: Into<String>>(subject: S, body: B) -> OutgoingMessage {
        OutgoingMessage {
            subject: subject.into(),
            body: body.into(),
            ..Default::default()
        }
    }

    /// Adds a primary recipient
    pub fn to<S: Into<String>>(mut self, address: S) -> Self {
        self.to.push(address.into());
        self
    }

    /// Adds a carbon copy recipient
    pub fn cc<S: Into<String>>(mut self, address: S) -> Self {
        self.cc.push(address.into());
        self
    }

    /// Adds a blind carbon copy recipient
    pub fn bcc<S: Into<String>>(mut self, address: S) -> Self {
        self.bcc.push(address.into());
        self
    }

    /// Adds an attachment
    pub fn attach<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.attachments.push(path.into());
        self
    }

    /// Sets the sender, overriding the one of the profile
    pub fn sender<S: Into<String>>(mut self, address: S) -> Self {
        self.sender = Some(address.into());
        self
    }

    /// Checks the message can be sent, without looking at the network or the disk
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.subject.trim().is_empty() {
            return Err(ValidationError::MissingSubject);
        }
        if self.body.trim().is_empty() {
            return Err(ValidationError::MissingBody);
        }
        if !self.to.iter().any(|a| !a.trim().is_empty()) {
            return Err(ValidationError::MissingRecipient);
        }
        Ok(())
    }

    /// Validates the message and builds its MIME document
    ///
    /// The sender is the message override if any, else the profile sender.
    /// Attachment files are read here.
    pub fn compose(&self, profile: &ResolvedProfile) -> Result<Message, ValidationError> {
        self.validate()?;

        let sender = self
            .sender
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| profile.sender())
            .ok_or(ValidationError::MissingSender)?;

        let mut builder = Message::builder()
            .from(parse_mailbox("sender", sender)?)
            .subject(self.subject.as_str());
        for address in non_blank(&self.to) {
            builder = builder.to(parse_mailbox("to", address)?);
        }
        for address in non_blank(&self.cc) {
            builder = builder.cc(parse_mailbox("cc", address)?);
        }
        for address in non_blank(&self.bcc) {
            builder = builder.bcc(parse_mailbox("bcc", address)?);
        }

        let mut parts = MultiPart::mixed().multipart(MultiPart::alternative_plain_html(
            self.body.clone(),
            html_document(&self.body),
        ));
        for path in &self.attachments {
            if let Some(part) = attachment::load(path)? {
                parts = parts.singlepart(part);
            }
        }

        builder.multipart(parts).map_err(ValidationError::Build)
    }
}

/// Wraps a body in a minimal HTML document
pub fn html_document(body: &str) -> String {
    format!("<html><head></head><body>{body}</body></html>")
}

/// Splits a comma separated address list, dropping blank items
pub fn split_addresses(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_owned)
        .collect()
}

fn non_blank(addresses: &[String]) -> impl Iterator<Item = &str> {
    addresses.iter().map(|a| a.trim()).filter(|a| !a.is_empty())
}

fn parse_mailbox(field: &'static str, value: &str) -> Result<Mailbox, ValidationError> {
    value
        .parse()
        .map_err(|source| ValidationError::InvalidAddress {
            field,
            value: value.to_owned(),
            source,
        })
}

/// A message that can not be sent as is
#[derive(Debug)]
pub enum ValidationError {
    /// Empty subject
    MissingSubject,
    /// Empty body
    MissingBody,
    /// No primary recipient
    MissingRecipient,
    /// Neither the message nor the profile provide a sender
    MissingSender,
    /// Unparseable address
    InvalidAddress {
        /// Field holding the address: `sender`, `to`, `cc` or `bcc`
        field: &'static str,
        /// The address as given
        value: String,
        /// Why it could not be parsed
        source: AddressError,
    },
    /// An existing attachment could not be read
    Attachment {
        /// Path of the attachment
        path: PathBuf,
        /// Read error
        source: io::Error,
    },
    /// The MIME document could not be built
    Build(lettre::error::Error),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingSubject => f.write_str("subject must not be empty"),
            ValidationError::MissingBody => f.write_str("content must not be empty"),
            ValidationError::MissingRecipient => f.write_str("at least one recipient is required"),
            ValidationError::MissingSender => f.write_str("no sender configured"),
            ValidationError::InvalidAddress { field, value, source } => {
                write!(f, "invalid {field} address {value:?}: {source}")
            }
            ValidationError::Attachment { path, source } => {
                write!(f, "unable to read attachment {}: {source}", path.display())
            }
            ValidationError::Build(err) => write!(f, "unable to build message: {err}"),
        }
    }
}

impl StdError for ValidationError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ValidationError::InvalidAddress { source, .. } => Some(source),
            ValidationError::Attachment { source, .. } => Some(source),
            ValidationError::Build(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use std::{env::temp_dir, fs};

    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    use super::*;

    fn profile() -> ResolvedProfile {
        ResolvedProfile {
            server: "localhost".to_owned(),
            port: 25,
            tls: false,
            ssl: false,
            sender: Some("device@example.com".to_owned()),
            login: None,
            password: None,
        }
    }

    fn formatted(message: &Message) -> String {
        String::from_utf8(message.formatted()).unwrap()
    }

    #[test]
    fn validation() {
        let ok = OutgoingMessage::new("subject", "body").to("x@y.com");
        assert!(ok.validate().is_ok());

        assert!(matches!(
            OutgoingMessage::new(" ", "body").to("x@y.com").validate(),
            Err(ValidationError::MissingSubject)
        ));
        assert!(matches!(
            OutgoingMessage::new("subject", "").to("x@y.com").validate(),
            Err(ValidationError::MissingBody)
        ));
        assert!(matches!(
            OutgoingMessage::new("subject", "body").validate(),
            Err(ValidationError::MissingRecipient)
        ));
        assert!(matches!(
            OutgoingMessage::new("subject", "body")
                .to("")
                .cc("x@y.com")
                .validate(),
            Err(ValidationError::MissingRecipient)
        ));
    }

    #[test]
    fn headers() {
        let message = OutgoingMessage::new("Test", "Hello")
            .to("x@y.com")
            .compose(&profile())
            .unwrap();
        let raw = formatted(&message);

        assert!(raw.contains("From: device@example.com\r\n"));
        assert!(raw.contains("To: x@y.com\r\n"));
        assert!(raw.contains("Subject: Test\r\n"));
        assert!(raw.contains("multipart/mixed"));
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("<html><head></head><body>Hello</body></html>"));
    }

    #[test]
    fn sender_override() {
        let message = OutgoingMessage::new("Test", "Hello")
            .to("x@y.com")
            .sender("forced@example.com")
            .compose(&profile())
            .unwrap();

        assert!(formatted(&message).contains("From: forced@example.com\r\n"));
        assert_eq!(
            message.envelope().from().map(|a| a.to_string()),
            Some("forced@example.com".to_owned())
        );
    }

    #[test]
    fn missing_sender() {
        let mut profile = profile();
        profile.sender = None;

        assert!(matches!(
            OutgoingMessage::new("Test", "Hello")
                .to("x@y.com")
                .compose(&profile),
            Err(ValidationError::MissingSender)
        ));
    }

    #[test]
    fn invalid_address() {
        let err = OutgoingMessage::new("Test", "Hello")
            .to("x@y.com")
            .cc("not an address")
            .compose(&profile())
            .unwrap_err();

        assert!(matches!(
            err,
            ValidationError::InvalidAddress { field: "cc", .. }
        ));
    }

    #[test]
    fn bcc_only_in_envelope() {
        let message = OutgoingMessage::new("Test", "Hello")
            .to("x@y.com")
            .cc("copy@y.com")
            .bcc("hidden@y.com")
            .compose(&profile())
            .unwrap();
        let raw = formatted(&message);

        assert!(raw.contains("Cc: copy@y.com\r\n"));
        assert!(!raw.contains("hidden@y.com"));
        assert!(!raw.contains("Bcc"));

        let recipients: Vec<String> = message
            .envelope()
            .to()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(recipients.len(), 3);
        assert!(recipients.contains(&"hidden@y.com".to_owned()));
    }

    #[test]
    fn attachments() {
        let dir = temp_dir().join(Uuid::new_v4().to_string());
        fs::create_dir(&dir).unwrap();
        let blob = dir.join("attachment1.unknownext");
        fs::write(&blob, b"some content").unwrap();

        let message = OutgoingMessage::new("Test", "Hello")
            .to("x@y.com")
            .attach(&blob)
            .attach(dir.join("missing.txt"))
            .compose(&profile())
            .unwrap();
        let raw = formatted(&message);

        assert!(raw.contains("filename=\"attachment1.unknownext\""));
        assert!(raw.contains("Content-Type: application/octet-stream"));
        assert!(!raw.contains("missing.txt"));

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn address_lists() {
        assert_eq!(
            split_addresses("a@b.c, d@e.f,,  "),
            vec!["a@b.c".to_owned(), "d@e.f".to_owned()]
        );
        assert!(split_addresses("").is_empty());
    }
}
