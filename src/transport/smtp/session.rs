use std::fmt::{self, Debug, Formatter};

use lettre::{
    address::Envelope,
    transport::smtp::{
        authentication::{Credentials, Mechanism},
        client::SmtpConnection,
        commands::{Data, Mail, Rcpt},
        extension::{ClientId, Extension, MailBodyParameter, MailParameter},
        Error,
    },
};

use super::tls_parameters;
use crate::{
    transport::{Fault, Session},
    BoxError,
};

/// Mechanisms tried in order
const MECHANISMS: &[Mechanism] = &[Mechanism::Plain, Mechanism::Login];

/// An open SMTP connection
pub struct SmtpSession {
    connection: SmtpConnection,
    server: String,
    hello_name: ClientId,
}

impl SmtpSession {
    pub(super) fn new(connection: SmtpConnection, server: String, hello_name: ClientId) -> Self {
        SmtpSession {
            connection,
            server,
            hello_name,
        }
    }

    /// Tells if the underlying stream is currently encrypted
    pub fn is_encrypted(&self) -> bool {
        self.connection.is_encrypted()
    }

    fn mail_parameters(
        &self,
        envelope: &Envelope,
        email: &[u8],
    ) -> Result<Vec<MailParameter>, Fault> {
        let server_info = self.connection.server_info();
        let mut parameters = vec![];

        let non_ascii_addresses = envelope
            .from()
            .into_iter()
            .chain(envelope.to())
            .any(|address| !address.user().is_ascii() || !address.domain().is_ascii());
        if non_ascii_addresses {
            if !server_info.supports_feature(Extension::SmtpUtfEight) {
                return Err(Fault::Other(
                    "envelope contains non-ascii chars but server does not support SMTPUTF8".into(),
                ));
            }
            parameters.push(MailParameter::SmtpUtfEight);
        }

        if !email.is_ascii() {
            if !server_info.supports_feature(Extension::EightBitMime) {
                return Err(Fault::Other(
                    "message contains non-ascii chars but server does not support 8BITMIME".into(),
                ));
            }
            parameters.push(MailParameter::Body(MailBodyParameter::EightBitMime));
        }

        Ok(parameters)
    }
}

impl Debug for SmtpSession {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSession")
            .field("server", &self.server)
            .field("encrypted", &self.is_encrypted())
            .finish()
    }
}

impl Session for SmtpSession {
    fn starttls(&mut self) -> Result<(), Fault> {
        let tls_parameters = tls_parameters(&self.server)?;
        self.connection
            .starttls(&tls_parameters, &self.hello_name)
            .map_err(|err| {
                if is_tls(&err) {
                    Fault::Other(Box::new(err))
                } else {
                    classify(err, Fault::Other)
                }
            })?;

        #[cfg(feature = "tracing")]
        tracing::debug!("connection to {} upgraded with STARTTLS", self.server);
        Ok(())
    }

    fn authenticate(&mut self, login: &str, password: &str) -> Result<(), Fault> {
        let credentials = Credentials::new(login.to_owned(), password.to_owned());
        self.connection
            .auth(MECHANISMS, &credentials)
            .map_err(|err| classify(err, Fault::Authentication))?;
        Ok(())
    }

    fn send(&mut self, envelope: &Envelope, email: &[u8]) -> Result<(), Fault> {
        let parameters = self.mail_parameters(envelope, email)?;

        self.connection
            .command(Mail::new(envelope.from().cloned(), parameters))
            .map_err(|err| classify(err, Fault::SenderRefused))?;

        // Offer every recipient before giving up, to report all refusals at once
        let mut refused = vec![];
        let mut last_refusal = None;
        for recipient in envelope.to() {
            match self.connection.command(Rcpt::new(recipient.clone(), vec![])) {
                Ok(_) => {}
                Err(err) if is_refusal(&err) => {
                    refused.push(recipient.to_string());
                    last_refusal = Some(err);
                }
                Err(err) => return Err(classify(err, Fault::Other)),
            }
        }
        if let Some(err) = last_refusal {
            return Err(Fault::RecipientsRefused {
                recipients: refused,
                source: Box::new(err),
            });
        }

        self.connection
            .command(Data)
            .map_err(|err| classify(err, Fault::Data))?;
        self.connection
            .message(email)
            .map_err(|err| classify(err, Fault::Data))?;
        Ok(())
    }

    fn close(&mut self) {
        // Sends QUIT unless already sent, then shuts the stream down
        self.connection.abort();
    }
}

/// 4yz and 5yz replies
fn is_refusal(err: &Error) -> bool {
    err.is_transient() || err.is_permanent()
}

#[cfg(any(feature = "native-tls", feature = "rustls", feature = "boring-tls"))]
fn is_tls(err: &Error) -> bool {
    err.is_tls()
}

#[cfg(not(any(feature = "native-tls", feature = "rustls", feature = "boring-tls")))]
fn is_tls(_err: &Error) -> bool {
    false
}

/// Maps a failed protocol step to a fault
///
/// A negative reply is the `refused` fault of the step and client side errors
/// are protocol faults. Anything else happened on the wire: a peer closing
/// the connection shows up as an incomplete response.
fn classify(err: Error, refused: fn(BoxError) -> Fault) -> Fault {
    if is_refusal(&err) {
        refused(Box::new(err))
    } else if err.is_client() {
        Fault::Other(Box::new(err))
    } else {
        Fault::Disconnected(Box::new(err))
    }
}
