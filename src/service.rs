//! Operations exposed to the host
//!
//! [`EmailService`] ties a [configuration store](crate::config::store) and a
//! [transport](crate::transport) together. Every send reads the stored
//! configuration again and resolves it, so configuration changes apply to
//! the next message without any restart.

use std::path::PathBuf;

use lettre::Address;
use serde::Serialize;

use crate::{
    config::{self, store::ConfigStore, ResolvedProfile, StoredConfig},
    dispatch::MailDispatcher,
    message::{split_addresses, OutgoingMessage},
    provider::{self, ProviderEntry},
    transport::Transport,
    Error,
};

/// Subject of the message sent by [`EmailService::test`]
pub const TEST_SUBJECT: &str = "Alert mailer test";
/// Body of the message sent by [`EmailService::test`]
pub const TEST_BODY: &str = "This is a test email from your device";

/// Sender used when neither the message nor the configuration provide one
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SenderFallback {
    /// No fallback, an explicit sender is required
    #[default]
    None,
    /// The login, when it is an email address
    Login,
    /// A fixed address
    Address(String),
}

/// Optional parts of [`EmailService::send_email`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// Comma separated copy recipients
    pub cc: Option<String>,
    /// Comma separated blind copy recipients
    pub bcc: Option<String>,
    /// Files to attach, missing files are skipped
    pub attachments: Vec<PathBuf>,
    /// Replaces the configured sender
    pub sender: Option<String>,
}

/// Stored configuration as shown to the host, without the password
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicConfig {
    /// Preset key, or the custom sentinel
    pub provider: String,
    /// SMTP server host name, custom provider only
    pub server: Option<String>,
    /// SMTP server port, custom provider only
    pub port: Option<u16>,
    /// Login used to authenticate
    pub login: Option<String>,
    /// Upgrade the plaintext connection with STARTTLS
    pub tls: bool,
    /// Connect over implicit TLS
    pub ssl: bool,
    /// Default `From` address
    pub sender: Option<String>,
    /// Providers the host may offer for selection
    pub providers: Vec<ProviderEntry>,
}

impl From<StoredConfig> for PublicConfig {
    fn from(config: StoredConfig) -> PublicConfig {
        PublicConfig {
            provider: config.provider,
            server: config.server,
            port: config.port,
            login: config.login,
            tls: config.tls,
            ssl: config.ssl,
            sender: config.sender,
            providers: provider::selectable(),
        }
    }
}

/// Sends emails using the configuration of a store
#[derive(Debug)]
pub struct EmailService<S, T> {
    store: S,
    dispatcher: MailDispatcher<T>,
    sender_fallback: SenderFallback,
}

impl<S, T> EmailService<S, T>
where
    S: ConfigStore,
    T: Transport,
{
    /// Creates a service reading its configuration from `store`
    pub fn new(store: S, transport: T) -> EmailService<S, T> {
        EmailService {
            store,
            dispatcher: MailDispatcher::new(transport),
            sender_fallback: SenderFallback::None,
        }
    }

    /// Sets the sender used when none is configured
    pub fn sender_fallback(mut self, fallback: SenderFallback) -> Self {
        self.sender_fallback = fallback;
        self
    }

    /// The configuration store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The dispatcher used to send messages
    pub fn dispatcher(&self) -> &MailDispatcher<T> {
        &self.dispatcher
    }

    /// Resolves the stored configuration, applying the sender fallback
    pub fn profile(&self) -> Result<ResolvedProfile, Error> {
        let mut profile = config::resolve(&self.store.get_config()?)?;

        if profile.sender().is_none() {
            profile.sender = match &self.sender_fallback {
                SenderFallback::None => None,
                SenderFallback::Login => profile
                    .login()
                    .filter(|login| login.parse::<Address>().is_ok())
                    .map(str::to_owned),
                SenderFallback::Address(address) => Some(address.clone()),
            };
        }

        Ok(profile)
    }

    /// Returns the stored configuration without its password
    pub fn get_config(&self) -> Result<PublicConfig, Error> {
        Ok(self.store.get_config()?.into())
    }

    /// Validates and stores a new configuration
    ///
    /// Returns the answer of the store.
    pub fn set_config(&self, config: StoredConfig) -> Result<bool, Error> {
        config.validate()?;

        #[cfg(feature = "tracing")]
        tracing::debug!("storing configuration for provider {}", config.provider);
        Ok(self.store.update_config(config)?)
    }

    /// Sends an email
    ///
    /// `recipient` and the copy lists of `options` are comma separated
    /// address lists. The message is checked before the configuration is
    /// read, and nothing touches the network until both are usable.
    pub fn send_email(
        &self,
        subject: &str,
        content: &str,
        recipient: &str,
        options: SendOptions,
    ) -> Result<bool, Error> {
        let message = OutgoingMessage {
            subject: subject.to_owned(),
            body: content.to_owned(),
            to: split_addresses(recipient),
            cc: options.cc.as_deref().map(split_addresses).unwrap_or_default(),
            bcc: options.bcc.as_deref().map(split_addresses).unwrap_or_default(),
            attachments: options.attachments,
            sender: options.sender,
        };

        self.send(&message)?;
        Ok(true)
    }

    /// Sends a prepared message
    pub fn send(&self, message: &OutgoingMessage) -> Result<(), Error> {
        let result = message
            .validate()
            .map_err(Error::from)
            .and_then(|()| self.profile())
            .and_then(|profile| self.dispatcher.send(&profile, message));

        #[cfg(feature = "tracing")]
        if let Err(ref err) = result {
            tracing::error!("unable to send email {:?}: {}", message.subject, err);
        }
        result
    }

    /// Sends a test email to `recipient`
    pub fn test(&self, recipient: &str) -> Result<bool, Error> {
        self.send_email(TEST_SUBJECT, TEST_BODY, recipient, SendOptions::default())
    }
}
