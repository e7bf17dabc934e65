//! Sends composed messages through a transport
//!
//! A send opens a fresh session, upgrades it with STARTTLS when the profile
//! asks for it and implicit TLS is not already in use, authenticates when
//! the profile carries a login, then transmits the message to every envelope
//! recipient. The session is closed on every exit path, before any error
//! reaches the caller.

use std::ops::{Deref, DerefMut};

use lettre::Message;

use crate::{
    config::ResolvedProfile,
    message::OutgoingMessage,
    transport::{Session, Transport},
    Error,
};

mod error;

pub use self::error::{Kind, MailError};

/// Sends messages using the settings of a [`ResolvedProfile`]
#[derive(Debug, Clone)]
pub struct MailDispatcher<T> {
    transport: T,
}

impl<T: Transport> MailDispatcher<T> {
    /// Creates a dispatcher using `transport`
    pub fn new(transport: T) -> MailDispatcher<T> {
        MailDispatcher { transport }
    }

    /// The underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Validates, composes and sends a message
    ///
    /// Validation and composition happen before any connection is opened.
    pub fn send(&self, profile: &ResolvedProfile, message: &OutgoingMessage) -> Result<(), Error> {
        let email = message.compose(profile)?;
        self.dispatch(profile, &email)?;
        Ok(())
    }

    /// Sends an already composed message
    pub fn dispatch(&self, profile: &ResolvedProfile, email: &Message) -> Result<(), MailError> {
        let mut session = Guard(self.transport.connect(profile)?);

        if profile.tls && !profile.ssl {
            #[cfg(feature = "tracing")]
            tracing::debug!("starting tls session");
            session.starttls()?;
        }

        if let Some(login) = profile.login() {
            #[cfg(feature = "tracing")]
            tracing::debug!("authenticating as {}", login);
            session.authenticate(login, profile.password.as_deref().unwrap_or_default())?;
        }

        session.send(email.envelope(), &email.formatted())?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "message sent through {}:{} to {} recipient(s)",
            profile.server,
            profile.port,
            email.envelope().to().len()
        );
        Ok(())
    }
}

/// Closes the session when dropped
struct Guard<S: Session>(S);

impl<S: Session> Deref for Guard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.0
    }
}

impl<S: Session> DerefMut for Guard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.0
    }
}

impl<S: Session> Drop for Guard<S> {
    fn drop(&mut self) {
        self.0.close();
    }
}
