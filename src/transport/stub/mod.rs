//! The stub transport records what it is asked to do and drops the content.
//! It can be useful for testing purposes.
//!
//! ```rust
//! use alert_mailer::{
//!     config::ResolvedProfile,
//!     dispatch::{Kind, MailDispatcher},
//!     message::OutgoingMessage,
//!     transport::{
//!         stub::{Stage, StubTransport},
//!         Fault,
//!     },
//! };
//!
//! let profile = ResolvedProfile {
//!     server: "localhost".to_owned(),
//!     port: 25,
//!     tls: false,
//!     ssl: false,
//!     sender: Some("device@example.com".to_owned()),
//!     login: None,
//!     password: None,
//! };
//! let message = OutgoingMessage::new("Hello", "World").to("me@example.com");
//!
//! let transport = StubTransport::new_ok();
//! MailDispatcher::new(&transport).send(&profile, &message).unwrap();
//! assert_eq!(transport.messages().len(), 1);
//!
//! let transport = StubTransport::failing(Stage::Send, Fault::Data("552 too big".into()));
//! let err = MailDispatcher::new(&transport)
//!     .dispatch(&profile, &message.compose(&profile).unwrap())
//!     .unwrap_err();
//! assert_eq!(err.kind(), Kind::ContentRejected);
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lettre::address::Envelope;

use super::{Fault, Session, Transport};
use crate::config::ResolvedProfile;

/// Step of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Opening the connection
    Connect,
    /// STARTTLS upgrade
    StartTls,
    /// Authentication
    Authenticate,
    /// Message transmission
    Send,
}

/// What the stub transport was asked to do, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// A session was opened
    Connect {
        /// Server of the profile
        server: String,
        /// Port of the profile
        port: u16,
        /// Implicit TLS requested
        ssl: bool,
    },
    /// The session was upgraded with STARTTLS
    StartTls,
    /// The session was authenticated
    Authenticate {
        /// Login used, the password is not recorded
        login: String,
    },
    /// A message was sent
    Send {
        /// Envelope of the message
        envelope: Envelope,
        /// Formatted message
        message: String,
    },
    /// The session was closed
    Close,
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<Call>,
    failure: Option<(Stage, Fault)>,
}

/// This transport records every call and succeeds, unless told to fail
///
/// Clones share their records.
#[derive(Debug, Clone, Default)]
pub struct StubTransport {
    state: Arc<Mutex<State>>,
}

impl StubTransport {
    /// Creates a new transport that always succeeds
    pub fn new_ok() -> StubTransport {
        StubTransport::default()
    }

    /// Creates a new transport that fails once with `fault` when reaching `stage`
    pub fn failing(stage: Stage, fault: Fault) -> StubTransport {
        let transport = StubTransport::default();
        transport.fail_at(stage, fault);
        transport
    }

    /// Makes the next session fail with `fault` when reaching `stage`
    pub fn fail_at(&self, stage: Stage, fault: Fault) {
        self.state().failure = Some((stage, fault));
    }

    /// Every call received so far
    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// Every message sent so far, with its envelope
    pub fn messages(&self) -> Vec<(Envelope, String)> {
        self.state()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::Send { envelope, message } => Some((envelope.clone(), message.clone())),
                _ => None,
            })
            .collect()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn step(state: &Mutex<State>, stage: Stage, call: Call) -> Result<(), Fault> {
    let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
    state.calls.push(call);

    if matches!(state.failure, Some((failing, _)) if failing == stage) {
        if let Some((_, fault)) = state.failure.take() {
            return Err(fault);
        }
    }
    Ok(())
}

impl Transport for StubTransport {
    type Session = StubSession;

    fn connect(&self, profile: &ResolvedProfile) -> Result<StubSession, Fault> {
        step(
            &self.state,
            Stage::Connect,
            Call::Connect {
                server: profile.server.clone(),
                port: profile.port,
                ssl: profile.ssl,
            },
        )?;

        Ok(StubSession {
            state: Arc::clone(&self.state),
        })
    }
}

/// Session of a [`StubTransport`]
#[derive(Debug)]
pub struct StubSession {
    state: Arc<Mutex<State>>,
}

impl Session for StubSession {
    fn starttls(&mut self) -> Result<(), Fault> {
        step(&self.state, Stage::StartTls, Call::StartTls)
    }

    fn authenticate(&mut self, login: &str, _password: &str) -> Result<(), Fault> {
        step(
            &self.state,
            Stage::Authenticate,
            Call::Authenticate {
                login: login.to_owned(),
            },
        )
    }

    fn send(&mut self, envelope: &Envelope, email: &[u8]) -> Result<(), Fault> {
        #[cfg(feature = "tracing")]
        tracing::info!(
            "stub: from=<{:?}> to=<{:?}>",
            envelope.from(),
            envelope.to()
        );

        step(
            &self.state,
            Stage::Send,
            Call::Send {
                envelope: envelope.clone(),
                message: String::from_utf8_lossy(email).into_owned(),
            },
        )
    }

    fn close(&mut self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .calls
            .push(Call::Close);
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn profile() -> ResolvedProfile {
        ResolvedProfile {
            server: "mail.lan".to_owned(),
            port: 2525,
            tls: false,
            ssl: true,
            sender: None,
            login: None,
            password: None,
        }
    }

    #[test]
    fn records_calls() {
        let transport = StubTransport::new_ok();
        let mut session = transport.connect(&profile()).unwrap();
        session.authenticate("me", "secret").unwrap();
        session.close();

        assert_eq!(
            transport.calls(),
            vec![
                Call::Connect {
                    server: "mail.lan".to_owned(),
                    port: 2525,
                    ssl: true,
                },
                Call::Authenticate {
                    login: "me".to_owned()
                },
                Call::Close,
            ]
        );
    }

    #[test]
    fn fails_once() {
        let transport =
            StubTransport::failing(Stage::Connect, Fault::Connect("refused".into()));

        assert!(matches!(
            transport.connect(&profile()),
            Err(Fault::Connect(_))
        ));
        assert!(transport.connect(&profile()).is_ok());
    }

    #[test]
    fn clones_share_records() {
        let transport = StubTransport::new_ok();
        let clone = transport.clone();
        clone.connect(&profile()).unwrap().close();

        assert_eq!(transport.calls().len(), 2);
    }
}
