//! Rendering of alert profiles into emails
//!
//! Alert producers of the host publish generic payloads tagged with a
//! profile name. A [`ProfileRenderers`] registry maps a tag to a plain
//! render function; this crate registers [`render_alert`] for the
//! [`ALERT_PROFILE`] tag.
//!
//! Rendering never fails: problems are logged and reported as `false`, so
//! that a broken mail setup does not break the producer.
//!
//! ```rust
//! use alert_mailer::{
//!     alert::{self, ALERT_PROFILE},
//!     config::{store::MemoryStore, StoredConfig},
//!     transport::stub::StubTransport,
//!     EmailService,
//! };
//! use serde_json::json;
//!
//! let store = MemoryStore::new(StoredConfig {
//!     server: Some("localhost".to_owned()),
//!     port: Some(25),
//!     sender: Some("device@example.com".to_owned()),
//!     ..StoredConfig::default()
//! });
//! let service = EmailService::new(store, StubTransport::new_ok());
//! let renderers = alert::renderers();
//!
//! let payload = json!({
//!     "subject": "Motion detected",
//!     "message": "Someone is in the garden",
//!     "recipients": "me@example.com",
//!     "attachment": null,
//! });
//! assert!(renderers.render(&service, ALERT_PROFILE, &payload));
//! assert!(!renderers.render(&service, "SmsProfile", &payload));
//! ```

use std::{
    collections::BTreeMap,
    fmt::{self, Debug, Formatter},
    path::PathBuf,
};

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::{
    config::store::ConfigStore,
    message::{split_addresses, OutgoingMessage},
    service::EmailService,
    transport::Transport,
};

/// Tag of the alert profile
pub const ALERT_PROFILE: &str = "AlertProfile";

/// Alert payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlertProfile {
    /// Subject of the email
    #[serde(default)]
    pub subject: String,
    /// Body of the email
    #[serde(default)]
    pub message: String,
    /// Comma separated string or list of addresses
    #[serde(default, deserialize_with = "deserialize_recipients")]
    pub recipients: Vec<String>,
    /// Nothing, one path or a list of paths
    #[serde(default, deserialize_with = "deserialize_attachments")]
    pub attachment: Vec<PathBuf>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

fn deserialize_recipients<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<OneOrMany<String>>::deserialize(deserializer)?
        .map(OneOrMany::into_vec)
        .unwrap_or_default()
        .iter()
        .flat_map(|item| split_addresses(item))
        .collect())
}

fn deserialize_attachments<'de, D>(deserializer: D) -> Result<Vec<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<OneOrMany<PathBuf>>::deserialize(deserializer)?
        .map(OneOrMany::into_vec)
        .unwrap_or_default())
}

impl AlertProfile {
    /// Reads a profile from a generic payload
    pub fn from_value(values: &Value) -> Result<AlertProfile, serde_json::Error> {
        AlertProfile::deserialize(values)
    }

    /// Builds the message, sent to `fallback` when the profile has no recipient
    pub fn into_message(self, fallback: Option<&str>) -> OutgoingMessage {
        let to = if self.recipients.is_empty() {
            fallback.map(split_addresses).unwrap_or_default()
        } else {
            self.recipients
        };

        OutgoingMessage {
            subject: self.subject,
            body: self.message,
            to,
            attachments: self.attachment,
            ..OutgoingMessage::default()
        }
    }
}

/// Sends an alert profile, returns `true` when the email was sent
///
/// Alerts without recipients go to the configured sender.
pub fn render_alert<S, T>(service: &EmailService<S, T>, values: &Value) -> bool
where
    S: ConfigStore,
    T: Transport,
{
    let profile = match AlertProfile::from_value(values) {
        Ok(profile) => profile,
        Err(_err) => {
            #[cfg(feature = "tracing")]
            tracing::warn!("invalid alert profile: {}", _err);
            return false;
        }
    };

    let result = service.profile().and_then(|resolved| {
        let message = profile.into_message(resolved.sender());
        service.send(&message)
    });

    match result {
        Ok(()) => true,
        Err(_err) => {
            #[cfg(feature = "tracing")]
            tracing::warn!("alert through email not sent: {}", _err);
            false
        }
    }
}

/// Render function of a profile tag
pub type RenderFn<C> = fn(&C, &Value) -> bool;

/// Render functions keyed by profile tag
pub struct ProfileRenderers<C> {
    renderers: BTreeMap<&'static str, RenderFn<C>>,
}

impl<C> ProfileRenderers<C> {
    /// Creates an empty registry
    pub fn new() -> Self {
        ProfileRenderers {
            renderers: BTreeMap::new(),
        }
    }

    /// Registers `render` for `tag`, replacing any previous function
    pub fn register(mut self, tag: &'static str, render: RenderFn<C>) -> Self {
        self.renderers.insert(tag, render);
        self
    }

    /// Tells if a render function is registered for `tag`
    pub fn supports(&self, tag: &str) -> bool {
        self.renderers.contains_key(tag)
    }

    /// Registered tags, in alphabetical order
    pub fn tags(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.renderers.keys().copied()
    }

    /// Renders `values` with the function registered for `tag`
    ///
    /// Returns `false` for unknown tags.
    pub fn render(&self, context: &C, tag: &str, values: &Value) -> bool {
        match self.renderers.get(tag) {
            Some(render) => render(context, values),
            None => {
                #[cfg(feature = "tracing")]
                tracing::debug!("no renderer for profile {}", tag);
                false
            }
        }
    }
}

impl<C> Default for ProfileRenderers<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Debug for ProfileRenderers<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileRenderers")
            .field("tags", &self.renderers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Registry holding the alert renderer
pub fn renderers<S, T>() -> ProfileRenderers<EmailService<S, T>>
where
    S: ConfigStore,
    T: Transport,
{
    ProfileRenderers::new().register(ALERT_PROFILE, render_alert::<S, T>)
}
