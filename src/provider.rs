//! Well-known email providers
//!
//! A provider preset bundles the server, port and encryption settings of a
//! public email service, so that users only have to supply credentials.
//! The table is process-wide constant data.

use serde::Serialize;

/// Key of the sentinel provider meaning "the caller supplies server and port"
pub const CUSTOM_PROVIDER_KEY: &str = "custom";

/// Label shown for the custom provider
pub const CUSTOM_PROVIDER_LABEL: &str = "Custom email provider";

/// Connection settings of a well-known email service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderPreset {
    /// Key stored in the configuration
    pub key: &'static str,
    /// Human readable name
    pub label: &'static str,
    /// SMTP server host name
    pub server: &'static str,
    /// SMTP server port
    pub port: u16,
    /// Upgrade the plaintext connection with STARTTLS
    pub tls: bool,
    /// Connect over implicit TLS
    pub ssl: bool,
}

/// All known presets, in display order
pub static PROVIDERS: &[ProviderPreset] = &[
    ProviderPreset {
        key: "gmail",
        label: "Google Gmail",
        server: "smtp.gmail.com",
        port: 465,
        tls: false,
        ssl: true,
    },
    ProviderPreset {
        key: "yahoo",
        label: "Yahoo! Mail",
        server: "smtp.mail.yahoo.com",
        port: 587,
        tls: true,
        ssl: false,
    },
    ProviderPreset {
        key: "outlook",
        label: "Outlook",
        server: "smtp-mail.outlook.com",
        port: 587,
        tls: true,
        ssl: false,
    },
];

/// Looks up a preset by key
///
/// Returns `None` for unknown keys and for the custom sentinel.
pub fn preset(key: &str) -> Option<&'static ProviderPreset> {
    PROVIDERS.iter().find(|p| p.key == key)
}

/// Tells if `key` names a preset or the custom sentinel
pub fn is_selectable(key: &str) -> bool {
    key == CUSTOM_PROVIDER_KEY || preset(key).is_some()
}

/// A selectable provider, as listed to users
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderEntry {
    /// Key to store in the configuration
    pub key: &'static str,
    /// Human readable name
    pub label: &'static str,
}

/// Lists every selectable provider, presets first and the custom sentinel last
pub fn selectable() -> Vec<ProviderEntry> {
    PROVIDERS
        .iter()
        .map(|p| ProviderEntry {
            key: p.key,
            label: p.label,
        })
        .chain(std::iter::once(ProviderEntry {
            key: CUSTOM_PROVIDER_KEY,
            label: CUSTOM_PROVIDER_LABEL,
        }))
        .collect()
}
