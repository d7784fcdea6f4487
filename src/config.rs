//! Account and transport settings.
//!
//! A [`Config`] holds what both halves of the crate need: the business account
//! id webhooks are validated against, and the credentials the [`Client`] sends
//! with. Build one in code or load it from the environment:
//!
//! | variable | field | required |
//! |---|---|---|
//! | `WHATSAPP_CLOUD_API_ACCESS_TOKEN` | `access_token` | yes |
//! | `WHATSAPP_CLOUD_API_SENDER_PHONE_NUMBER_ID` | `phone_number_id` | yes |
//! | `WHATSAPP_CLOUD_API_WABA_ID` | `account_id` | yes |
//! | `WHATSAPP_CLOUD_API_VERSION` | `api_version` | no, `v22.0` |
//! | `WHATSAPP_CLOUD_API_BASE` | `api_base` | no, `https://graph.facebook.com` |
//! | `WHATSAPP_WEBHOOK_VERIFY_TOKEN` | `verify_token` | no |
//! | `WHATSAPP_APP_SECRET` | `app_secret` | no |
//! | `FLOW_PRIVATE_KEY` | `flow_private_key` | no |
//!
//! [`Client`]: crate::Client

use std::env;

pub const ACCESS_TOKEN_ENV: &str = "WHATSAPP_CLOUD_API_ACCESS_TOKEN";
pub const PHONE_NUMBER_ID_ENV: &str = "WHATSAPP_CLOUD_API_SENDER_PHONE_NUMBER_ID";
pub const ACCOUNT_ID_ENV: &str = "WHATSAPP_CLOUD_API_WABA_ID";
pub const API_VERSION_ENV: &str = "WHATSAPP_CLOUD_API_VERSION";
pub const API_BASE_ENV: &str = "WHATSAPP_CLOUD_API_BASE";
pub const VERIFY_TOKEN_ENV: &str = "WHATSAPP_WEBHOOK_VERIFY_TOKEN";
pub const APP_SECRET_ENV: &str = "WHATSAPP_APP_SECRET";
pub const FLOW_PRIVATE_KEY_ENV: &str = "FLOW_PRIVATE_KEY";

pub const DEFAULT_API_VERSION: &str = "v22.0";
pub const DEFAULT_API_BASE: &str = "https://graph.facebook.com";

/// A required setting was absent or empty.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
}

/// Settings for one WhatsApp Business phone number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub access_token: String,
    pub phone_number_id: String,
    /// The WhatsApp Business Account id webhooks must be addressed to.
    pub account_id: String,
    pub api_version: String,
    pub api_base: String,
    /// Echoed back during the webhook verification handshake.
    pub verify_token: Option<String>,
    /// Signs webhook bodies (`X-Hub-Signature-256`).
    pub app_secret: Option<String>,
    /// RSA private key (PEM) for flow data endpoints, see [`crate::flow`].
    pub flow_private_key: Option<String>,
}

impl Config {
    /// Creates a config with the default API base and version.
    pub fn new(
        access_token: impl Into<String>,
        phone_number_id: impl Into<String>,
        account_id: impl Into<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            phone_number_id: phone_number_id.into(),
            account_id: account_id.into(),
            api_version: DEFAULT_API_VERSION.to_owned(),
            api_base: DEFAULT_API_BASE.to_owned(),
            verify_token: None,
            app_secret: None,
            flow_private_key: None,
        }
    }

    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    pub fn verify_token(mut self, token: impl Into<String>) -> Self {
        self.verify_token = Some(token.into());
        self
    }

    pub fn app_secret(mut self, secret: impl Into<String>) -> Self {
        self.app_secret = Some(secret.into());
        self
    }

    pub fn flow_private_key(mut self, pem: impl Into<String>) -> Self {
        self.flow_private_key = Some(pem.into());
        self
    }

    /// Loads the config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads the config through `lookup`, which maps a variable name to its
    /// value. Empty values count as absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        Ok(Self {
            access_token: require(ACCESS_TOKEN_ENV)?,
            phone_number_id: require(PHONE_NUMBER_ID_ENV)?,
            account_id: require(ACCOUNT_ID_ENV)?,
            api_version: get(API_VERSION_ENV).unwrap_or_else(|| DEFAULT_API_VERSION.to_owned()),
            api_base: get(API_BASE_ENV).unwrap_or_else(|| DEFAULT_API_BASE.to_owned()),
            verify_token: get(VERIFY_TOKEN_ENV),
            app_secret: get(APP_SECRET_ENV),
            flow_private_key: get(FLOW_PRIVATE_KEY_ENV),
        })
    }
}
