//! Builder pattern for client configuration.
//!
//! # Example
//!
//! ```no_run
//! use guilded_client::{Client, GatewayOptions};
//!
//! # fn example() -> guilded_client::Result<()> {
//! let client = Client::builder()
//!     .token("bot-token")
//!     .options(GatewayOptions::new().with_max_reconnect_attempts(5))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::cache::IdentityCache;
use crate::error::{Error, Result};
use crate::rest::RestClient;
use crate::transport::{Connector, WsConnector};

use super::core::{Client, ClientParts};
use super::options::GatewayOptions;

// ============================================================================
// Constants
// ============================================================================

/// Gateway WebSocket endpoint.
pub const DEFAULT_GATEWAY_URL: &str = "wss://www.guilded.gg/websocket/v1";

/// REST API base.
pub const DEFAULT_API_BASE_URL: &str = "https://www.guilded.gg/api/v1";

/// Timeout for one REST request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable read by [`ClientBuilder::from_env`].
pub const TOKEN_ENV_VAR: &str = "GUILDED_TOKEN";

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`Client`].
///
/// Use [`Client::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct ClientBuilder {
    /// Bot token.
    token: Option<String>,
    /// Gateway URL override.
    gateway_url: Option<String>,
    /// REST base URL override.
    api_base_url: Option<String>,
    /// User agent override.
    user_agent: Option<String>,
    /// Session configuration.
    options: GatewayOptions,
    /// REST timeout override.
    request_timeout: Option<Duration>,
    /// Cache to share with other clients.
    cache: Option<IdentityCache>,
    /// Custom gateway connector.
    connector: Option<Arc<dyn Connector>>,
}

impl ClientBuilder {
    /// Creates an empty builder.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder with the token taken from `GUILDED_TOKEN`.
    ///
    /// An unset variable leaves the token empty, which `build` rejects.
    #[must_use]
    pub fn from_env() -> Self {
        let builder = Self::new();
        match std::env::var(TOKEN_ENV_VAR) {
            Ok(token) => builder.token(token),
            Err(_) => builder,
        }
    }

    /// Sets the bot token.
    #[inline]
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Overrides the gateway URL (`ws://` or `wss://`).
    #[inline]
    #[must_use]
    pub fn gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = Some(url.into());
        self
    }

    /// Overrides the REST base URL (`http://` or `https://`).
    #[inline]
    #[must_use]
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    /// Overrides the `User-Agent` sent on the handshake and REST calls.
    #[inline]
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Sets the session options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: GatewayOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the REST request timeout.
    #[inline]
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Uses `cache` instead of a fresh one.
    ///
    /// Clients built with the same cache share user records.
    #[inline]
    #[must_use]
    pub fn identity_cache(mut self, cache: IdentityCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Uses a custom connector instead of the WebSocket one.
    #[inline]
    #[must_use]
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Builds the client with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the token is missing or blank
    /// - [`Error::Config`] if a URL does not parse or has the wrong scheme
    /// - [`Error::Config`] if the options or request timeout are invalid
    /// - [`Error::Http`] if the HTTP client cannot be built
    pub fn build(self) -> Result<Client> {
        let token = self.validate_token()?;
        let gateway_url = validate_url(
            self.gateway_url.as_deref().unwrap_or(DEFAULT_GATEWAY_URL),
            &["ws", "wss"],
            "Gateway",
        )?;
        let api_base_url = validate_url(
            self.api_base_url.as_deref().unwrap_or(DEFAULT_API_BASE_URL),
            &["http", "https"],
            "API",
        )?;
        self.options.validate()?;

        let request_timeout = self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        if request_timeout.is_zero() {
            return Err(Error::config("request_timeout must be greater than zero"));
        }

        let user_agent = self.user_agent.unwrap_or_else(default_user_agent);
        let rest = RestClient::new(&token, &api_base_url, &user_agent, request_timeout)?;

        let connector = match self.connector {
            Some(connector) => connector,
            None => Arc::new(WsConnector::new(gateway_url.clone(), token, user_agent)),
        };

        Ok(Client::from_parts(ClientParts {
            gateway_url,
            options: self.options,
            rest,
            cache: self.cache.unwrap_or_default(),
            connector,
        }))
    }
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("gateway_url", &self.gateway_url)
            .field("api_base_url", &self.api_base_url)
            .field("user_agent", &self.user_agent)
            .field("options", &self.options)
            .field("request_timeout", &self.request_timeout)
            .field("custom_connector", &self.connector.is_some())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientBuilder {
    fn validate_token(&self) -> Result<String> {
        match self.token.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => Ok(token.to_string()),
            _ => Err(Error::config(
                "Bot token is required. Use .token() or set GUILDED_TOKEN.\n\
                 Example: Client::builder().token(\"...\")",
            )),
        }
    }
}

/// Parses `raw` and checks its scheme; returns it unchanged.
fn validate_url(raw: &str, schemes: &[&str], label: &str) -> Result<String> {
    let url = Url::parse(raw)
        .map_err(|e| Error::config(format!("{label} URL '{raw}' is invalid: {e}")))?;

    if !schemes.contains(&url.scheme()) {
        return Err(Error::config(format!(
            "{label} URL '{raw}' must use one of: {}",
            schemes.join(", ")
        )));
    }

    Ok(raw.to_string())
}

/// `Guilded-Bot/<version> (<platform>) Rust`.
#[must_use]
pub fn default_user_agent() -> String {
    let platform = match std::env::consts::OS {
        "windows" => "Windows",
        "macos" => "MacOS",
        "linux" => "Linux",
        other => other,
    };
    format!("Guilded-Bot/{} ({platform}) Rust", env!("CARGO_PKG_VERSION"))
}

// ============================================================================
// Tests
// ============================================================================
