//! REST-backed user accessors.
//!
//! Each accessor reads the cached record first and only calls the member
//! endpoint when the field is empty. The fetched profile is merged into the
//! shared cache, so the answer is visible through every handle.

// ============================================================================
// Imports
// ============================================================================

use tracing::debug;

use crate::cache::UserHandle;
use crate::error::Result;

use super::core::Client;

// ============================================================================
// UserHandle - REST
// ============================================================================

impl UserHandle {
    /// Returns the avatar URL, fetching the profile if none is cached.
    ///
    /// Falls back to a default avatar when the profile has none.
    ///
    /// # Errors
    ///
    /// Transport-level HTTP errors.
    pub async fn fetch_avatar_url(&self, client: &Client) -> Result<String> {
        let cached = self.read().avatar_url.clone();
        if let Some(url) = cached {
            return Ok(url);
        }

        self.refresh(client).await?;
        Ok(self.read().avatar_url_or_default())
    }

    /// Returns the banner URL, fetching the profile if none is cached.
    ///
    /// # Errors
    ///
    /// Transport-level HTTP errors.
    pub async fn fetch_banner_url(&self, client: &Client) -> Result<Option<String>> {
        let cached = self.read().banner_url.clone();
        if cached.is_some() {
            return Ok(cached);
        }

        self.refresh(client).await?;
        Ok(self.read().banner_url.clone())
    }

    /// Fetches the full profile and merges it into the cache.
    ///
    /// Returns `false` without a request when the user's server is unknown,
    /// and when the lookup finds nothing.
    ///
    /// # Errors
    ///
    /// Transport-level HTTP errors.
    pub async fn refresh(&self, client: &Client) -> Result<bool> {
        let id = self.id();
        let Some(server_id) = self.server_id() else {
            debug!(user_id = %id, "No server known for user, skipping profile fetch");
            return Ok(false);
        };

        Ok(client.fetch_user(&server_id, &id).await?.is_some())
    }
}

// ============================================================================
// Tests
// ============================================================================
