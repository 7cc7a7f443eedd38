//! SDK configuration.

use crate::errors::{InAppPayError, Result};
use std::env;
use std::time::Duration;

/// Backend the SDK talks to unless configured otherwise.
pub const DEFAULT_BASE_URL: &str = "https://us-central1-inapppay-47111.cloudfunctions.net";

/// Default connect and per-read ceiling.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for an [`InAppPay`](crate::sdk::InAppPay) instance.
#[derive(Debug, Clone, PartialEq)]
pub struct InAppPayConfig {
    /// Project identifier sent with every request
    pub project_name: String,

    /// Base URL of the Cloud Functions endpoints
    pub base_url: String,

    /// TCP connect timeout
    pub connect_timeout: Duration,

    /// Ceiling on each read; resets whenever data arrives
    pub request_timeout: Duration,

    /// User id to send instead of the probed device id
    pub user_id_override: Option<String>,
}

impl InAppPayConfig {
    /// Creates a configuration with default endpoint and timeouts.
    ///
    /// # Examples
    ///
    /// ```
    /// use inapppay_rs::config::{InAppPayConfig, DEFAULT_BASE_URL};
    ///
    /// let config = InAppPayConfig::new("my-project");
    /// assert_eq!(config.base_url, DEFAULT_BASE_URL);
    /// ```
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: DEFAULT_TIMEOUT,
            request_timeout: DEFAULT_TIMEOUT,
            user_id_override: None,
        }
    }

    /// Sets the backend base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets both connect and request timeouts.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self.request_timeout = timeout;
        self
    }

    /// Uses a fixed user id instead of the device probe.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id_override = Some(user_id.into());
        self
    }

    /// Loads the configuration from `INAPPPAY_*` environment variables.
    ///
    /// `INAPPPAY_PROJECT_NAME` is required; `INAPPPAY_BASE_URL`,
    /// `INAPPPAY_TIMEOUT_SECS` and `INAPPPAY_USER_ID` are optional.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let project_name = lookup("INAPPPAY_PROJECT_NAME")
            .ok_or_else(|| InAppPayError::Config("INAPPPAY_PROJECT_NAME is not set".to_string()))?;
        let mut config = Self::new(project_name);

        if let Some(base_url) = lookup("INAPPPAY_BASE_URL") {
            config = config.with_base_url(base_url);
        }
        if let Some(raw) = lookup("INAPPPAY_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                InAppPayError::Config(format!("INAPPPAY_TIMEOUT_SECS is not a number: {}", raw))
            })?;
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(user_id) = lookup("INAPPPAY_USER_ID") {
            config = config.with_user_id(user_id);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_builders() {
        let config = InAppPayConfig::new("demo")
            .with_base_url("http://localhost:5001")
            .with_timeout(Duration::from_secs(5))
            .with_user_id("user-1");

        assert_eq!(config.project_name, "demo");
        assert_eq!(config.base_url, "http://localhost:5001");
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.user_id_override.as_deref(), Some("user-1"));
    }

    #[test]
    fn test_defaults() {
        let config = InAppPayConfig::new("demo");
        assert_eq!(config.request_timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.user_id_override, None);
    }

    #[test]
    fn test_from_lookup() {
        let config = InAppPayConfig::from_lookup(lookup(&[
            ("INAPPPAY_PROJECT_NAME", "demo"),
            ("INAPPPAY_TIMEOUT_SECS", "12"),
        ]))
        .unwrap();
        assert_eq!(config.project_name, "demo");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.request_timeout, Duration::from_secs(12));
    }

    #[test]
    fn test_from_lookup_errors() {
        let missing = InAppPayConfig::from_lookup(lookup(&[]));
        assert!(matches!(missing, Err(InAppPayError::Config(_))));

        let bad_timeout = InAppPayConfig::from_lookup(lookup(&[
            ("INAPPPAY_PROJECT_NAME", "demo"),
            ("INAPPPAY_TIMEOUT_SECS", "soon"),
        ]));
        assert!(matches!(bad_timeout, Err(InAppPayError::Config(_))));
    }
}
