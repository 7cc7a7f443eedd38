//! Device identity and country detection.
//!
//! The backend identifies users by a device identifier. The country code is a
//! best-effort guess: SIM, then network, then system locale, then `"US"`.

use std::env;
use std::fs;

/// Country reported when nothing better is known.
pub const FALLBACK_COUNTRY: &str = "US";

const MACHINE_ID_PATHS: [&str; 2] = ["/etc/machine-id", "/var/lib/dbus/machine-id"];
const LOCALE_VARS: [&str; 3] = ["LC_ALL", "LC_MESSAGES", "LANG"];

/// Source of device identity.
///
/// Hosts with telephony hardware override the SIM and network lookups.
pub trait DeviceProbe: Send + Sync {
    /// Stable identifier for this device, if one can be read.
    fn device_id(&self) -> Option<String>;

    /// ISO country code of the SIM card.
    fn sim_country(&self) -> Option<String> {
        None
    }

    /// ISO country code of the registered network.
    fn network_country(&self) -> Option<String> {
        None
    }

    /// Country part of the system locale.
    fn locale_country(&self) -> Option<String>;
}

/// Detects the user's country as an upper-case ISO code.
///
/// # Examples
///
/// ```
/// use inapppay_rs::device::{detect_country, StaticProbe};
///
/// let probe = StaticProbe::new("device-1").with_network_country("de");
/// assert_eq!(detect_country(&probe), "DE");
/// ```
pub fn detect_country(probe: &dyn DeviceProbe) -> String {
    [
        probe.sim_country(),
        probe.network_country(),
        probe.locale_country(),
    ]
    .into_iter()
    .flatten()
    .map(|code| code.trim().to_uppercase())
    .find(|code| !code.is_empty())
    .unwrap_or_else(|| FALLBACK_COUNTRY.to_string())
}

/// Extracts the country from a POSIX or BCP-47 locale string.
///
/// `"en_GB.UTF-8"` and `"pt-BR"` yield `"GB"` and `"BR"`.
pub fn country_from_locale(locale: &str) -> Option<String> {
    let base = locale.split(['.', '@']).next()?;
    let region = base.split(['_', '-']).nth(1)?;
    if region.len() == 2 && region.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(region.to_ascii_uppercase())
    } else {
        None
    }
}

/// Probe backed by the host operating system.
///
/// Reads the machine id and the locale environment variables.
#[derive(Debug, Clone, Default)]
pub struct HostProbe;

impl DeviceProbe for HostProbe {
    fn device_id(&self) -> Option<String> {
        MACHINE_ID_PATHS
            .iter()
            .filter_map(|path| fs::read_to_string(path).ok())
            .map(|id| id.trim().to_string())
            .find(|id| !id.is_empty())
    }

    fn locale_country(&self) -> Option<String> {
        LOCALE_VARS
            .iter()
            .filter_map(|var| env::var(var).ok())
            .find_map(|locale| country_from_locale(&locale))
    }
}

/// Probe with fixed answers, for hosts that already know their identity.
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    device_id: Option<String>,
    sim_country: Option<String>,
    network_country: Option<String>,
    locale_country: Option<String>,
}

impl StaticProbe {
    /// Probe reporting `device_id` and no country.
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: Some(device_id.into()),
            ..Self::default()
        }
    }

    /// Sets the SIM country.
    pub fn with_sim_country(mut self, country: impl Into<String>) -> Self {
        self.sim_country = Some(country.into());
        self
    }

    /// Sets the network country.
    pub fn with_network_country(mut self, country: impl Into<String>) -> Self {
        self.network_country = Some(country.into());
        self
    }

    /// Sets the locale country.
    pub fn with_locale_country(mut self, country: impl Into<String>) -> Self {
        self.locale_country = Some(country.into());
        self
    }
}

impl DeviceProbe for StaticProbe {
    fn device_id(&self) -> Option<String> {
        self.device_id.clone()
    }

    fn sim_country(&self) -> Option<String> {
        self.sim_country.clone()
    }

    fn network_country(&self) -> Option<String> {
        self.network_country.clone()
    }

    fn locale_country(&self) -> Option<String> {
        self.locale_country.clone()
    }
}
