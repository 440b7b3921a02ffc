//! Typed service settings
//!
//! Built from the shared [`TomlConfig`] with `FCDB_*` environment overrides
//! applied on top and compiled defaults filling the gaps. CLI arguments are
//! applied by `main` after this.

use fcdb_common::config::{env_override, TomlConfig};
use fcdb_common::{Error, Result};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

use crate::provider::retry::RetryPolicy;
use crate::types::{Family, FamilySource};

pub const DEFAULT_PORT: u16 = 5810;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_PAGE_DELAY_MS: u64 = 1000;
pub const DEFAULT_MAX_PAGES: u32 = 10;
pub const DEFAULT_STEP_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_MISSING_KEY_SAMPLE: usize = 50;
pub const DEFAULT_METADATA_ENDPOINT: &str = "metadata";

/// Upsert chunk size for the volume-heavy club table
pub const DEFAULT_CLUB_BATCH_SIZE: usize = 500;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
pub const DEFAULT_SEC_CH_UA: &str =
    "\"Chromium\";v=\"124\", \"Google Chrome\";v=\"124\", \"Not-A.Brand\";v=\"99\"";
pub const DEFAULT_SEC_CH_UA_PLATFORM: &str = "\"Windows\"";

pub const ENV_PORT: &str = "FCDB_PORT";
pub const ENV_PROVIDER_BASE_URL: &str = "FCDB_PROVIDER_BASE_URL";
pub const ENV_MAX_RETRIES: &str = "FCDB_MAX_RETRIES";
pub const ENV_PAGE_DELAY_MS: &str = "FCDB_PAGE_DELAY_MS";
pub const ENV_STEP_TIMEOUT_SECS: &str = "FCDB_STEP_TIMEOUT_SECS";

/// Outbound provider settings
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    /// Base URL without trailing slash
    pub base_url: String,
    pub user_agent: String,
    pub referer: String,
    pub sec_ch_ua: String,
    pub sec_ch_ua_platform: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub retry: RetryPolicy,
    /// Fixed delay between pages of a paginated listing
    pub page_delay: Duration,
    pub default_max_pages: u32,
}

impl ProviderSettings {
    /// Settings with defaults for everything but the base URL
    pub fn with_base_url(base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            referer: format!("{}/", base_url),
            base_url,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            sec_ch_ua: DEFAULT_SEC_CH_UA.to_string(),
            sec_ch_ua_platform: DEFAULT_SEC_CH_UA_PLATFORM.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
            page_delay: Duration::from_millis(DEFAULT_PAGE_DELAY_MS),
            default_max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

/// Per-family settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilySettings {
    /// Provider path relative to the base URL
    pub endpoint: String,
    /// `None` writes all records in one chunk
    pub batch_size: Option<usize>,
    pub paginated: bool,
}

impl FamilySettings {
    pub fn default_for(family: Family) -> Self {
        Self {
            endpoint: family.default_endpoint().to_string(),
            batch_size: match family {
                Family::Club => Some(DEFAULT_CLUB_BATCH_SIZE),
                _ => None,
            },
            paginated: false,
        }
    }
}

/// Complete fcdb-sync settings
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSettings {
    pub port: u16,
    pub provider: ProviderSettings,
    /// Bound on the dictionary lookup and on each upsert batch
    pub step_timeout: Duration,
    pub missing_key_sample: usize,
    /// Endpoint fetched for the universal families
    metadata_endpoint: String,
    families: BTreeMap<Family, FamilySettings>,
}

impl SyncSettings {
    /// Defaults everywhere except the provider base URL
    pub fn new(base_url: &str) -> Self {
        Self {
            port: DEFAULT_PORT,
            provider: ProviderSettings::with_base_url(base_url),
            step_timeout: Duration::from_secs(DEFAULT_STEP_TIMEOUT_SECS),
            missing_key_sample: DEFAULT_MISSING_KEY_SAMPLE,
            metadata_endpoint: DEFAULT_METADATA_ENDPOINT.to_string(),
            families: Family::ALL
                .into_iter()
                .map(|family| (family, FamilySettings::default_for(family)))
                .collect(),
        }
    }

    /// Resolve settings: ENV > TOML > default
    ///
    /// Fails when no provider base URL is configured, when it is not an
    /// http(s) URL, or when `[families]` names an unknown family.
    pub fn from_toml(config: &TomlConfig) -> Result<Self> {
        let base_url = env_override::<String>(ENV_PROVIDER_BASE_URL)
            .or_else(|| config.provider.base_url.clone())
            .ok_or_else(|| {
                Error::Config(format!(
                    "provider.base_url is not set (TOML [provider] base_url or {})",
                    ENV_PROVIDER_BASE_URL
                ))
            })?;
        validate_base_url(&base_url)?;

        let mut settings = Self::new(&base_url);
        let provider = &config.provider;

        settings.port = env_override(ENV_PORT).or(config.port).unwrap_or(DEFAULT_PORT);

        if let Some(endpoint) = &provider.metadata_endpoint {
            settings.set_metadata_endpoint(endpoint);
        }

        let p = &mut settings.provider;
        if let Some(user_agent) = &provider.user_agent {
            p.user_agent = user_agent.clone();
        }
        if let Some(referer) = &provider.referer {
            p.referer = referer.clone();
        }
        if let Some(sec_ch_ua) = &provider.sec_ch_ua {
            p.sec_ch_ua = sec_ch_ua.clone();
        }
        if let Some(platform) = &provider.sec_ch_ua_platform {
            p.sec_ch_ua_platform = platform.clone();
        }
        if let Some(secs) = provider.timeout_secs {
            p.timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = provider.connect_timeout_secs {
            p.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = env_override(ENV_MAX_RETRIES).or(provider.max_retries) {
            p.retry.max_retries = retries;
        }
        if let Some(ms) = provider.retry_initial_delay_ms {
            p.retry.initial_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = provider.retry_max_delay_ms {
            p.retry.max_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = env_override(ENV_PAGE_DELAY_MS).or(provider.page_delay_ms) {
            p.page_delay = Duration::from_millis(ms);
        }
        if let Some(pages) = provider.default_max_pages {
            if pages == 0 {
                return Err(Error::Config(
                    "provider.default_max_pages must be at least 1".to_string(),
                ));
            }
            p.default_max_pages = pages;
        }

        if let Some(secs) = env_override(ENV_STEP_TIMEOUT_SECS).or(config.sync.step_timeout_secs) {
            settings.step_timeout = Duration::from_secs(secs);
        }
        if let Some(sample) = config.sync.missing_key_sample {
            settings.missing_key_sample = sample;
        }

        for (slug, overrides) in &config.families {
            let family: Family = slug
                .parse()
                .map_err(|e: String| Error::Config(format!("[families.{}]: {}", slug, e)))?;
            let entry = settings
                .families
                .entry(family)
                .or_insert_with(|| FamilySettings::default_for(family));

            if let Some(endpoint) = &overrides.endpoint {
                entry.endpoint = endpoint.trim_matches('/').to_string();
            }
            if let Some(batch_size) = overrides.batch_size {
                entry.batch_size = (batch_size > 0).then_some(batch_size);
            }
            if let Some(paginated) = overrides.paginated {
                entry.paginated = paginated;
            }
        }

        debug!(base_url = %settings.provider.base_url, port = settings.port, "Resolved sync settings");

        Ok(settings)
    }

    pub fn family(&self, family: Family) -> FamilySettings {
        self.families
            .get(&family)
            .cloned()
            .unwrap_or_else(|| FamilySettings::default_for(family))
    }

    pub fn set_family(&mut self, family: Family, settings: FamilySettings) {
        self.families.insert(family, settings);
    }

    /// Endpoint fetched for a metadata run
    ///
    /// Independent of the per-family endpoints: overriding `[families.leagues]`
    /// leaves metadata runs on this document.
    pub fn metadata_endpoint(&self) -> String {
        self.metadata_endpoint.clone()
    }

    /// Move the metadata document
    ///
    /// Universal families still on the previous document follow it; families
    /// with their own endpoint keep it.
    pub fn set_metadata_endpoint(&mut self, endpoint: &str) {
        let endpoint = endpoint.trim_matches('/').to_string();
        for (family, entry) in self.families.iter_mut() {
            if family.source() == FamilySource::Universal && entry.endpoint == self.metadata_endpoint {
                entry.endpoint = endpoint.clone();
            }
        }
        self.metadata_endpoint = endpoint;
    }
}

fn validate_base_url(base_url: &str) -> Result<()> {
    let url = reqwest::Url::parse(base_url)
        .map_err(|e| Error::Config(format!("Invalid provider base URL {:?}: {}", base_url, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::Config(format!(
            "Provider base URL must be http or https, got {}",
            other
        ))),
    }
}
