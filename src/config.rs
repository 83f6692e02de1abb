//! Client configuration: API location, Lightning network and storage.
//!
//! Settings come from code ([`ClientConfig::builder`]) or from the
//! environment ([`ClientConfig::from_env`]), optionally seeded by a `.env`
//! file:
//!
//! | variable             | default                 |
//! |----------------------|-------------------------|
//! | `BTRY_API_URL`       | `http://localhost:8080` |
//! | `BTRY_NETWORK`       | `mainnet`               |
//! | `BTRY_BOLT11_PREFIX` | derived from network    |
//! | `BTRY_STORAGE_DIR`   | `.btry`                 |

use crate::error::{Error, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_STORAGE_DIR: &str = ".btry";
pub const DEFAULT_BACKOFF_FLOOR: Duration = Duration::from_secs(1);
pub const DEFAULT_BACKOFF_CEILING: Duration = Duration::from_secs(60);

/// Lightning network the lottery node runs on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
    Signet,
    Regtest,
}

impl Network {
    /// BOLT11 prefix of invoices on this network.
    pub fn bolt11_prefix(self) -> &'static str {
        match self {
            Network::Mainnet => "lnbc",
            Network::Testnet => "lntb",
            Network::Signet => "lntbs",
            Network::Regtest => "lnbcrt",
        }
    }
}

impl FromStr for Network {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" | "bitcoin" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            "signet" => Ok(Network::Signet),
            "regtest" => Ok(Network::Regtest),
            other => Err(Error::Config(format!("unknown network '{other}'"))),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Signet => "signet",
            Network::Regtest => "regtest",
        })
    }
}

/// Everything a [`LotteryClient`](crate::client::LotteryClient) needs to know
/// about its surroundings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server origin; REST lives under `{api_url}/api`.
    pub api_url: Url,
    pub network: Network,
    /// Prefix every accepted invoice must start with.
    pub bolt11_prefix: String,
    /// Directory holding the identity record.
    pub storage_dir: PathBuf,
    pub backoff_floor: Duration,
    pub backoff_ceiling: Duration,
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Load from process environment, reading `.env` first when present.
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let mut builder = ClientConfig::builder();
        if let Some(url) = get("BTRY_API_URL") {
            builder = builder.api_url(&url)?;
        }
        if let Some(network) = get("BTRY_NETWORK") {
            builder = builder.network(network.parse()?);
        }
        if let Some(prefix) = get("BTRY_BOLT11_PREFIX") {
            builder = builder.bolt11_prefix(prefix);
        }
        if let Some(dir) = get("BTRY_STORAGE_DIR") {
            builder = builder.storage_dir(dir);
        }
        builder.build()
    }

    /// `{api_url}/api/`, the base every REST path is joined onto.
    pub fn api_base(&self) -> Result<Url> {
        let mut base = self.api_url.clone();
        let path = format!("{}/api/", base.path().trim_end_matches('/'));
        base.set_path(&path);
        Ok(base)
    }

    /// URL of the server-push event stream.
    pub fn events_url(&self) -> Result<Url> {
        let mut url = self.api_base()?.join("events")?;
        url.query_pairs_mut().append_pair("stream", "events");
        Ok(url)
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    api_url: Option<Url>,
    network: Option<Network>,
    bolt11_prefix: Option<String>,
    storage_dir: Option<PathBuf>,
    backoff_floor: Option<Duration>,
    backoff_ceiling: Option<Duration>,
}

impl ClientConfigBuilder {
    pub fn api_url(mut self, url: &str) -> Result<Self> {
        let parsed = Url::parse(url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Config(format!("api url must be http(s): {url}")));
        }
        self.api_url = Some(parsed);
        Ok(self)
    }

    pub fn network(mut self, network: Network) -> Self {
        self.network = Some(network);
        self
    }

    /// Override the prefix implied by the network.
    pub fn bolt11_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.bolt11_prefix = Some(prefix.into());
        self
    }

    pub fn storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = Some(dir.into());
        self
    }

    pub fn backoff(mut self, floor: Duration, ceiling: Duration) -> Self {
        self.backoff_floor = Some(floor);
        self.backoff_ceiling = Some(ceiling);
        self
    }

    pub fn build(self) -> Result<ClientConfig> {
        let network = self.network.unwrap_or_default();
        let bolt11_prefix = self
            .bolt11_prefix
            .unwrap_or_else(|| network.bolt11_prefix().to_owned())
            .to_ascii_lowercase();
        if !bolt11_prefix.starts_with("ln") {
            return Err(Error::Config(format!("bolt11 prefix must start with 'ln': {bolt11_prefix}")));
        }

        let backoff_floor = self.backoff_floor.unwrap_or(DEFAULT_BACKOFF_FLOOR);
        let backoff_ceiling = self.backoff_ceiling.unwrap_or(DEFAULT_BACKOFF_CEILING);
        if backoff_floor.is_zero() || backoff_floor > backoff_ceiling {
            return Err(Error::Config("backoff floor must be non-zero and not above the ceiling".into()));
        }

        Ok(ClientConfig {
            api_url: match self.api_url {
                Some(url) => url,
                None => Url::parse(DEFAULT_API_URL)?,
            },
            network,
            bolt11_prefix,
            storage_dir: self.storage_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR)),
            backoff_floor,
            backoff_ceiling,
        })
    }
}
