//! Configured data-source networks.
//!
//! The registry is a plain value handed to the session manager at startup.
//! Each network has its own query endpoint and its own hub base URL for
//! human-facing links.

use thiserror::Error;

use flagwatch_shared::constants::DEFAULT_NETWORK;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Registry has no networks")]
    Empty,

    #[error("Default network {0:?} is not configured")]
    UnknownDefault(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Selection key, e.g. `mumbai`.
    pub name: String,
    /// Dashboard heading.
    pub title: String,
    /// GraphQL query endpoint.
    pub graph_url: String,
    /// Base URL of the hub UI, without trailing slash.
    pub hub_url: String,
}

impl NetworkConfig {
    pub fn new(
        name: impl Into<String>,
        title: impl Into<String>,
        graph_url: impl Into<String>,
        hub_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            graph_url: graph_url.into(),
            hub_url: hub_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn operator_link(&self, operator_id: &str) -> String {
        format!("{}/network/operators/{operator_id}", self.hub_url)
    }

    pub fn sponsorship_link(&self, sponsorship_id: &str) -> String {
        format!("{}/network/sponsorships/{sponsorship_id}", self.hub_url)
    }
}

#[derive(Debug, Clone)]
pub struct NetworkRegistry {
    networks: Vec<NetworkConfig>,
    default: String,
}

impl NetworkRegistry {
    pub fn new(networks: Vec<NetworkConfig>, default: &str) -> Result<Self, RegistryError> {
        if networks.is_empty() {
            return Err(RegistryError::Empty);
        }
        if !networks.iter().any(|n| n.name == default) {
            return Err(RegistryError::UnknownDefault(default.to_string()));
        }
        Ok(Self {
            networks,
            default: default.to_string(),
        })
    }

    /// The two Streamr networks the dashboard ships with.
    pub fn builtin() -> Self {
        Self {
            networks: vec![
                NetworkConfig::new(
                    "mumbai",
                    "Streamr 1.0 Mumbai pre-testnet flags",
                    "https://api.thegraph.com/subgraphs/name/samt1803/network-subgraphs",
                    "https://mumbai.streamr.network/hub",
                ),
                NetworkConfig::new(
                    "polygon",
                    "Streamr 1.0 Polygon flags",
                    "https://api.thegraph.com/subgraphs/name/streamr-dev/network-subgraphs",
                    "https://streamr.network/hub",
                ),
            ],
            default: DEFAULT_NETWORK.to_string(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&NetworkConfig> {
        self.networks.iter().find(|n| n.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut NetworkConfig> {
        self.networks.iter_mut().find(|n| n.name == name)
    }

    pub fn default_network(&self) -> &NetworkConfig {
        // Constructors guarantee the default is present.
        self.get(&self.default).unwrap_or(&self.networks[0])
    }

    pub fn set_default(&mut self, name: &str) -> Result<(), RegistryError> {
        if self.get(name).is_none() {
            return Err(RegistryError::UnknownDefault(name.to_string()));
        }
        self.default = name.to_string();
        Ok(())
    }

    /// Resolve an external selection parameter. Missing, blank, or unknown
    /// values fall back to the default network.
    pub fn select(&self, requested: Option<&str>) -> &NetworkConfig {
        requested
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .and_then(|r| self.networks.iter().find(|n| n.name.eq_ignore_ascii_case(r)))
            .unwrap_or_else(|| self.default_network())
    }

    pub fn iter(&self) -> impl Iterator<Item = &NetworkConfig> {
        self.networks.iter()
    }
}
