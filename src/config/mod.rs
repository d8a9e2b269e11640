use std::net::SocketAddr;

use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use serde::Deserialize;

use crate::models::{Direction, Sort, SortField};

/// Configuration for the service
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// PostgreSQL connection URL. Clients are kept in memory when unset.
    #[serde(default)]
    pub database_url: Option<String>,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,

    #[serde(default = "default_order_by")]
    pub default_order_by: String,

    #[serde(default = "default_direction")]
    pub default_direction: String,

    /// Load the fixture clients into an empty store on start
    #[serde(default = "default_true")]
    pub seed_fixtures: bool,

    #[serde(default = "default_max_connections")]
    pub db_max_connections: u32,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_page_size() -> u32 {
    12
}

fn default_max_page_size() -> u32 {
    100
}

fn default_order_by() -> String {
    "name".to_string()
}

fn default_direction() -> String {
    "ASC".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_connections() -> u32 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            bind_addr: default_bind_addr(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            default_order_by: default_order_by(),
            default_direction: default_direction(),
            seed_fixtures: true,
            db_max_connections: default_max_connections(),
        }
    }
}

/// Paging defaults applied to every listing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingConfig {
    pub default_size: u32,
    pub max_size: u32,
    pub default_sort: Sort,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            default_size: default_page_size(),
            max_size: default_max_page_size(),
            default_sort: Sort {
                field: SortField::Name,
                direction: Direction::Asc,
            },
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Variables from a `.env` file are loaded first if the file exists.
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let config = envy::from_env::<Config>().context("invalid environment configuration")?;

        Ok(config)
    }

    /// Build a configuration from explicit key/value pairs, as if they were
    /// environment variables.
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::from_iter::<_, Config>(vars).context("invalid configuration")?;
        Ok(config)
    }

    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref()
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.bind_addr
            .parse()
            .with_context(|| format!("invalid bind address '{}'", self.bind_addr))
    }

    /// Resolve and check the paging settings.
    pub fn paging(&self) -> Result<PagingConfig> {
        if self.default_page_size == 0 || self.max_page_size == 0 {
            bail!("page sizes must be positive");
        }
        if self.default_page_size > self.max_page_size {
            bail!(
                "default page size {} exceeds max page size {}",
                self.default_page_size,
                self.max_page_size
            );
        }

        let field: SortField = self
            .default_order_by
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))?;
        let direction: Direction = self
            .default_direction
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))?;

        Ok(PagingConfig {
            default_size: self.default_page_size,
            max_size: self.max_page_size,
            default_sort: Sort { field, direction },
        })
    }
}

/// Initialize environment variables and load configuration
pub fn init() -> Result<Config> {
    let config = Config::load()?;

    // Fail early on values that only break at first use
    config.bind_addr()?;
    config.paging()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = Config::from_vars(Vec::new()).unwrap();
        assert!(config.database_url().is_none());
        assert!(config.seed_fixtures);
        assert_eq!(config.paging().unwrap(), PagingConfig::default());
        assert_eq!(config.bind_addr().unwrap().port(), 8080);
    }

    #[test]
    fn variables_override_defaults() {
        let config = Config::from_vars(vars(&[
            ("DATABASE_URL", "postgres://localhost/clients"),
            ("DEFAULT_PAGE_SIZE", "5"),
            ("DEFAULT_ORDER_BY", "income"),
            ("DEFAULT_DIRECTION", "desc"),
            ("SEED_FIXTURES", "false"),
        ]))
        .unwrap();

        assert_eq!(config.database_url(), Some("postgres://localhost/clients"));
        assert!(!config.seed_fixtures);
        let paging = config.paging().unwrap();
        assert_eq!(paging.default_size, 5);
        assert_eq!(paging.default_sort.field, SortField::Income);
        assert_eq!(paging.default_sort.direction, Direction::Desc);
    }

    #[test]
    fn inconsistent_paging_is_rejected() {
        let config = Config::from_vars(vars(&[
            ("DEFAULT_PAGE_SIZE", "50"),
            ("MAX_PAGE_SIZE", "10"),
        ]))
        .unwrap();
        assert!(config.paging().is_err());

        let config = Config::from_vars(vars(&[("DEFAULT_ORDER_BY", "salary")])).unwrap();
        assert!(config.paging().is_err());
    }

    #[test]
    fn bad_bind_address_is_reported() {
        let config = Config::from_vars(vars(&[("BIND_ADDR", "nowhere")])).unwrap();
        assert!(config.bind_addr().is_err());
    }
}
