//! Runtime settings from environment variables (a `.env` file is honoured).

use crate::error::ConfigError;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "memory" | "mem" | "in-memory" => Ok(Self::Memory),
            _ => Err(ConfigError::Validation(
                "DATABASE_BACKEND must be one of: postgres, memory".into(),
            )),
        }
    }
}

/// What to do with entity tables at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaGeneration {
    /// Drop every entity table and create it again.
    DropAndCreate,
    /// Create missing tables, keep existing ones.
    Create,
    None,
}

impl FromStr for SchemaGeneration {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "drop-and-create" | "drop_and_create" => Ok(Self::DropAndCreate),
            "create" | "update" => Ok(Self::Create),
            "none" => Ok(Self::None),
            _ => Err(ConfigError::Validation(
                "SCHEMA_GENERATION must be one of: drop-and-create, create, none".into(),
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub backend: StoreBackend,
    pub database_url: String,
    pub db_max_connections: u32,
    /// Prefix for every route, e.g. "/api". Empty mounts at the root.
    pub root_path: String,
    pub config_path: PathBuf,
    pub seed_path: PathBuf,
    /// True when SEED_PATH was set explicitly; a missing file is then an error.
    pub seed_path_explicit: bool,
    pub schema_generation: SchemaGeneration,
    pub body_limit_bytes: usize,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let host = env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = parse_var("APP_PORT", 3000u16)?;
        let backend: StoreBackend = env::var("DATABASE_BACKEND")
            .unwrap_or_else(|_| "postgres".into())
            .parse()?;
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/rest_data".into());
        let db_max_connections = parse_var("DB_MAX_CONNECTIONS", 5u32)?;
        let root_path = normalize_root_path(&env::var("HTTP_ROOT_PATH").unwrap_or_default());
        let config_path = PathBuf::from(env::var("CONFIG_PATH").unwrap_or_else(|_| "sample".into()));
        let (seed_path, seed_path_explicit) = match env::var("SEED_PATH") {
            Ok(p) => (PathBuf::from(p), true),
            Err(_) => (config_path.join("import.sql"), false),
        };
        let schema_generation: SchemaGeneration = env::var("SCHEMA_GENERATION")
            .unwrap_or_else(|_| "drop-and-create".into())
            .parse()?;
        let body_limit_bytes = parse_var("BODY_LIMIT_BYTES", 1024 * 1024usize)?;

        Ok(Self {
            host,
            port,
            backend,
            database_url,
            db_max_connections,
            root_path,
            config_path,
            seed_path,
            seed_path_explicit,
            schema_generation,
            body_limit_bytes,
        })
    }

    /// In-memory settings rooted at `config_path`; environment is not consulted.
    pub fn in_memory(config_path: impl Into<PathBuf>) -> Self {
        let config_path = config_path.into();
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            backend: StoreBackend::Memory,
            database_url: String::new(),
            db_max_connections: 1,
            root_path: String::new(),
            seed_path: config_path.join("import.sql"),
            config_path,
            seed_path_explicit: false,
            schema_generation: SchemaGeneration::DropAndCreate,
            body_limit_bytes: 1024 * 1024,
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::Validation(format!("{} has an invalid value: {}", name, raw))),
        Err(_) => Ok(default),
    }
}

/// "/api/" and "api" become "/api"; "" and "/" become "".
pub fn normalize_root_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backends() {
        assert_eq!("PG".parse::<StoreBackend>().unwrap(), StoreBackend::Postgres);
        assert_eq!("memory".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert!("mysql".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn parses_schema_generation() {
        assert_eq!(
            "drop-and-create".parse::<SchemaGeneration>().unwrap(),
            SchemaGeneration::DropAndCreate
        );
        assert_eq!("none".parse::<SchemaGeneration>().unwrap(), SchemaGeneration::None);
        assert!("validate".parse::<SchemaGeneration>().is_err());
    }

    #[test]
    fn normalizes_root_path() {
        assert_eq!(normalize_root_path(""), "");
        assert_eq!(normalize_root_path("/"), "");
        assert_eq!(normalize_root_path("api/"), "/api");
        assert_eq!(normalize_root_path("/api/v1"), "/api/v1");
    }
}
