//! One-time shared cache initialization.

use super::memory::MemoryCache;
use super::sqlite::SqliteCache;
use super::traits::CacheBackend;
use crate::config::CacheDefaults;
use crate::error::{Result, SessionError};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// Which shared cache backend to open at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SharedCacheSettings {
    /// Process-local cache; peers cannot observe each other's sessions.
    Memory,
    /// SQLite database file shared by every process on the host.
    Sqlite { path: PathBuf },
}

impl FromStr for SharedCacheSettings {
    type Err = SessionError;

    fn from_str(uri: &str) -> Result<Self> {
        if uri == CacheDefaults::MEMORY_SCHEME || uri == "memory" {
            return Ok(SharedCacheSettings::Memory);
        }

        if let Some(path) = uri.strip_prefix(CacheDefaults::SQLITE_SCHEME) {
            if path.is_empty() {
                return Err(SessionError::Config {
                    message: "sqlite cache uri is missing a database path".to_string(),
                });
            }
            return Ok(SharedCacheSettings::Sqlite {
                path: PathBuf::from(path),
            });
        }

        Err(SessionError::Config {
            message: format!("unsupported cache uri scheme: {}", uri),
        })
    }
}

/// Open the configured shared cache, creating storage as needed.
pub fn init_shared_cache(settings: &SharedCacheSettings) -> Result<Arc<dyn CacheBackend>> {
    let backend: Arc<dyn CacheBackend> = match settings {
        SharedCacheSettings::Memory => Arc::new(MemoryCache::new()),
        SharedCacheSettings::Sqlite { path } => Arc::new(SqliteCache::open(path)?),
    };

    // Entries left behind by a previous run are dead weight.
    let swept = backend.cleanup_expired()?;
    info!(?settings, swept, "Shared session cache initialized");

    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_parse_memory() {
        assert_eq!(
            "memory://".parse::<SharedCacheSettings>().unwrap(),
            SharedCacheSettings::Memory
        );
    }

    #[test]
    fn test_parse_sqlite() {
        assert_eq!(
            "sqlite:///var/lib/plugins/sessions.db"
                .parse::<SharedCacheSettings>()
                .unwrap(),
            SharedCacheSettings::Sqlite {
                path: PathBuf::from("/var/lib/plugins/sessions.db")
            }
        );
    }

    #[test]
    fn test_parse_rejects_unknown_scheme() {
        let err = "redis://localhost:6379".parse::<SharedCacheSettings>().unwrap_err();
        assert!(matches!(err, SessionError::Config { .. }));
        assert!("sqlite://".parse::<SharedCacheSettings>().is_err());
    }

    #[test]
    fn test_init_sqlite_creates_database() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("sessions.db");
        let backend = init_shared_cache(&SharedCacheSettings::Sqlite { path: path.clone() }).unwrap();

        backend.set("ns", "k", b"v", Duration::from_secs(60)).unwrap();
        assert!(path.exists());
    }
}
