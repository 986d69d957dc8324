use std::env;
use std::time::Duration;

/// Database configuration.
///
/// Reads from the `TIMETABLE_DATABASE_URL` environment variable, falling back
/// to `postgresql://localhost:5432/timetable` when unset.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Full PostgreSQL connection URL.
    pub database_url: String,
    /// Upper bound on pooled connections. A rebuild holds one connection for
    /// its whole transaction, so this caps concurrent mutations.
    pub max_connections: u32,
    /// How long a mutation waits for a free connection before failing.
    pub acquire_timeout: Duration,
}

impl DbConfig {
    /// The default connection URL used when no environment variable is set.
    pub const DEFAULT_URL: &str = "postgresql://localhost:5432/timetable";

    /// Environment variable consulted by [`DbConfig::from_env`].
    pub const URL_ENV: &str = "TIMETABLE_DATABASE_URL";

    pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

    const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

    /// Build a config from the environment.
    pub fn from_env() -> Self {
        let database_url =
            env::var(Self::URL_ENV).unwrap_or_else(|_| Self::DEFAULT_URL.to_owned());
        Self::new(database_url)
    }

    /// Build a config from an explicit URL (tests and CLI flags).
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: Self::DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: Self::DEFAULT_ACQUIRE_TIMEOUT,
        }
    }

    /// Zero is clamped to one connection.
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections.max(1);
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// The same server with `database_name` as target, keeping any query
    /// string and the pool settings.
    pub fn for_database(&self, database_name: &str) -> Self {
        let (base, query) = match self.database_url.split_once('?') {
            Some((base, query)) => (base, Some(query)),
            None => (self.database_url.as_str(), None),
        };
        let server = base.rfind('/').map_or(base, |pos| &base[..pos]);
        let database_url = match query {
            Some(query) => format!("{server}/{database_name}?{query}"),
            None => format!("{server}/{database_name}"),
        };
        Self {
            database_url,
            ..self.clone()
        }
    }

    /// Extract the database name from the URL, ignoring any query string.
    pub fn database_name(&self) -> Option<&str> {
        let without_query = self.database_url.split('?').next()?;
        without_query.rsplit('/').next().filter(|s| !s.is_empty())
    }

    /// URL of the `postgres` maintenance database on the same server, used to
    /// issue `CREATE DATABASE` and `DROP DATABASE`.
    pub fn maintenance_url(&self) -> String {
        self.for_database("postgres").database_url
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_url() {
        let cfg = DbConfig::new(DbConfig::DEFAULT_URL);
        assert_eq!(cfg.database_url, "postgresql://localhost:5432/timetable");
        assert_eq!(cfg.max_connections, 5);
        assert_eq!(cfg.acquire_timeout, Duration::from_secs(10));
    }

    #[test]
    fn pool_settings_builders() {
        let cfg = DbConfig::new(DbConfig::DEFAULT_URL)
            .with_max_connections(0)
            .with_acquire_timeout(Duration::from_secs(30));
        assert_eq!(cfg.max_connections, 1);
        assert_eq!(cfg.acquire_timeout, Duration::from_secs(30));
    }

    #[test]
    fn for_database_keeps_server_query_and_pool() {
        let cfg = DbConfig::new("postgresql://u:p@db:5432/timetable?sslmode=disable")
            .with_max_connections(8);
        let other = cfg.for_database("timetable_test_1");
        assert_eq!(
            other.database_url,
            "postgresql://u:p@db:5432/timetable_test_1?sslmode=disable"
        );
        assert_eq!(other.database_name(), Some("timetable_test_1"));
        assert_eq!(other.max_connections, 8);
    }

    #[test]
    fn database_name_extraction() {
        let cfg = DbConfig::new("postgresql://localhost:5432/school");
        assert_eq!(cfg.database_name(), Some("school"));
    }

    #[test]
    fn database_name_strips_query() {
        let cfg = DbConfig::new("postgresql://localhost:5432/school?sslmode=disable");
        assert_eq!(cfg.database_name(), Some("school"));
    }

    #[test]
    fn maintenance_url_replaces_db() {
        let cfg = DbConfig::new("postgresql://localhost:5432/timetable");
        assert_eq!(cfg.maintenance_url(), "postgresql://localhost:5432/postgres");
    }
}
