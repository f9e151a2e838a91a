use dotenv::dotenv;
use sqlx::mysql::MySqlConnectOptions;
use std::env;
use std::fmt;
use std::time::Duration;
use tracing::{info, warn};

const DEFAULT_JWT_SECRET: &str = "un segreto meno bello";
/// Dieci anni
const MAX_DURATION_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Dove si trova il database: `DATABASE_URL` oppure i parametri `DB_*` separati.
/// Con i parametri separati la password non passa mai da un URL, quindi
/// `@`, `/` o `#` non vanno codificati.
#[derive(Clone, PartialEq)]
pub enum DatabaseTarget {
    Url(String),
    Parts {
        host: String,
        port: u16,
        user: String,
        password: String,
        name: String,
    },
}

impl DatabaseTarget {
    pub fn connect_options(&self) -> Result<MySqlConnectOptions, sqlx::Error> {
        match self {
            Self::Url(url) => url.parse(),
            Self::Parts {
                host,
                port,
                user,
                password,
                name,
            } => {
                let options = MySqlConnectOptions::new()
                    .host(host)
                    .port(*port)
                    .username(user)
                    .database(name);
                if password.is_empty() {
                    Ok(options)
                } else {
                    Ok(options.password(password))
                }
            }
        }
    }

    /// Descrizione senza credenziali, per i log
    pub fn masked(&self) -> String {
        match self {
            Self::Url(url) => mask_url(url),
            Self::Parts {
                host, port, name, ..
            } => format!("mysql://***@{}:{}/{}", host, port, name),
        }
    }
}

impl fmt::Debug for DatabaseTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseTarget,
    pub jwt_secret: String,
    pub jwt_expires_in: Duration,
    pub server_host: String,
    pub server_port: u16,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
    pub cors_origins: Vec<String>,
    pub upload_dir: String,
    pub app_env: String,
    pub run_migrations: bool,
}

impl Config {
    /// Carica la configurazione dalle variabili d'ambiente
    /// Chiama dotenv() automaticamente
    pub fn from_env() -> Result<Self, String> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Costruisce la configurazione a partire da una funzione di lookup,
    /// così i test non devono toccare l'ambiente del processo
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database = match lookup("DATABASE_URL") {
            Some(url) => DatabaseTarget::Url(url),
            None => Self::database_from_parts(&lookup)?,
        };

        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET not set, using default (not secure for production!)");
            DEFAULT_JWT_SECRET.to_string()
        });

        let jwt_expires_in = parse_duration(
            &lookup("JWT_EXPIRES_IN").unwrap_or_else(|| "24h".to_string()),
        )
        .ok_or_else(|| {
            "Invalid JWT_EXPIRES_IN: use <n>s, <n>m, <n>h, <n>d or seconds".to_string()
        })?;

        let server_host = lookup("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());

        let server_port = lookup("SERVER_PORT")
            .or_else(|| lookup("PORT"))
            .unwrap_or_else(|| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| "Invalid SERVER_PORT: must be a number between 0-65535".to_string())?;

        let max_connections = lookup("MAX_DB_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse::<u32>()
            .map_err(|_| "Invalid MAX_DB_CONNECTIONS: must be a positive number".to_string())?;

        let connect_timeout_secs = lookup("DB_CONNECT_TIMEOUT_SECS")
            .unwrap_or_else(|| "60".to_string())
            .parse::<u64>()
            .map_err(|_| {
                "Invalid DB_CONNECT_TIMEOUT_SECS: must be a positive number".to_string()
            })?;

        let cors_origins = match lookup("CORS_ORIGIN") {
            Some(list) => list
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            None => vec![
                "http://localhost:5173".to_string(),
                "http://localhost:8080".to_string(),
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:5173".to_string(),
                "http://127.0.0.1:8080".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        };

        let upload_dir = lookup("UPLOAD_DIR").unwrap_or_else(|| "uploads".to_string());

        let app_env = lookup("APP_ENV").unwrap_or_else(|| "development".to_string());

        let run_migrations = lookup("RUN_MIGRATIONS")
            .map(|v| !matches!(v.to_lowercase().as_str(), "false" | "0" | "no"))
            .unwrap_or(true);

        Ok(Config {
            database,
            jwt_secret,
            jwt_expires_in,
            server_host,
            server_port,
            max_connections,
            connect_timeout_secs,
            cors_origins,
            upload_dir,
            app_env,
            run_migrations,
        })
    }

    fn database_from_parts<F>(lookup: &F) -> Result<DatabaseTarget, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (Some(host), Some(user), Some(name)) =
            (lookup("DB_HOST"), lookup("DB_USER"), lookup("DB_NAME"))
        else {
            return Err(
                "DATABASE_URL (or DB_HOST, DB_USER and DB_NAME) must be set in .env file"
                    .to_string(),
            );
        };
        let port = lookup("DB_PORT")
            .unwrap_or_else(|| "3306".to_string())
            .parse::<u16>()
            .map_err(|_| "Invalid DB_PORT: must be a number between 0-65535".to_string())?;
        Ok(DatabaseTarget::Parts {
            host,
            port,
            user,
            password: lookup("DB_PASSWORD").unwrap_or_default(),
            name,
        })
    }

    /// Logga la configurazione (nascondendo i segreti)
    pub fn print_info(&self) {
        info!("Server Configuration:");
        info!("   Environment: {}", self.app_env);
        info!("   Server Address: {}:{}", self.server_host, self.server_port);
        info!("   Database: {}", self.database.masked());
        info!("   Max DB Connections: {}", self.max_connections);
        info!("   Connect Timeout: {}s", self.connect_timeout_secs);
        info!("   Upload Dir: {}", self.upload_dir);
        info!("   CORS Origins: {}", self.cors_origins.join(", "));
        info!("   JWT Expiry: {}s", self.jwt_expires_in.as_secs());
        if self.jwt_secret == DEFAULT_JWT_SECRET {
            warn!("   JWT Secret: USING DEFAULT (INSECURE!)");
        } else {
            info!("   JWT Secret: custom secret configured");
        }
    }
}

/// Maschera le credenziali di un URL. Si cerca l'ultima `@`, perché una
/// password non codificata può contenerne altre.
fn mask_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at_pos)) if at_pos > scheme_end => {
            format!("{}***{}", &url[..scheme_end + 3], &url[at_pos..])
        }
        _ => "***".to_string(),
    }
}

/// Interpreta durate nel formato `30s`, `15m`, `24h`, `7d` o secondi nudi
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let (digits, multiplier) = match raw.chars().last()? {
        's' => (&raw[..raw.len() - 1], 1),
        'm' => (&raw[..raw.len() - 1], 60),
        'h' => (&raw[..raw.len() - 1], 60 * 60),
        'd' => (&raw[..raw.len() - 1], 24 * 60 * 60),
        _ => (raw, 1),
    };
    let value = digits.parse::<u64>().ok()?;
    // la scadenza finisce in un claim `exp`: deve restare sommabile a un timestamp
    value
        .checked_mul(multiplier)
        .filter(|secs| *secs <= MAX_DURATION_SECS)
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("15m"), Some(Duration::from_secs(900)));
        assert_eq!(parse_duration("24h"), Some(Duration::from_secs(86_400)));
        assert_eq!(parse_duration("7d"), Some(Duration::from_secs(604_800)));
        assert_eq!(parse_duration("120"), Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("h"), None);
        assert_eq!(parse_duration("tenh"), None);
        assert_eq!(parse_duration("-5m"), None);
    }

    #[test]
    fn test_parse_duration_rejects_huge_values() {
        assert_eq!(parse_duration("18446744073709551615d"), None);
        assert_eq!(parse_duration("999999999999h"), None);
        assert_eq!(parse_duration("3650d"), Some(Duration::from_secs(MAX_DURATION_SECS)));
    }

    #[test]
    fn test_huge_jwt_expiry_is_a_config_error() {
        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "mysql://u:p@h/db"),
            ("JWT_EXPIRES_IN", "99999999999999999d"),
        ]))
        .unwrap_err();
        assert!(err.contains("JWT_EXPIRES_IN"));
    }

    #[test]
    fn test_defaults_with_database_url() {
        let config = Config::from_lookup(lookup_from(&[(
            "DATABASE_URL",
            "mysql://root:pw@localhost:3306/marketplace",
        )]))
        .unwrap();

        assert_eq!(config.server_host, "127.0.0.1");
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.connect_timeout_secs, 60);
        assert_eq!(config.jwt_expires_in, Duration::from_secs(86_400));
        assert_eq!(config.upload_dir, "uploads");
        assert_eq!(config.app_env, "development");
        assert!(config.run_migrations);
        assert_eq!(config.cors_origins.len(), 6);
    }

    #[test]
    fn test_database_target_from_parts() {
        let config = Config::from_lookup(lookup_from(&[
            ("DB_HOST", "db"),
            ("DB_USER", "market"),
            ("DB_PASSWORD", "secret"),
            ("DB_NAME", "marketplace"),
        ]))
        .unwrap();

        assert_eq!(
            config.database,
            DatabaseTarget::Parts {
                host: "db".to_string(),
                port: 3306,
                user: "market".to_string(),
                password: "secret".to_string(),
                name: "marketplace".to_string(),
            }
        );
    }

    #[test]
    fn test_password_with_url_characters_stays_a_password() {
        let config = Config::from_lookup(lookup_from(&[
            ("DB_HOST", "db.internal"),
            ("DB_PORT", "3307"),
            ("DB_USER", "app"),
            ("DB_PASSWORD", "p@ss/w#rd"),
            ("DB_NAME", "marketplace"),
        ]))
        .unwrap();

        let options = config.database.connect_options().unwrap();
        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 3307);
        assert_eq!(options.get_username(), "app");
        assert_eq!(options.get_database(), Some("marketplace"));

        let masked = config.database.masked();
        assert_eq!(masked, "mysql://***@db.internal:3307/marketplace");
        assert!(!format!("{:?}", config).contains("w#rd"));
    }

    #[test]
    fn test_invalid_db_port_names_the_variable() {
        let err = Config::from_lookup(lookup_from(&[
            ("DB_HOST", "db"),
            ("DB_PORT", "mysql"),
            ("DB_USER", "app"),
            ("DB_NAME", "marketplace"),
        ]))
        .unwrap_err();
        assert!(err.contains("DB_PORT"));
    }

    #[test]
    fn test_missing_database_settings_is_an_error() {
        let result = Config::from_lookup(lookup_from(&[("DB_HOST", "db")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_port_fallback_and_cors_list() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "mysql://u:p@h/db"),
            ("PORT", "5000"),
            ("CORS_ORIGIN", "https://a.example, https://b.example,"),
            ("RUN_MIGRATIONS", "false"),
        ]))
        .unwrap();

        assert_eq!(config.server_port, 5000);
        assert_eq!(
            config.cors_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert!(!config.run_migrations);
    }

    #[test]
    fn test_invalid_port_names_the_variable() {
        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "mysql://u:p@h/db"),
            ("SERVER_PORT", "not-a-port"),
        ]))
        .unwrap_err();
        assert!(err.contains("SERVER_PORT"));
    }

    #[test]
    fn test_mask_url_hides_credentials() {
        assert_eq!(
            mask_url("mysql://root:pw@localhost:3306/db"),
            "mysql://***@localhost:3306/db"
        );
        assert_eq!(mask_url("mysql://app:p@ss@db:3306/x"), "mysql://***@db:3306/x");
        assert_eq!(mask_url("nonsense"), "***");
    }
}
