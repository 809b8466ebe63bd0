/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `300` -- generation is
    /// slow and runs to completion).
    pub request_timeout_secs: u64,
    /// Directory generated artifacts are written to and served from.
    pub output_dir: String,
    /// Base URL clients can retrieve artifacts under.
    pub public_base_url: String,
    /// Optional accelerator memory budget override in MiB. Useful to
    /// leave headroom for a desktop compositor sharing the card.
    pub device_memory_budget_mib: Option<u64>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                  |
    /// |---------------------------|--------------------------|
    /// | `HOST`                    | `0.0.0.0`                |
    /// | `PORT`                    | `8000`                   |
    /// | `CORS_ORIGINS`            | `http://localhost:3000`  |
    /// | `REQUEST_TIMEOUT_SECS`    | `300`                    |
    /// | `OUTPUT_DIR`              | `outputs`                |
    /// | `PUBLIC_BASE_URL`         | `http://localhost:8000`  |
    /// | `DEVICE_MEMORY_BUDGET_MB` | unset                    |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "300".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let output_dir = std::env::var("OUTPUT_DIR").unwrap_or_else(|_| "outputs".into());

        let public_base_url =
            std::env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| "http://localhost:8000".into());

        let device_memory_budget_mib = std::env::var("DEVICE_MEMORY_BUDGET_MB")
            .ok()
            .map(|v| v.parse().expect("DEVICE_MEMORY_BUDGET_MB must be a valid u64"));

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            output_dir,
            public_base_url,
            device_memory_budget_mib,
        }
    }
}
