//! Application constants
//!
//! Single source of truth for paths, defaults and environment variable names.

/// Default configuration file path
pub const CONFIG_PATH: &str = "config/config.yaml";

/// Default environment file path
pub const ENV_PATH: &str = "config/.env";

/// Default report file written after every CLI run
pub const RESULTS_PATH: &str = "results.json";

/// Service name reported by `/health`
pub const SERVICE_NAME: &str = "ops-agent";

/// Alias under which the default MCP server is always reachable
pub const DEFAULT_SERVER_ALIAS: &str = "default";

pub const DEFAULT_MCP_TIMEOUT: &str = "30s";
pub const DEFAULT_LLM_TIMEOUT: &str = "60s";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o";
pub const DEFAULT_LLM_PROVIDER: &str = "azure";
pub const DEFAULT_TIME_RANGE: &str = "1h";
pub const DEFAULT_MAX_ITERATIONS: usize = 5;
pub const DEFAULT_HTTP_HOST: &str = "0.0.0.0";
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Request body version expected by the LLM gateway
pub const GATEWAY_API_VERSION: &str = "2024-05-13";

/// MCP protocol revision announced during `initialize`
pub const MCP_PROTOCOL_VERSION: &str = "2025-06-18";

pub const ENV_MCP_SERVERS_JSON: &str = "MCP_SERVERS_JSON";
pub const ENV_MCP_SERVER_URL: &str = "MCP_SERVER_URL";
pub const ENV_MCP_TOKEN: &str = "MCP_TOKEN";
pub const ENV_LLM_URL: &str = "LLM_URL";
pub const ENV_LLM_TOKEN: &str = "LLM_TOKEN";
pub const ENV_LLM_MODEL: &str = "LLM_MODEL";
pub const ENV_LLM_HEADERS_JSON: &str = "LLM_HEADERS_JSON";
pub const ENV_NOTIFY_URL: &str = "NOTIFY_URL";
pub const ENV_NOTIFY_KEY: &str = "NOTIFY_KEY";
pub const ENV_HOST: &str = "HOST";
pub const ENV_PORT: &str = "PORT";
