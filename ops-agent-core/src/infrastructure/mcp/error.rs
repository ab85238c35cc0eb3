use thiserror::Error;

#[derive(Debug, Error)]
pub enum McpError {
    #[error("MCP server '{server}' is not configured")]
    NotConfigured { server: String },
    #[error("MCP server '{server}' transport error: {source}")]
    Http {
        server: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("MCP server '{server}' did not answer within the configured timeout")]
    Timeout { server: String },
    #[error("MCP server '{server}' responded with HTTP {status}: {body}")]
    Status {
        server: String,
        status: u16,
        body: String,
    },
    #[error("MCP server '{server}' returned JSON-RPC error {code}: {message}")]
    Rpc {
        server: String,
        code: i64,
        message: String,
    },
    #[error("MCP server '{server}' returned an invalid response: {reason}")]
    InvalidResponse { server: String, reason: String },
}

impl McpError {
    pub fn http(server: impl Into<String>, source: reqwest::Error) -> Self {
        let server = server.into();
        if source.is_timeout() {
            Self::Timeout { server }
        } else {
            Self::Http { server, source }
        }
    }

    pub fn invalid_response(server: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            server: server.into(),
            reason: reason.into(),
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            McpError::NotConfigured { server } => {
                format!("MCP server \"{server}\" is not configured. Check mcp_servers or MCP_SERVERS_JSON.")
            }
            McpError::Http { server, source } => {
                if source.is_connect() {
                    format!("Cannot connect to MCP server \"{server}\".")
                } else {
                    format!("Network error while calling MCP server \"{server}\".")
                }
            }
            McpError::Timeout { server } => {
                format!("MCP server \"{server}\" timed out.")
            }
            McpError::Status { server, status, .. } => {
                format!("MCP server \"{server}\" rejected the request (HTTP {status}).")
            }
            McpError::Rpc { server, message, .. } => {
                format!("MCP server \"{server}\" reported an error: {message}")
            }
            McpError::InvalidResponse { server, .. } => {
                format!("MCP server \"{server}\" sent a response that could not be understood.")
            }
        }
    }
}
