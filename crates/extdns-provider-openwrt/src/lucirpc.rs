//! Session client for the LuCI JSON-RPC endpoint
//!
//! LuCI exposes authentication and UCI manipulation as JSON-RPC over HTTP:
//! `POST {scheme}://{host}:{port}/cgi-bin/luci/rpc/{auth|uci}[?auth=token]`
//! with an envelope of `{"id": .., "method": .., "params": [..]}`.
//!
//! The client holds the session token obtained via `login` and retries a
//! failed call exactly once after re-authenticating on a 401/403. The token
//! is only ever replaced wholesale, never merged, so concurrent re-logins
//! are safe (last write wins).

use extdns_core::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// RPC path serving the login method
const AUTH_PATH: &str = "/cgi-bin/luci/rpc/auth";

/// RPC path serving the UCI methods
const UCI_PATH: &str = "/cgi-bin/luci/rpc/uci";

const METHOD_LOGIN: &str = "login";

/// Connection settings for the LuCI RPC endpoint
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LuciConfig {
    /// Router hostname or address
    pub hostname: String,

    /// RPC server port
    pub port: u16,

    /// Use https instead of http
    pub ssl: bool,

    /// Identifier placed in every request envelope
    pub rpc_id: i64,

    /// Connect and keep-alive timeout in seconds
    pub timeout_secs: u64,

    /// Skip TLS certificate validation
    pub insecure_skip_verify: bool,

    /// Login username
    pub username: String,

    /// Login password
    pub password: String,
}

impl Default for LuciConfig {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            port: 443,
            ssl: true,
            rpc_id: 1,
            timeout_secs: 15,
            insecure_skip_verify: false,
            username: String::new(),
            password: String::new(),
        }
    }
}

impl LuciConfig {
    /// Validate the connection settings
    pub fn validate(&self) -> Result<()> {
        if self.hostname.is_empty() {
            return Err(Error::config("hostname cannot be empty"));
        }
        if self.username.is_empty() {
            return Err(Error::config("username cannot be empty"));
        }

        Ok(())
    }
}

// Custom Debug implementation that hides the password
impl std::fmt::Debug for LuciConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LuciConfig")
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("ssl", &self.ssl)
            .field("rpc_id", &self.rpc_id)
            .field("timeout_secs", &self.timeout_secs)
            .field("insecure_skip_verify", &self.insecure_skip_verify)
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .finish()
    }
}

/// JSON-RPC request envelope
#[derive(Debug, Serialize)]
struct Payload<'a> {
    id: i64,
    method: &'a str,
    params: &'a [&'a str],
}

/// JSON-RPC response envelope
#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Value,
}

/// Stateful RPC client holding the LuCI session token
pub struct LuciClient {
    config: LuciConfig,
    token: RwLock<String>,
    http: reqwest::Client,
}

impl LuciClient {
    /// Build a client from connection settings
    pub fn new(config: LuciConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.insecure_skip_verify)
            .connect_timeout(timeout)
            .timeout(timeout)
            .tcp_keepalive(timeout)
            .build()
            .map_err(|e| Error::transport(format!("failed to build http client: {e}")))?;

        Ok(Self {
            config,
            token: RwLock::new(String::new()),
            http,
        })
    }

    /// Issue a UCI method call, re-authenticating once on 401/403
    pub async fn uci(&self, method: &str, params: &[&str]) -> Result<String> {
        self.rpc_with_auth(UCI_PATH, method, params).await
    }

    async fn login(&self) -> Result<()> {
        let token = self
            .rpc(
                AUTH_PATH,
                METHOD_LOGIN,
                &[self.config.username.as_str(), self.config.password.as_str()],
            )
            .await?;

        // LuCI answers wrong credentials with a 200 and a null result:
        // {"id":1,"result":null,"error":null}
        if token.is_empty() || token == "null" {
            return Err(Error::auth("login rejected by remote"));
        }

        *self.token.write().await = token;
        Ok(())
    }

    async fn rpc_with_auth(&self, path: &str, method: &str, params: &[&str]) -> Result<String> {
        match self.rpc(path, method, params).await {
            Err(err) if err.is_authorization() => {
                info!("re-authenticate");
                self.login().await?;
                self.rpc(path, method, params).await
            }
            result => result,
        }
    }

    async fn rpc(&self, path: &str, method: &str, params: &[&str]) -> Result<String> {
        let payload = Payload {
            id: self.config.rpc_id,
            method,
            params,
        };

        let url = self.uri(path, method).await;
        debug!(%url, method, "rpc call");

        let response = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::transport(e.to_string()))?;

        let status = response.status().as_u16();
        if status > 226 {
            return Err(match status {
                401 => Error::Unauthorized,
                403 => Error::Forbidden,
                _ => Error::HttpStatus(status),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::transport(e.to_string()))?;
        let envelope: RpcResponse = serde_json::from_str(&body)?;

        if !envelope.error.is_null() {
            return Err(Error::Rpc(stringify(&envelope.error)));
        }

        if envelope.result.is_null() {
            return Ok(String::new());
        }

        Ok(stringify(&envelope.result))
    }

    /// Build the request URL, appending the session token for every method
    /// except login
    async fn uri(&self, path: &str, method: &str) -> String {
        let proto = if self.config.ssl { "https" } else { "http" };
        let mut url = format!(
            "{proto}://{}:{}{path}",
            self.config.hostname, self.config.port
        );

        let token = self.token.read().await;
        if method != METHOD_LOGIN && !token.is_empty() {
            url.push_str("?auth=");
            url.push_str(&token);
        }

        url
    }
}

/// Render an RPC result or error field as a string: plain strings verbatim,
/// anything else as its JSON serialization
fn stringify(value: &Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}
