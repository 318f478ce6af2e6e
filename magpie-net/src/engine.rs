//! Anonymizing request engine
//!
//! Stubborn HTTP client that routes through a SOCKS proxy and swaps
//! circuits whenever a request fails or the exit node looks unreliable.
//! Some exits intercept TLS and serve their own error pages; a succeeded
//! request with clearly-wrong content is treated exactly like a failed one.

use std::time::Duration;

use reqwest::{Client, Method, Proxy, Response};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::controller::CircuitController;
use crate::error::EngineError;
use crate::identity::random_user_agent;

/// Pause between controller recovery attempts.
const CONTROLLER_RETRY_PAUSE: Duration = Duration::from_millis(250);

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Control-port address of the local anonymity daemon.
    pub control_addr: String,
    /// Control-port password.
    pub control_password: String,
    /// SOCKS proxy URL; `None` sends requests directly.
    pub proxy: Option<String>,
    /// Endpoint reporting the egress address as `{"ip": "<addr>"}`.
    pub probe_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Overall deadline for a single request, rotations included.
    /// `None` retries until a response arrives.
    pub give_up_after: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            control_addr: "127.0.0.1:9051".to_string(),
            control_password: "password".to_string(),
            proxy: Some("socks5://localhost:9050".to_string()),
            probe_url: "https://api.ipify.org/?format=json".to_string(),
            timeout_secs: 45,
            give_up_after: None,
        }
    }
}

/// Stubborn and anonymous request engine.
///
/// Construction authenticates to the circuit controller and blocks until a
/// verified circuit is ready. Requests never fail on network errors: every
/// failure rotates the circuit and retries, either forever or until the
/// configured [`give_up_after`] deadline expires.
///
/// [`give_up_after`]: EngineConfig::give_up_after
#[derive(Debug)]
pub struct AnonEngine {
    config: EngineConfig,
    controller: CircuitController,
    client: Client,
    exit_ip: Option<String>,
}

impl AnonEngine {
    /// Authenticate to the controller, then acquire a verified circuit.
    ///
    /// Only controller authentication (and an unusable proxy URL) can fail
    /// here; circuit trouble is rotated away before this returns.
    pub async fn connect(config: EngineConfig) -> Result<Self, EngineError> {
        let controller =
            CircuitController::connect(&config.control_addr, &config.control_password).await?;
        let client = build_client(&config)?;
        let mut engine = Self {
            config,
            controller,
            client,
            exit_ip: None,
        };
        engine.rotate_circuit().await;
        Ok(engine)
    }

    /// GET `url`, rotating circuits until a response arrives.
    pub async fn get(&mut self, url: &str) -> Result<Response, EngineError> {
        self.send(Method::GET, url, None).await
    }

    /// POST `url` with a JSON body, rotating circuits until a response
    /// arrives.
    pub async fn post<T: Serialize>(&mut self, url: &str, json: &T) -> Result<Response, EngineError> {
        let body = serde_json::to_value(json)?;
        self.send(Method::POST, url, Some(body)).await
    }

    /// Last verified egress address, if any.
    pub fn exit_ip(&self) -> Option<&str> {
        self.exit_ip.as_deref()
    }

    /// Swap to a fresh circuit and keep swapping until one verifies.
    ///
    /// Each cycle signals the controller, rebuilds the HTTP client with a
    /// newly randomized identity header, and probes the exit. Controller
    /// hiccups are recovered by reconnecting; nothing here surfaces as an
    /// error.
    pub async fn rotate_circuit(&mut self) {
        loop {
            if let Err(e) = self.controller.new_circuit().await {
                debug!("circuit signal failed: {}, reconnecting controller", e);
                if let Err(e) = self.controller.reconnect().await {
                    debug!("controller reconnect failed: {}", e);
                    tokio::time::sleep(CONTROLLER_RETRY_PAUSE).await;
                }
                continue;
            }

            match build_client(&self.config) {
                Ok(client) => self.client = client,
                Err(e) => {
                    debug!("client rebuild failed: {}", e);
                    tokio::time::sleep(CONTROLLER_RETRY_PAUSE).await;
                    continue;
                }
            }

            if !self.verify_circuit().await {
                break;
            }
        }
    }

    /// Probe the current circuit's egress.
    ///
    /// Returns `true` when the circuit must be rotated again: the probe
    /// errored, or its body reads as an interception page instead of the
    /// expected `{"ip": ...}`. Returns `false` and records the resolved
    /// address otherwise.
    pub async fn verify_circuit(&mut self) -> bool {
        let body = match self.client.get(&self.config.probe_url).send().await {
            Ok(response) => match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    debug!("probe body read failed: {}", e);
                    return true;
                }
            },
            Err(e) => {
                debug!("probe request failed: {}", e);
                return true;
            }
        };

        match parse_probe(&body) {
            Some(ip) => {
                info!("new exit identity: {}", ip);
                self.exit_ip = Some(ip);
                false
            }
            None => {
                debug!("exit returned a tampered probe body, rotating");
                true
            }
        }
    }

    async fn send(
        &mut self,
        method: Method,
        url: &str,
        json: Option<Value>,
    ) -> Result<Response, EngineError> {
        match self.config.give_up_after {
            Some(deadline) => {
                tokio::time::timeout(deadline, self.send_with_rotation(method, url, json))
                    .await
                    .map_err(|_| EngineError::Aborted)
            }
            None => Ok(self.send_with_rotation(method, url, json).await),
        }
    }

    /// The retry loop: every failure is transient and answered with a
    /// rotation. Termination depends on eventually getting a working
    /// circuit, or on the deadline in [`send`](Self::send).
    async fn send_with_rotation(&mut self, method: Method, url: &str, json: Option<Value>) -> Response {
        loop {
            let mut request = self.client.request(method.clone(), url);
            if let Some(ref body) = json {
                request = request.json(body);
            }
            match request.send().await {
                Ok(response) => return response,
                Err(e) => {
                    debug!("request to {} failed: {}, rotating circuit", url, e);
                    self.rotate_circuit().await;
                }
            }
        }
    }
}

/// Build a client bound to the configured proxy, with a fresh identity
/// header.
fn build_client(config: &EngineConfig) -> Result<Client, EngineError> {
    let mut builder = Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(random_user_agent());

    if let Some(ref proxy) = config.proxy {
        builder = builder.proxy(Proxy::all(proxy).map_err(|e| EngineError::ClientBuild(e.to_string()))?);
    }

    builder
        .build()
        .map_err(|e| EngineError::ClientBuild(e.to_string()))
}

/// Extract the reported address from a probe response body.
///
/// Returns `None` for interception pages (the `DOCTYPE` sniff) and for
/// anything that is not `{"ip": "<addr>"}`.
fn parse_probe(body: &str) -> Option<String> {
    if body.contains("DOCTYPE") {
        return None;
    }
    let value: Value = serde_json::from_str(body).ok()?;
    value.get("ip")?.as_str().map(str::to_string)
}
