use derive_more::Constructor;
use std::time::Duration;

/// Credentials plus exactly one server binding. Immutable after the
/// [`Session`](crate::session::Session) that owns them is created.
#[derive(Debug, Clone, Constructor)]
pub struct Credentials {
    pub user: u64,
    pub password: String,
    pub server: ServerBinding,
}

/// A cluster name is resolved to a concrete `(host, port)` once, on first
/// connect; a direct `(host, port)` binding is used as-is. The binding is
/// authoritative for the life of the session and is never re-resolved.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ServerBinding {
    ClusterName(String),
    HostPort { host: String, port: u16 },
}

impl ServerBinding {
    pub fn host_port(host: impl Into<String>, port: u16) -> Self {
        Self::HostPort {
            host: host.into(),
            port,
        }
    }

    pub fn cluster(name: impl Into<String>) -> Self {
        Self::ClusterName(name.into())
    }
}

/// Configuration consumed by the core. Everything outside this
/// table - CLI parsing, JSON/env loading - is an external collaborator.
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    /// gRPC gateway endpoint, `host:port`. Defaults to the credentials' own
    /// `host:port` binding when that form is used and no override is given.
    pub grpc_endpoint: Option<String>,
    pub test_symbol: String,
    pub test_volume: f64,
    /// Upper bound on dialing the gateway, passed to
    /// [`Transport::connect`](crate::transport::Transport::connect). Does
    /// not bound the call deadlines applied once connected.
    pub connect_timeout: Duration,
    /// Whether [`Transport::connect`](crate::transport::Transport::connect)
    /// negotiates TLS. `false` is for connecting to a gateway reachable
    /// only over a plaintext loopback, such as an in-process test double.
    pub tls: bool,
}

impl Config {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            grpc_endpoint: None,
            test_symbol: "EURUSD".to_string(),
            test_volume: 0.01,
            connect_timeout: Duration::from_secs(10),
            tls: true,
        }
    }

    pub fn with_grpc_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.grpc_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    /// Endpoint the [`Transport`](crate::transport::Transport) connects to.
    /// Only meaningful when the credentials carry a direct `(host, port)`
    /// binding - a cluster name has no endpoint until it is resolved by the
    /// gateway's connect-by-server-name operation.
    pub fn default_endpoint(&self) -> Option<String> {
        self.grpc_endpoint.clone().or_else(|| match &self.credentials.server {
            ServerBinding::HostPort { host, port } => Some(format!("{host}:{port}")),
            ServerBinding::ClusterName(_) => None,
        })
    }
}
