use crate::{
    config::{Config, ServerBinding},
    error::ClientError,
    transport::Transport,
};
use metarpc_proto::{connect_reply, ConnectByHostPortRequest, ConnectByServerNameRequest};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct Binding {
    host: String,
    port: u16,
}

struct Inner {
    transport: Option<Transport>,
    instance_id: Option<Uuid>,
    /// Authoritative once a cluster lookup has produced it; reused for the
    /// life of the session (never re-resolved on reconnect).
    binding: Option<Binding>,
    connected: bool,
}

/// Turns credentials into an instance identifier usable by every subsequent
/// call. The `connected` flag and `instance_id` are read and
/// written together under one lock so no caller ever observes a
/// half-updated session.
#[derive(Clone)]
pub struct Session {
    config: Config,
    inner: Arc<RwLock<Inner>>,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            inner: Arc::new(RwLock::new(Inner {
                transport: None,
                instance_id: None,
                binding: None,
                connected: false,
            })),
        }
    }

    /// If already connected, returns the current transport and instance
    /// identifier immediately; otherwise runs the connect protocol.
    pub async fn ensure_connected(&self) -> Result<(Transport, Uuid), ClientError> {
        {
            let guard = self.inner.read().await;
            if guard.connected {
                if let (Some(transport), Some(id)) = (&guard.transport, guard.instance_id) {
                    return Ok((transport.clone(), id));
                }
            }
        }
        self.reconnect().await
    }

    /// Unconditional reconnect: opens a fresh transport and replays the
    /// connect protocol using the session's authoritative binding, if one
    /// has already been established.
    pub async fn reconnect(&self) -> Result<(Transport, Uuid), ClientError> {
        let mut guard = self.inner.write().await;
        guard.connected = false;

        let endpoint = self.endpoint()?;
        let mut transport = Transport::connect(&endpoint, self.config.connect_timeout, self.config.tls).await?;

        let existing_binding = guard.binding.clone();
        let (instance_id, binding) = match existing_binding {
            Some(binding) => {
                let id = connect_by_host_port(
                    &mut transport,
                    &self.config,
                    &binding.host,
                    binding.port,
                )
                .await?;
                (id, binding)
            }
            None => match &self.config.credentials.server {
                ServerBinding::ClusterName(name) => {
                    connect_by_server_name(&mut transport, &self.config, name).await?
                }
                ServerBinding::HostPort { host, port } => {
                    let binding = Binding {
                        host: host.clone(),
                        port: *port,
                    };
                    let id =
                        connect_by_host_port(&mut transport, &self.config, host, *port).await?;
                    (id, binding)
                }
            },
        };

        info!(%instance_id, host = %binding.host, port = binding.port, "session connected");

        guard.transport = Some(transport.clone());
        guard.instance_id = Some(instance_id);
        guard.binding = Some(binding);
        guard.connected = true;

        Ok((transport, instance_id))
    }

    /// Marks the session as disconnected without clearing the resolved
    /// binding, so the next [`Session::ensure_connected`] reconnects using
    /// the same `(host, port)` rather than re-resolving a cluster name
    ///.
    pub async fn mark_disconnected(&self) {
        let mut guard = self.inner.write().await;
        guard.connected = false;
    }

    pub async fn close(&self) {
        let mut guard = self.inner.write().await;
        guard.connected = false;
        guard.transport = None;
        guard.instance_id = None;
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.read().await.connected
    }

    /// Snapshot of the instance identifier without triggering a connect -
    /// exposed for logging/correlation("Observable behaviors").
    pub async fn instance_id(&self) -> Option<Uuid> {
        self.inner.read().await.instance_id
    }

    fn endpoint(&self) -> Result<String, ClientError> {
        self.config.default_endpoint().ok_or_else(|| {
            ClientError::ConnectFailed(
                "no gRPC endpoint configured and credentials use a cluster name".to_string(),
            )
        })
    }
}

async fn connect_by_server_name(
    transport: &mut Transport,
    config: &Config,
    cluster: &str,
) -> Result<(Uuid, Binding), ClientError> {
    let request = ConnectByServerNameRequest {
        user: config.credentials.user,
        password: config.credentials.password.clone(),
        mt_cluster_name: cluster.to_string(),
        base_chart_symbol: String::new(),
        terminal_timeout_seconds: 30,
    };

    let reply = transport
        .connection
        .connect_by_server_name(request)
        .await?
        .into_inner();

    match reply.body {
        Some(connect_reply::Body::Data(data)) => {
            let instance_id = parse_instance_id(&data.terminal_instance_guid)?;
            Ok((
                instance_id,
                Binding {
                    host: data.resolved_host,
                    port: data.resolved_port as u16,
                },
            ))
        }
        Some(connect_reply::Body::Error(error)) => {
            Err(ClientError::ConnectFailed(format!("{}: {}", error.code, error.message)))
        }
        None => Err(ClientError::ConnectFailed("empty connect reply".to_string())),
    }
}

async fn connect_by_host_port(
    transport: &mut Transport,
    config: &Config,
    host: &str,
    port: u16,
) -> Result<Uuid, ClientError> {
    let request = ConnectByHostPortRequest {
        user: config.credentials.user,
        password: config.credentials.password.clone(),
        host: host.to_string(),
        port: port as u32,
        base_chart_symbol: String::new(),
        terminal_timeout_seconds: 30,
    };

    let reply = transport
        .connection
        .connect_by_host_port(request)
        .await?
        .into_inner();

    match reply.body {
        Some(connect_reply::Body::Data(data)) => parse_instance_id(&data.terminal_instance_guid),
        Some(connect_reply::Body::Error(error)) => {
            warn!(code = error.code, message = %error.message, "connect-by-host-port rejected");
            Err(ClientError::ConnectFailed(format!("{}: {}", error.code, error.message)))
        }
        None => Err(ClientError::ConnectFailed("empty connect reply".to_string())),
    }
}

fn parse_instance_id(raw: &str) -> Result<Uuid, ClientError> {
    Uuid::parse_str(raw)
        .map_err(|error| ClientError::ConnectFailed(format!("invalid instance id: {error}")))
}
