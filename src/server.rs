//! Plugin server: the `ProviderService` trait and the serve loop.
//!
//! The provider runs as a subprocess of the plugin host. On startup it binds
//! a localhost TCP port, prints a handshake line to stdout
//! (`REDMINE_PROVIDER|<protocol_version>|<address>`) and then answers
//! newline-delimited JSON requests until the host disconnects, sends a
//! `stop` request, or the process receives SIGTERM/SIGINT.
//!
//! Provider errors never tear down the connection; they are returned as
//! error diagnostics in the response so the host can render them.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

use crate::error::ProviderError;
use crate::schema::{Diagnostic, ProviderSchema};
use crate::types::{
    ImportedResource, PlanResult, ProviderMetadata, HANDSHAKE_PREFIX, PROTOCOL_VERSION,
};

/// Trait that the provider implements and the serve loop dispatches to.
///
/// Lifecycle operations take and return resource state as
/// `serde_json::Value` attribute maps; the plugin host owns persistence of
/// that state between invocations.
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    /// Return the provider's schema including all resources.
    fn schema(&self) -> ProviderSchema;

    /// Return provider metadata. By default, derived from the schema.
    fn metadata(&self) -> ProviderMetadata {
        let schema = self.schema();
        let mut resources: Vec<String> = schema.resources.keys().cloned().collect();
        resources.sort();
        ProviderMetadata {
            resources,
            capabilities: Default::default(),
        }
    }

    /// Validate the provider configuration before configuring.
    async fn validate_provider_config(
        &self,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = config;
        Ok(vec![])
    }

    /// Configure the provider with credentials and settings.
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Stop the provider gracefully.
    async fn stop(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Validate a resource's configuration before planning.
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = (resource_type, config);
        Ok(vec![])
    }

    /// Upgrade resource state from an older schema version.
    async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: i64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        let _ = (resource_type, version);
        Ok(state)
    }

    /// Plan changes for a resource.
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError>;

    /// Create a new resource.
    async fn create(&self, resource_type: &str, planned_state: Value)
        -> Result<Value, ProviderError>;

    /// Read the current state of a resource.
    async fn read(&self, resource_type: &str, current_state: Value)
        -> Result<Value, ProviderError>;

    /// Update an existing resource.
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Delete a resource.
    async fn delete(&self, resource_type: &str, current_state: Value)
        -> Result<(), ProviderError>;

    /// Import existing infrastructure into management.
    async fn import_resource(
        &self,
        resource_type: &str,
        _id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        Err(ProviderError::UnknownResource(format!(
            "import not supported for resource type: {}",
            resource_type
        )))
    }
}

/// A request from the plugin host, one JSON object per line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// Provider capabilities and resource type names.
    GetMetadata,
    /// Full provider and resource schemas.
    GetSchema,
    /// Validate provider configuration.
    ValidateProviderConfig {
        /// Raw provider configuration.
        config: Value,
    },
    /// Configure the provider.
    Configure {
        /// Raw provider configuration.
        config: Value,
    },
    /// Validate a resource configuration.
    ValidateResourceConfig {
        /// Resource type name.
        resource_type: String,
        /// Raw resource configuration.
        config: Value,
    },
    /// Migrate state written by an older schema version.
    UpgradeResourceState {
        /// Resource type name.
        resource_type: String,
        /// Schema version the state was written with.
        version: i64,
        /// The stored state.
        state: Value,
    },
    /// Compute required changes.
    Plan {
        /// Resource type name.
        resource_type: String,
        /// State from the last apply, absent when creating.
        prior_state: Option<Value>,
        /// Desired state, null when destroying.
        proposed_state: Value,
        /// Raw resource configuration.
        config: Value,
    },
    /// Create a resource.
    Create {
        /// Resource type name.
        resource_type: String,
        /// Planned state to realize.
        planned_state: Value,
    },
    /// Read a resource.
    Read {
        /// Resource type name.
        resource_type: String,
        /// State from the last apply.
        current_state: Value,
    },
    /// Update a resource.
    Update {
        /// Resource type name.
        resource_type: String,
        /// State from the last apply.
        prior_state: Value,
        /// Planned state to realize.
        planned_state: Value,
    },
    /// Delete a resource.
    Delete {
        /// Resource type name.
        resource_type: String,
        /// State from the last apply.
        current_state: Value,
    },
    /// Adopt an existing remote object by identifier.
    ImportResourceState {
        /// Resource type name.
        resource_type: String,
        /// Remote identifier.
        id: String,
    },
    /// Graceful shutdown.
    Stop,
}

/// Response to a [`Request`]; unused fields are omitted from the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Response {
    /// Errors and warnings from the operation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
    /// Metadata, for `get_metadata`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ProviderMetadata>,
    /// Schemas, for `get_schema`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<ProviderSchema>,
    /// Resulting state, for state-producing operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
    /// Plan outcome, for `plan`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<PlanResult>,
    /// Imported resources, for `import_resource_state`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imported: Vec<ImportedResource>,
}

impl Response {
    fn from_error(err: ProviderError) -> Self {
        Self {
            diagnostics: vec![Diagnostic::error(err.to_string())],
            ..Default::default()
        }
    }

    fn from_diagnostics(diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            diagnostics,
            ..Default::default()
        }
    }
}

/// Dispatch a single request to the provider.
#[instrument(skip(provider, request), fields(op = request_op(&request)))]
pub async fn dispatch<P: ProviderService>(provider: &P, request: Request) -> Response {
    debug!("dispatching request");
    match request {
        Request::GetMetadata => Response {
            metadata: Some(provider.metadata()),
            ..Default::default()
        },
        Request::GetSchema => Response {
            schema: Some(provider.schema()),
            ..Default::default()
        },
        Request::ValidateProviderConfig { config } => {
            match provider.validate_provider_config(config).await {
                Ok(diagnostics) => Response::from_diagnostics(diagnostics),
                Err(e) => {
                    error!(error = %e, "validate_provider_config failed");
                    Response::from_error(e)
                }
            }
        }
        Request::Configure { config } => match provider.configure(config).await {
            Ok(diagnostics) => {
                info!("provider configured");
                Response::from_diagnostics(diagnostics)
            }
            Err(e) => {
                error!(error = %e, "configure failed");
                Response::from_error(e)
            }
        },
        Request::ValidateResourceConfig {
            resource_type,
            config,
        } => {
            match provider
                .validate_resource_config(&resource_type, config)
                .await
            {
                Ok(diagnostics) => Response::from_diagnostics(diagnostics),
                Err(e) => {
                    error!(%resource_type, error = %e, "validate_resource_config failed");
                    Response::from_error(e)
                }
            }
        }
        Request::UpgradeResourceState {
            resource_type,
            version,
            state,
        } => {
            match provider
                .upgrade_resource_state(&resource_type, version, state)
                .await
            {
                Ok(upgraded) => Response {
                    state: Some(upgraded),
                    ..Default::default()
                },
                Err(e) => {
                    error!(%resource_type, version, error = %e, "upgrade_resource_state failed");
                    Response::from_error(e)
                }
            }
        }
        Request::Plan {
            resource_type,
            prior_state,
            proposed_state,
            config,
        } => {
            match provider
                .plan(&resource_type, prior_state, proposed_state, config)
                .await
            {
                Ok(result) => {
                    info!(
                        %resource_type,
                        changes = result.changes.len(),
                        requires_replace = result.requires_replace,
                        "plan completed"
                    );
                    Response {
                        plan: Some(result),
                        ..Default::default()
                    }
                }
                Err(e) => {
                    error!(%resource_type, error = %e, "plan failed");
                    Response::from_error(e)
                }
            }
        }
        Request::Create {
            resource_type,
            planned_state,
        } => match provider.create(&resource_type, planned_state).await {
            Ok(state) => {
                info!(%resource_type, "create completed");
                Response {
                    state: Some(state),
                    ..Default::default()
                }
            }
            Err(e) => {
                error!(%resource_type, error = %e, "create failed");
                Response::from_error(e)
            }
        },
        Request::Read {
            resource_type,
            current_state,
        } => match provider.read(&resource_type, current_state).await {
            Ok(state) => Response {
                state: Some(state),
                ..Default::default()
            },
            Err(e) => {
                error!(%resource_type, error = %e, "read failed");
                Response::from_error(e)
            }
        },
        Request::Update {
            resource_type,
            prior_state,
            planned_state,
        } => {
            match provider
                .update(&resource_type, prior_state, planned_state)
                .await
            {
                Ok(state) => {
                    info!(%resource_type, "update completed");
                    Response {
                        state: Some(state),
                        ..Default::default()
                    }
                }
                Err(e) => {
                    error!(%resource_type, error = %e, "update failed");
                    Response::from_error(e)
                }
            }
        }
        Request::Delete {
            resource_type,
            current_state,
        } => match provider.delete(&resource_type, current_state).await {
            Ok(()) => {
                info!(%resource_type, "delete completed");
                Response::default()
            }
            Err(e) => {
                error!(%resource_type, error = %e, "delete failed");
                Response::from_error(e)
            }
        },
        Request::ImportResourceState { resource_type, id } => {
            match provider.import_resource(&resource_type, &id).await {
                Ok(imported) => {
                    info!(%resource_type, %id, count = imported.len(), "import completed");
                    Response {
                        imported,
                        ..Default::default()
                    }
                }
                Err(e) => {
                    error!(%resource_type, %id, error = %e, "import failed");
                    Response::from_error(e)
                }
            }
        }
        Request::Stop => Response::default(),
    }
}

fn request_op(request: &Request) -> &'static str {
    match request {
        Request::GetMetadata => "get_metadata",
        Request::GetSchema => "get_schema",
        Request::ValidateProviderConfig { .. } => "validate_provider_config",
        Request::Configure { .. } => "configure",
        Request::ValidateResourceConfig { .. } => "validate_resource_config",
        Request::UpgradeResourceState { .. } => "upgrade_resource_state",
        Request::Plan { .. } => "plan",
        Request::Create { .. } => "create",
        Request::Read { .. } => "read",
        Request::Update { .. } => "update",
        Request::Delete { .. } => "delete",
        Request::ImportResourceState { .. } => "import_resource_state",
        Request::Stop => "stop",
    }
}

/// Options for configuring the provider server.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    /// Timeout for graceful shutdown. After receiving a shutdown signal,
    /// the server will wait this long for in-flight requests to complete.
    /// Default: 30 seconds.
    pub shutdown_timeout: Duration,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl ServeOptions {
    /// Create new serve options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the shutdown timeout.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");
        let mut sigint = signal(SignalKind::interrupt()).expect("Failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                eprintln!("Received SIGTERM, initiating graceful shutdown...");
            }
            _ = sigint.recv() => {
                eprintln!("Received SIGINT, initiating graceful shutdown...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C handler");
        eprintln!("Received CTRL+C, initiating graceful shutdown...");
    }
}

/// Serve a provider on an ephemeral localhost port.
///
/// This function:
/// 1. Finds an available port
/// 2. Outputs the handshake string to stdout
/// 3. Answers requests until stopped
/// 4. Handles shutdown signals (SIGTERM/SIGINT) gracefully
///
/// The handshake format is: `REDMINE_PROVIDER|<version>|<address>`
pub async fn serve<P: ProviderService>(provider: P) -> Result<(), Box<dyn std::error::Error>> {
    serve_with_options(provider, ServeOptions::default()).await
}

/// Serve a provider with custom options. See [`serve`] for details.
pub async fn serve_with_options<P: ProviderService>(
    provider: P,
    options: ServeOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    serve_on_listener(provider, listener, addr, options).await
}

/// Serve a provider on a specific address.
pub async fn serve_on<P: ProviderService>(
    provider: P,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error>> {
    serve_on_with_options(provider, addr, ServeOptions::default()).await
}

/// Serve a provider on a specific address with custom options.
pub async fn serve_on_with_options<P: ProviderService>(
    provider: P,
    addr: SocketAddr,
    options: ServeOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    serve_on_listener(provider, listener, actual_addr, options).await
}

async fn serve_on_listener<P: ProviderService>(
    provider: P,
    listener: TcpListener,
    addr: SocketAddr,
    options: ServeOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    // Handshake goes to stdout; everything else to stderr via tracing
    println!("{}|{}|{}", HANDSHAKE_PREFIX, PROTOCOL_VERSION, addr);

    info!(address = %addr, "provider server starting");

    let provider = Arc::new(provider);
    let (stop_tx, mut stop_rx) = watch::channel(false);
    let mut connections = JoinSet::new();

    let signals = wait_for_shutdown_signal();
    tokio::pin!(signals);

    loop {
        tokio::select! {
            _ = &mut signals => {
                info!("shutdown signal received");
                break;
            }
            _ = stop_rx.changed() => {
                info!("stop requested by host");
                break;
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        debug!(%peer, "host connected");
                        let provider = Arc::clone(&provider);
                        let stop_tx = stop_tx.clone();
                        connections.spawn(async move {
                            if let Err(e) = handle_connection(provider, stream, stop_tx).await {
                                warn!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "accept failed");
                    }
                }
            }
        }
    }

    // Let in-flight requests finish, but not forever
    let drain = async {
        while connections.join_next().await.is_some() {}
    };
    if tokio::time::timeout(options.shutdown_timeout, drain)
        .await
        .is_err()
    {
        warn!(
            timeout = ?options.shutdown_timeout,
            "shutdown timeout exceeded, forcing shutdown"
        );
        connections.abort_all();
    }

    debug!("calling provider stop()");
    if let Err(e) = provider.stop().await {
        warn!(error = %e, "provider stop() returned error");
    }

    info!("provider shutdown complete");
    Ok(())
}

async fn handle_connection<P: ProviderService>(
    provider: Arc<P>,
    stream: tokio::net::TcpStream,
    stop_tx: watch::Sender<bool>,
) -> Result<(), ProviderError> {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let (response, stop_requested) = match serde_json::from_str::<Request>(&line) {
            Ok(request) => {
                let stop_requested = matches!(request, Request::Stop);
                (dispatch(provider.as_ref(), request).await, stop_requested)
            }
            Err(e) => (
                Response::from_diagnostics(vec![Diagnostic::error("Malformed request")
                    .with_detail(e.to_string())]),
                false,
            ),
        };

        let mut payload = serde_json::to_vec(&response)?;
        payload.push(b'\n');
        write_half.write_all(&payload).await?;
        write_half.flush().await?;

        if stop_requested {
            // Best effort; the serve loop may already be shutting down
            let _ = stop_tx.send(true);
            break;
        }
    }

    Ok(())
}
