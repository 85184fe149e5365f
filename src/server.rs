//! gRPC server for the provider.
//!
//! [`ProviderService`] is the JSON-level API the provider implements; the
//! adapter in this module turns it into the generated `provider.v1.Provider`
//! service. Handler errors never fail an RPC: they are returned as error
//! diagnostics on the response.
//!
//! # Signal Handling
//!
//! On SIGTERM or SIGINT (Ctrl-C elsewhere) the server:
//! 1. Stops accepting new connections
//! 2. Waits for in-flight requests, for at most the shutdown timeout
//! 3. Calls the provider's `stop()` method

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tonic::transport::Server;
use tracing::{debug, error, info, instrument, warn};

use crate::error::ProviderError;
use crate::generated;
use crate::schema::{BlockNestingMode, Diagnostic, DiagnosticSeverity, ProviderSchema};
use crate::types::{
    ImportedResource, PlanResult, ProviderMetadata, StateResponse, HANDSHAKE_PREFIX,
    PROTOCOL_VERSION,
};

/// Provider operations over JSON values.
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    fn schema(&self) -> ProviderSchema;

    /// Type names, derived from the schema by default.
    fn metadata(&self) -> ProviderMetadata {
        let schema = self.schema();
        ProviderMetadata {
            resources: schema.resources.keys().cloned().collect(),
            data_sources: schema.data_sources.keys().cloned().collect(),
            capabilities: Default::default(),
        }
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = config;
        Ok(vec![])
    }

    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError>;

    async fn stop(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = (resource_type, config);
        Ok(vec![])
    }

    /// Upgrade state written by an older schema version. Every schema is
    /// still at version 0, so state passes through.
    async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: i64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        let _ = (resource_type, version);
        Ok(state)
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError>;

    async fn create(&self, resource_type: &str, planned_state: Value)
        -> Result<StateResponse, ProviderError>;

    /// A null state in the response drops the resource from state.
    async fn read(&self, resource_type: &str, current_state: Value)
        -> Result<StateResponse, ProviderError>;

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<StateResponse, ProviderError>;

    /// Returns warnings; errors go through `Err`.
    async fn delete(&self, resource_type: &str, current_state: Value)
        -> Result<Vec<Diagnostic>, ProviderError>;

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let _ = id;
        Err(ProviderError::Unimplemented(format!(
            "Import not supported for resource type: {}",
            resource_type
        )))
    }

    // =========================================================================
    // Data Source Operations
    // =========================================================================

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = (data_source_type, config);
        Ok(vec![])
    }

    async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<StateResponse, ProviderError> {
        let _ = config;
        Err(ProviderError::UnknownResource(data_source_type.to_string()))
    }
}

fn diagnostics_to_proto(diagnostics: Vec<Diagnostic>) -> Vec<generated::Diagnostic> {
    diagnostics
        .into_iter()
        .map(|d| generated::Diagnostic {
            severity: match d.severity {
                DiagnosticSeverity::Error => generated::diagnostic::Severity::Error as i32,
                DiagnosticSeverity::Warning => generated::diagnostic::Severity::Warning as i32,
            },
            summary: d.summary,
            detail: d.detail.unwrap_or_default(),
            attribute: d.attribute.unwrap_or_default(),
        })
        .collect()
}

fn error_to_proto(err: ProviderError) -> Vec<generated::Diagnostic> {
    diagnostics_to_proto(err.into_diagnostics())
}

fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics
        .iter()
        .any(|d| matches!(d.severity, DiagnosticSeverity::Error))
}

/// Decode a JSON payload; an empty or malformed one reads as null.
fn decode(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes).unwrap_or_else(|e| {
        warn!(error = %e, "Discarding malformed JSON payload");
        Value::Null
    })
}

fn encode(value: &Value) -> Vec<u8> {
    serde_json::to_vec(value).unwrap_or_default()
}

fn schema_to_proto(schema: &crate::schema::Schema) -> generated::Schema {
    generated::Schema {
        version: schema.version as i64,
        block: Some(block_to_proto(&schema.block)),
    }
}

fn block_to_proto(block: &crate::schema::Block) -> generated::Block {
    generated::Block {
        attributes: block
            .attributes
            .iter()
            .map(|(name, attr)| generated::Attribute {
                name: name.clone(),
                r#type: serde_json::to_vec(&attr.attr_type).unwrap_or_default(),
                required: attr.flags.required,
                optional: attr.flags.optional,
                computed: attr.flags.computed,
                sensitive: attr.flags.sensitive,
                description: attr.description.clone().unwrap_or_default(),
                force_new: attr.force_new,
                default_value: attr.default.as_ref().map(encode).unwrap_or_default(),
            })
            .collect(),
        block_types: block
            .blocks
            .iter()
            .map(|(name, nested)| generated::NestedBlock {
                type_name: name.clone(),
                block: Some(block_to_proto(&nested.block)),
                nesting_mode: match nested.nesting_mode {
                    BlockNestingMode::Single => generated::nested_block::NestingMode::Single as i32,
                    BlockNestingMode::List => generated::nested_block::NestingMode::List as i32,
                },
                min_items: nested.min_items as i32,
                max_items: nested.max_items() as i32,
            })
            .collect(),
        description: block.description.clone().unwrap_or_default(),
    }
}

/// Adapter from [`ProviderService`] to the generated gRPC trait.
struct ProviderGrpcService<P: ProviderService> {
    provider: Arc<P>,
}

type GrpcResult<T> = Result<tonic::Response<T>, tonic::Status>;

#[tonic::async_trait]
impl<P: ProviderService> generated::provider_server::Provider for ProviderGrpcService<P> {
    #[instrument(skip(self, _request), name = "grpc.get_metadata")]
    async fn get_metadata(
        &self,
        _request: tonic::Request<generated::GetMetadataRequest>,
    ) -> GrpcResult<generated::GetMetadataResponse> {
        let metadata = self.provider.metadata();
        debug!(
            resources = metadata.resources.len(),
            data_sources = metadata.data_sources.len(),
            "GetMetadata completed"
        );
        Ok(tonic::Response::new(generated::GetMetadataResponse {
            server_capabilities: Some(generated::ServerCapabilities {
                plan_destroy: metadata.capabilities.plan_destroy,
            }),
            resources: metadata.resources,
            data_sources: metadata.data_sources,
            diagnostics: vec![],
        }))
    }

    #[instrument(skip(self, _request), name = "grpc.get_schema")]
    async fn get_schema(
        &self,
        _request: tonic::Request<generated::GetSchemaRequest>,
    ) -> GrpcResult<generated::GetSchemaResponse> {
        let schema = self.provider.schema();
        debug!(
            resources = schema.resources.len(),
            data_sources = schema.data_sources.len(),
            "GetSchema completed"
        );
        Ok(tonic::Response::new(generated::GetSchemaResponse {
            provider: Some(schema_to_proto(&schema.provider)),
            resources: schema
                .resources
                .iter()
                .map(|(k, v)| (k.clone(), schema_to_proto(v)))
                .collect(),
            data_sources: schema
                .data_sources
                .iter()
                .map(|(k, v)| (k.clone(), schema_to_proto(v)))
                .collect(),
            diagnostics: vec![],
        }))
    }

    #[instrument(skip(self, request), name = "grpc.validate_provider_config")]
    async fn validate_provider_config(
        &self,
        request: tonic::Request<generated::ValidateProviderConfigRequest>,
    ) -> GrpcResult<generated::ValidateProviderConfigResponse> {
        let config = decode(&request.into_inner().config);
        let diagnostics = match self.provider.validate_provider_config(config).await {
            Ok(diagnostics) => {
                if has_errors(&diagnostics) {
                    warn!(diagnostics = diagnostics.len(), "ValidateProviderConfig completed with errors");
                }
                diagnostics_to_proto(diagnostics)
            },
            Err(e) => {
                error!(error = %e, "ValidateProviderConfig failed");
                error_to_proto(e)
            },
        };
        Ok(tonic::Response::new(generated::ValidateProviderConfigResponse { diagnostics }))
    }

    #[instrument(skip(self, request), name = "grpc.configure")]
    async fn configure(
        &self,
        request: tonic::Request<generated::ConfigureRequest>,
    ) -> GrpcResult<generated::ConfigureResponse> {
        let config = decode(&request.into_inner().config);
        let diagnostics = match self.provider.configure(config).await {
            Ok(diagnostics) => {
                if has_errors(&diagnostics) {
                    warn!(diagnostics = diagnostics.len(), "Configure completed with errors");
                } else {
                    info!("Configure completed successfully");
                }
                diagnostics_to_proto(diagnostics)
            },
            Err(e) => {
                error!(error = %e, "Configure failed");
                error_to_proto(e)
            },
        };
        Ok(tonic::Response::new(generated::ConfigureResponse { diagnostics }))
    }

    #[instrument(skip(self, _request), name = "grpc.stop")]
    async fn stop(
        &self,
        _request: tonic::Request<generated::StopRequest>,
    ) -> GrpcResult<generated::StopResponse> {
        info!("Stop called");
        let error = match self.provider.stop().await {
            Ok(()) => String::new(),
            Err(e) => {
                error!(error = %e, "Stop failed");
                e.to_string()
            },
        };
        Ok(tonic::Response::new(generated::StopResponse { error }))
    }

    #[instrument(skip(self, request), name = "grpc.validate_resource_config")]
    async fn validate_resource_config(
        &self,
        request: tonic::Request<generated::ValidateResourceConfigRequest>,
    ) -> GrpcResult<generated::ValidateResourceConfigResponse> {
        let req = request.into_inner();
        let config = decode(&req.config);
        let diagnostics = match self
            .provider
            .validate_resource_config(&req.resource_type, config)
            .await
        {
            Ok(diagnostics) => {
                if has_errors(&diagnostics) {
                    warn!(resource_type = %req.resource_type, diagnostics = diagnostics.len(), "ValidateResourceConfig completed with errors");
                }
                diagnostics_to_proto(diagnostics)
            },
            Err(e) => {
                error!(resource_type = %req.resource_type, error = %e, "ValidateResourceConfig failed");
                error_to_proto(e)
            },
        };
        Ok(tonic::Response::new(generated::ValidateResourceConfigResponse { diagnostics }))
    }

    #[instrument(skip(self, request), name = "grpc.upgrade_resource_state")]
    async fn upgrade_resource_state(
        &self,
        request: tonic::Request<generated::UpgradeResourceStateRequest>,
    ) -> GrpcResult<generated::UpgradeResourceStateResponse> {
        let req = request.into_inner();
        let state = decode(&req.raw_state);
        let response = match self
            .provider
            .upgrade_resource_state(&req.resource_type, req.version, state)
            .await
        {
            Ok(upgraded) => {
                debug!(resource_type = %req.resource_type, from_version = req.version, "UpgradeResourceState completed");
                generated::UpgradeResourceStateResponse {
                    upgraded_state: encode(&upgraded),
                    diagnostics: vec![],
                }
            },
            Err(e) => {
                error!(resource_type = %req.resource_type, version = req.version, error = %e, "UpgradeResourceState failed");
                generated::UpgradeResourceStateResponse {
                    upgraded_state: vec![],
                    diagnostics: error_to_proto(e),
                }
            },
        };
        Ok(tonic::Response::new(response))
    }

    #[instrument(skip(self, request), name = "grpc.plan")]
    async fn plan(
        &self,
        request: tonic::Request<generated::PlanRequest>,
    ) -> GrpcResult<generated::PlanResponse> {
        let req = request.into_inner();
        let prior_state = match decode(&req.prior_state) {
            Value::Null => None,
            prior => Some(prior),
        };
        debug!(resource_type = %req.resource_type, is_create = prior_state.is_none(), "Plan called");
        let proposed_state = decode(&req.proposed_state);
        let config = decode(&req.config);

        let response = match self
            .provider
            .plan(&req.resource_type, prior_state, proposed_state, config)
            .await
        {
            Ok(result) => {
                info!(
                    resource_type = %req.resource_type,
                    changes = result.changes.len(),
                    requires_replace = result.requires_replace,
                    "Plan completed"
                );
                generated::PlanResponse {
                    planned_state: encode(&result.planned_state),
                    changes: result.changes.into_iter().map(Into::into).collect(),
                    requires_replace: result.requires_replace,
                    diagnostics: diagnostics_to_proto(result.diagnostics),
                }
            },
            Err(e) => {
                error!(resource_type = %req.resource_type, error = %e, "Plan failed");
                generated::PlanResponse {
                    planned_state: vec![],
                    changes: vec![],
                    requires_replace: false,
                    diagnostics: error_to_proto(e),
                }
            },
        };
        Ok(tonic::Response::new(response))
    }

    #[instrument(skip(self, request), name = "grpc.create")]
    async fn create(
        &self,
        request: tonic::Request<generated::CreateRequest>,
    ) -> GrpcResult<generated::CreateResponse> {
        let req = request.into_inner();
        info!(resource_type = %req.resource_type, "Create called");
        let planned_state = decode(&req.planned_state);

        let (state, diagnostics) = state_parts(
            self.provider.create(&req.resource_type, planned_state).await,
            &req.resource_type,
            "Create",
        );
        Ok(tonic::Response::new(generated::CreateResponse { state, diagnostics }))
    }

    #[instrument(skip(self, request), name = "grpc.read")]
    async fn read(
        &self,
        request: tonic::Request<generated::ReadRequest>,
    ) -> GrpcResult<generated::ReadResponse> {
        let req = request.into_inner();
        debug!(resource_type = %req.resource_type, "Read called");
        let current_state = decode(&req.current_state);

        let (state, diagnostics) = state_parts(
            self.provider.read(&req.resource_type, current_state).await,
            &req.resource_type,
            "Read",
        );
        Ok(tonic::Response::new(generated::ReadResponse { state, diagnostics }))
    }

    #[instrument(skip(self, request), name = "grpc.update")]
    async fn update(
        &self,
        request: tonic::Request<generated::UpdateRequest>,
    ) -> GrpcResult<generated::UpdateResponse> {
        let req = request.into_inner();
        info!(resource_type = %req.resource_type, "Update called");
        let prior_state = decode(&req.prior_state);
        let planned_state = decode(&req.planned_state);

        let (state, diagnostics) = state_parts(
            self.provider
                .update(&req.resource_type, prior_state, planned_state)
                .await,
            &req.resource_type,
            "Update",
        );
        Ok(tonic::Response::new(generated::UpdateResponse { state, diagnostics }))
    }

    #[instrument(skip(self, request), name = "grpc.delete")]
    async fn delete(
        &self,
        request: tonic::Request<generated::DeleteRequest>,
    ) -> GrpcResult<generated::DeleteResponse> {
        let req = request.into_inner();
        info!(resource_type = %req.resource_type, "Delete called");
        let current_state = decode(&req.current_state);

        let diagnostics = match self.provider.delete(&req.resource_type, current_state).await {
            Ok(warnings) => {
                info!(resource_type = %req.resource_type, "Delete completed");
                diagnostics_to_proto(warnings)
            },
            Err(e) => {
                error!(resource_type = %req.resource_type, error = %e, "Delete failed");
                error_to_proto(e)
            },
        };
        Ok(tonic::Response::new(generated::DeleteResponse { diagnostics }))
    }

    #[instrument(skip(self, request), name = "grpc.import_resource_state")]
    async fn import_resource_state(
        &self,
        request: tonic::Request<generated::ImportResourceStateRequest>,
    ) -> GrpcResult<generated::ImportResourceStateResponse> {
        let req = request.into_inner();
        info!(resource_type = %req.resource_type, id = %req.id, "ImportResourceState called");

        let response = match self.provider.import_resource(&req.resource_type, &req.id).await {
            Ok(imported) => {
                info!(
                    resource_type = %req.resource_type,
                    id = %req.id,
                    imported_count = imported.len(),
                    "ImportResourceState completed"
                );
                generated::ImportResourceStateResponse {
                    imported: imported
                        .into_iter()
                        .map(|r| generated::ImportedResource {
                            resource_type: r.resource_type,
                            state: encode(&r.state),
                        })
                        .collect(),
                    diagnostics: vec![],
                }
            },
            Err(e) => {
                error!(resource_type = %req.resource_type, id = %req.id, error = %e, "ImportResourceState failed");
                generated::ImportResourceStateResponse {
                    imported: vec![],
                    diagnostics: error_to_proto(e),
                }
            },
        };
        Ok(tonic::Response::new(response))
    }

    #[instrument(skip(self, request), name = "grpc.validate_data_source_config")]
    async fn validate_data_source_config(
        &self,
        request: tonic::Request<generated::ValidateDataSourceConfigRequest>,
    ) -> GrpcResult<generated::ValidateDataSourceConfigResponse> {
        let req = request.into_inner();
        let config = decode(&req.config);
        let diagnostics = match self
            .provider
            .validate_data_source_config(&req.data_source_type, config)
            .await
        {
            Ok(diagnostics) => {
                if has_errors(&diagnostics) {
                    warn!(data_source_type = %req.data_source_type, diagnostics = diagnostics.len(), "ValidateDataSourceConfig completed with errors");
                }
                diagnostics_to_proto(diagnostics)
            },
            Err(e) => {
                error!(data_source_type = %req.data_source_type, error = %e, "ValidateDataSourceConfig failed");
                error_to_proto(e)
            },
        };
        Ok(tonic::Response::new(generated::ValidateDataSourceConfigResponse { diagnostics }))
    }

    #[instrument(skip(self, request), name = "grpc.read_data_source")]
    async fn read_data_source(
        &self,
        request: tonic::Request<generated::ReadDataSourceRequest>,
    ) -> GrpcResult<generated::ReadDataSourceResponse> {
        let req = request.into_inner();
        debug!(data_source_type = %req.data_source_type, "ReadDataSource called");
        let config = decode(&req.config);

        let (state, diagnostics) = state_parts(
            self.provider
                .read_data_source(&req.data_source_type, config)
                .await,
            &req.data_source_type,
            "ReadDataSource",
        );
        Ok(tonic::Response::new(generated::ReadDataSourceResponse { state, diagnostics }))
    }
}

/// Split a handler result into response state bytes and diagnostics.
fn state_parts(
    result: Result<StateResponse, ProviderError>,
    type_name: &str,
    operation: &str,
) -> (Vec<u8>, Vec<generated::Diagnostic>) {
    match result {
        Ok(resp) => {
            debug!(type_name, operation, removed = resp.is_removed(), "Operation completed");
            (encode(&resp.state), diagnostics_to_proto(resp.diagnostics))
        },
        Err(e) => {
            error!(type_name, operation, error = %e, "Operation failed");
            (vec![], error_to_proto(e))
        },
    }
}

/// Options for the provider server.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    /// How long in-flight requests may run after a shutdown signal.
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
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

/// Resolves on SIGTERM or SIGINT (Ctrl-C off unix). If the handlers cannot
/// be installed the server runs until killed.
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                (Err(e), _) | (_, Err(e)) => {
                    warn!(error = %e, "Failed to install signal handlers");
                    return std::future::pending().await;
                },
            };

        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, initiating graceful shutdown"),
            _ = sigint.recv() => info!("Received SIGINT, initiating graceful shutdown"),
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl-C handler");
            return std::future::pending().await;
        }
        info!("Received Ctrl-C, initiating graceful shutdown");
    }
}

/// Serve on an ephemeral loopback port.
///
/// The handshake line `HYPERPING_PROVIDER|<version>|<address>` goes to
/// stdout once the port is bound.
pub async fn serve<P: ProviderService>(provider: P) -> Result<(), ProviderError> {
    serve_with_options(provider, ServeOptions::default()).await
}

pub async fn serve_with_options<P: ProviderService>(
    provider: P,
    options: ServeOptions,
) -> Result<(), ProviderError> {
    let listener = bind("127.0.0.1:0".parse().map_err(|e| {
        ProviderError::Sdk(format!("invalid listen address: {}", e))
    })?)
    .await?;
    serve_with_shutdown(provider, listener, options, wait_for_shutdown_signal()).await
}

/// Serve on a specific address.
pub async fn serve_on<P: ProviderService>(provider: P, addr: SocketAddr) -> Result<(), ProviderError> {
    serve_on_with_options(provider, addr, ServeOptions::default()).await
}

pub async fn serve_on_with_options<P: ProviderService>(
    provider: P,
    addr: SocketAddr,
    options: ServeOptions,
) -> Result<(), ProviderError> {
    let listener = bind(addr).await?;
    serve_with_shutdown(provider, listener, options, wait_for_shutdown_signal()).await
}

async fn bind(addr: SocketAddr) -> Result<TcpListener, ProviderError> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| ProviderError::Sdk(format!("failed to bind {}: {}", addr, e)))
}

/// Serve on a bound listener until `shutdown` resolves, then drain for at
/// most `options.shutdown_timeout` and call the provider's `stop()`.
pub async fn serve_with_shutdown<P, F>(
    provider: P,
    listener: TcpListener,
    options: ServeOptions,
    shutdown: F,
) -> Result<(), ProviderError>
where
    P: ProviderService,
    F: Future<Output = ()> + Send,
{
    let addr = listener
        .local_addr()
        .map_err(|e| ProviderError::Sdk(format!("failed to read listener address: {}", e)))?;

    println!("{}|{}|{}", HANDSHAKE_PREFIX, PROTOCOL_VERSION, addr);
    info!(address = %addr, "Provider server starting");

    let provider = Arc::new(provider);
    let grpc_service = ProviderGrpcService {
        provider: Arc::clone(&provider),
    };

    let (signalled_tx, mut signalled_rx) = oneshot::channel::<()>();
    let server = Server::builder()
        .add_service(generated::provider_server::ProviderServer::new(grpc_service))
        .serve_with_incoming_shutdown(
            tokio_stream::wrappers::TcpListenerStream::new(listener),
            async move {
                shutdown.await;
                let _ = signalled_tx.send(());
            },
        );
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => result?,
        Ok(()) = &mut signalled_rx => {
            match tokio::time::timeout(options.shutdown_timeout, &mut server).await {
                Ok(result) => result?,
                Err(_) => warn!(
                    timeout = ?options.shutdown_timeout,
                    "Shutdown timeout exceeded, abandoning in-flight requests"
                ),
            }
        }
    }
    info!("Server stopped");

    if let Err(e) = provider.stop().await {
        warn!(error = %e, "Provider stop() returned error");
    }
    info!("Provider shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, Schema};
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct EchoProvider {
        stopped: Arc<AtomicBool>,
    }

    #[async_trait::async_trait]
    impl ProviderService for EchoProvider {
        fn schema(&self) -> ProviderSchema {
            ProviderSchema::new().with_resource(
                "hyperping_echo",
                Schema::v0().with_attribute("name", Attribute::required_string()),
            )
        }

        async fn configure(&self, _config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
            Ok(vec![Diagnostic::warning("Configured")])
        }

        async fn stop(&self) -> Result<(), ProviderError> {
            self.stopped.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn plan(
            &self,
            _resource_type: &str,
            _prior_state: Option<Value>,
            proposed_state: Value,
            _config: Value,
        ) -> Result<PlanResult, ProviderError> {
            Ok(PlanResult::no_change(proposed_state)
                .with_diagnostics(vec![Diagnostic::warning("Past Start Date")]))
        }

        async fn create(&self, _t: &str, planned: Value) -> Result<StateResponse, ProviderError> {
            Ok(StateResponse::new(planned))
        }

        async fn read(&self, _t: &str, _current: Value) -> Result<StateResponse, ProviderError> {
            Ok(StateResponse::removed())
        }

        async fn update(
            &self,
            _t: &str,
            _prior: Value,
            _planned: Value,
        ) -> Result<StateResponse, ProviderError> {
            Err(ProviderError::Diagnostics(vec![
                Diagnostic::error("Failed to Update Echo").with_attribute("name"),
            ]))
        }

        async fn delete(&self, _t: &str, _current: Value) -> Result<Vec<Diagnostic>, ProviderError> {
            Ok(vec![Diagnostic::warning("Echo Not Found")])
        }
    }

    fn service() -> ProviderGrpcService<EchoProvider> {
        ProviderGrpcService {
            provider: Arc::new(EchoProvider::default()),
        }
    }

    use generated::provider_server::Provider;

    #[tokio::test]
    async fn test_plan_passes_diagnostics_through() {
        let resp = service()
            .plan(tonic::Request::new(generated::PlanRequest {
                resource_type: "hyperping_echo".into(),
                prior_state: vec![],
                proposed_state: br#"{"name":"a"}"#.to_vec(),
                config: vec![],
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(decode(&resp.planned_state), json!({"name": "a"}));
        assert_eq!(resp.diagnostics.len(), 1);
        assert_eq!(resp.diagnostics[0].summary, "Past Start Date");
    }

    #[tokio::test]
    async fn test_handler_error_becomes_diagnostics() {
        let resp = service()
            .update(tonic::Request::new(generated::UpdateRequest {
                resource_type: "hyperping_echo".into(),
                prior_state: b"{}".to_vec(),
                planned_state: b"{}".to_vec(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(resp.state.is_empty());
        assert_eq!(resp.diagnostics[0].summary, "Failed to Update Echo");
        assert_eq!(resp.diagnostics[0].attribute, "name");
        assert_eq!(
            resp.diagnostics[0].severity,
            generated::diagnostic::Severity::Error as i32
        );
    }

    #[tokio::test]
    async fn test_read_removed_encodes_null() {
        let resp = service()
            .read(tonic::Request::new(generated::ReadRequest {
                resource_type: "hyperping_echo".into(),
                current_state: br#"{"id":"x"}"#.to_vec(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(resp.state, b"null");
    }

    #[tokio::test]
    async fn test_unknown_data_source() {
        let resp = service()
            .read_data_source(tonic::Request::new(generated::ReadDataSourceRequest {
                data_source_type: "hyperping_nothing".into(),
                config: vec![],
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(resp.diagnostics[0].summary.contains("hyperping_nothing"));
    }

    #[tokio::test]
    async fn test_delete_warnings() {
        let resp = service()
            .delete(tonic::Request::new(generated::DeleteRequest {
                resource_type: "hyperping_echo".into(),
                current_state: b"{}".to_vec(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(
            resp.diagnostics[0].severity,
            generated::diagnostic::Severity::Warning as i32
        );
    }

    #[test]
    fn test_decode_tolerates_garbage() {
        assert_eq!(decode(b""), Value::Null);
        assert_eq!(decode(b"{not json"), Value::Null);
        assert_eq!(decode(b"[1]"), json!([1]));
    }

    #[tokio::test]
    async fn test_serve_stops_provider_on_shutdown() {
        let provider = EchoProvider::default();
        let stopped = Arc::clone(&provider.stopped);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        serve_with_shutdown(
            provider,
            listener,
            ServeOptions::new().with_shutdown_timeout(Duration::from_millis(100)),
            async {},
        )
        .await
        .unwrap();
        assert!(stopped.load(Ordering::SeqCst));
    }
}
