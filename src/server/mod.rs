//! MCP server over a line-delimited byte stream
//!
//! Requests run concurrently, one task each. Responses are funnelled to a
//! single writer task so lines never interleave. A request cancelled through
//! `notifications/cancelled` is never answered. Request ids must be unique
//! among in-flight requests.

pub mod handler;
pub mod resources;
pub mod transport;

pub use handler::RequestHandler;
pub use transport::{InboundLine, MessageReader, MessageWriter, TransportError};

use crate::client::CallContext;
use crate::protocol::mcp::{methods, CancelledParams};
use crate::protocol::{
    error_codes, IncomingMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RequestId,
};
use crate::tools::ToolSystem;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument};

/// Responses waiting for the writer task
const OUTBOUND_QUEUE: usize = 64;

type InflightMap = Arc<Mutex<HashMap<RequestId, CancellationToken>>>;

pub struct McpServer {
    handler: Arc<RequestHandler>,
    name: String,
}

impl McpServer {
    pub fn new(tools: Arc<ToolSystem>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            handler: Arc::new(RequestHandler::new(tools, name.clone())),
            name,
        }
    }

    /// Serve until the reader hits EOF or `shutdown` fires.
    ///
    /// Outstanding requests are cancelled on exit and every response already
    /// queued is flushed before returning.
    pub async fn serve<R, W>(
        &self,
        reader: R,
        writer: W,
        shutdown: CancellationToken,
    ) -> Result<(), TransportError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let span = crate::session_span!(server = %self.name);
        self.run(reader, writer, shutdown).instrument(span).await
    }

    async fn run<R, W>(
        &self,
        reader: R,
        writer: W,
        shutdown: CancellationToken,
    ) -> Result<(), TransportError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        info!("MCP server starting");

        let (tx, rx) = mpsc::channel::<JsonRpcResponse>(OUTBOUND_QUEUE);
        let writer_task = tokio::spawn(write_responses(MessageWriter::new(writer), rx));

        let session = shutdown.child_token();
        let inflight: InflightMap = Arc::new(Mutex::new(HashMap::new()));
        let mut tasks = JoinSet::new();
        let mut reader = MessageReader::new(reader);

        let read_result = loop {
            let line = tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("shutdown requested");
                    break Ok(());
                }
                line = reader.next_line() => line,
            };

            let line = match line {
                Ok(Some(InboundLine::Message(line))) => line,
                Ok(Some(InboundLine::InvalidUtf8)) => {
                    warn!("rejected message that is not valid UTF-8");
                    let response = JsonRpcResponse::error(
                        None,
                        error_codes::PARSE_ERROR,
                        "parse error: message is not valid UTF-8",
                    );
                    if tx.send(response).await.is_err() {
                        break Ok(());
                    }
                    continue;
                }
                Ok(None) => {
                    info!("input closed, shutting down");
                    break Ok(());
                }
                Err(e) => break Err(e),
            };

            match IncomingMessage::parse(&line) {
                Ok(IncomingMessage::Request(request)) => {
                    self.spawn_request(request, &session, &inflight, &tx, &mut tasks)
                        .await;
                }
                Ok(IncomingMessage::Notification(notification)) => {
                    handle_notification(&notification, &inflight).await;
                }
                Err(response) => {
                    warn!("rejected malformed message");
                    if tx.send(response).await.is_err() {
                        break Ok(());
                    }
                }
            }

            // Reap finished tasks so the set does not grow without bound
            while tasks.try_join_next().is_some() {}
        };

        session.cancel();
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "request task panicked");
            }
        }

        drop(tx);
        let write_result = match writer_task.await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "writer task panicked");
                Ok(())
            }
        };

        info!("MCP server stopped");
        read_result.and(write_result)
    }

    async fn spawn_request(
        &self,
        request: JsonRpcRequest,
        session: &CancellationToken,
        inflight: &InflightMap,
        tx: &mpsc::Sender<JsonRpcResponse>,
        tasks: &mut JoinSet<()>,
    ) {
        debug!(method = %request.method, id = %request.id, "received request");

        let token = {
            let mut pending = inflight.lock().await;
            if pending.contains_key(&request.id) {
                drop(pending);
                warn!(id = %request.id, "rejected request reusing an in-flight id");
                let response = JsonRpcResponse::error(
                    Some(request.id.clone()),
                    error_codes::INVALID_REQUEST,
                    format!("request id {} is already in flight", request.id),
                );
                if tx.send(response).await.is_err() {
                    warn!(id = %request.id, "writer closed before response was sent");
                }
                return;
            }
            let token = session.child_token();
            pending.insert(request.id.clone(), token.clone());
            token
        };

        let handler = self.handler.clone();
        let inflight = inflight.clone();
        let tx = tx.clone();

        tasks.spawn(async move {
            let ctx = CallContext::new().with_cancellation(token);
            let response = handler.handle(&request, &ctx).await;
            inflight.lock().await.remove(&request.id);

            match response {
                Some(response) if !ctx.is_cancelled() => {
                    if tx.send(response).await.is_err() {
                        warn!(id = %request.id, "writer closed before response was sent");
                    }
                }
                _ => debug!(id = %request.id, "request cancelled, no response sent"),
            }
        });
    }
}

async fn handle_notification(notification: &JsonRpcNotification, inflight: &InflightMap) {
    match notification.method.as_str() {
        methods::NOTIFY_CANCELLED => {
            let params = notification.params.clone().unwrap_or_default();
            match serde_json::from_value::<CancelledParams>(params) {
                Ok(params) => match inflight.lock().await.get(&params.request_id) {
                    Some(token) => {
                        info!(
                            id = %params.request_id,
                            reason = params.reason.as_deref().unwrap_or(""),
                            "cancelling request"
                        );
                        token.cancel();
                    }
                    None => debug!(id = %params.request_id, "cancel for unknown request"),
                },
                Err(e) => warn!(error = %e, "malformed cancellation notification"),
            }
        }
        methods::NOTIFY_INITIALIZED => debug!("client initialized"),
        other => debug!(method = %other, "ignoring notification"),
    }
}

async fn write_responses<W>(
    mut writer: MessageWriter<W>,
    mut rx: mpsc::Receiver<JsonRpcResponse>,
) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        writer.write_response(&response).await?;
    }
    Ok(())
}
