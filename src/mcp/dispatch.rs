//! Request dispatcher: routes JSON-RPC messages to sessions and tools

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::catalog::ToolCatalog;
use super::envelope::{self, ToolCallResult};
use super::protocol::{methods, Exchange, InitializeResult, McpHandler, McpRequest, McpResponse};
use super::session::{ClientInfo, Session, SessionRegistry};
use crate::collaborators::with_timeout;
use crate::error::{GatewayError, Result};

/// Default backstop for one tool call
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Dispatches MCP messages against a session registry and a tool catalog
#[derive(Clone)]
pub struct Dispatcher {
    sessions: Arc<SessionRegistry>,
    catalog: Arc<ToolCatalog>,
    tool_timeout: Duration,
}

impl Dispatcher {
    pub fn new(sessions: Arc<SessionRegistry>, catalog: Arc<ToolCatalog>) -> Self {
        Self {
            sessions,
            catalog,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn tool_timeout(&self) -> Duration {
        self.tool_timeout
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    pub fn catalog(&self) -> &Arc<ToolCatalog> {
        &self.catalog
    }

    /// Invoke a tool on behalf of a session.
    ///
    /// Only session and tool resolution fail at the protocol level. Argument
    /// violations, collaborator failures and timeouts come back as error
    /// envelopes.
    pub async fn call_tool(
        &self,
        session_id: Option<&str>,
        name: &str,
        arguments: &Value,
    ) -> Result<ToolCallResult> {
        let session = match session_id {
            Some(id) => self.sessions.lookup(id)?,
            None => return Err(GatewayError::InvalidSession(None)),
        };
        let tool = self.catalog.resolve(name)?;

        let args = match tool.schema.validate(arguments) {
            Ok(args) => args,
            Err(violation) => {
                tracing::debug!("Rejected arguments for {}: {}", name, violation);
                let result = tool_failure(name, &GatewayError::SchemaValidation(violation));
                publish_failure(&session, name, &result);
                return Ok(result);
            }
        };

        tracing::debug!("Calling tool {} for session {}", name, session.id());
        let what = format!("Tool {}", name);
        let result = match with_timeout(&what, self.tool_timeout, (tool.handler)(args)).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Tool {} failed: {}", name, e);
                tool_failure(name, &e)
            }
        };

        if result.is_error() {
            publish_failure(&session, name, &result);
        }
        Ok(result)
    }

    fn initialize(&self, session: &Session, request: &McpRequest) -> Value {
        if let Some(info) = request
            .params
            .get("clientInfo")
            .and_then(|v| serde_json::from_value::<ClientInfo>(v.clone()).ok())
        {
            tracing::info!(
                "Client {} {} initialized session {}",
                info.name,
                info.version,
                session.id()
            );
            session.set_client(info);
        }
        json!(InitializeResult::default())
    }

    async fn tools_call(&self, session: &Session, params: &Value) -> Result<Value> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| GatewayError::InvalidParams("missing tool name".to_string()))?;
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        let result = self.call_tool(Some(session.id()), name, &arguments).await?;
        Ok(json!(result))
    }
}

fn tool_failure(name: &str, err: &GatewayError) -> ToolCallResult {
    envelope::failure(&format!("calling {}", name), err)
}

/// Push a log notification for a failed call onto the session's stream
fn publish_failure(session: &Session, name: &str, result: &ToolCallResult) {
    session.notify(json!({
        "jsonrpc": "2.0",
        "method": methods::LOG_MESSAGE,
        "params": {
            "level": "error",
            "logger": "taskgate",
            "data": {
                "tool": name,
                "message": result.joined_text(),
            }
        }
    }));
}

#[async_trait]
impl McpHandler for Dispatcher {
    async fn handle_request(&self, session_id: Option<&str>, request: McpRequest) -> Exchange {
        if request.jsonrpc != "2.0" {
            return Exchange::reply(
                None,
                McpResponse::from_error(
                    request.id,
                    GatewayError::InvalidRequest(format!(
                        "unsupported jsonrpc version {:?}",
                        request.jsonrpc
                    )),
                ),
            );
        }

        let session = match self.sessions.open(session_id, request.is_initialize()) {
            Ok(session) => session,
            Err(e) => {
                tracing::debug!("Rejected {} without a valid session", request.method);
                return Exchange::reply(None, McpResponse::from_error(request.id, e));
            }
        };
        let sid = Some(session.id().to_string());

        if request.is_notification() {
            if request.method != methods::INITIALIZED {
                tracing::debug!("Ignoring notification {}", request.method);
            }
            return Exchange::accepted(sid);
        }

        let outcome = match request.method.as_str() {
            methods::INITIALIZE => Ok(self.initialize(&session, &request)),
            methods::PING => Ok(json!({})),
            methods::LIST_TOOLS => Ok(json!({ "tools": self.catalog.list() })),
            methods::CALL_TOOL => self.tools_call(&session, &request.params).await,
            other => {
                return Exchange::reply(
                    sid,
                    McpResponse::error(
                        request.id,
                        crate::error::codes::METHOD_NOT_FOUND,
                        format!("Method not found: {}", other),
                    ),
                )
            }
        };

        let response = match outcome {
            Ok(result) => McpResponse::success(request.id, result),
            Err(e) => McpResponse::from_error(request.id, e),
        };
        Exchange::reply(sid, response)
    }

    fn close_session(&self, session_id: &str) -> bool {
        self.sessions.close(session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::codes;
    use crate::mcp::catalog::ToolDefinition;
    use crate::mcp::schema::{ParamKind, ParamSpec, ToolSchema};

    fn dispatcher() -> Dispatcher {
        let catalog = ToolCatalog::builder()
            .register(ToolDefinition::new(
                "echo",
                "Echoes its input",
                ToolSchema::new(vec![ParamSpec::required("text", ParamKind::String, "")]),
                |args| async move { Ok(ToolCallResult::text(args.str("text").unwrap_or_default())) },
            ))
            .register(ToolDefinition::new(
                "slow",
                "Never finishes in time",
                ToolSchema::empty(),
                |_args| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(ToolCallResult::text("late"))
                },
            ))
            .build()
            .unwrap();
        Dispatcher::new(Arc::new(SessionRegistry::new()), Arc::new(catalog))
            .with_tool_timeout(Duration::from_millis(20))
    }

    async fn initialize(d: &Dispatcher) -> String {
        let exchange = d
            .handle_request(
                None,
                McpRequest::new(
                    1,
                    methods::INITIALIZE,
                    json!({"clientInfo": {"name": "test", "version": "1.0"}}),
                ),
            )
            .await;
        exchange.session_id.unwrap()
    }

    #[tokio::test]
    async fn test_initialize_opens_session() {
        let d = dispatcher();
        let sid = initialize(&d).await;
        let session = d.sessions().lookup(&sid).unwrap();
        assert_eq!(session.client().unwrap().name, "test");
    }

    #[tokio::test]
    async fn test_call_without_session_is_protocol_error() {
        let d = dispatcher();
        let exchange = d
            .handle_request(None, McpRequest::new(2, methods::LIST_TOOLS, Value::Null))
            .await;
        assert!(exchange.session_id.is_none());
        assert_eq!(
            exchange.response.unwrap().error_code(),
            Some(codes::INVALID_SESSION)
        );
    }

    #[tokio::test]
    async fn test_timeout_becomes_envelope() {
        let d = dispatcher();
        let sid = initialize(&d).await;
        let mut rx = d.sessions().lookup(&sid).unwrap().subscribe();

        let result = d.call_tool(Some(&sid), "slow", &json!({})).await.unwrap();
        assert!(result.is_error());
        assert!(result
            .joined_text()
            .starts_with("Error calling slow: Tool slow timed out after"));

        let pushed = rx.recv().await.unwrap();
        assert_eq!(pushed["method"], methods::LOG_MESSAGE);
        assert_eq!(pushed["params"]["data"]["tool"], "slow");
    }

    #[tokio::test]
    async fn test_missing_tool_name_is_invalid_params() {
        let d = dispatcher();
        let sid = initialize(&d).await;
        let exchange = d
            .handle_request(
                Some(&sid),
                McpRequest::new(3, methods::CALL_TOOL, json!({"arguments": {}})),
            )
            .await;
        assert_eq!(
            exchange.response.unwrap().error_code(),
            Some(codes::INVALID_PARAMS)
        );
    }

    #[tokio::test]
    async fn test_wrong_jsonrpc_version() {
        let d = dispatcher();
        let mut request = McpRequest::new(4, methods::PING, Value::Null);
        request.jsonrpc = "1.0".into();
        let exchange = d.handle_request(None, request).await;
        assert_eq!(
            exchange.response.unwrap().error_code(),
            Some(codes::INVALID_REQUEST)
        );
    }
}
