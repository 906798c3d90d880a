//! MCP tool surface for MockServer.
//!
//! Each tool validates its arguments, makes exactly one call through [`MockServerClient`], and
//! turns the outcome into a `CallToolResult`. Failures from the client are reported as tool
//! errors (`is_error: true`) carrying the error kind, never as protocol errors.

use crate::params::{ClearExpectationsParams, RetrieveParams, VerifyRequestParams};
use crate::{summary, validate};
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, ServerCapabilities, ServerInfo, Tool};
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, warn};
use unrelated_mockserver_client::model::Expectation;
use unrelated_mockserver_client::{MockServerClient, MockServerError};

type Outcome = std::result::Result<CallToolResult, MockServerError>;

#[derive(Clone)]
pub struct MockServerTools {
    client: MockServerClient,
    tool_router: ToolRouter<Self>,
}

impl MockServerTools {
    #[must_use]
    pub fn new(client: MockServerClient) -> Self {
        Self {
            client,
            tool_router: Self::tool_router(),
        }
    }

    /// The tools advertised in `tools/list`.
    #[must_use]
    pub fn tools(&self) -> Vec<Tool> {
        self.tool_router.list_all()
    }

    async fn run_create_expectation(&self, expectation: Expectation) -> Outcome {
        validate::expectation(&expectation)?;
        self.client.create_expectation(&expectation).await?;
        Ok(text_result(summary::expectation_created(&expectation)))
    }

    async fn run_verify(&self, params: VerifyRequestParams) -> Outcome {
        validate::matcher("httpRequest", &params.http_request)?;
        if let Some(times) = &params.times {
            validate::verification_times(times)?;
        }
        let result = self
            .client
            .verify(&params.http_request, params.times)
            .await?;
        data_result(
            summary::verification(&params.http_request, &result),
            &result,
        )
    }

    async fn run_clear(&self, params: ClearExpectationsParams) -> Outcome {
        if let Some(m) = &params.http_request {
            validate::matcher("httpRequest", m)?;
        }
        let scope = params.scope.unwrap_or_default();
        self.client
            .clear_scoped(params.http_request.as_ref(), scope)
            .await?;
        Ok(text_result(summary::cleared(
            params.http_request.as_ref(),
            scope,
        )))
    }

    async fn run_retrieve_recorded(&self, params: RetrieveParams) -> Outcome {
        if let Some(m) = &params.http_request {
            validate::matcher("httpRequest", m)?;
        }
        let requests = self
            .client
            .retrieve_recorded_requests(params.http_request.as_ref())
            .await?;
        data_result(summary::recorded_requests(&requests), &requests)
    }

    async fn run_retrieve_active(&self, params: RetrieveParams) -> Outcome {
        if let Some(m) = &params.http_request {
            validate::matcher("httpRequest", m)?;
        }
        let expectations = self
            .client
            .retrieve_active_expectations(params.http_request.as_ref())
            .await?;
        data_result(summary::active_expectations(&expectations), &expectations)
    }
}

#[tool_router]
impl MockServerTools {
    #[tool(
        name = "create_expectation",
        description = "Create an expectation on MockServer: when a request matches `httpRequest`, MockServer answers with `httpResponse`. Optional `times` limits how often it matches and `timeToLive` how long it lives. Reusing an `id` updates the existing expectation.",
        annotations(
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = false,
            open_world_hint = true
        )
    )]
    pub async fn create_expectation(
        &self,
        Parameters(expectation): Parameters<Expectation>,
    ) -> Result<CallToolResult, McpError> {
        Ok(finish(
            "create_expectation",
            self.run_create_expectation(expectation).await,
        ))
    }

    #[tool(
        name = "verify_request",
        description = "Verify that MockServer received requests matching `httpRequest`. `times` may set `atLeast`, `atMost` and/or `exactly` (default: at least once). A failed verification is reported as `success: false`, not as an error.",
        annotations(
            read_only_hint = true,
            destructive_hint = false,
            idempotent_hint = true,
            open_world_hint = true
        )
    )]
    pub async fn verify_request(
        &self,
        Parameters(params): Parameters<VerifyRequestParams>,
    ) -> Result<CallToolResult, McpError> {
        Ok(finish("verify_request", self.run_verify(params).await))
    }

    #[tool(
        name = "clear_expectations",
        description = "Clear expectations and recorded requests matching `httpRequest`, or everything when it is omitted. `type` limits what is cleared: ALL (default), EXPECTATIONS or LOG.",
        annotations(
            read_only_hint = false,
            destructive_hint = true,
            idempotent_hint = true,
            open_world_hint = true
        )
    )]
    pub async fn clear_expectations(
        &self,
        Parameters(params): Parameters<ClearExpectationsParams>,
    ) -> Result<CallToolResult, McpError> {
        Ok(finish("clear_expectations", self.run_clear(params).await))
    }

    #[tool(
        name = "reset",
        description = "Reset MockServer: remove all expectations and all recorded requests.",
        annotations(
            read_only_hint = false,
            destructive_hint = true,
            idempotent_hint = true,
            open_world_hint = true
        )
    )]
    pub async fn reset(&self) -> Result<CallToolResult, McpError> {
        let outcome = self
            .client
            .reset()
            .await
            .map(|()| text_result(summary::reset()));
        Ok(finish("reset", outcome))
    }

    #[tool(
        name = "retrieve_recorded_requests",
        description = "List the requests MockServer has received, optionally filtered by `httpRequest`.",
        annotations(
            read_only_hint = true,
            destructive_hint = false,
            idempotent_hint = true,
            open_world_hint = true
        )
    )]
    pub async fn retrieve_recorded_requests(
        &self,
        Parameters(params): Parameters<RetrieveParams>,
    ) -> Result<CallToolResult, McpError> {
        Ok(finish(
            "retrieve_recorded_requests",
            self.run_retrieve_recorded(params).await,
        ))
    }

    #[tool(
        name = "retrieve_active_expectations",
        description = "List the expectations currently active on MockServer, optionally filtered by `httpRequest`.",
        annotations(
            read_only_hint = true,
            destructive_hint = false,
            idempotent_hint = true,
            open_world_hint = true
        )
    )]
    pub async fn retrieve_active_expectations(
        &self,
        Parameters(params): Parameters<RetrieveParams>,
    ) -> Result<CallToolResult, McpError> {
        Ok(finish(
            "retrieve_active_expectations",
            self.run_retrieve_active(params).await,
        ))
    }

    #[tool(
        name = "get_status",
        description = "Check whether MockServer is reachable and report its version. An unreachable server is reported as `reachable: false`, not as an error.",
        annotations(
            read_only_hint = true,
            destructive_hint = false,
            idempotent_hint = true,
            open_world_hint = true
        )
    )]
    pub async fn get_status(&self) -> Result<CallToolResult, McpError> {
        let outcome = self
            .client
            .status()
            .await
            .and_then(|status| data_result(summary::status(&status), &status));
        Ok(finish("get_status", outcome))
    }
}

#[tool_handler]
impl ServerHandler for MockServerTools {
    fn get_info(&self) -> ServerInfo {
        let mut info = ServerInfo::default();
        info.capabilities = ServerCapabilities::builder().enable_tools().build();
        info.server_info.name = env!("CARGO_PKG_NAME").to_string();
        info.server_info.version = env!("CARGO_PKG_VERSION").to_string();
        info.instructions = Some(format!(
            "Tools for driving the MockServer instance at {}: create expectations, verify \
             received requests, inspect recorded traffic, clear or reset state, and check \
             reachability.",
            self.client.base_url()
        ));
        info
    }
}

fn text_result(text: String) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text)])
}

/// Summary line plus the data, both as structured content and as pretty JSON text.
///
/// Lists are wrapped as `{"items": [...]}` since structured content is always an object.
fn data_result<T: Serialize>(summary: String, data: &T) -> Outcome {
    let value = serde_json::to_value(data)?;
    let json = serde_json::to_string_pretty(&value)?;
    let structured = match value {
        Value::Object(_) => value,
        other => json!({ "items": other }),
    };
    Ok(CallToolResult {
        content: vec![Content::text(summary), Content::text(json)],
        structured_content: Some(structured),
        is_error: Some(false),
        meta: None,
    })
}

fn finish(tool: &str, outcome: Outcome) -> CallToolResult {
    match outcome {
        Ok(result) => {
            debug!(tool, "tool call succeeded");
            result
        }
        Err(err) => {
            warn!(tool, kind = %err.kind(), error = %err, "tool call failed");
            let structured = err.to_value();
            let details = serde_json::to_string_pretty(&structured)
                .unwrap_or_else(|_| structured.to_string());
            CallToolResult {
                content: vec![Content::text(summary::error(&err)), Content::text(details)],
                structured_content: Some(structured),
                is_error: Some(true),
                meta: None,
            }
        }
    }
}
