//! MCP server surface
//!
//! Every operation is a named tool with a declared schema. Handlers
//! return `Result<String, String>`; `call_tool` turns both sides into
//! the uniform result envelope, so flow failures never cross the
//! protocol boundary as errors.
//!
//! Operations are serialized: the session sits behind a mutex held
//! for the duration of each call, so no two browser actions overlap.

use rmcp::{
    ErrorData as McpError, ServerHandler, ServiceExt,
    handler::server::tool::schema_for_type,
    model::{
        CallToolRequestParams, CallToolResult, Content, Implementation, ListToolsResult,
        PaginatedRequestParams, ServerCapabilities, ServerInfo, Tool,
    },
    schemars::{self, JsonSchema},
    service::{RequestContext, RoleServer},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{stdin, stdout};
use tokio::sync::Mutex;
use tracing::{info, warn};

use mailpilot_flows::{
    ComposeOrchestrator, ComposeRequest, EmailMatcher, EmailQuery, ReplyMode,
};
use mailpilot_session::{
    bootstrap_once, safe_goto, wait_for_url_prefix, AppConfig, DomProbe, Session, SessionPhase,
};

const DEFAULT_SCREENSHOT_PATH: &str = "mcp_debug.png";

/// MailPilot MCP Server
///
/// Exposes the webmail workflows as schema-validated tools over the
/// stdio transport.
#[derive(Clone)]
pub struct MailPilotServer {
    session: Arc<Mutex<Session>>,
}

// ============================================================================
// Tool Parameter Types
// ============================================================================

/// Empty parameters (for tools with no parameters)
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct EmptyParams {}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WaitLoggedInParams {
    /// How long to wait for the post-login URL, in milliseconds
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct OpenEmailParams {
    /// Subject text; every word must appear in the row
    pub subject: Option<String>,
    /// Sender text; every word must appear in the row
    pub from: Option<String>,
    /// Zero-based row position, used only when no text filter is given
    pub index: Option<i64>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComposeParams {
    pub to: Option<String>,
    pub cc: Option<String>,
    pub bcc: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    /// Absolute paths of files to attach
    pub attachments: Option<Vec<String>>,
    /// Click Send after filling the form (default false)
    pub auto_send: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReplyComposeParams {
    pub body: Option<String>,
    pub auto_send: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForwardComposeParams {
    pub to: Option<String>,
    pub body: Option<String>,
    pub auto_send: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReplyParams {
    /// One of "reply", "replyAll", "forward"
    pub mode: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ScreenshotToolParams {
    /// Output file path (default mcp_debug.png)
    pub path: Option<String>,
}

// ============================================================================
// Argument validation
// ============================================================================

fn validate_compose(params: ComposeParams) -> Result<ComposeRequest, String> {
    let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
    let mut missing = Vec::new();
    if !present(&params.to) {
        missing.push("to");
    }
    if !present(&params.subject) {
        missing.push("subject");
    }
    if !present(&params.body) {
        missing.push("body");
    }
    if !missing.is_empty() {
        return Err(format!(
            "Missing required field(s): {}. Usage: compose requires to, subject and body; \
             optional: cc, bcc, attachments, autoSend.",
            missing.join(", ")
        ));
    }
    Ok(ComposeRequest {
        to: params.to.unwrap_or_default(),
        cc: params.cc,
        bcc: params.bcc,
        subject: params.subject.unwrap_or_default(),
        body: params.body.unwrap_or_default(),
        attachments: params.attachments.unwrap_or_default(),
        auto_send: params.auto_send.unwrap_or(false),
    })
}

fn validate_reply(params: ReplyComposeParams, tool: &str) -> Result<(String, bool), String> {
    match params.body {
        Some(body) if !body.trim().is_empty() => {
            Ok((body, params.auto_send.unwrap_or(false)))
        }
        _ => Err(format!(
            "Missing required field: body. Usage: {tool} requires body; optional: autoSend."
        )),
    }
}

fn validate_forward(
    params: ForwardComposeParams,
) -> Result<(String, Option<String>, bool), String> {
    match params.to {
        Some(to) if !to.trim().is_empty() => {
            Ok((to, params.body, params.auto_send.unwrap_or(false)))
        }
        _ => Err(
            "Missing required field: to. Usage: forward_compose requires to; \
             optional: body, autoSend."
                .to_string(),
        ),
    }
}

/// The login wait watches for the email module URL itself, not just
/// the application origin: an identity redirect can land on the
/// origin before the module is reachable.
fn login_wait_params(config: &AppConfig, timeout_ms: Option<u64>) -> (String, Duration) {
    let bound = timeout_ms
        .map(Duration::from_millis)
        .unwrap_or(config.timeouts.login_url_wait);
    (config.target_after_login(), bound)
}

fn parse_reply_mode(mode: Option<&str>) -> Result<ReplyMode, String> {
    match mode {
        Some("reply") => Ok(ReplyMode::Reply),
        Some("replyAll") => Ok(ReplyMode::ReplyAll),
        Some("forward") => Ok(ReplyMode::Forward),
        other => Err(format!(
            "Invalid mode {:?}. Usage: reply requires mode, one of \"reply\", \
             \"replyAll\", \"forward\".",
            other.unwrap_or("<missing>")
        )),
    }
}

// ============================================================================
// Handlers
// ============================================================================

impl MailPilotServer {
    pub fn new(config: AppConfig) -> Self {
        Self {
            session: Arc::new(Mutex::new(Session::new(config))),
        }
    }

    /// Navigate to the application before binding the transport, so
    /// the first tool call finds a warm page. Failure is reported,
    /// not fatal.
    pub async fn bootstrap(&self) {
        let mut session = self.session.lock().await;
        match bootstrap_once(&mut session).await {
            Ok(url) => info!(%url, "startup navigation done"),
            Err(e) => warn!(error = %e, "startup navigation failed, continuing"),
        }
    }

    /// Run the MCP server over the stdio transport.
    pub async fn run(self) -> anyhow::Result<()> {
        info!("starting MCP server on stdio");
        let server = self.serve((stdin(), stdout())).await?;
        server.waiting().await?;
        Ok(())
    }

    async fn handle_open_login(&self) -> Result<String, String> {
        let mut session = self.session.lock().await;
        let url = bootstrap_once(&mut session)
            .await
            .map_err(|e| e.to_string())?;
        Ok(format!("Opened {url}"))
    }

    async fn handle_wait_logged_in(
        &self,
        params: WaitLoggedInParams,
    ) -> Result<String, String> {
        let mut session = self.session.lock().await;
        let timeouts = session.config().timeouts.clone();
        let (prefix, bound) = login_wait_params(session.config(), params.timeout_ms);
        let page = session
            .acquire_page()
            .await
            .map_err(|e| e.to_string())?
            .clone();
        let url = wait_for_url_prefix(&page, &prefix, bound, timeouts.poll_interval)
            .await
            .map_err(|e| e.to_string())?;
        session.advance_phase(SessionPhase::LoggedIn);
        Ok(format!("Logged in. Current URL: {url}"))
    }

    async fn handle_goto_emails(&self) -> Result<String, String> {
        let mut session = self.session.lock().await;
        let timeouts = session.config().timeouts.clone();
        let target = session.config().target_after_login();
        let page = session
            .acquire_page()
            .await
            .map_err(|e| e.to_string())?
            .clone();
        safe_goto(&page, &target, &timeouts)
            .await
            .map_err(|e| e.to_string())?;
        Ok(format!("Opened {target}"))
    }

    async fn handle_open_email(&self, params: OpenEmailParams) -> Result<String, String> {
        let mut session = self.session.lock().await;
        let timeouts = session.config().timeouts.clone();
        let page = session
            .acquire_page()
            .await
            .map_err(|e| e.to_string())?
            .clone();
        let probe = DomProbe::new(&page, &timeouts);
        let matched = EmailMatcher::new(&probe)
            .locate_row(&EmailQuery {
                subject: params.subject,
                from: params.from,
                index: params.index,
            })
            .await
            .map_err(|e| e.to_string())?;
        Ok(format!("Opened email (matched by {})", matched.as_str()))
    }

    async fn handle_open_compose(&self) -> Result<String, String> {
        let mut session = self.session.lock().await;
        let timeouts = session.config().timeouts.clone();
        let page = session
            .acquire_page()
            .await
            .map_err(|e| e.to_string())?
            .clone();
        let probe = DomProbe::new(&page, &timeouts);
        ComposeOrchestrator::new(&probe)
            .open_compose()
            .await
            .map_err(|e| e.to_string())?;
        Ok("Compose window opened".into())
    }

    async fn handle_compose(&self, params: ComposeParams) -> Result<String, String> {
        // Validation failures must not reach the browser layer.
        let request = validate_compose(params)?;
        let mut session = self.session.lock().await;
        let timeouts = session.config().timeouts.clone();
        let page = session
            .acquire_page()
            .await
            .map_err(|e| e.to_string())?
            .clone();
        let probe = DomProbe::new(&page, &timeouts);
        ComposeOrchestrator::new(&probe)
            .compose(&request)
            .await
            .map_err(|e| e.to_string())
    }

    async fn handle_reply_compose(
        &self,
        params: ReplyComposeParams,
        mode: ReplyMode,
        tool: &str,
    ) -> Result<String, String> {
        let (body, auto_send) = validate_reply(params, tool)?;
        let mut session = self.session.lock().await;
        let timeouts = session.config().timeouts.clone();
        let page = session
            .acquire_page()
            .await
            .map_err(|e| e.to_string())?
            .clone();
        let probe = DomProbe::new(&page, &timeouts);
        ComposeOrchestrator::new(&probe)
            .reply(mode, &body, auto_send)
            .await
            .map_err(|e| e.to_string())
    }

    async fn handle_forward_compose(
        &self,
        params: ForwardComposeParams,
    ) -> Result<String, String> {
        let (to, body, auto_send) = validate_forward(params)?;
        let mut session = self.session.lock().await;
        let timeouts = session.config().timeouts.clone();
        let page = session
            .acquire_page()
            .await
            .map_err(|e| e.to_string())?
            .clone();
        let probe = DomProbe::new(&page, &timeouts);
        ComposeOrchestrator::new(&probe)
            .forward(&to, body.as_deref(), auto_send)
            .await
            .map_err(|e| e.to_string())
    }

    async fn handle_reply(&self, params: ReplyParams) -> Result<String, String> {
        let mode = parse_reply_mode(params.mode.as_deref())?;
        let mut session = self.session.lock().await;
        let timeouts = session.config().timeouts.clone();
        let page = session
            .acquire_page()
            .await
            .map_err(|e| e.to_string())?
            .clone();
        let probe = DomProbe::new(&page, &timeouts);
        ComposeOrchestrator::new(&probe)
            .click_action(mode)
            .await
            .map_err(|e| e.to_string())?;
        Ok(format!("Clicked {}", mode.label()))
    }

    async fn handle_send(&self) -> Result<String, String> {
        let mut session = self.session.lock().await;
        let timeouts = session.config().timeouts.clone();
        let page = session
            .acquire_page()
            .await
            .map_err(|e| e.to_string())?
            .clone();
        let probe = DomProbe::new(&page, &timeouts);
        ComposeOrchestrator::new(&probe)
            .send()
            .await
            .map_err(|e| e.to_string())
    }

    async fn handle_screenshot(&self, params: ScreenshotToolParams) -> Result<String, String> {
        let path = params
            .path
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SCREENSHOT_PATH.to_string());
        let mut session = self.session.lock().await;
        let timeouts = session.config().timeouts.clone();
        let page = session
            .acquire_page()
            .await
            .map_err(|e| e.to_string())?
            .clone();
        let probe = DomProbe::new(&page, &timeouts);
        probe
            .screenshot(&path, true)
            .await
            .map_err(|e| e.to_string())?;
        Ok(format!("Screenshot saved to {path}"))
    }

    async fn handle_close(&self) -> Result<String, String> {
        let mut session = self.session.lock().await;
        session.close().await;
        Ok("Browser closed".into())
    }
}

// ============================================================================
// ServerHandler
// ============================================================================

impl ServerHandler for MailPilotServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "mailpilot".to_string(),
                title: Some("MailPilot MCP Server".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "MailPilot MCP Server - drives the webmail module of the target application. \
                Start with open_login and wait_logged_in, then use goto_emails/open_email to \
                navigate the inbox, compose/reply_compose/reply_all_compose/forward_compose \
                to write messages, send to send a pending draft, screenshot for debugging, \
                and close to tear the browser down."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        let tools = vec![
            Tool::new(
                "open_login",
                "Open the application, landing on the email module or the login page. \
                 Returns the URL actually reached.",
                schema_for_type::<EmptyParams>(),
            ),
            Tool::new(
                "wait_logged_in",
                "Wait until an interactive login finishes and the browser is back inside \
                 the application. Returns the current URL.",
                schema_for_type::<WaitLoggedInParams>(),
            ),
            Tool::new(
                "goto_emails",
                "Navigate directly to the email module.",
                schema_for_type::<EmptyParams>(),
            ),
            Tool::new(
                "open_email",
                "Find and open an inbox email by sender and/or subject words, or by \
                 zero-based position. Text filters always win over the index.",
                schema_for_type::<OpenEmailParams>(),
            ),
            Tool::new(
                "open_compose",
                "Open a fresh compose window if one is not already open.",
                schema_for_type::<EmptyParams>(),
            ),
            Tool::new(
                "compose",
                "Compose an email: recipients, subject, body, optional attachments. \
                 Leaves a draft unless autoSend is true.",
                schema_for_type::<ComposeParams>(),
            ),
            Tool::new(
                "reply",
                "Click Reply, Reply all, or Forward on the open email without typing \
                 anything.",
                schema_for_type::<ReplyParams>(),
            ),
            Tool::new(
                "reply_compose",
                "Reply to the open email with the given body.",
                schema_for_type::<ReplyComposeParams>(),
            ),
            Tool::new(
                "reply_all_compose",
                "Reply to all recipients of the open email with the given body.",
                schema_for_type::<ReplyComposeParams>(),
            ),
            Tool::new(
                "forward_compose",
                "Forward the open email to a recipient; body is optional.",
                schema_for_type::<ForwardComposeParams>(),
            ),
            Tool::new(
                "send",
                "Click Send on the open compose window. Reports whether the button \
                 was visible.",
                schema_for_type::<EmptyParams>(),
            ),
            Tool::new(
                "screenshot",
                "Save a full-page PNG screenshot for debugging.",
                schema_for_type::<ScreenshotToolParams>(),
            ),
            Tool::new(
                "close",
                "Close the browser and reset the session.",
                schema_for_type::<EmptyParams>(),
            ),
        ];
        Ok(ListToolsResult { tools, next_cursor: None, meta: None })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        fn args<T: serde::de::DeserializeOwned>(
            request: &mut CallToolRequestParams,
        ) -> Result<T, McpError> {
            serde_json::from_value(Value::Object(request.arguments.take().unwrap_or_default()))
                .map_err(|e| McpError::invalid_params(format!("Invalid parameters: {}", e), None))
        }

        let mut request = request;
        let result = match request.name.as_ref() {
            "open_login" => self.handle_open_login().await,
            "wait_logged_in" => {
                let params: WaitLoggedInParams = args(&mut request)?;
                self.handle_wait_logged_in(params).await
            }
            "goto_emails" => self.handle_goto_emails().await,
            "open_email" => {
                let params: OpenEmailParams = args(&mut request)?;
                self.handle_open_email(params).await
            }
            "open_compose" => self.handle_open_compose().await,
            "compose" => {
                let params: ComposeParams = args(&mut request)?;
                self.handle_compose(params).await
            }
            "reply" => {
                let params: ReplyParams = args(&mut request)?;
                self.handle_reply(params).await
            }
            "reply_compose" => {
                let params: ReplyComposeParams = args(&mut request)?;
                self.handle_reply_compose(params, ReplyMode::Reply, "reply_compose")
                    .await
            }
            "reply_all_compose" => {
                let params: ReplyComposeParams = args(&mut request)?;
                self.handle_reply_compose(params, ReplyMode::ReplyAll, "reply_all_compose")
                    .await
            }
            "forward_compose" => {
                let params: ForwardComposeParams = args(&mut request)?;
                self.handle_forward_compose(params).await
            }
            "send" => self.handle_send().await,
            "screenshot" => {
                let params: ScreenshotToolParams = args(&mut request)?;
                self.handle_screenshot(params).await
            }
            "close" => self.handle_close().await,
            other => Err(format!("Unknown tool: {other}")),
        };

        match result {
            Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
            Err(error) => Ok(CallToolResult::error(vec![Content::text(error)])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compose_params(
        to: Option<&str>,
        subject: Option<&str>,
        body: Option<&str>,
    ) -> ComposeParams {
        ComposeParams {
            to: to.map(String::from),
            cc: None,
            bcc: None,
            subject: subject.map(String::from),
            body: body.map(String::from),
            attachments: None,
            auto_send: None,
        }
    }

    #[test]
    fn compose_missing_subject_gets_usage_hint() {
        let err = validate_compose(compose_params(Some("a@x.com"), None, Some("hi")))
            .unwrap_err();
        assert!(err.contains("subject"));
        assert!(err.contains("Usage"));
    }

    #[test]
    fn compose_lists_all_missing_fields() {
        let err = validate_compose(compose_params(None, None, None)).unwrap_err();
        assert!(err.contains("to, subject, body"));
    }

    #[test]
    fn compose_whitespace_counts_as_missing() {
        let err = validate_compose(compose_params(Some("  "), Some("Hi"), Some("x")))
            .unwrap_err();
        assert!(err.contains("to"));
    }

    #[test]
    fn compose_valid_request_defaults() {
        let req = validate_compose(compose_params(Some("a@x.com"), Some("Hi"), Some("Hello")))
            .unwrap();
        assert_eq!(req.to, "a@x.com");
        assert!(!req.auto_send);
        assert!(req.attachments.is_empty());
        assert!(req.needs_cc_clear());
    }

    #[test]
    fn reply_requires_body() {
        let err = validate_reply(
            ReplyComposeParams { body: None, auto_send: Some(true) },
            "reply_compose",
        )
        .unwrap_err();
        assert!(err.contains("body"));
        assert!(err.contains("reply_compose"));
    }

    #[test]
    fn forward_requires_to_only() {
        let (to, body, auto_send) = validate_forward(ForwardComposeParams {
            to: Some("a@x.com".into()),
            body: None,
            auto_send: None,
        })
        .unwrap();
        assert_eq!(to, "a@x.com");
        assert!(body.is_none());
        assert!(!auto_send);

        assert!(validate_forward(ForwardComposeParams {
            to: None,
            body: Some("fyi".into()),
            auto_send: None,
        })
        .is_err());
    }

    #[test]
    fn login_wait_watches_the_email_module_url() {
        let config = AppConfig::default();
        let (prefix, bound) = login_wait_params(&config, None);
        assert_eq!(prefix, config.target_after_login());
        // Stricter than the bare origin: landing on base_url alone
        // must not count as logged in.
        assert!(prefix.len() > config.base_url.len());
        assert_eq!(bound, config.timeouts.login_url_wait);
    }

    #[test]
    fn login_wait_honors_caller_timeout() {
        let (_, bound) = login_wait_params(&AppConfig::default(), Some(2500));
        assert_eq!(bound, Duration::from_millis(2500));
    }

    #[test]
    fn reply_mode_parsing() {
        assert_eq!(parse_reply_mode(Some("reply")).unwrap(), ReplyMode::Reply);
        assert_eq!(parse_reply_mode(Some("replyAll")).unwrap(), ReplyMode::ReplyAll);
        assert_eq!(parse_reply_mode(Some("forward")).unwrap(), ReplyMode::Forward);
        assert!(parse_reply_mode(Some("bounce")).is_err());
        assert!(parse_reply_mode(None).unwrap_err().contains("Usage"));
    }

    #[test]
    fn compose_params_accept_camel_case() {
        let params: ComposeParams = serde_json::from_value(serde_json::json!({
            "to": "a@x.com",
            "subject": "Hi",
            "body": "Hello",
            "autoSend": true
        }))
        .unwrap();
        assert_eq!(params.auto_send, Some(true));
    }
}
