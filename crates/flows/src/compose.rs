//! Compose, reply and forward orchestration
//!
//! Each flow ends with a human-readable status string; the dispatch
//! layer wraps it into a result envelope. A missing Send button is a
//! reported outcome, never an error, so a half-finished draft is
//! still described truthfully.

use mailpilot_locator::{
    assert_compose_open, resolve_compose_scope, ComposeScope, ElementResolver, LocatorError,
    LocatorStrategy, LocatorTarget, ScopeKind,
};
use mailpilot_session::{DomProbe, TextFilter};
use tracing::{debug, info, warn};

use crate::errors::FlowError;
use crate::inbox::{EmailMatcher, EmailQuery};
use crate::recipient::{RecipientField, RecipientPicker};

const LABEL_SELECTOR: &str = "label, span, div";
const BODY_EDITOR_SELECTOR: &str = "[contenteditable=true], [role=textbox]";

/// Where to click for the body when no editable region is detected:
/// a fixed point inside the usual body area of the compose surface.
const BODY_FALLBACK_POINT: (f64, f64) = (640.0, 520.0);

/// A fully validated compose request. Construction-time validation
/// happens at the dispatch boundary; by the time this exists, the
/// required fields are present.
#[derive(Clone, Debug, Default)]
pub struct ComposeRequest {
    pub to: String,
    pub cc: Option<String>,
    pub bcc: Option<String>,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<String>,
    pub auto_send: bool,
}

impl ComposeRequest {
    /// Absence of `cc` means the field must end up empty, not
    /// "whatever it already contained".
    pub fn needs_cc_clear(&self) -> bool {
        self.cc.is_none()
    }
}

/// The three detail-view actions that open a reply-like surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplyMode {
    Reply,
    ReplyAll,
    Forward,
}

impl ReplyMode {
    pub fn label(&self) -> &'static str {
        match self {
            ReplyMode::Reply => "Reply",
            ReplyMode::ReplyAll => "Reply all",
            ReplyMode::Forward => "Forward",
        }
    }
}

/// Forward's body is optional by design: whitespace-only text must
/// skip body typing entirely.
fn has_body(body: Option<&str>) -> bool {
    body.is_some_and(|b| !b.trim().is_empty())
}

fn outcome_message(action: &str, auto_send: bool, send_report: Option<&str>) -> String {
    match (auto_send, send_report) {
        (false, _) => format!("{action} composed (not sent)"),
        (true, Some("Send clicked")) => format!("{action} sent"),
        (true, Some(report)) => format!("{action} composed but {report}"),
        (true, None) => format!("{action} composed"),
    }
}

/// Sequences whole compose / reply / forward flows.
pub struct ComposeOrchestrator<'a> {
    probe: &'a DomProbe<'a>,
}

impl<'a> ComposeOrchestrator<'a> {
    pub fn new(probe: &'a DomProbe<'a>) -> Self {
        Self { probe }
    }

    /// Open a fresh compose surface unless one is already open.
    pub async fn open_compose(&self) -> Result<(), FlowError> {
        if self.compose_already_open().await? {
            debug!("compose surface already open");
            return Ok(());
        }
        let resolver = ElementResolver::new(self.probe);
        resolver
            .click(&LocatorTarget::compose_affordance(), None)
            .await?;
        tokio::time::sleep(self.probe.timeouts().settle_compose).await;
        assert_compose_open(self.probe).await?;
        Ok(())
    }

    /// Fresh compose: recipients, subject, body, attachments, then
    /// send or report a draft.
    pub async fn compose(&self, req: &ComposeRequest) -> Result<String, FlowError> {
        self.open_compose().await?;
        let scope = assert_compose_open(self.probe).await?;
        let picker = RecipientPicker::new(self.probe);

        if req.needs_cc_clear() {
            picker.clear_cc_chips().await?;
        }
        picker.pick(RecipientField::To, &req.to).await?;
        if let Some(cc) = &req.cc {
            picker.pick(RecipientField::Cc, cc).await?;
        }
        if let Some(bcc) = &req.bcc {
            picker.pick(RecipientField::Bcc, bcc).await?;
        }

        self.fill_subject(&req.subject).await?;
        self.fill_body(&scope, &req.body).await?;
        if !req.attachments.is_empty() {
            self.attach(&req.attachments).await?;
        }

        let report = if req.auto_send {
            Some(self.send().await?)
        } else {
            None
        };
        let message = outcome_message("Email", req.auto_send, report.as_deref());
        info!(%message, "compose flow finished");
        Ok(message)
    }

    /// Reply or reply-all: open the detail action, fill body only.
    pub async fn reply(
        &self,
        mode: ReplyMode,
        body: &str,
        auto_send: bool,
    ) -> Result<String, FlowError> {
        self.click_action(mode).await?;
        let scope = assert_compose_open(self.probe).await?;
        self.fill_body(&scope, body).await?;
        let report = if auto_send { Some(self.send().await?) } else { None };
        Ok(outcome_message(mode.label(), auto_send, report.as_deref()))
    }

    /// Forward: recipient required, body optional.
    pub async fn forward(
        &self,
        to: &str,
        body: Option<&str>,
        auto_send: bool,
    ) -> Result<String, FlowError> {
        self.click_action(ReplyMode::Forward).await?;
        let scope = assert_compose_open(self.probe).await?;
        let picker = RecipientPicker::new(self.probe);
        picker.pick(RecipientField::To, to).await?;
        if has_body(body) {
            self.fill_body(&scope, body.unwrap_or_default()).await?;
        } else {
            debug!("forward body empty, skipping body typing");
        }
        let report = if auto_send { Some(self.send().await?) } else { None };
        Ok(outcome_message("Forward", auto_send, report.as_deref()))
    }

    /// Click a detail-view action without filling anything.
    pub async fn click_action(&self, mode: ReplyMode) -> Result<(), FlowError> {
        self.ensure_detail_open().await?;
        let resolver = ElementResolver::new(self.probe);
        resolver
            .click(&LocatorTarget::action_control(mode.label()), None)
            .await?;
        tokio::time::sleep(self.probe.timeouts().settle_click).await;
        Ok(())
    }

    /// Click Send if it is visible. "Not visible" is a reported
    /// outcome, not a failure.
    pub async fn send(&self) -> Result<String, FlowError> {
        let scope = resolve_compose_scope(self.probe).await?;
        let resolver = ElementResolver::new(self.probe);
        match resolver
            .resolve_within(&LocatorTarget::send_control(), Some(&scope.rect))
            .await
        {
            Ok(hit) => {
                self.probe.click_hit(&hit).await?;
                tokio::time::sleep(self.probe.timeouts().settle_send).await;
                Ok("Send clicked".into())
            }
            Err(LocatorError::NoStrategyMatched { .. }) => {
                warn!("Send control not visible");
                Ok("Send button not visible".into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Make sure an email detail view is open, opening the first
    /// inbox row when none is.
    pub async fn ensure_detail_open(&self) -> Result<(), FlowError> {
        let resolver = ElementResolver::new(self.probe);
        let reply = LocatorTarget::action_control(ReplyMode::Reply.label());
        if resolver.resolve(&reply).await.is_ok() {
            return Ok(());
        }
        debug!("no detail view, opening first inbox row");
        let matcher = EmailMatcher::new(self.probe);
        matcher
            .locate_row(&EmailQuery { index: Some(0), ..Default::default() })
            .await?;

        let deadline = tokio::time::Instant::now() + self.probe.timeouts().detail_open;
        loop {
            if resolver.resolve(&reply).await.is_ok() {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(FlowError::DetailNotOpen(
                    "no Reply action after opening the first row".into(),
                ));
            }
            tokio::time::sleep(self.probe.timeouts().poll_interval).await;
        }
    }

    async fn compose_already_open(&self) -> Result<bool, FlowError> {
        let scope = resolve_compose_scope(self.probe).await?;
        if scope.kind == ScopeKind::Page {
            return Ok(false);
        }
        let to_visible = self
            .probe
            .scan(LABEL_SELECTOR, &TextFilter::exact("To"))
            .await?
            .iter()
            .any(|h| {
                let (cx, cy) = h.rect.center();
                scope.rect.contains_point(cx, cy)
            });
        Ok(to_visible)
    }

    /// Direct value-set preferred; keystroke typing as the fallback.
    async fn fill_subject(&self, subject: &str) -> Result<(), FlowError> {
        if self
            .probe
            .set_value_after_label("Subject", subject)
            .await?
        {
            return Ok(());
        }
        debug!("direct subject set failed, typing instead");
        let input = self.probe.input_after_label("Subject").await?;
        self.probe.click_hit(&input).await?;
        self.probe.insert_text(subject).await?;
        Ok(())
    }

    /// Click a rich-text editable region and type; fall back to a
    /// fixed body-area coordinate when none is detected.
    async fn fill_body(&self, scope: &ComposeScope, body: &str) -> Result<(), FlowError> {
        let editors = self
            .probe
            .scan(BODY_EDITOR_SELECTOR, &TextFilter::any())
            .await?;
        let in_scope = editors.iter().find(|h| {
            let (cx, cy) = h.rect.center();
            scope.rect.contains_point(cx, cy)
        });
        match in_scope {
            Some(editor) => self.probe.click_hit(editor).await?,
            None => {
                debug!("no editable region detected, clicking body area");
                let (x, y) = BODY_FALLBACK_POINT;
                self.probe.click_at(x, y).await?;
            }
        }
        tokio::time::sleep(self.probe.timeouts().settle_click).await;
        self.probe.insert_text(body).await?;
        Ok(())
    }

    /// Supply attachment files; the probe prefers a native file
    /// input and needs the Attach control only for the dialog
    /// fallback.
    async fn attach(&self, paths: &[String]) -> Result<(), FlowError> {
        let resolver = ElementResolver::new(self.probe);
        let attach_target = LocatorTarget::new(
            "Attach",
            vec![
                LocatorStrategy::ExactText("Attach".into()),
                LocatorStrategy::ButtonTextContains("Attach".into()),
                LocatorStrategy::AriaLabelContains("Attach".into()),
            ],
        );
        let button = resolver.resolve(&attach_target).await.ok();
        self.probe
            .supply_files(paths, button.as_ref())
            .await
            .map_err(|e| FlowError::Attachment(e.to_string()))?;
        tokio::time::sleep(self.probe.timeouts().settle_attach).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_body_skipped_when_blank() {
        assert!(!has_body(None));
        assert!(!has_body(Some("")));
        assert!(!has_body(Some("   \n\t")));
        assert!(has_body(Some("FYI")));
    }

    #[test]
    fn cc_omission_requires_clearing() {
        let without_cc = ComposeRequest { to: "a@x.com".into(), ..Default::default() };
        assert!(without_cc.needs_cc_clear());
        let with_cc = ComposeRequest {
            cc: Some("b@x.com".into()),
            ..ComposeRequest::default()
        };
        assert!(!with_cc.needs_cc_clear());
    }

    #[test]
    fn deferred_send_reports_not_sent() {
        assert_eq!(
            outcome_message("Email", false, None),
            "Email composed (not sent)"
        );
    }

    #[test]
    fn auto_send_reports_outcome() {
        assert_eq!(
            outcome_message("Email", true, Some("Send clicked")),
            "Email sent"
        );
        assert_eq!(
            outcome_message("Reply", true, Some("Send button not visible")),
            "Reply composed but Send button not visible"
        );
    }

    #[test]
    fn reply_mode_labels() {
        assert_eq!(ReplyMode::Reply.label(), "Reply");
        assert_eq!(ReplyMode::ReplyAll.label(), "Reply all");
        assert_eq!(ReplyMode::Forward.label(), "Forward");
    }
}
