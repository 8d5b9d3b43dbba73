//! Compose-scope detection
//!
//! Field operations must not match unrelated page regions, so every
//! compose flow first narrows to the smallest container that holds
//! the active compose surface: a dialog with a Send control, else a
//! generic container with one, else the whole page.

use mailpilot_session::{DomProbe, Rect, TextFilter};
use tracing::debug;

use crate::errors::LocatorError;
use crate::strategies::ElementResolver;
use crate::types::LocatorTarget;

const DIALOG_SELECTOR: &str = "[role=dialog], .ms-Dialog-main, .ms-Panel-main, .ms-Modal";
const CONTAINER_SELECTOR: &str = "form, section, div[class*=compose i], div[class*=Compose]";
const LABEL_SELECTOR: &str = "label, span, div";

/// A container must comfortably exceed the Send control it encloses
/// to count as a surface rather than a tight button wrapper.
const CONTAINER_MIN_AREA_RATIO: f64 = 2.0;

/// How a scope was found.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    Dialog,
    Container,
    Page,
}

/// The region searched for compose fields and controls.
#[derive(Clone, Copy, Debug)]
pub struct ComposeScope {
    pub kind: ScopeKind,
    pub rect: Rect,
}

impl ComposeScope {
    fn page() -> Self {
        // Unbounded region; containment checks always pass.
        Self {
            kind: ScopeKind::Page,
            rect: Rect { x: 0.0, y: 0.0, width: f64::MAX, height: f64::MAX },
        }
    }
}

/// Resolve the smallest enclosing compose surface.
pub async fn resolve_compose_scope(probe: &DomProbe<'_>) -> Result<ComposeScope, LocatorError> {
    let resolver = ElementResolver::new(probe);
    let send = match resolver.resolve(&LocatorTarget::send_control()).await {
        Ok(hit) => hit,
        Err(_) => {
            debug!("no Send control visible, scope falls back to page");
            return Ok(ComposeScope::page());
        }
    };

    let dialogs = probe.scan(DIALOG_SELECTOR, &TextFilter::any()).await?;
    if let Some(rect) = smallest_container(
        &dialogs.iter().map(|h| h.rect).collect::<Vec<_>>(),
        &send.rect,
        CONTAINER_MIN_AREA_RATIO,
    ) {
        debug!(?rect, "scope is a dialog");
        return Ok(ComposeScope { kind: ScopeKind::Dialog, rect });
    }

    let containers = probe.scan(CONTAINER_SELECTOR, &TextFilter::any()).await?;
    if let Some(rect) = smallest_container(
        &containers.iter().map(|h| h.rect).collect::<Vec<_>>(),
        &send.rect,
        CONTAINER_MIN_AREA_RATIO,
    ) {
        debug!(?rect, "scope is a generic container");
        return Ok(ComposeScope { kind: ScopeKind::Container, rect });
    }

    debug!("no enclosing container, scope falls back to page");
    Ok(ComposeScope::page())
}

/// Block until both a "To" label and the Send control are visible
/// inside the resolved scope. Safe to call on an already-open surface;
/// it re-reads state and mutates nothing.
pub async fn assert_compose_open(probe: &DomProbe<'_>) -> Result<ComposeScope, LocatorError> {
    let bound = probe.timeouts().compose_open;
    let poll = probe.timeouts().poll_interval;
    let resolver = ElementResolver::new(probe);
    let deadline = tokio::time::Instant::now() + bound;
    loop {
        let scope = resolve_compose_scope(probe).await?;
        let in_scope = |rect: &Rect| {
            let (cx, cy) = rect.center();
            scope.rect.contains_point(cx, cy)
        };

        let to_visible = probe
            .scan(LABEL_SELECTOR, &TextFilter::exact("To"))
            .await?
            .iter()
            .any(|h| in_scope(&h.rect));
        let send_visible = match resolver
            .resolve_within(&LocatorTarget::send_control(), Some(&scope.rect))
            .await
        {
            Ok(_) => true,
            Err(LocatorError::NoStrategyMatched { .. }) => false,
            Err(e) => return Err(e),
        };

        if to_visible && send_visible {
            debug!(kind = ?scope.kind, "compose surface open");
            return Ok(scope);
        }
        if tokio::time::Instant::now() >= deadline {
            let missing = match (to_visible, send_visible) {
                (false, false) => "To label and Send control",
                (false, true) => "To label",
                _ => "Send control",
            };
            return Err(LocatorError::ComposeNotOpen(format!(
                "{missing} not visible within {bound:?}"
            )));
        }
        tokio::time::sleep(poll).await;
    }
}

/// Smallest rect that fully contains `inner` and is at least
/// `min_ratio` times its area.
fn smallest_container(candidates: &[Rect], inner: &Rect, min_ratio: f64) -> Option<Rect> {
    candidates
        .iter()
        .filter(|c| {
            c.contains_point(inner.x, inner.y)
                && c.contains_point(inner.right(), inner.bottom())
                && c.area() >= inner.area() * min_ratio
        })
        .min_by(|a, b| {
            a.area()
                .partial_cmp(&b.area())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Rect {
        Rect { x, y, width: w, height: h }
    }

    #[test]
    fn picks_smallest_enclosing_container() {
        let send = rect(100.0, 100.0, 60.0, 30.0);
        let candidates = vec![
            rect(0.0, 0.0, 1000.0, 800.0),
            rect(50.0, 50.0, 400.0, 300.0),
            rect(90.0, 90.0, 200.0, 100.0),
        ];
        let chosen = smallest_container(&candidates, &send, 2.0);
        assert_eq!(chosen, Some(rect(90.0, 90.0, 200.0, 100.0)));
    }

    #[test]
    fn rejects_non_enclosing_and_tight_wrappers() {
        let send = rect(100.0, 100.0, 60.0, 30.0);
        // First does not contain the button, second is barely larger.
        let candidates = vec![
            rect(300.0, 300.0, 400.0, 300.0),
            rect(99.0, 99.0, 62.0, 32.0),
        ];
        assert_eq!(smallest_container(&candidates, &send, 2.0), None);
    }

    #[test]
    fn page_scope_contains_everything() {
        let scope = ComposeScope::page();
        assert_eq!(scope.kind, ScopeKind::Page);
        assert!(scope.rect.contains_point(0.0, 0.0));
        assert!(scope.rect.contains_point(99999.0, 99999.0));
    }
}
