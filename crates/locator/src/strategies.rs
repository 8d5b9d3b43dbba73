//! Strategy-chain evaluation
//!
//! Short-circuit loop over a target's strategies with per-strategy
//! logging. A probe error on one strategy does not abort the chain;
//! the chain fails only when every strategy came up empty.

use mailpilot_session::{DomProbe, ElementHit, Rect};
use tracing::{debug, warn};

use crate::errors::LocatorError;
use crate::types::LocatorTarget;

/// Evaluates [`LocatorTarget`] chains against a page.
pub struct ElementResolver<'a> {
    probe: &'a DomProbe<'a>,
}

impl<'a> ElementResolver<'a> {
    pub fn new(probe: &'a DomProbe<'a>) -> Self {
        Self { probe }
    }

    /// First visible match across the chain, anywhere on the page.
    pub async fn resolve(&self, target: &LocatorTarget) -> Result<ElementHit, LocatorError> {
        self.resolve_within(target, None).await
    }

    /// First visible match whose center falls inside `scope`, when a
    /// scope is given.
    pub async fn resolve_within(
        &self,
        target: &LocatorTarget,
        scope: Option<&Rect>,
    ) -> Result<ElementHit, LocatorError> {
        for (rank, strategy) in target.strategies.iter().enumerate() {
            let (selector, filter) = strategy.query();
            match self.probe.scan(&selector, &filter).await {
                Ok(hits) => {
                    let hit = hits.into_iter().find(|h| {
                        scope.map_or(true, |s| {
                            let (cx, cy) = h.rect.center();
                            s.contains_point(cx, cy)
                        })
                    });
                    if let Some(hit) = hit {
                        debug!(target = %target.name, rank, strategy = %strategy, "strategy matched");
                        return Ok(hit);
                    }
                    debug!(target = %target.name, rank, strategy = %strategy, "strategy empty");
                }
                Err(e) => {
                    warn!(target = %target.name, rank, strategy = %strategy, error = %e,
                        "strategy errored, trying next");
                }
            }
        }
        Err(LocatorError::no_match(
            target.name.clone(),
            target.strategies.len(),
        ))
    }

    /// Resolve and click in one step. Unscoped resolution re-runs the
    /// winning query so the element is scrolled into view before the
    /// click; scoped hits are clicked where they were measured.
    pub async fn click(
        &self,
        target: &LocatorTarget,
        scope: Option<&Rect>,
    ) -> Result<ElementHit, LocatorError> {
        let hit = self.resolve_within(target, scope).await?;
        if scope.is_some() {
            self.probe.click_hit(&hit).await?;
            return Ok(hit);
        }
        for strategy in &target.strategies {
            let (selector, filter) = strategy.query();
            if let Ok(clicked) = self.probe.click(&selector, &filter).await {
                return Ok(clicked);
            }
        }
        // Resolution succeeded moments ago; click at the stale rect.
        self.probe.click_hit(&hit).await?;
        Ok(hit)
    }
}
