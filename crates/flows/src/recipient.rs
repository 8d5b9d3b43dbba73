//! Chip-based recipient fields
//!
//! Fluent-style pickers accept values only through their suggestion
//! surface, so each field runs the same protocol: reveal (bcc), open
//! the dropdown, type a short filter prefix, select a suggestion
//! (structural container first, geometric fallback second), commit
//! with Tab.

use std::time::Duration;

use mailpilot_locator::textmatch::filter_prefix;
use mailpilot_session::{DomProbe, ElementHit, Rect, TextFilter};
use tracing::{debug, warn};

use crate::errors::FlowError;

const SUGGESTION_CONTAINER_SELECTOR: &str =
    ".ms-Callout, .ms-Suggestions, .ms-Suggestions-container";
const SUGGESTION_ITEM_SELECTOR: &str =
    "[role=option], li, .ms-Suggestions-item, .ms-Suggestions-itemButton, button";
const CHIP_REMOVE_SELECTOR: &str =
    "[data-icon-name=Cancel], .ms-TagItem-close, button[title*=Remove i]";

/// Geometric fallback tolerances: a candidate counts as a suggestion
/// when it sits below the input (within a small vertical tolerance)
/// and inside a horizontal band around it.
const HORIZONTAL_SLACK_LEFT: f64 = 40.0;
const HORIZONTAL_SLACK_RIGHT: f64 = 800.0;
const VERTICAL_TOLERANCE: f64 = 2.0;

/// Clicking here, just inside the right edge of the input box, lands
/// on the dropdown chevron region.
const CHEVRON_INSET: f64 = 10.0;

/// Inter-key delay while typing the filter prefix, slow enough that
/// the picker sees individual keystrokes.
const FILTER_KEY_DELAY: Duration = Duration::from_millis(30);

/// Passes clearing chips before giving up; each pass removes at
/// least one chip or stops.
const CLEAR_CHIP_PASSES: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecipientField {
    To,
    Cc,
    Bcc,
}

impl RecipientField {
    pub fn label(&self) -> &'static str {
        match self {
            RecipientField::To => "To",
            RecipientField::Cc => "Cc",
            RecipientField::Bcc => "Bcc",
        }
    }
}

/// Drives one recipient field at a time through the picker protocol.
pub struct RecipientPicker<'a> {
    probe: &'a DomProbe<'a>,
}

impl<'a> RecipientPicker<'a> {
    pub fn new(probe: &'a DomProbe<'a>) -> Self {
        Self { probe }
    }

    /// Run the full protocol: commit `value` as a chip in `field`.
    pub async fn pick(&self, field: RecipientField, value: &str) -> Result<(), FlowError> {
        debug!(field = field.label(), value, "picking recipient");
        let input = self.open_field(field).await?;
        self.filter(value).await?;
        self.select(&input, field, value).await?;
        self.commit().await?;
        Ok(())
    }

    /// Click any visible remove controls inside the Cc row until none
    /// remain. No-op when no Cc label is on screen.
    pub async fn clear_cc_chips(&self) -> Result<(), FlowError> {
        let cc_rows = self
            .probe
            .ancestor_rows(&TextFilter::exact(RecipientField::Cc.label()))
            .await?;
        let Some(row) = cc_rows.first() else {
            debug!("no Cc row visible, nothing to clear");
            return Ok(());
        };
        let row_rect = row.rect;
        for _ in 0..CLEAR_CHIP_PASSES {
            let removes = self
                .probe
                .scan(CHIP_REMOVE_SELECTOR, &TextFilter::any())
                .await?;
            let Some(target) = removes.iter().find(|h| {
                let (cx, cy) = h.rect.center();
                row_rect.contains_point(cx, cy)
            }) else {
                return Ok(());
            };
            self.probe.click_hit(target).await?;
            tokio::time::sleep(self.probe.timeouts().settle_chip).await;
        }
        warn!("chip removal did not converge, leaving remaining chips");
        Ok(())
    }

    /// Reveal (bcc only) and open the field's suggestion surface.
    /// Returns the field's input element.
    async fn open_field(&self, field: RecipientField) -> Result<ElementHit, FlowError> {
        let input = match self.probe.input_after_label(field.label()).await {
            Ok(hit) => hit,
            Err(e) if field == RecipientField::Bcc => {
                // Field hidden behind its toggle
                debug!("revealing Bcc field");
                self.probe
                    .click("button, span, [role=button]", &TextFilter::exact("Bcc"))
                    .await
                    .map_err(|_| e)?;
                tokio::time::sleep(self.probe.timeouts().settle_click).await;
                self.probe.input_after_label(field.label()).await?
            }
            Err(e) => return Err(e.into()),
        };

        self.probe.click_hit(&input).await?;
        // Nudge the chevron region so the suggestion surface opens
        // even without typed input.
        let chevron_x = input.rect.right() - CHEVRON_INSET;
        let (_, center_y) = input.rect.center();
        self.probe.click_at(chevron_x, center_y).await?;
        Ok(input)
    }

    /// Type the leading characters of `value` into the focused input.
    async fn filter(&self, value: &str) -> Result<(), FlowError> {
        let prefix = filter_prefix(value);
        self.probe.type_chars(&prefix, FILTER_KEY_DELAY).await?;
        tokio::time::sleep(self.probe.timeouts().settle_filter).await;
        Ok(())
    }

    /// Click the suggestion matching `value`: structural container
    /// first, geometric fallback second.
    async fn select(
        &self,
        input: &ElementHit,
        field: RecipientField,
        value: &str,
    ) -> Result<(), FlowError> {
        if let Some(hit) = self.structural_candidate(value).await? {
            debug!(text = %hit.text, "structural suggestion matched");
            self.probe.click_hit(&hit).await?;
            return Ok(());
        }

        let deadline = tokio::time::Instant::now() + self.probe.timeouts().suggestion_poll;
        loop {
            let candidates = self.probe.scan("*", &TextFilter::contains(value)).await?;
            if let Some(hit) = candidates
                .iter()
                .find(|h| below_and_aligned(&input.rect, &h.rect))
            {
                debug!(text = %hit.text, "geometric suggestion matched");
                self.probe.click_hit(hit).await?;
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(FlowError::SuggestionNotFound {
                    field: field.label().to_string(),
                    value: value.to_string(),
                });
            }
            tokio::time::sleep(self.probe.timeouts().poll_interval).await;
        }
    }

    /// A matching row inside a recognizable suggestion container, if
    /// one shows up within the short structural probe window.
    async fn structural_candidate(
        &self,
        value: &str,
    ) -> Result<Option<ElementHit>, FlowError> {
        let container = match self
            .probe
            .wait_for(
                SUGGESTION_CONTAINER_SELECTOR,
                &TextFilter::any(),
                self.probe.timeouts().suggestion_container,
            )
            .await
        {
            Ok(hit) => hit,
            Err(_) => return Ok(None),
        };
        let items = self
            .probe
            .scan(SUGGESTION_ITEM_SELECTOR, &TextFilter::contains(value))
            .await?;
        Ok(items.into_iter().find(|h| {
            let (cx, cy) = h.rect.center();
            container.rect.contains_point(cx, cy)
        }))
    }

    /// Turn the clicked suggestion into a committed chip.
    async fn commit(&self) -> Result<(), FlowError> {
        self.probe.press_tab().await?;
        tokio::time::sleep(self.probe.timeouts().settle_chip).await;
        Ok(())
    }
}

/// Whether `candidate` is plausibly a suggestion rendered for
/// `input`: top edge at or past the input's bottom (minus tolerance)
/// and left edge inside the horizontal band around the input.
fn below_and_aligned(input: &Rect, candidate: &Rect) -> bool {
    candidate.y > input.bottom() - VERTICAL_TOLERANCE
        && candidate.x >= input.x - HORIZONTAL_SLACK_LEFT
        && candidate.x <= input.x + input.width + HORIZONTAL_SLACK_RIGHT
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Rect {
        Rect { x, y, width: w, height: h }
    }

    #[test]
    fn accepts_candidate_directly_below() {
        let input = rect(100.0, 200.0, 300.0, 30.0);
        assert!(below_and_aligned(&input, &rect(100.0, 235.0, 280.0, 24.0)));
    }

    #[test]
    fn accepts_candidate_within_vertical_tolerance() {
        let input = rect(100.0, 200.0, 300.0, 30.0);
        // bottom = 230, tolerance lets 229 pass
        assert!(below_and_aligned(&input, &rect(100.0, 229.0, 280.0, 24.0)));
        assert!(!below_and_aligned(&input, &rect(100.0, 227.0, 280.0, 24.0)));
    }

    #[test]
    fn rejects_candidate_above_input() {
        let input = rect(100.0, 200.0, 300.0, 30.0);
        assert!(!below_and_aligned(&input, &rect(100.0, 100.0, 280.0, 24.0)));
    }

    #[test]
    fn horizontal_band_has_asymmetric_slack() {
        let input = rect(100.0, 200.0, 300.0, 30.0);
        // left slack 40
        assert!(below_and_aligned(&input, &rect(61.0, 240.0, 50.0, 24.0)));
        assert!(!below_and_aligned(&input, &rect(59.0, 240.0, 50.0, 24.0)));
        // right slack 800 past the input's right edge origin
        assert!(below_and_aligned(&input, &rect(1199.0, 240.0, 50.0, 24.0)));
        assert!(!below_and_aligned(&input, &rect(1201.0, 240.0, 50.0, 24.0)));
    }

    #[test]
    fn field_labels() {
        assert_eq!(RecipientField::To.label(), "To");
        assert_eq!(RecipientField::Cc.label(), "Cc");
        assert_eq!(RecipientField::Bcc.label(), "Bcc");
    }
}
