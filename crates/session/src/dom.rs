//! CDP-level DOM probing
//!
//! [`DomProbe`] is the only surface through which upper layers observe
//! or mutate the page. Element discovery runs as injected scripts that
//! return plain geometry and text; all interaction happens through CDP
//! input events dispatched at measured coordinates, so the probe works
//! against markup it has never seen before.

use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams,
    DispatchMouseEventType, InsertTextParams, MouseButton,
};
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, EventFileChooserOpened, SetInterceptFileChooserDialogParams,
};
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Timeouts;
use crate::errors::SessionError;

/// Upper bound on hits returned by any single probe pass.
pub const CANDIDATE_CAP: usize = 50;

/// Shallowest and deepest ancestor levels tried when widening a text
/// hit into its enclosing list row.
pub const ROW_ANCESTOR_MIN: u32 = 2;
pub const ROW_ANCESTOR_MAX: u32 = 9;

/// Minimum footprint for an ancestor to count as a list row.
pub const ROW_MIN_WIDTH: f64 = 200.0;
pub const ROW_MIN_HEIGHT: f64 = 40.0;

/// Viewport-relative bounding box in CSS pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }
}

/// One element found by a probe pass: its normalized text, tag name
/// and current bounding box.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ElementHit {
    pub text: String,
    pub tag: String,
    #[serde(flatten)]
    pub rect: Rect,
}

/// Text predicate applied inside the injected scan script.
///
/// The same semantics are mirrored in [`TextFilter::matches`] so
/// higher layers can re-rank hits without another round trip.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum TextFilter {
    /// Whitespace-normalized text equals the value exactly
    Exact { value: String },
    /// Case-insensitive substring match
    Contains { value: String },
    /// Every token appears somewhere, case-insensitive, any order
    #[serde(rename = "tokens")]
    AllTokens { tokens: Vec<String> },
    /// Case-insensitive regular expression test
    Regex { value: String },
    /// Any visible element, text ignored; pair with a selective CSS
    /// selector
    Any,
}

impl TextFilter {
    pub fn exact(value: impl Into<String>) -> Self {
        TextFilter::Exact { value: value.into() }
    }

    pub fn contains(value: impl Into<String>) -> Self {
        TextFilter::Contains { value: value.into() }
    }

    pub fn all_tokens(tokens: Vec<String>) -> Self {
        TextFilter::AllTokens { tokens }
    }

    pub fn regex(value: impl Into<String>) -> Self {
        TextFilter::Regex { value: value.into() }
    }

    pub fn any() -> Self {
        TextFilter::Any
    }

    /// Rust-side mirror of the in-page predicate. `Regex` filters are
    /// evaluated in the page only and never match here.
    pub fn matches(&self, text: &str) -> bool {
        if matches!(self, TextFilter::Any) {
            return true;
        }
        let normalized = normalize_text(text);
        if normalized.is_empty() {
            return false;
        }
        match self {
            TextFilter::Exact { value } => normalized == value.trim(),
            TextFilter::Contains { value } => normalized
                .to_lowercase()
                .contains(&value.to_lowercase()),
            TextFilter::AllTokens { tokens } => {
                let lower = normalized.to_lowercase();
                !tokens.is_empty()
                    && tokens.iter().all(|t| lower.contains(&t.to_lowercase()))
            }
            TextFilter::Regex { .. } => false,
            TextFilter::Any => true,
        }
    }
}

/// Collapse runs of whitespace and trim, the way the scan script does.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

const SCAN_JS: &str = r#"
(() => {
  const filter = __FILTER__;
  const cap = __CAP__;
  const norm = (s) => (s || '').replace(/\s+/g, ' ').trim();
  const matches = (text) => {
    if (filter.mode === 'any') return true;
    const t = norm(text);
    if (!t) return false;
    switch (filter.mode) {
      case 'exact': return t === filter.value.trim();
      case 'contains': return t.toLowerCase().includes(filter.value.toLowerCase());
      case 'tokens': return filter.tokens.length > 0
        && filter.tokens.every((tok) => t.toLowerCase().includes(tok.toLowerCase()));
      case 'regex': return new RegExp(filter.value, 'i').test(t);
      default: return false;
    }
  };
  const visible = (el) => {
    const r = el.getBoundingClientRect();
    if (r.width < 1 || r.height < 1) return false;
    const s = window.getComputedStyle(el);
    return s.visibility !== 'hidden' && s.display !== 'none';
  };
  const all = Array.from(document.querySelectorAll(__SELECTOR__));
  const hits = all.filter((el) => visible(el) && matches(el.innerText));
  const deepest = hits.filter((el) => !hits.some((o) => o !== el && el.contains(o)));
  return deepest.slice(0, cap).map((el) => {
    const r = el.getBoundingClientRect();
    return { text: norm(el.innerText).slice(0, 400), tag: el.tagName.toLowerCase(),
             x: r.x, y: r.y, width: r.width, height: r.height };
  });
})()
"#;

const CLICK_RESOLVE_JS: &str = r#"
(() => {
  const filter = __FILTER__;
  const norm = (s) => (s || '').replace(/\s+/g, ' ').trim();
  const matches = (text) => {
    if (filter.mode === 'any') return true;
    const t = norm(text);
    if (!t) return false;
    switch (filter.mode) {
      case 'exact': return t === filter.value.trim();
      case 'contains': return t.toLowerCase().includes(filter.value.toLowerCase());
      case 'tokens': return filter.tokens.length > 0
        && filter.tokens.every((tok) => t.toLowerCase().includes(tok.toLowerCase()));
      case 'regex': return new RegExp(filter.value, 'i').test(t);
      default: return false;
    }
  };
  const visible = (el) => {
    const r = el.getBoundingClientRect();
    if (r.width < 1 || r.height < 1) return false;
    const s = window.getComputedStyle(el);
    return s.visibility !== 'hidden' && s.display !== 'none';
  };
  const all = Array.from(document.querySelectorAll(__SELECTOR__));
  const hits = all.filter((el) => visible(el) && matches(el.innerText));
  const deepest = hits.filter((el) => !hits.some((o) => o !== el && el.contains(o)));
  if (deepest.length === 0) return null;
  const el = deepest[0];
  el.scrollIntoView({ block: 'center', inline: 'nearest' });
  const r = el.getBoundingClientRect();
  return { text: norm(el.innerText).slice(0, 400), tag: el.tagName.toLowerCase(),
           x: r.x, y: r.y, width: r.width, height: r.height };
})()
"#;

const INPUT_AFTER_LABEL_JS: &str = r#"
(() => {
  const label = __LABEL__;
  const norm = (s) => (s || '').replace(/\s+/g, ' ').trim();
  const visible = (el) => {
    const r = el.getBoundingClientRect();
    if (r.width < 1 || r.height < 1) return false;
    const s = window.getComputedStyle(el);
    return s.visibility !== 'hidden' && s.display !== 'none';
  };
  const anchors = Array.from(document.querySelectorAll('label, span, div'))
    .filter((el) => visible(el) && norm(el.innerText) === label);
  for (const anchor of anchors) {
    const node = document.evaluate(
      '(following::input|following::textarea)[1]',
      anchor, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue;
    if (node && visible(node)) {
      node.scrollIntoView({ block: 'center', inline: 'nearest' });
      const r = node.getBoundingClientRect();
      return { text: '', tag: node.tagName.toLowerCase(),
               x: r.x, y: r.y, width: r.width, height: r.height };
    }
  }
  return null;
})()
"#;

const ROWS_JS: &str = r#"
(() => {
  const filter = __FILTER__;
  const pick = __PICK__;
  const cap = __CAP__;
  const minW = __MIN_W__;
  const minH = __MIN_H__;
  const levelMin = __LEVEL_MIN__;
  const levelMax = __LEVEL_MAX__;
  const norm = (s) => (s || '').replace(/\s+/g, ' ').trim();
  const matches = (text) => {
    if (filter.mode === 'any') return true;
    const t = norm(text);
    if (!t) return false;
    switch (filter.mode) {
      case 'exact': return t === filter.value.trim();
      case 'contains': return t.toLowerCase().includes(filter.value.toLowerCase());
      case 'tokens': return filter.tokens.length > 0
        && filter.tokens.every((tok) => t.toLowerCase().includes(tok.toLowerCase()));
      case 'regex': return new RegExp(filter.value, 'i').test(t);
      default: return false;
    }
  };
  const visible = (el) => {
    const r = el.getBoundingClientRect();
    if (r.width < 1 || r.height < 1) return false;
    const s = window.getComputedStyle(el);
    return s.visibility !== 'hidden' && s.display !== 'none';
  };
  const markers = Array.from(document.querySelectorAll('*'))
    .filter((el) => el.children.length === 0 && visible(el) && matches(el.innerText));
  const rows = [];
  const seen = new Set();
  for (const marker of markers) {
    let row = null;
    let node = marker;
    for (let level = 1; level <= levelMax; level++) {
      node = node.parentElement;
      if (!node) break;
      if (level < levelMin) continue;
      const r = node.getBoundingClientRect();
      if (r.width >= minW && r.height >= minH) { row = node; break; }
    }
    if (!row) continue;
    const r = row.getBoundingClientRect();
    const key = [Math.round(r.x), Math.round(r.y), Math.round(r.width), Math.round(r.height)].join(',');
    if (seen.has(key)) continue;
    seen.add(key);
    rows.push(row);
    if (rows.length >= cap) break;
  }
  rows.sort((a, b) => a.getBoundingClientRect().y - b.getBoundingClientRect().y);
  const measure = (el) => {
    const r = el.getBoundingClientRect();
    return { text: norm(el.innerText).slice(0, 400), tag: el.tagName.toLowerCase(),
             x: r.x, y: r.y, width: r.width, height: r.height };
  };
  if (pick >= 0) {
    if (pick >= rows.length) return [];
    rows[pick].scrollIntoView({ block: 'center', inline: 'nearest' });
    return [measure(rows[pick])];
  }
  return rows.map(measure);
})()
"#;

const SET_VALUE_JS: &str = r#"
(() => {
  const label = __LABEL__;
  const value = __VALUE__;
  const norm = (s) => (s || '').replace(/\s+/g, ' ').trim();
  const visible = (el) => {
    const r = el.getBoundingClientRect();
    if (r.width < 1 || r.height < 1) return false;
    const s = window.getComputedStyle(el);
    return s.visibility !== 'hidden' && s.display !== 'none';
  };
  const anchors = Array.from(document.querySelectorAll('label, span, div'))
    .filter((el) => visible(el) && norm(el.innerText) === label);
  for (const anchor of anchors) {
    const node = document.evaluate(
      '(following::input|following::textarea)[1]',
      anchor, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue;
    if (!node || !visible(node)) continue;
    const proto = node.tagName === 'TEXTAREA'
      ? window.HTMLTextAreaElement.prototype
      : window.HTMLInputElement.prototype;
    const setter = Object.getOwnPropertyDescriptor(proto, 'value').set;
    setter.call(node, value);
    node.dispatchEvent(new Event('input', { bubbles: true }));
    node.dispatchEvent(new Event('change', { bubbles: true }));
    return true;
  }
  return false;
})()
"#;

const TEXT_EXISTS_JS: &str = r#"
(() => {
  const needle = __NEEDLE__;
  const body = document.body ? document.body.innerText : '';
  return body.toLowerCase().includes(needle.toLowerCase());
})()
"#;

/// Read-and-act handle over a single page.
pub struct DomProbe<'a> {
    page: &'a Page,
    timeouts: &'a Timeouts,
}

impl<'a> DomProbe<'a> {
    pub fn new(page: &'a Page, timeouts: &'a Timeouts) -> Self {
        Self { page, timeouts }
    }

    pub fn timeouts(&self) -> &Timeouts {
        self.timeouts
    }

    /// Find visible elements under `selector` whose text satisfies
    /// `filter`. Only the deepest matching element of each nested
    /// chain is reported, capped at [`CANDIDATE_CAP`].
    pub async fn scan(
        &self,
        selector: &str,
        filter: &TextFilter,
    ) -> Result<Vec<ElementHit>, SessionError> {
        let js = SCAN_JS
            .replace("__SELECTOR__", &encode(selector)?)
            .replace("__FILTER__", &encode(filter)?)
            .replace("__CAP__", &CANDIDATE_CAP.to_string());
        self.eval(&js).await
    }

    /// Poll [`scan`](Self::scan) until it yields a hit or `bound`
    /// elapses; returns the first hit.
    pub async fn wait_for(
        &self,
        selector: &str,
        filter: &TextFilter,
        bound: Duration,
    ) -> Result<ElementHit, SessionError> {
        let deadline = tokio::time::Instant::now() + bound;
        loop {
            let mut hits = self.scan(selector, filter).await?;
            if !hits.is_empty() {
                return Ok(hits.remove(0));
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(SessionError::Timeout(format!(
                    "element matching {filter:?} under '{selector}'"
                )));
            }
            tokio::time::sleep(self.timeouts.poll_interval).await;
        }
    }

    /// Resolve the first match, scroll it into view and click its
    /// center.
    pub async fn click(
        &self,
        selector: &str,
        filter: &TextFilter,
    ) -> Result<ElementHit, SessionError> {
        let js = CLICK_RESOLVE_JS
            .replace("__SELECTOR__", &encode(selector)?)
            .replace("__FILTER__", &encode(filter)?);
        let hit: Option<ElementHit> = self.eval(&js).await?;
        let hit = hit.ok_or_else(|| {
            SessionError::Timeout(format!("clickable element matching {filter:?}"))
        })?;
        self.click_hit(&hit).await?;
        Ok(hit)
    }

    /// Click the center of an already-measured hit.
    pub async fn click_hit(&self, hit: &ElementHit) -> Result<(), SessionError> {
        let (x, y) = hit.rect.center();
        self.click_at(x, y).await
    }

    /// Dispatch a raw left click at viewport coordinates.
    pub async fn click_at(&self, x: f64, y: f64) -> Result<(), SessionError> {
        debug!(x, y, "dispatching click");
        let pressed = DispatchMouseEventParams::builder()
            .r#type(DispatchMouseEventType::MousePressed)
            .x(x)
            .y(y)
            .button(MouseButton::Left)
            .click_count(1)
            .build()
            .map_err(SessionError::Cdp)?;
        self.page.execute(pressed).await.map_err(SessionError::cdp)?;
        let released = DispatchMouseEventParams::builder()
            .r#type(DispatchMouseEventType::MouseReleased)
            .x(x)
            .y(y)
            .button(MouseButton::Left)
            .click_count(1)
            .build()
            .map_err(SessionError::Cdp)?;
        self.page
            .execute(released)
            .await
            .map_err(SessionError::cdp)?;
        Ok(())
    }

    /// Insert `text` into the focused element in one CDP call.
    pub async fn insert_text(&self, text: &str) -> Result<(), SessionError> {
        self.page
            .execute(InsertTextParams::new(text))
            .await
            .map_err(SessionError::cdp)?;
        Ok(())
    }

    /// Insert `text` character by character with a fixed inter-key
    /// delay, so suggestion widgets see individual keystrokes.
    pub async fn type_chars(&self, text: &str, delay: Duration) -> Result<(), SessionError> {
        for ch in text.chars() {
            self.insert_text(&ch.to_string()).await?;
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    /// Press and release a single key on the focused element.
    pub async fn press_key(
        &self,
        key: &str,
        code: &str,
        virtual_key: i64,
    ) -> Result<(), SessionError> {
        let down = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::RawKeyDown)
            .key(key)
            .code(code)
            .windows_virtual_key_code(virtual_key)
            .build()
            .map_err(SessionError::Cdp)?;
        self.page.execute(down).await.map_err(SessionError::cdp)?;
        let up = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyUp)
            .key(key)
            .code(code)
            .windows_virtual_key_code(virtual_key)
            .build()
            .map_err(SessionError::Cdp)?;
        self.page.execute(up).await.map_err(SessionError::cdp)?;
        Ok(())
    }

    pub async fn press_tab(&self) -> Result<(), SessionError> {
        self.press_key("Tab", "Tab", 9).await
    }

    /// Find the first visible input or textarea in document order
    /// after an element whose text equals `label` exactly.
    pub async fn input_after_label(&self, label: &str) -> Result<ElementHit, SessionError> {
        let js = INPUT_AFTER_LABEL_JS.replace("__LABEL__", &encode(label)?);
        let hit: Option<ElementHit> = self.eval(&js).await?;
        hit.ok_or_else(|| SessionError::Geometry(format!("input after label '{label}'")))
    }

    /// Widen leaf elements matching `filter` into their enclosing
    /// rows: the nearest ancestor between [`ROW_ANCESTOR_MIN`] and
    /// [`ROW_ANCESTOR_MAX`] levels up that is at least
    /// [`ROW_MIN_WIDTH`] × [`ROW_MIN_HEIGHT`]. Rows come back in
    /// top-to-bottom order, deduplicated by geometry.
    pub async fn ancestor_rows(
        &self,
        filter: &TextFilter,
    ) -> Result<Vec<ElementHit>, SessionError> {
        self.rows_inner(filter, -1).await
    }

    /// Re-run the row widening deterministically, scroll row `index`
    /// into view and return its fresh geometry.
    pub async fn resolve_row(
        &self,
        filter: &TextFilter,
        index: usize,
    ) -> Result<ElementHit, SessionError> {
        let mut rows = self.rows_inner(filter, index as i64).await?;
        if rows.is_empty() {
            return Err(SessionError::Geometry(format!(
                "row {index} no longer present"
            )));
        }
        Ok(rows.remove(0))
    }

    async fn rows_inner(
        &self,
        filter: &TextFilter,
        pick: i64,
    ) -> Result<Vec<ElementHit>, SessionError> {
        let js = ROWS_JS
            .replace("__FILTER__", &encode(filter)?)
            .replace("__PICK__", &pick.to_string())
            .replace("__CAP__", &CANDIDATE_CAP.to_string())
            .replace("__MIN_W__", &ROW_MIN_WIDTH.to_string())
            .replace("__MIN_H__", &ROW_MIN_HEIGHT.to_string())
            .replace("__LEVEL_MIN__", &ROW_ANCESTOR_MIN.to_string())
            .replace("__LEVEL_MAX__", &ROW_ANCESTOR_MAX.to_string());
        self.eval(&js).await
    }

    /// Set the value of the input following `label` directly,
    /// dispatching synthetic input events so framework state stays in
    /// sync. Returns false when no such input exists.
    pub async fn set_value_after_label(
        &self,
        label: &str,
        value: &str,
    ) -> Result<bool, SessionError> {
        let js = SET_VALUE_JS
            .replace("__LABEL__", &encode(label)?)
            .replace("__VALUE__", &encode(value)?);
        self.eval(&js).await
    }

    /// Whether the page body currently contains `needle`,
    /// case-insensitive.
    pub async fn text_exists(&self, needle: &str) -> Result<bool, SessionError> {
        let js = TEXT_EXISTS_JS.replace("__NEEDLE__", &encode(needle)?);
        self.eval(&js).await
    }

    /// Supply attachment files, preferring a native file input and
    /// falling back to intercepting the dialog opened by
    /// `fallback_button`.
    pub async fn supply_files(
        &self,
        paths: &[String],
        fallback_button: Option<&ElementHit>,
    ) -> Result<(), SessionError> {
        if let Ok(input) = self.page.find_element("input[type=file]").await {
            debug!("supplying files through native input");
            let params = SetFileInputFilesParams::builder()
                .files(paths.to_vec())
                .backend_node_id(input.backend_node_id)
                .build()
                .map_err(SessionError::Cdp)?;
            self.page.execute(params).await.map_err(SessionError::cdp)?;
            return Ok(());
        }

        let button = fallback_button.ok_or_else(|| {
            SessionError::Geometry("no file input and no attach control".into())
        })?;

        self.page
            .execute(SetInterceptFileChooserDialogParams::new(true))
            .await
            .map_err(SessionError::cdp)?;
        let mut chooser_events = self
            .page
            .event_listener::<EventFileChooserOpened>()
            .await
            .map_err(SessionError::cdp)?;
        self.click_hit(button).await?;

        let opened =
            tokio::time::timeout(self.timeouts.file_chooser, chooser_events.next()).await;
        let result = match opened {
            Ok(Some(event)) => {
                let node_id = event.backend_node_id.clone().ok_or_else(|| {
                    SessionError::Cdp("file chooser event carried no node id".into())
                })?;
                let params = SetFileInputFilesParams::builder()
                    .files(paths.to_vec())
                    .backend_node_id(node_id)
                    .build()
                    .map_err(SessionError::Cdp)?;
                self.page.execute(params).await.map_err(SessionError::cdp)?;
                Ok(())
            }
            Ok(None) => Err(SessionError::Cdp("file chooser event stream ended".into())),
            Err(_) => Err(SessionError::Timeout("file chooser dialog".into())),
        };

        if let Err(e) = self
            .page
            .execute(SetInterceptFileChooserDialogParams::new(false))
            .await
        {
            warn!(error = %e, "could not disable file chooser interception");
        }
        result
    }

    /// Capture the page to a PNG file at `path`.
    pub async fn screenshot(&self, path: &str, full_page: bool) -> Result<(), SessionError> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(full_page)
            .build();
        let bytes = self
            .page
            .screenshot(params)
            .await
            .map_err(SessionError::cdp)?;
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    async fn eval<T: serde::de::DeserializeOwned>(&self, js: &str) -> Result<T, SessionError> {
        self.page
            .evaluate(js)
            .await
            .map_err(SessionError::cdp)?
            .into_value::<T>()
            .map_err(|e| SessionError::Decode(e.to_string()))
    }
}

fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, SessionError> {
    serde_json::to_string(value).map_err(|e| SessionError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_center() {
        let rect = Rect { x: 10.0, y: 20.0, width: 100.0, height: 40.0 };
        assert_eq!(rect.center(), (60.0, 40.0));
        assert_eq!(rect.right(), 110.0);
        assert_eq!(rect.bottom(), 60.0);
    }

    #[test]
    fn exact_filter_normalizes_whitespace() {
        let filter = TextFilter::exact("To");
        assert!(filter.matches("  To  "));
        assert!(filter.matches("To"));
        assert!(!filter.matches("to"));
        assert!(!filter.matches("Topic"));
    }

    #[test]
    fn contains_filter_is_case_insensitive() {
        let filter = TextFilter::contains("Send");
        assert!(filter.matches("send message"));
        assert!(filter.matches("SEND"));
        assert!(!filter.matches("sand"));
    }

    #[test]
    fn all_tokens_match_in_any_order() {
        let filter = TextFilter::all_tokens(vec!["john".into(), "doe".into()]);
        assert!(filter.matches("Doe, John <jd@example.com>"));
        assert!(!filter.matches("John Smith"));
    }

    #[test]
    fn empty_token_list_matches_nothing() {
        let filter = TextFilter::all_tokens(vec![]);
        assert!(!filter.matches("anything"));
    }

    #[test]
    fn empty_text_matches_nothing() {
        assert!(!TextFilter::contains("x").matches("   "));
        assert!(!TextFilter::exact("").matches(""));
    }

    #[test]
    fn any_filter_matches_even_empty_text() {
        assert!(TextFilter::any().matches(""));
        assert!(TextFilter::any().matches("whatever"));
        assert_eq!(serde_json::to_value(TextFilter::any()).unwrap()["mode"], "any");
    }

    #[test]
    fn rect_point_containment() {
        let rect = Rect { x: 10.0, y: 10.0, width: 20.0, height: 10.0 };
        assert!(rect.contains_point(10.0, 10.0));
        assert!(rect.contains_point(30.0, 20.0));
        assert!(!rect.contains_point(31.0, 15.0));
        assert!(!rect.contains_point(15.0, 9.0));
    }

    #[test]
    fn filter_serializes_with_mode_tag() {
        let json = serde_json::to_value(TextFilter::all_tokens(vec!["a".into()])).unwrap();
        assert_eq!(json["mode"], "tokens");
        assert_eq!(json["tokens"][0], "a");

        let json = serde_json::to_value(TextFilter::regex(r"\d{1,2}:\d{2}")).unwrap();
        assert_eq!(json["mode"], "regex");
    }

    #[test]
    fn element_hit_flattens_rect() {
        let raw = r#"{"text":"Inbox","tag":"div","x":1.0,"y":2.0,"width":3.0,"height":4.0}"#;
        let hit: ElementHit = serde_json::from_str(raw).unwrap();
        assert_eq!(hit.text, "Inbox");
        assert_eq!(hit.rect.width, 3.0);
    }

    #[test]
    fn normalize_collapses_inner_runs() {
        assert_eq!(normalize_text("  a \n\t b  "), "a b");
    }
}
