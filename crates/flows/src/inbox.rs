//! Inbox search and row opening
//!
//! Rows carry no identifiers; what they reliably carry is a marker:
//! a time stamp, a date stamp, or a Today/Yesterday section header.
//! Matching widens marker or sender/subject text into enclosing rows
//! and verifies that clicking one actually opened a message.

use mailpilot_locator::{all_tokens_match, token_filter, ElementResolver, LocatorTarget};
use mailpilot_session::{DomProbe, TextFilter};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::errors::FlowError;

/// Matches the time-of-day or date stamp carried by every rendered
/// email row. Positional lookup enumerates rows from these alone:
/// a Today/Yesterday header also widens into a big container and
/// would shift every index if it were counted.
const ROW_STAMP_PATTERN: &str =
    r"(\b\d{1,2}:\d{2}\s?(am|pm)\b)|(\b\d{1,2}\/\d{1,2}\/\d{4}\b)";

/// Stamps plus the Today/Yesterday section headers; used only to
/// wait for the list to render, never to enumerate rows.
const ROW_MARKER_PATTERN: &str =
    r"(\b\d{1,2}:\d{2}\s?(am|pm)\b)|(\b\d{1,2}\/\d{1,2}\/\d{4}\b)|(^(today|yesterday)$)";

/// The empty-state text the list shows when nothing is selected or
/// present; seeing it after a row click means the click went nowhere.
const NO_MAILS_TEXT: &str = "no mails";

/// What a caller may search by.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct EmailQuery {
    pub subject: Option<String>,
    pub from: Option<String>,
    pub index: Option<i64>,
}

/// How a row was found; diagnostic, not behavioral.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchedBy {
    FromSubject,
    Subject,
    Index,
}

impl MatchedBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchedBy::FromSubject => "from/subject",
            MatchedBy::Subject => "subject",
            MatchedBy::Index => "index",
        }
    }
}

/// The resolved search path for a query. Filters always win over a
/// positional index when both are present.
#[derive(Clone, Debug, PartialEq)]
enum MatchPlan {
    Filtered {
        primary: String,
        subject_check: Option<String>,
        matched_by: MatchedBy,
    },
    Positional(i64),
}

fn match_plan(query: &EmailQuery) -> Result<MatchPlan, FlowError> {
    let has = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
    if has(&query.from) {
        return Ok(MatchPlan::Filtered {
            primary: query.from.clone().unwrap_or_default(),
            subject_check: query.subject.clone().filter(|s| !s.trim().is_empty()),
            matched_by: MatchedBy::FromSubject,
        });
    }
    if has(&query.subject) {
        return Ok(MatchPlan::Filtered {
            primary: query.subject.clone().unwrap_or_default(),
            subject_check: None,
            matched_by: MatchedBy::Subject,
        });
    }
    if let Some(index) = query.index {
        return Ok(MatchPlan::Positional(index));
    }
    Err(FlowError::InsufficientQuery)
}

/// Clamp a possibly out-of-range index into [0, count-1]; an empty
/// list clamps to 0.
fn clamp_index(index: i64, count: usize) -> usize {
    if count == 0 || index < 0 {
        0
    } else {
        (index as usize).min(count - 1)
    }
}

/// First row whose text passes the optional subject token test.
fn select_row_index(row_texts: &[String], subject_check: Option<&str>) -> Option<usize> {
    row_texts.iter().position(|text| match subject_check {
        Some(subject) => all_tokens_match(subject, text),
        None => true,
    })
}

/// Finds and opens inbox rows.
pub struct EmailMatcher<'a> {
    probe: &'a DomProbe<'a>,
}

impl<'a> EmailMatcher<'a> {
    pub fn new(probe: &'a DomProbe<'a>) -> Self {
        Self { probe }
    }

    /// Locate the row described by `query`, click it, and verify the
    /// detail view opened.
    pub async fn locate_row(&self, query: &EmailQuery) -> Result<MatchedBy, FlowError> {
        let plan = match_plan(query)?;
        self.activate_inbox().await?;

        match plan {
            MatchPlan::Filtered { primary, subject_check, matched_by } => {
                let rows = self.probe.ancestor_rows(&token_filter(&primary)).await?;
                if rows.is_empty() {
                    return Err(FlowError::NoMatch(format!(
                        "no rows match '{primary}'"
                    )));
                }
                let texts: Vec<String> = rows.iter().map(|r| r.text.clone()).collect();
                let position = select_row_index(&texts, subject_check.as_deref())
                    .ok_or_else(|| {
                        FlowError::NoMatch(format!(
                            "rows match '{primary}' but none also match subject '{}'",
                            subject_check.as_deref().unwrap_or_default()
                        ))
                    })?;
                self.click_row(&token_filter(&primary), position).await?;
                info!(matched_by = matched_by.as_str(), "email row opened");
                Ok(matched_by)
            }
            MatchPlan::Positional(index) => {
                let marker = TextFilter::regex(ROW_STAMP_PATTERN);
                let rows = self.probe.ancestor_rows(&marker).await?;
                if rows.is_empty() {
                    return Err(FlowError::NoMatch("inbox shows no rows".into()));
                }
                let position = clamp_index(index, rows.len());
                if position as i64 != index {
                    debug!(requested = index, clamped = position, "index clamped into range");
                }
                self.click_row(&marker, position).await?;
                info!(matched_by = MatchedBy::Index.as_str(), "email row opened");
                Ok(MatchedBy::Index)
            }
        }
    }

    /// Bring the inbox list into view and wait for row markers.
    async fn activate_inbox(&self) -> Result<(), FlowError> {
        let resolver = ElementResolver::new(self.probe);
        if let Err(e) = resolver.click(&LocatorTarget::inbox_tab(), None).await {
            debug!(error = %e, "no Inbox activator, assuming list already shown");
        }
        self.probe
            .wait_for(
                "*",
                &TextFilter::regex(ROW_MARKER_PATTERN),
                self.probe.timeouts().inbox_load,
            )
            .await?;
        tokio::time::sleep(self.probe.timeouts().settle_inbox).await;
        Ok(())
    }

    /// Click row `position` of the deterministic row list for
    /// `filter` and verify the click opened a message.
    async fn click_row(
        &self,
        filter: &TextFilter,
        position: usize,
    ) -> Result<(), FlowError> {
        let row = self.probe.resolve_row(filter, position).await?;
        self.probe.click_hit(&row).await?;
        tokio::time::sleep(self.probe.timeouts().settle_row).await;
        if self.probe.text_exists(NO_MAILS_TEXT).await? {
            warn!(position, "row click landed on the empty state");
            return Err(FlowError::NoMatch(
                "row click did not open a message".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_win_over_index() {
        let query = EmailQuery {
            subject: Some("update".into()),
            from: Some("jane".into()),
            index: Some(3),
        };
        let plan = match_plan(&query).unwrap();
        assert!(matches!(
            plan,
            MatchPlan::Filtered { matched_by: MatchedBy::FromSubject, .. }
        ));
    }

    #[test]
    fn subject_only_uses_subject_path() {
        let query = EmailQuery { subject: Some("update".into()), ..Default::default() };
        match match_plan(&query).unwrap() {
            MatchPlan::Filtered { primary, subject_check, matched_by } => {
                assert_eq!(primary, "update");
                assert!(subject_check.is_none());
                assert_eq!(matched_by, MatchedBy::Subject);
            }
            other => panic!("unexpected plan: {other:?}"),
        }
    }

    #[test]
    fn from_with_subject_keeps_subject_check() {
        let query = EmailQuery {
            subject: Some("Project update".into()),
            from: Some("Jane Doe".into()),
            index: None,
        };
        match match_plan(&query).unwrap() {
            MatchPlan::Filtered { primary, subject_check, .. } => {
                assert_eq!(primary, "Jane Doe");
                assert_eq!(subject_check.as_deref(), Some("Project update"));
            }
            other => panic!("unexpected plan: {other:?}"),
        }
    }

    #[test]
    fn index_used_only_without_filters() {
        let query = EmailQuery { index: Some(2), ..Default::default() };
        assert_eq!(match_plan(&query).unwrap(), MatchPlan::Positional(2));
    }

    #[test]
    fn blank_filters_do_not_count() {
        let query = EmailQuery {
            subject: Some("   ".into()),
            from: Some("".into()),
            index: Some(1),
        };
        assert_eq!(match_plan(&query).unwrap(), MatchPlan::Positional(1));
    }

    #[test]
    fn empty_query_is_insufficient() {
        assert!(matches!(
            match_plan(&EmailQuery::default()),
            Err(FlowError::InsufficientQuery)
        ));
    }

    #[test]
    fn index_clamps_at_both_ends() {
        assert_eq!(clamp_index(-5, 10), 0);
        assert_eq!(clamp_index(0, 10), 0);
        assert_eq!(clamp_index(9, 10), 9);
        assert_eq!(clamp_index(42, 10), 9);
    }

    #[test]
    fn clamp_survives_empty_row_list() {
        assert_eq!(clamp_index(0, 0), 0);
        assert_eq!(clamp_index(-1, 0), 0);
        assert_eq!(clamp_index(7, 0), 0);
    }

    #[test]
    fn positional_markers_exclude_section_headers() {
        assert!(ROW_MARKER_PATTERN.contains("today"));
        assert!(!ROW_STAMP_PATTERN.contains("today"));
        assert!(!ROW_STAMP_PATTERN.contains("yesterday"));
        // Stamps themselves stay available to the positional path.
        assert!(ROW_STAMP_PATTERN.contains("am|pm"));
        assert!(ROW_MARKER_PATTERN.starts_with(ROW_STAMP_PATTERN));
    }

    #[test]
    fn row_selection_applies_subject_check() {
        let rows = vec![
            "Jane Doe — lunch plans — 9:02 AM".to_string(),
            "Jane Doe — Project update — 10:15 AM".to_string(),
        ];
        assert_eq!(select_row_index(&rows, None), Some(0));
        assert_eq!(select_row_index(&rows, Some("project update")), Some(1));
        assert_eq!(select_row_index(&rows, Some("quarterly report")), None);
    }

    #[test]
    fn matched_by_labels() {
        assert_eq!(MatchedBy::FromSubject.as_str(), "from/subject");
        assert_eq!(MatchedBy::Subject.as_str(), "subject");
        assert_eq!(MatchedBy::Index.as_str(), "index");
    }
}
