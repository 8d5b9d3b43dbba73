//! Locator strategies as data
//!
//! A strategy is a (CSS selector, text filter) query the probe can
//! run; a target is a named, ordered chain of them. Evaluation order
//! encodes precedence: once an earlier strategy matches, the rest are
//! never consulted.

use std::fmt;

use mailpilot_session::TextFilter;

/// Containers treated as the sidebar/navigation region.
const NAV_SELECTOR: &str = "nav *, [role=navigation] *, aside *";

/// Elements that act like buttons whether or not they are `<button>`.
const BUTTON_SELECTOR: &str = "button, [role=button]";

/// One locator strategy.
#[derive(Clone, Debug, PartialEq)]
pub enum LocatorStrategy {
    /// Exact text inside a navigation-role container
    NavScopedText(String),
    /// Exact text anywhere on the page
    ExactText(String),
    /// Exact text on a button-like element
    ButtonExactText(String),
    /// Substring match on a button-like element's text
    ButtonTextContains(String),
    /// Button-like element whose aria-label contains the value,
    /// regardless of rendered text
    AriaLabelContains(String),
}

impl LocatorStrategy {
    /// The probe query this strategy runs.
    pub fn query(&self) -> (String, TextFilter) {
        match self {
            LocatorStrategy::NavScopedText(text) => {
                (NAV_SELECTOR.to_string(), TextFilter::exact(text.clone()))
            }
            LocatorStrategy::ExactText(text) => {
                ("*".to_string(), TextFilter::exact(text.clone()))
            }
            LocatorStrategy::ButtonExactText(text) => {
                (BUTTON_SELECTOR.to_string(), TextFilter::exact(text.clone()))
            }
            LocatorStrategy::ButtonTextContains(text) => {
                (BUTTON_SELECTOR.to_string(), TextFilter::contains(text.clone()))
            }
            LocatorStrategy::AriaLabelContains(text) => {
                let value = sanitize_attr(text);
                let selector = format!(
                    "button[aria-label*=\"{value}\" i], [role=button][aria-label*=\"{value}\" i]"
                );
                (selector, TextFilter::any())
            }
        }
    }
}

impl fmt::Display for LocatorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocatorStrategy::NavScopedText(t) => write!(f, "nav-scoped text '{t}'"),
            LocatorStrategy::ExactText(t) => write!(f, "exact text '{t}'"),
            LocatorStrategy::ButtonExactText(t) => write!(f, "button exact text '{t}'"),
            LocatorStrategy::ButtonTextContains(t) => write!(f, "button text contains '{t}'"),
            LocatorStrategy::AriaLabelContains(t) => write!(f, "aria-label contains '{t}'"),
        }
    }
}

/// Attribute values go into a CSS selector string; anything that
/// could close the quote is dropped.
fn sanitize_attr(value: &str) -> String {
    value.chars().filter(|c| *c != '"' && *c != '\\').collect()
}

/// A named, ordered strategy chain.
#[derive(Clone, Debug)]
pub struct LocatorTarget {
    pub name: String,
    pub strategies: Vec<LocatorStrategy>,
}

impl LocatorTarget {
    pub fn new(name: impl Into<String>, strategies: Vec<LocatorStrategy>) -> Self {
        Self { name: name.into(), strategies }
    }

    /// The Compose affordance: sidebar first, then anywhere, then any
    /// button mentioning it.
    pub fn compose_affordance() -> Self {
        Self::new(
            "Compose",
            vec![
                LocatorStrategy::NavScopedText("Compose".into()),
                LocatorStrategy::ExactText("Compose".into()),
                LocatorStrategy::ButtonTextContains("Compose".into()),
            ],
        )
    }

    /// The Send control inside a compose or detail surface.
    pub fn send_control() -> Self {
        Self::new(
            "Send",
            vec![
                LocatorStrategy::ButtonExactText("Send".into()),
                LocatorStrategy::ExactText("Send".into()),
                LocatorStrategy::ButtonTextContains("Send".into()),
            ],
        )
    }

    /// Reply / Reply all / Forward on an open detail view.
    pub fn action_control(label: &str) -> Self {
        Self::new(
            label,
            vec![
                LocatorStrategy::ExactText(label.into()),
                LocatorStrategy::ButtonExactText(label.into()),
                LocatorStrategy::AriaLabelContains(label.into()),
            ],
        )
    }

    /// The Inbox list activator.
    pub fn inbox_tab() -> Self {
        Self::new(
            "Inbox",
            vec![
                LocatorStrategy::NavScopedText("Inbox".into()),
                LocatorStrategy::ExactText("Inbox".into()),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_chain_prefers_sidebar() {
        let target = LocatorTarget::compose_affordance();
        assert_eq!(
            target.strategies[0],
            LocatorStrategy::NavScopedText("Compose".into())
        );
        assert_eq!(target.strategies.len(), 3);
    }

    #[test]
    fn exact_text_queries_everything() {
        let (selector, filter) = LocatorStrategy::ExactText("Send".into()).query();
        assert_eq!(selector, "*");
        assert!(filter.matches("Send"));
        assert!(!filter.matches("Sender"));
    }

    #[test]
    fn button_contains_is_substring() {
        let (selector, filter) = LocatorStrategy::ButtonTextContains("Compose".into()).query();
        assert!(selector.contains("button"));
        assert!(filter.matches("Compose new message"));
    }

    #[test]
    fn aria_label_strategy_matches_any_text() {
        let (selector, filter) = LocatorStrategy::AriaLabelContains("Reply all".into()).query();
        assert!(selector.contains("aria-label*=\"Reply all\""));
        assert!(filter.matches(""));
    }

    #[test]
    fn aria_label_value_is_sanitized() {
        let (selector, _) = LocatorStrategy::AriaLabelContains("x\"]{}".into()).query();
        assert!(!selector.contains('\\'));
        assert!(selector.contains("x]{}"));
    }

    #[test]
    fn action_chain_ends_with_aria_fallback() {
        let target = LocatorTarget::action_control("Forward");
        assert!(matches!(
            target.strategies.last(),
            Some(LocatorStrategy::AriaLabelContains(_))
        ));
    }
}
