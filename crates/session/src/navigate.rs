//! Guarded navigation
//!
//! Navigation against a slow dev backend fails transiently often
//! enough that every goto here is bounded and retried a fixed number
//! of times before the error propagates.

use std::time::Duration;

use chromiumoxide::page::Page;
use tracing::{debug, info, warn};

use crate::config::Timeouts;
use crate::errors::SessionError;
use crate::session::{Session, SessionPhase};

/// Attempts made by [`safe_goto`] before giving up.
pub const GOTO_ATTEMPTS: u32 = 3;

/// Navigate to `url`, retrying on timeout or transport failure.
///
/// Each attempt is bounded by `timeouts.navigation`; attempts are
/// separated by `timeouts.navigation_retry_pause`.
pub async fn safe_goto(page: &Page, url: &str, timeouts: &Timeouts) -> Result<(), SessionError> {
    let mut last_reason = String::new();
    for attempt in 1..=GOTO_ATTEMPTS {
        debug!(url, attempt, "navigating");
        match tokio::time::timeout(timeouts.navigation, page.goto(url)).await {
            Ok(Ok(_)) => {
                info!(url, attempt, "navigation succeeded");
                return Ok(());
            }
            Ok(Err(e)) => {
                last_reason = e.to_string();
                warn!(url, attempt, error = %last_reason, "navigation failed");
            }
            Err(_) => {
                last_reason = format!("exceeded {:?}", timeouts.navigation);
                warn!(url, attempt, "navigation timed out");
            }
        }
        if attempt < GOTO_ATTEMPTS {
            tokio::time::sleep(timeouts.navigation_retry_pause).await;
        }
    }
    Err(SessionError::Navigation {
        url: url.to_string(),
        attempts: GOTO_ATTEMPTS,
        reason: last_reason,
    })
}

/// First navigation of a session: aim at the email module, fall back
/// to the login entry point when the application itself is unreachable.
///
/// Returns the URL the page actually landed on. An identity redirect
/// away from the target is expected here, not a failure; callers gate
/// on login separately via [`wait_for_url_prefix`].
pub async fn bootstrap_once(session: &mut Session) -> Result<String, SessionError> {
    let target = session.config().target_after_login();
    let login_url = session.config().login_url.clone();
    let timeouts = session.config().timeouts.clone();

    if session.phase() != SessionPhase::Idle {
        let page = session.acquire_page().await?;
        let url = current_url(page).await?;
        debug!(url = %url, "already bootstrapped");
        return Ok(url);
    }

    let page = session.acquire_page().await?;
    if let Err(e) = safe_goto(page, &target, &timeouts).await {
        warn!(error = %e, "email module unreachable, falling back to login page");
        safe_goto(page, &login_url, &timeouts).await?;
    }
    let landed = current_url(page).await?;
    session.advance_phase(SessionPhase::Bootstrapped);
    info!(url = %landed, "session bootstrapped");
    Ok(landed)
}

/// Poll the page URL until it starts with `prefix` or `bound` elapses.
///
/// Returns the matching URL. Used to detect that an interactive login
/// finished and the identity provider redirected back into the app.
pub async fn wait_for_url_prefix(
    page: &Page,
    prefix: &str,
    bound: Duration,
    poll: Duration,
) -> Result<String, SessionError> {
    let deadline = tokio::time::Instant::now() + bound;
    loop {
        let url = current_url(page).await?;
        if url_reached(&url, prefix) {
            return Ok(url);
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(SessionError::Timeout(format!(
                "URL prefix '{prefix}' (still at '{url}')"
            )));
        }
        tokio::time::sleep(poll).await;
    }
}

/// Whether `url` counts as having reached `prefix`. Plain prefix
/// matching: deeper routes and query strings under the prefix pass,
/// the bare origin and identity-provider URLs do not.
fn url_reached(url: &str, prefix: &str) -> bool {
    url.starts_with(prefix)
}

async fn current_url(page: &Page) -> Result<String, SessionError> {
    page.url()
        .await
        .map_err(SessionError::cdp)?
        .ok_or_else(|| SessionError::Cdp("page reported no URL".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODULE: &str = "http://localhost:5000/admin/emails";

    #[test]
    fn module_url_and_deeper_routes_count_as_reached() {
        assert!(url_reached(MODULE, MODULE));
        assert!(url_reached("http://localhost:5000/admin/emails/inbox", MODULE));
        assert!(url_reached("http://localhost:5000/admin/emails?folder=sent", MODULE));
    }

    #[test]
    fn origin_and_identity_provider_do_not_count() {
        assert!(!url_reached("http://localhost:5000/", MODULE));
        assert!(!url_reached("http://localhost:5000/admin", MODULE));
        assert!(!url_reached(
            "https://accountsdev.actingoffice.com/login?returnUrl=%2Fadmin%2Femails",
            MODULE
        ));
    }
}
