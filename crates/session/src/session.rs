//! Browser session lifecycle
//!
//! One [`Session`] owns at most one browser process and one page. The
//! browser is launched lazily on the first operation that needs a page
//! and torn down on [`Session::close`], after which the session can be
//! reused from scratch.

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::errors::SessionError;

/// Where the session stands in its lifecycle.
///
/// The phase only ever moves forward until `close` resets it:
/// `Idle` → `Bootstrapped` → `LoggedIn`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    /// No browser process yet, or the session was closed
    Idle,
    /// Browser is up and the initial navigation has run
    Bootstrapped,
    /// The page URL was observed inside the application
    LoggedIn,
}

/// A lazily-launched browser session bound to a single page.
pub struct Session {
    config: AppConfig,
    browser: Option<Browser>,
    page: Option<Page>,
    handler_task: Option<JoinHandle<()>>,
    phase: SessionPhase,
}

impl Session {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            browser: None,
            page: None,
            handler_task: None,
            phase: SessionPhase::Idle,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Advance the lifecycle phase; backward transitions are ignored.
    pub fn advance_phase(&mut self, next: SessionPhase) {
        if phase_rank(next) > phase_rank(self.phase) {
            debug!(from = ?self.phase, to = ?next, "session phase advanced");
            self.phase = next;
        }
    }

    /// Whether a browser process is currently running.
    pub fn is_running(&self) -> bool {
        self.browser.is_some()
    }

    /// Return the session page, launching the browser on first use.
    pub async fn acquire_page(&mut self) -> Result<&Page, SessionError> {
        if self.browser.is_none() {
            self.launch().await?;
        }
        if self.page.is_none() {
            let browser = self
                .browser
                .as_ref()
                .ok_or_else(|| SessionError::Launch("browser vanished after launch".into()))?;
            let page = browser
                .new_page("about:blank")
                .await
                .map_err(SessionError::cdp)?;
            self.page = Some(page);
        }
        // Checked above
        self.page
            .as_ref()
            .ok_or_else(|| SessionError::Launch("page vanished after creation".into()))
    }

    async fn launch(&mut self) -> Result<(), SessionError> {
        let mut builder = BrowserConfig::builder();
        if !self.config.headless {
            builder = builder.with_head();
        }
        if let Some(proxy) = &self.config.proxy {
            builder = builder.arg(format!("--proxy-server={proxy}"));
        }
        // Chromium refuses to sandbox under common container setups.
        #[cfg(target_os = "linux")]
        {
            builder = builder.no_sandbox();
        }
        let browser_config = builder
            .build()
            .map_err(SessionError::Launch)?;

        info!(headless = self.config.headless, "launching browser");
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| SessionError::Launch(e.to_string()))?;

        let task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "browser handler event error");
                }
            }
        });

        self.browser = Some(browser);
        self.handler_task = Some(task);
        Ok(())
    }

    /// Tear the browser down and reset the session to [`SessionPhase::Idle`].
    ///
    /// Teardown is best-effort: a browser that already died is not an
    /// error, and the phase resets regardless.
    pub async fn close(&mut self) {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                warn!(error = %e, "page close failed");
            }
        }
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                warn!(error = %e, "browser close failed");
            }
            if let Err(e) = browser.wait().await {
                debug!(error = %e, "browser wait failed");
            }
        }
        if let Some(task) = self.handler_task.take() {
            task.abort();
        }
        self.phase = SessionPhase::Idle;
        info!("session closed");
    }
}

fn phase_rank(phase: SessionPhase) -> u8 {
    match phase {
        SessionPhase::Idle => 0,
        SessionPhase::Bootstrapped => 1,
        SessionPhase::LoggedIn => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_starts_idle() {
        let session = Session::new(AppConfig::default());
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(!session.is_running());
    }

    #[test]
    fn phase_never_moves_backward() {
        let mut session = Session::new(AppConfig::default());
        session.advance_phase(SessionPhase::LoggedIn);
        session.advance_phase(SessionPhase::Bootstrapped);
        assert_eq!(session.phase(), SessionPhase::LoggedIn);
    }

    #[test]
    fn phase_advances_in_order() {
        let mut session = Session::new(AppConfig::default());
        session.advance_phase(SessionPhase::Bootstrapped);
        assert_eq!(session.phase(), SessionPhase::Bootstrapped);
        session.advance_phase(SessionPhase::LoggedIn);
        assert_eq!(session.phase(), SessionPhase::LoggedIn);
    }
}
