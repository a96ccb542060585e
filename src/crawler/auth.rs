//! Form-based login before the traversal loop
//!
//! Each step runs independently: a failed step is logged as a warning and
//! the remaining steps still run. Authentication never fails a job; at worst
//! the crawl proceeds unauthenticated.

use crate::config::AuthConfig;
use crate::crawler::journal::JobJournal;
use crate::job::AuthDescriptor;
use crate::renderer::{RenderError, RenderSession};

/// How far authentication got
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Every step succeeded and the success indicator appeared
    Verified,
    /// Every step succeeded; success was assumed after a fixed delay
    Unverified,
    /// At least one step failed
    Degraded,
}

pub struct Authenticator<'a> {
    config: &'a AuthConfig,
    journal: &'a JobJournal<'a>,
}

impl<'a> Authenticator<'a> {
    pub fn new(config: &'a AuthConfig, journal: &'a JobJournal<'a>) -> Self {
        Self { config, journal }
    }

    /// Fills and submits the login form described by `auth`
    pub async fn authenticate(
        &self,
        session: &mut dyn RenderSession,
        auth: &AuthDescriptor,
    ) -> AuthOutcome {
        self.journal.info("Attempting authentication...");
        let mut degraded = false;

        if let Some(selector) = auth.username_selector() {
            let step = self.fill_field(session, selector, auth.username()).await;
            degraded |= !self.record(step, "Filled username", "username field");
        }

        if let Some(selector) = auth.password_selector() {
            let step = self.fill_field(session, selector, auth.password()).await;
            degraded |= !self.record(step, "Filled password", "password field");
        }

        if let Some(selector) = auth.submit_selector() {
            let step = session.click(selector).await;
            degraded |= !self.record(step, "Clicked submit button", "submit control");
        }

        let verified = match auth.success_selector() {
            Some(selector) => {
                let step = session
                    .wait_for_selector(selector, self.config.success_timeout())
                    .await;
                self.record(step, "Login successful", "success indicator")
            }
            None => {
                session.pause(self.config.fallback_delay()).await;
                self.journal
                    .info("Login attempted (no success selector provided)");
                false
            }
        };

        let outcome = if degraded || (auth.success_selector().is_some() && !verified) {
            AuthOutcome::Degraded
        } else if verified {
            AuthOutcome::Verified
        } else {
            AuthOutcome::Unverified
        };
        tracing::debug!(job_id = %self.journal.id(), "Authentication outcome: {:?}", outcome);
        outcome
    }

    async fn fill_field(
        &self,
        session: &mut dyn RenderSession,
        selector: &str,
        value: &str,
    ) -> Result<(), RenderError> {
        session
            .wait_for_selector(selector, self.config.selector_timeout())
            .await?;
        session.fill(selector, value).await
    }

    /// Logs the result of one step, returning whether it succeeded
    fn record(&self, step: Result<(), RenderError>, success: &str, what: &str) -> bool {
        match step {
            Ok(()) => {
                self.journal.info(success);
                true
            }
            Err(e) => {
                self.journal
                    .warn(&format!("Authentication warning: {}: {}", what, e));
                false
            }
        }
    }
}
