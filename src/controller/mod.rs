//! Process controller: the top-level automation loop
//!
//! ```text
//! plan ──► slot ──► accounts in priority order
//!            │         └─► harvest ─► fresh candidates ─► transfer ─► ledger
//!            └─► countdown (1 s ticks) ─► next slot ... plan exhausted ─► new plan
//! ```
//!
//! One cooperative loop owns the browser session; accounts and candidates are
//! processed strictly one after another. The stop flag is checked before
//! every slot, before every candidate and on every countdown tick. An
//! in-flight transfer step always runs to completion.
//!
//! Every run ends with exactly one terminal event: `Finished`, `Failed` or
//! `Cancelled`.

pub mod events;

pub use events::{StatusEvent, StatusSink, StopHandle};

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::browser::{BrowserLauncher, ResilientExecutor, SessionManager};
use crate::config::{AccountsConfig, Config, Settings};
use crate::error::{CrosspostErrorTrait, Error, Result};
use crate::harvester::{select_fresh, ContentHarvester};
use crate::models::{CandidateItem, Credentials, Finalization, ItemState};
use crate::scheduler::{countdown, CountdownOutcome, CyclePlanner};
use crate::storage::SeenLedger;
use crate::transfer::{ComposerTiming, DestinationLocators, MediaFetcher, TransferPipeline};
use crate::utils::jitter;
use crate::utils::retry::RetryConfig;

/// Parameters of one run, as given by the start command
#[derive(Debug, Clone)]
pub struct StartRequest {
    /// Source accounts in priority order
    pub accounts: AccountsConfig,

    /// Source and destination logins
    pub credentials: Credentials,

    /// Slots per planning window
    pub items_per_window: u32,

    /// Per-run settings
    pub settings: Settings,
}

impl StartRequest {
    /// Request built from the loaded configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            accounts: config.accounts.clone(),
            credentials: config.credentials.clone(),
            items_per_window: config.schedule.items_per_window,
            settings: config.settings.clone(),
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The configured number of cycles completed
    Finished,
    /// A setup failure prevented the run
    Failed(String),
    /// A stop request ended the run
    Cancelled,
}

/// Result of one slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotOutcome {
    /// An item reached the destination and the ledger
    Transferred {
        account: String,
        item_id: String,
        finalization: Finalization,
    },
    /// No account produced a transferable item
    Skipped,
    /// A stop request interrupted the slot
    Stopped,
}

/// Ties planner, harvester, transfer pipeline and ledger together
pub struct ProcessController {
    config: Config,
    launcher: Arc<dyn BrowserLauncher>,
    fetcher: Arc<dyn MediaFetcher>,
    locators: DestinationLocators,
    harvester: ContentHarvester,
    status: StatusSink,
    stop: StopHandle,
}

impl ProcessController {
    pub fn new(
        config: Config,
        launcher: Arc<dyn BrowserLauncher>,
        fetcher: Arc<dyn MediaFetcher>,
        status: StatusSink,
    ) -> Self {
        Self {
            config,
            launcher,
            fetcher,
            locators: DestinationLocators::default(),
            harvester: ContentHarvester::new(),
            status,
            stop: StopHandle::new(),
        }
    }

    /// Handle that stops this controller
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Run until stopped, finished or failed; always emits one terminal event
    pub async fn start(&self, request: StartRequest) -> RunOutcome {
        let outcome = match self.run(request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(category = e.category().label(), error = %e, "Run failed during setup");
                RunOutcome::Failed(e.to_string())
            }
        };

        match &outcome {
            RunOutcome::Finished => self.status.send(StatusEvent::Finished),
            RunOutcome::Failed(reason) => self.status.send(StatusEvent::Failed(reason.clone())),
            RunOutcome::Cancelled => self.status.send(StatusEvent::Cancelled),
        }
        outcome
    }

    /// Request a cooperative stop
    pub fn stop(&self) {
        self.status.status("Stop requested");
        self.stop.stop();
    }

    #[instrument(skip_all)]
    async fn run(&self, request: StartRequest) -> Result<RunOutcome> {
        let accounts = request.accounts.urls();
        if accounts.is_empty() {
            return Err(Error::config("no source account configured"));
        }
        if !request.credentials.destination.is_complete() {
            return Err(Error::CredentialsMissing(
                "destination login and password are required".to_string(),
            ));
        }

        let mut ledger = SeenLedger::load(&self.config.storage.ledger_path);
        info!(accounts = accounts.len(), seen = ledger.len(), "Starting process");
        self.status.status(format!(
            "Starting with {} account(s), {} item(s) per {} minutes",
            accounts.len(),
            request.items_per_window,
            self.config.schedule.window_minutes
        ));

        let mut session = SessionManager::new(
            Arc::clone(&self.launcher),
            request.settings.clone(),
            self.locators.login.clone(),
        );
        session
            .ensure_session()
            .await
            .map_err(|e| Error::SessionUnavailable(e.to_string()))?;

        let outcome = self
            .cycle_loop(&mut session, &mut ledger, &accounts, &request)
            .await;
        session.close().await;
        Ok(outcome)
    }

    async fn cycle_loop(
        &self,
        session: &mut SessionManager,
        ledger: &mut SeenLedger,
        accounts: &[String],
        request: &StartRequest,
    ) -> RunOutcome {
        let schedule = &self.config.schedule;
        let mut planner = CyclePlanner::new(request.items_per_window, schedule.window_minutes, schedule.seed);
        let executor = ResilientExecutor::new(
            request.settings.element_timeout(),
            Duration::from_millis(self.config.transfer.poll_interval_ms),
        );
        let pipeline = TransferPipeline::new(
            self.locators.clone(),
            Arc::clone(&self.fetcher),
            ComposerTiming::from(&self.config.transfer),
        );

        let mut cycles = 0u32;
        loop {
            let plan = planner.next_plan();
            self.status.send(StatusEvent::NewPlan {
                item_count: plan.len(),
                intervals: plan.intervals().to_vec(),
            });

            for (index, minutes) in plan.intervals().iter().enumerate() {
                if self.stop.is_stopped() {
                    return RunOutcome::Cancelled;
                }
                self.status
                    .status(format!("Slot {}/{}", index + 1, plan.len()));

                let slot = self
                    .run_slot(session, ledger, accounts, request, &executor, &pipeline)
                    .await;
                match &slot {
                    SlotOutcome::Transferred {
                        account,
                        item_id,
                        finalization,
                    } => info!(account = %account, item = %item_id, %finalization, "Slot transferred"),
                    SlotOutcome::Skipped => self.status.status("No new item in any account, slot skipped"),
                    SlotOutcome::Stopped => return RunOutcome::Cancelled,
                }

                let seconds = u64::from(*minutes) * 60;
                if countdown(seconds, &self.stop, &self.status).await == CountdownOutcome::Stopped {
                    return RunOutcome::Cancelled;
                }
            }

            cycles += 1;
            if schedule.max_cycles.is_some_and(|max| cycles >= max) {
                info!(cycles, "Configured cycle count reached");
                return RunOutcome::Finished;
            }
        }
    }

    /// Try accounts in priority order until one item is transferred
    pub async fn run_slot(
        &self,
        session: &mut SessionManager,
        ledger: &mut SeenLedger,
        accounts: &[String],
        request: &StartRequest,
        executor: &ResilientExecutor,
        pipeline: &TransferPipeline,
    ) -> SlotOutcome {
        let harvest = &self.config.harvest;
        let page_timeout = request.settings.page_timeout();

        for account in accounts {
            if self.stop.is_stopped() {
                return SlotOutcome::Stopped;
            }
            self.status.status(format!("Checking {account}"));

            let items = match session.surface().await {
                Ok(page) => {
                    self.harvester
                        .harvest(page, executor, account, harvest.count, page_timeout)
                        .await
                }
                Err(e) => Err(e.into()),
            };
            let items = match items {
                Ok(items) => items,
                Err(e) => {
                    warn!(account = %account, error = %e, "Harvest failed, trying next account");
                    self.status
                        .status(format!("Could not read {account}: {}", e.user_message()));
                    continue;
                }
            };

            let fresh = select_fresh(items, ledger);
            if fresh.is_empty() {
                self.status.status(format!("No new items on {account}"));
                continue;
            }

            for candidate in &fresh {
                if self.stop.is_stopped() {
                    return SlotOutcome::Stopped;
                }
                tokio::time::sleep(jitter(
                    harvest.candidate_delay_min_ms,
                    harvest.candidate_delay_max_ms,
                ))
                .await;
                if self.stop.is_stopped() {
                    return SlotOutcome::Stopped;
                }

                if let Some(finalization) = self
                    .transfer_with_retry(session, executor, pipeline, candidate, request)
                    .await
                {
                    if let Err(e) = ledger.record_and_flush(&candidate.source_account, &candidate.id) {
                        warn!(error = %e, "Ledger flush failed, item kept in memory only");
                    }
                    debug!(item = %candidate.id, state = ?ItemState::LedgerRecorded, "Item state");
                    return SlotOutcome::Transferred {
                        account: account.clone(),
                        item_id: candidate.id.clone(),
                        finalization,
                    };
                }
            }
        }

        SlotOutcome::Skipped
    }

    /// Bounded attempts for one candidate; `MediaNotFound` is never retried
    async fn transfer_with_retry(
        &self,
        session: &mut SessionManager,
        executor: &ResilientExecutor,
        pipeline: &TransferPipeline,
        candidate: &CandidateItem,
        request: &StartRequest,
    ) -> Option<Finalization> {
        let transfer = &self.config.transfer;
        let retry = RetryConfig::with_delays(
            transfer.max_attempts,
            transfer.retry_delay_ms,
            transfer.retry_delay_ms.saturating_mul(4),
        );

        for attempt in 0..retry.max_attempts.max(1) {
            let delay = retry.delay_before(attempt);
            if !delay.is_zero() {
                if self.stop.is_stopped() {
                    return None;
                }
                debug!(attempt, delay_ms = delay.as_millis() as u64, "Retrying transfer");
                tokio::time::sleep(delay).await;
            }

            let result = pipeline
                .transfer(
                    session,
                    executor,
                    candidate,
                    &request.credentials.destination,
                    request.settings.auto_publish,
                    &self.status,
                )
                .await;

            if result.success {
                return result.finalization;
            }
            match &result.failure_reason {
                Some(reason) if !reason.is_retryable() => return None,
                _ => {}
            }
        }
        None
    }
}
