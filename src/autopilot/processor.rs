//! Batch draft generation
//!
//! One cycle fetches the inbox and analyses, picks qualifying emails that are not
//! queued yet, and generates drafts for at most `batch_size` of them, one at a time.
//! At most one cycle runs per processor; overlapping triggers are dropped.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use super::error::{AutopilotError, AutopilotResult};
use super::filter::qualify;
use super::prefs::AutopilotPreferences;
use super::queue::DraftQueue;
use super::services::{DraftGenerator, DraftRequest, InboxProvider};
use super::types::AutopilotDraft;
use crate::constants::AUTOPILOT_BATCH_SIZE;
use crate::mail::{Analysis, EmailSummary};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Autopilot is disabled or paused; nothing was attempted
    Inactive,
    /// Another cycle held the in-flight claim; this trigger was dropped
    AlreadyRunning,
    Completed(CycleReport),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Qualifying emails not yet queued, before the batch cap
    pub candidates: usize,
    /// Email ids whose drafts were queued, in processing order
    pub queued: Vec<String>,
    /// Email ids whose generation failed; they stay candidates
    pub failed: Vec<String>,
}

impl CycleReport {
    /// Candidates left for a later cycle
    pub fn remaining(&self) -> usize {
        self.candidates - self.queued.len()
    }
}

/// Releases the in-flight claim when the cycle ends, however it ends
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Processor {
    batch_size: usize,
    in_flight: AtomicBool,
}

impl Default for Processor {
    fn default() -> Self {
        Self::new(AUTOPILOT_BATCH_SIZE)
    }
}

impl Processor {
    /// A batch size of zero is raised to one
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn try_claim(&self) -> Option<InFlight<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(&self.in_flight))
    }

    /// Qualifying emails that have an analysis and no queued draft, in inbox order
    pub fn select_candidates(
        emails: &[EmailSummary],
        analyses: &HashMap<String, Analysis>,
        queue: &DraftQueue,
        prefs: &AutopilotPreferences,
    ) -> Vec<(EmailSummary, Analysis)> {
        emails
            .iter()
            .filter(|email| !queue.contains(&email.id))
            .filter_map(|email| {
                let analysis = analyses.get(&email.id)?;
                match qualify(analysis, prefs) {
                    Ok(()) => Some((email.clone(), analysis.clone())),
                    Err(reason) => {
                        tracing::trace!("Skipping {}: {}", email.id, reason);
                        None
                    }
                }
            })
            .collect()
    }

    /// Run one cycle. Returns `AlreadyRunning` without doing anything when another
    /// cycle holds the claim, and `InboxFetch` when the inbox or analyses cannot be
    /// loaded. Per-candidate generation failures are logged and reported, never
    /// retried within the cycle.
    pub async fn run_cycle<I, G>(
        &self,
        user_id: &str,
        prefs: &AutopilotPreferences,
        inbox: &I,
        generator: &G,
        queue: &Mutex<DraftQueue>,
    ) -> AutopilotResult<CycleOutcome>
    where
        I: InboxProvider,
        G: DraftGenerator,
    {
        let Some(_claim) = self.try_claim() else {
            tracing::debug!("Autopilot cycle already running, ignoring trigger");
            return Ok(CycleOutcome::AlreadyRunning);
        };

        let (emails, analyses) = tokio::try_join!(
            inbox.list_inbox_emails(user_id),
            inbox.get_all_analyses(user_id)
        )
        .map_err(AutopilotError::InboxFetch)?;

        let candidates = {
            let queue = queue.lock().unwrap_or_else(|e| e.into_inner());
            Self::select_candidates(&emails, &analyses, &queue, prefs)
        };

        let mut report = CycleReport {
            candidates: candidates.len(),
            ..Default::default()
        };
        tracing::debug!(
            "Autopilot cycle: {} emails, {} candidates, batch of {}",
            emails.len(),
            candidates.len(),
            candidates.len().min(self.batch_size)
        );

        let tone = prefs.default_tone;
        for (email, analysis) in candidates.into_iter().take(self.batch_size) {
            let request = DraftRequest::reply_to(&email, tone);
            let email_id = email.id.clone();

            match generator.generate_draft(&request).await {
                Ok(generated) => {
                    let draft = AutopilotDraft::pending(
                        email,
                        analysis,
                        generated.subject,
                        generated.body,
                        tone,
                    );
                    queue.lock().unwrap_or_else(|e| e.into_inner()).add(draft);
                    report.queued.push(email_id);
                }
                Err(e) => {
                    tracing::warn!("Autopilot draft generation failed for {}: {:#}", email_id, e);
                    report.failed.push(email_id);
                }
            }
        }

        tracing::info!(
            "Autopilot cycle finished: {} queued, {} failed, {} left for later",
            report.queued.len(),
            report.failed.len(),
            report.remaining()
        );

        Ok(CycleOutcome::Completed(report))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::autopilot::services::GeneratedDraft;
    use crate::autopilot::types::{DraftStatus, MaxUrgency};
    use crate::mail::Sentiment;
    use anyhow::{Result, anyhow};
    use chrono::Utc;
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    pub(crate) fn make_email(id: &str) -> EmailSummary {
        EmailSummary {
            id: id.to_string(),
            thread_id: None,
            from_name: Some(format!("Sender {}", id)),
            from_address: format!("{}@example.com", id),
            subject: format!("Subject {}", id),
            snippet: format!("Snippet {}", id),
            received_at: Utc::now(),
        }
    }

    pub(crate) fn make_analysis(urgency: u8, flags: &[&str], category: &str) -> Analysis {
        Analysis {
            category: category.to_string(),
            urgency,
            sentiment: Sentiment::Neutral,
            requires_response: true,
            risk_flags: flags.iter().map(|f| f.to_string()).collect(),
            summary: None,
        }
    }

    #[derive(Default)]
    pub(crate) struct FakeInbox {
        pub emails: Vec<EmailSummary>,
        pub analyses: HashMap<String, Analysis>,
        pub fail: bool,
    }

    impl FakeInbox {
        pub(crate) fn with(entries: Vec<(EmailSummary, Option<Analysis>)>) -> Self {
            let mut inbox = FakeInbox::default();
            for (email, analysis) in entries {
                if let Some(analysis) = analysis {
                    inbox.analyses.insert(email.id.clone(), analysis);
                }
                inbox.emails.push(email);
            }
            inbox
        }

        /// `count` eligible emails with ids e0..e{count-1}
        pub(crate) fn eligible(count: usize) -> Self {
            Self::with(
                (0..count)
                    .map(|i| {
                        (
                            make_email(&format!("e{}", i)),
                            Some(make_analysis(1, &[], "client")),
                        )
                    })
                    .collect(),
            )
        }
    }

    impl InboxProvider for FakeInbox {
        async fn list_inbox_emails(&self, _user_id: &str) -> Result<Vec<EmailSummary>> {
            if self.fail {
                return Err(anyhow!("backend unavailable"));
            }
            Ok(self.emails.clone())
        }

        async fn get_all_analyses(&self, _user_id: &str) -> Result<HashMap<String, Analysis>> {
            Ok(self.analyses.clone())
        }
    }

    #[derive(Default)]
    pub(crate) struct FakeGenerator {
        pub calls: AtomicUsize,
        pub failing: HashSet<String>,
        requests: Mutex<Vec<DraftRequest>>,
    }

    impl FakeGenerator {
        pub(crate) fn failing_for(ids: &[&str]) -> Self {
            Self {
                failing: ids.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            }
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn requests(&self) -> Vec<DraftRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl DraftGenerator for FakeGenerator {
        async fn generate_draft(&self, request: &DraftRequest) -> Result<GeneratedDraft> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());

            let subject = &request.original_email.subject;
            if self.failing.iter().any(|id| subject.ends_with(id.as_str())) {
                return Err(anyhow!("rate limited"));
            }
            Ok(GeneratedDraft {
                subject: format!("Re: {}", subject),
                body: format!("<p>Reply in a {} tone</p>", request.tone),
            })
        }
    }

    fn active_prefs() -> AutopilotPreferences {
        AutopilotPreferences {
            enabled: true,
            ..Default::default()
        }
    }

    fn completed(outcome: CycleOutcome) -> CycleReport {
        match outcome {
            CycleOutcome::Completed(report) => report,
            other => panic!("expected completed cycle, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_mixed_inbox_queues_only_eligible() {
        let inbox = FakeInbox::with(vec![
            (make_email("a"), Some(make_analysis(1, &[], "client"))),
            (
                make_email("b"),
                Some(make_analysis(1, &["payment_issue"], "client")),
            ),
            (make_email("c"), Some(make_analysis(4, &[], "client"))),
        ]);
        let generator = FakeGenerator::default();
        let queue = Mutex::new(DraftQueue::new());
        let prefs = AutopilotPreferences {
            max_urgency: MaxUrgency::Two,
            ..active_prefs()
        };

        let report = completed(
            Processor::default()
                .run_cycle("user", &prefs, &inbox, &generator, &queue)
                .await
                .unwrap(),
        );

        assert_eq!(report.queued, vec!["a".to_string()]);
        let queue = queue.lock().unwrap();
        let pending = queue.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].email_id, "a");
        assert_eq!(pending[0].status, DraftStatus::Pending);
        assert_eq!(pending[0].draft_subject, "Re: Subject a");
    }

    #[tokio::test]
    async fn test_emails_without_analysis_are_skipped() {
        let inbox = FakeInbox::with(vec![
            (make_email("a"), None),
            (make_email("b"), Some(make_analysis(1, &[], "client"))),
        ]);
        let generator = FakeGenerator::default();
        let queue = Mutex::new(DraftQueue::new());

        let report = completed(
            Processor::default()
                .run_cycle("user", &active_prefs(), &inbox, &generator, &queue)
                .await
                .unwrap(),
        );
        assert_eq!(report.candidates, 1);
        assert_eq!(report.queued, vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn test_zero_batch_size_still_drafts() {
        let inbox = FakeInbox::eligible(2);
        let generator = FakeGenerator::default();
        let queue = Mutex::new(DraftQueue::new());
        let processor = Processor::new(0);

        let report = completed(
            processor
                .run_cycle("user", &active_prefs(), &inbox, &generator, &queue)
                .await
                .unwrap(),
        );
        assert_eq!(report.queued, vec!["e0"]);
    }

    #[tokio::test]
    async fn test_batch_cap_spreads_over_cycles() {
        let inbox = FakeInbox::eligible(8);
        let generator = FakeGenerator::default();
        let queue = Mutex::new(DraftQueue::new());
        let processor = Processor::default();
        let prefs = active_prefs();

        let first = completed(
            processor
                .run_cycle("user", &prefs, &inbox, &generator, &queue)
                .await
                .unwrap(),
        );
        assert_eq!(first.candidates, 8);
        assert_eq!(first.queued.len(), 5);
        assert_eq!(first.remaining(), 3);
        assert_eq!(queue.lock().unwrap().len(), 5);

        let second = completed(
            processor
                .run_cycle("user", &prefs, &inbox, &generator, &queue)
                .await
                .unwrap(),
        );
        assert_eq!(second.candidates, 3);
        assert_eq!(second.queued, vec!["e5", "e6", "e7"]);
        assert_eq!(queue.lock().unwrap().len(), 8);
        assert_eq!(generator.call_count(), 8);
    }

    #[tokio::test]
    async fn test_repeated_cycles_do_not_duplicate() {
        let inbox = FakeInbox::eligible(1);
        let generator = FakeGenerator::default();
        let queue = Mutex::new(DraftQueue::new());
        let processor = Processor::default();
        let prefs = active_prefs();

        for _ in 0..2 {
            processor
                .run_cycle("user", &prefs, &inbox, &generator, &queue)
                .await
                .unwrap();
        }

        assert_eq!(queue.lock().unwrap().len(), 1);
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn test_processed_drafts_still_block_regeneration() {
        let inbox = FakeInbox::eligible(1);
        let generator = FakeGenerator::default();
        let queue = Mutex::new(DraftQueue::new());
        let processor = Processor::default();
        let prefs = active_prefs();

        processor
            .run_cycle("user", &prefs, &inbox, &generator, &queue)
            .await
            .unwrap();
        queue
            .lock()
            .unwrap()
            .set_status("e0", DraftStatus::Rejected, None);

        let report = completed(
            processor
                .run_cycle("user", &prefs, &inbox, &generator, &queue)
                .await
                .unwrap(),
        );
        assert!(report.queued.is_empty());
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn test_generation_failure_is_isolated() {
        let inbox = FakeInbox::eligible(3);
        let generator = FakeGenerator::failing_for(&["e1"]);
        let queue = Mutex::new(DraftQueue::new());
        let processor = Processor::default();
        let prefs = active_prefs();

        let report = completed(
            processor
                .run_cycle("user", &prefs, &inbox, &generator, &queue)
                .await
                .unwrap(),
        );
        assert_eq!(report.queued, vec!["e0", "e2"]);
        assert_eq!(report.failed, vec!["e1"]);
        // One attempt per candidate, no retries
        assert_eq!(generator.call_count(), 3);
        assert!(!processor.is_running());

        // The failed email is picked up again next time
        let again = completed(
            processor
                .run_cycle("user", &prefs, &inbox, &generator, &queue)
                .await
                .unwrap(),
        );
        assert_eq!(again.candidates, 1);
        assert_eq!(again.failed, vec!["e1"]);
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts_and_releases_claim() {
        let inbox = FakeInbox {
            fail: true,
            ..FakeInbox::eligible(2)
        };
        let generator = FakeGenerator::default();
        let queue = Mutex::new(DraftQueue::new());
        let processor = Processor::default();

        let result = processor
            .run_cycle("user", &active_prefs(), &inbox, &generator, &queue)
            .await;
        assert!(matches!(result, Err(AutopilotError::InboxFetch(_))));
        assert_eq!(generator.call_count(), 0);
        assert!(!processor.is_running());
    }

    #[tokio::test]
    async fn test_requests_carry_tone_and_reply_context() {
        let inbox = FakeInbox::eligible(1);
        let generator = FakeGenerator::default();
        let queue = Mutex::new(DraftQueue::new());
        let prefs = AutopilotPreferences {
            default_tone: crate::autopilot::types::Tone::Empathetic,
            ..active_prefs()
        };

        Processor::default()
            .run_cycle("user", &prefs, &inbox, &generator, &queue)
            .await
            .unwrap();

        let requests = generator.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert!(request.is_reply);
        assert_eq!(request.tone, crate::autopilot::types::Tone::Empathetic);
        assert_eq!(request.original_email.from, "Sender e0 <e0@example.com>");
        assert_eq!(request.original_email.subject, "Subject e0");
        assert_eq!(request.original_email.body, "Snippet e0");
    }

    /// Blocks inside each generation call until released
    #[derive(Default)]
    pub(crate) struct GatedGenerator {
        pub started: Notify,
        pub release: Notify,
    }

    impl DraftGenerator for GatedGenerator {
        async fn generate_draft(&self, request: &DraftRequest) -> Result<GeneratedDraft> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(GeneratedDraft {
                subject: format!("Re: {}", request.original_email.subject),
                body: "<p>ok</p>".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_overlapping_trigger_is_dropped() {
        let inbox = FakeInbox::eligible(1);
        let generator = GatedGenerator {
            started: Notify::new(),
            release: Notify::new(),
        };
        let queue = Mutex::new(DraftQueue::new());
        let processor = Processor::default();
        let prefs = active_prefs();

        let first = processor.run_cycle("user", &prefs, &inbox, &generator, &queue);
        let second = async {
            generator.started.notified().await;
            assert!(processor.is_running());
            let outcome = processor
                .run_cycle("user", &prefs, &inbox, &generator, &queue)
                .await;
            generator.release.notify_one();
            outcome
        };

        let (first, second) = tokio::join!(first, second);
        assert_eq!(completed(first.unwrap()).queued, vec!["e0"]);
        assert_eq!(second.unwrap(), CycleOutcome::AlreadyRunning);
        assert!(!processor.is_running());
    }
}
