//! Sequential sweeps over the preset catalog.
//!
//! Member jobs run strictly one at a time, which preserves the
//! one-in-flight invariant without a work queue and bounds service load
//! to a single outstanding request.

use tokio::time::sleep;

use crate::catalog::{self, CUSTOM_TARGET, CUSTOM_TARGET_ID};
use crate::engine::Engine;
use crate::error::EngineError;
use crate::events::NoticeLevel;
use crate::params::Method;

/// Outcome of a catalog or cascade sweep. Failures are per-entry: the
/// sweep is a best-effort pass, not a transaction.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

impl Engine {
    /// Render the full catalog in order, then the live custom preview.
    ///
    /// A fixed pacing pause separates the entries so a fresh upload does
    /// not burst the service with full-image requests.
    pub async fn process_all(&self) -> Result<BatchReport, EngineError> {
        self.require_session()?;
        if self.state().is_processing() {
            return Err(EngineError::Busy);
        }

        let total = catalog::catalog().len();
        let mut report = BatchReport::default();
        for (index, entry) in catalog::catalog().iter().enumerate() {
            self.progress(
                format!("processing {} ({}/{})", entry.name, index + 1, total),
                (index * 100 / (total + 1)) as u8,
            );
            let params = self.merge_globals(entry.params.clone());
            match self.run_job(entry.name, entry.target_id, params).await {
                Ok(_) => report.succeeded.push(entry.name.to_string()),
                Err(err) => {
                    tracing::warn!(preset = entry.name, error = %err, "catalog entry failed");
                    report.failed.push((entry.name.to_string(), err.to_string()));
                }
            }
            sleep(self.pacing()).await;
        }

        self.progress(
            "finalizing custom preview",
            (total * 100 / (total + 1)) as u8,
        );
        let mut params = self.params();
        params.method = Method::Custom;
        match self.run_job(CUSTOM_TARGET, CUSTOM_TARGET_ID, params).await {
            Ok(_) => report.succeeded.push(CUSTOM_TARGET.to_string()),
            Err(err) => report.failed.push((CUSTOM_TARGET.to_string(), err.to_string())),
        }
        self.clear_progress();

        if report.is_clean() {
            self.notice(NoticeLevel::Success, "all variations processed");
        } else {
            self.notice(
                NoticeLevel::Error,
                format!("{} of {} targets failed", report.failed.len(), report.total()),
            );
        }
        Ok(report)
    }

    /// Re-render a snapshot of previously ready targets after a global
    /// setting change, keeping each entry's own numeric parameters.
    pub(crate) async fn cascade(&self, targets: Vec<String>) -> Result<BatchReport, EngineError> {
        let mut report = BatchReport::default();
        if targets.is_empty() {
            return Ok(report);
        }

        let total = targets.len();
        for (index, target) in targets.iter().enumerate() {
            self.progress(
                format!("refreshing {} ({}/{})", target, index + 1, total),
                (index * 100 / total) as u8,
            );
            let outcome = if target == CUSTOM_TARGET {
                let mut params = self.params();
                params.method = Method::Custom;
                self.run_job(CUSTOM_TARGET, CUSTOM_TARGET_ID, params).await
            } else if let Some(entry) = catalog::find(target) {
                let params = self.merge_globals(entry.params.clone());
                self.run_job(entry.name, entry.target_id, params).await
            } else {
                // Stale flag for a target no longer in the catalog.
                tracing::debug!(job = %target, "skipping unknown cascade target");
                continue;
            };
            match outcome {
                Ok(_) => report.succeeded.push(target.clone()),
                Err(err) => {
                    tracing::warn!(job = %target, error = %err, "cascade entry failed");
                    report.failed.push((target.clone(), err.to_string()));
                }
            }
        }
        self.clear_progress();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::engine::{Engine, EngineConfig};
    use crate::params::Method;
    use crate::testing::{sample_upload, RecordingService, ServiceCall};

    async fn bound_engine(service: Arc<RecordingService>) -> Engine {
        let (engine, _edits) = Engine::new(service, EngineConfig::default());
        engine.upload(sample_upload()).await.expect("upload");
        engine
    }

    fn processed_methods(service: &RecordingService) -> Vec<Method> {
        service
            .process_calls()
            .into_iter()
            .map(|call| match call {
                ServiceCall::Process { method, .. } => method,
                other => panic!("expected process call, got {other:?}"),
            })
            .collect()
    }

    #[test]
    fn test_full_run_is_sequential_and_in_catalog_order() {
        tokio_test::block_on(async {
            tokio::time::pause();
            let service = Arc::new(RecordingService::new());
            service.set_delay(Some(Duration::from_millis(20)));
            let engine = bound_engine(service.clone()).await;
            service.clear_calls();

            let report = engine.process_all().await.expect("full run");
            assert!(report.is_clean());
            assert_eq!(report.total(), 13);

            // No two requests were ever outstanding simultaneously.
            assert_eq!(service.peak_in_flight(), 1);

            let mut expected: Vec<Method> = crate::catalog::catalog()
                .iter()
                .map(|entry| entry.params.method)
                .collect();
            expected.push(Method::Custom);
            assert_eq!(processed_methods(&service), expected);
        });
    }

    #[test]
    fn test_full_run_paces_entries_with_the_configured_interval() {
        tokio_test::block_on(async {
            tokio::time::pause();
            let service = Arc::new(RecordingService::new());
            let (engine, _edits) = Engine::new(
                service.clone(),
                EngineConfig::default().with_pacing(Duration::from_millis(200)),
            );
            engine.upload(sample_upload()).await.expect("upload");

            let start = tokio::time::Instant::now();
            engine.process_all().await.expect("full run");

            // One pacing pause after each of the 12 catalog entries.
            assert_eq!(start.elapsed(), Duration::from_millis(2_400));
        });
    }

    #[test]
    fn test_full_run_marks_all_thirteen_targets_ready() {
        tokio_test::block_on(async {
            tokio::time::pause();
            let service = Arc::new(RecordingService::new());
            let engine = bound_engine(service.clone()).await;

            engine.process_all().await.expect("full run");

            let ready = engine.ready_targets();
            assert_eq!(ready.len(), 13);
            assert_eq!(ready.first().map(String::as_str), Some("medieval"));
            assert_eq!(ready.last().map(String::as_str), Some("custom"));
        });
    }

    #[test]
    fn test_entry_failure_does_not_abort_the_sweep() {
        tokio_test::block_on(async {
            tokio::time::pause();
            let service = Arc::new(RecordingService::new());
            let engine = bound_engine(service.clone()).await;
            service.fail_method(Method::Threshold);

            let report = engine.process_all().await.expect("full run");
            assert_eq!(report.failed.len(), 1);
            assert_eq!(report.failed[0].0, "threshold");
            assert_eq!(report.succeeded.len(), 12);

            assert!(!engine.is_ready("threshold"));
            assert!(engine.is_ready("medieval"));
            assert!(engine.is_ready("custom"));
        });
    }

    #[test]
    fn test_cascade_resubmits_exactly_the_ready_targets() {
        tokio_test::block_on(async {
            tokio::time::pause();
            let service = Arc::new(RecordingService::new());
            let engine = bound_engine(service.clone()).await;

            // "threshold" never rendered; everything else did.
            service.fail_method(Method::Threshold);
            engine.process_all().await.expect("full run");
            service.clear_fail_methods();
            service.clear_calls();

            let report = engine
                .set_color_tint(Some("sepia".to_string()))
                .await
                .expect("cascade");
            assert!(report.is_clean());
            assert_eq!(report.total(), 12);
            assert!(!report.succeeded.contains(&"threshold".to_string()));
            assert!(report.succeeded.contains(&"custom".to_string()));

            let calls = service.process_calls();
            assert_eq!(calls.len(), 12);
            for call in calls {
                match call {
                    ServiceCall::Process {
                        method, color_tint, ..
                    } => {
                        assert_ne!(method, Method::Threshold);
                        assert_eq!(color_tint.as_deref(), Some("sepia"));
                    }
                    other => panic!("expected process call, got {other:?}"),
                }
            }
        });
    }

    #[test]
    fn test_cascade_after_full_run_covers_all_thirteen_targets() {
        tokio_test::block_on(async {
            tokio::time::pause();
            let service = Arc::new(RecordingService::new());
            let engine = bound_engine(service.clone()).await;

            engine.process_all().await.expect("full run");
            service.clear_calls();

            let report = engine
                .set_color_tint(Some("sepia".to_string()))
                .await
                .expect("cascade");
            assert_eq!(report.total(), 13);
            assert_eq!(service.process_calls().len(), 13);
        });
    }

    #[test]
    fn test_tint_change_before_any_preview_issues_no_requests() {
        tokio_test::block_on(async {
            let service = Arc::new(RecordingService::new());
            let engine = bound_engine(service.clone()).await;
            service.clear_calls();

            let report = engine
                .set_color_tint(Some("sepia".to_string()))
                .await
                .expect("no-op cascade");
            assert_eq!(report.total(), 0);
            assert!(service.process_calls().is_empty());

            // The setting itself still took effect.
            assert_eq!(engine.params().color_tint.as_deref(), Some("sepia"));
        });
    }

    #[test]
    fn test_aspect_toggle_cascades_with_preserved_numerics() {
        tokio_test::block_on(async {
            let service = Arc::new(RecordingService::new());
            let engine = bound_engine(service.clone()).await;

            engine.apply_preset("medieval").await.expect("preset");
            service.clear_calls();

            let report = engine.set_preserve_aspect(true).await.expect("cascade");
            // "medieval" and "custom" were ready.
            assert_eq!(report.total(), 2);

            for call in service.process_calls() {
                match call {
                    ServiceCall::Process {
                        preserve_aspect_ratio,
                        ..
                    } => assert!(preserve_aspect_ratio),
                    other => panic!("expected process call, got {other:?}"),
                }
            }
        });
    }

    #[test]
    fn test_full_run_without_session_is_not_ready() {
        tokio_test::block_on(async {
            let service = Arc::new(RecordingService::new());
            let (engine, _edits) = Engine::new(service.clone(), EngineConfig::default());

            let err = engine.process_all().await.unwrap_err();
            assert!(matches!(err, crate::error::EngineError::NotReady(_)));
            assert!(service.calls().is_empty());
        });
    }
}
