//! End-to-end lifecycle passes over real directories with a recording
//! print dispatcher.

use std::path::Path;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use autoprint_core::{
    DispatchOutput, ExclusionStore, FileLifecycleManager, LifecycleStep, PrintDispatcher, Result,
    WatchConfiguration,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tokio::sync::Mutex;

/// Records every dispatch instead of printing.
#[derive(Default)]
struct RecordingDispatcher {
    calls: StdMutex<Vec<(String, String)>>,
}

impl RecordingDispatcher {
    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PrintDispatcher for RecordingDispatcher {
    async fn dispatch(&self, file_name: &str, printer: &str) -> Result<DispatchOutput> {
        self.calls
            .lock()
            .unwrap()
            .push((file_name.to_string(), printer.to_string()));

        Ok(DispatchOutput {
            success: true,
            exit_code: Some(0),
            stdout: format!("printed {file_name}\n"),
            stderr: String::new(),
            attempts: 1,
            duration_ms: 0,
        })
    }
}

struct Harness {
    watched: TempDir,
    work: TempDir,
    state: TempDir,
    dispatcher: Arc<RecordingDispatcher>,
    exclusions: Arc<Mutex<ExclusionStore>>,
    manager: FileLifecycleManager,
}

impl Harness {
    async fn new() -> Self {
        let watched = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let state = TempDir::new().unwrap();
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let exclusions = Arc::new(Mutex::new(
            ExclusionStore::load(state.path()).await.unwrap(),
        ));
        let manager =
            FileLifecycleManager::new(exclusions.clone(), dispatcher.clone(), work.path());

        Self {
            watched,
            work,
            state,
            dispatcher,
            exclusions,
            manager,
        }
    }

    fn touch(&self, name: &str) {
        std::fs::write(self.watched.path().join(name), b"%PDF-1.4").unwrap();
    }

    fn config(&self, words: &str) -> WatchConfiguration {
        WatchConfiguration::from_word_list("Front Office", self.watched.path(), words)
    }

    async fn persisted_exclusions(&self) -> Vec<String> {
        ExclusionStore::load(self.state.path())
            .await
            .unwrap()
            .names()
            .to_vec()
    }
}

fn exists(path: &Path) -> bool {
    path.try_exists().unwrap()
}

#[tokio::test]
async fn test_wrong_extension_and_excluded_files_are_skipped() {
    let harness = Harness::new().await;
    harness.touch("invoice_ACME.pdf");
    harness.touch("report_other.txt");
    harness
        .exclusions
        .lock()
        .await
        .add("invoice_ACME.pdf")
        .await
        .unwrap();

    let report = harness.manager.run_pass(&harness.config("ACME")).await.unwrap();

    assert_eq!(report.processed(), 0);
    assert!(harness.dispatcher.calls().is_empty());
    assert!(exists(&harness.watched.path().join("invoice_ACME.pdf")));
    assert!(exists(&harness.watched.path().join("report_other.txt")));
}

#[tokio::test]
async fn test_matching_file_is_copied_printed_recorded_and_archived() {
    let harness = Harness::new().await;
    harness.touch("order_BETA.pdf");

    let report = harness
        .manager
        .run_pass(&harness.config("BETA,GAMMA"))
        .await
        .unwrap();

    assert_eq!(report.processed(), 1);
    let outcome = &report.outcomes[0];
    assert!(outcome.is_success(), "failures: {:?}", outcome.failures);
    assert!(outcome.copied && outcome.recorded && outcome.archived);
    assert_eq!(
        outcome.dispatch.as_ref().map(|d| d.stdout.as_str()),
        Some("printed order_BETA.pdf\n")
    );

    assert_eq!(
        harness.dispatcher.calls(),
        vec![("order_BETA.pdf".to_string(), "Front Office".to_string())]
    );
    assert_eq!(harness.persisted_exclusions().await, vec!["order_BETA.pdf"]);
    assert!(exists(&harness.work.path().join("order_BETA.pdf")));
    assert!(!exists(&harness.watched.path().join("order_BETA.pdf")));
    assert!(exists(&harness.watched.path().join("archive/order_BETA.pdf")));
}

#[tokio::test]
async fn test_second_pass_prints_nothing_new() {
    let harness = Harness::new().await;
    harness.touch("a_BETA.pdf");
    harness.touch("b_BETA.PDF");
    let config = harness.config("BETA");

    let first = harness.manager.run_pass(&config).await.unwrap();
    let second = harness.manager.run_pass(&config).await.unwrap();

    assert_eq!(first.processed(), 2);
    assert_eq!(second.processed(), 0);
    assert_eq!(harness.dispatcher.calls().len(), 2);
    assert_eq!(harness.persisted_exclusions().await.len(), 2);
}

#[tokio::test]
async fn test_reappearing_name_is_never_reprinted() {
    let harness = Harness::new().await;
    harness.touch("order_BETA.pdf");
    let config = harness.config("BETA");

    harness.manager.run_pass(&config).await.unwrap();
    harness.touch("order_BETA.pdf");
    let report = harness.manager.run_pass(&config).await.unwrap();

    assert_eq!(report.processed(), 0);
    assert_eq!(harness.dispatcher.calls().len(), 1);
    assert!(exists(&harness.watched.path().join("order_BETA.pdf")));
}

#[tokio::test]
async fn test_exclusions_are_shared_across_directories() {
    let harness = Harness::new().await;
    harness.touch("order_BETA.pdf");
    harness.manager.run_pass(&harness.config("BETA")).await.unwrap();

    let other = TempDir::new().unwrap();
    std::fs::write(other.path().join("order_BETA.pdf"), b"%PDF").unwrap();
    let other_config = WatchConfiguration::from_word_list("Back Office", other.path(), "BETA");
    let report = harness.manager.run_pass(&other_config).await.unwrap();

    assert_eq!(report.processed(), 0);
    assert!(exists(&other.path().join("order_BETA.pdf")));
}

#[tokio::test]
async fn test_copy_failure_does_not_stop_later_steps() {
    let harness = Harness::new().await;
    harness.touch("order_BETA.pdf");
    let manager = FileLifecycleManager::new(
        harness.exclusions.clone(),
        harness.dispatcher.clone(),
        harness.work.path().join("missing"),
    );

    let report = manager.run_pass(&harness.config("BETA")).await.unwrap();
    let outcome = &report.outcomes[0];

    assert!(outcome.failed(LifecycleStep::Copy));
    assert!(outcome.recorded);
    assert!(outcome.archived);
    assert_eq!(report.failed(), 1);
}
