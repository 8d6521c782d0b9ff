//! Example: wiring the extension's services at a composition root
//!
//! Registers a logger, an issue tracker client and a per-session time
//! tracker, then resolves them around two work sessions. Run with
//! `RUST_LOG=debug` to see the container's own tracing output.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use taskpilot_core::container::{Implementation, Resolve, ServiceCollection, ServiceToken};
use taskpilot_core::{ConfigTrait, ContainerOptions, CoreError};

pub trait Logger: Send + Sync {
    fn info(&self, message: &str);
}

struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn info(&self, message: &str) {
        println!("[info] {}", message);
    }
}

pub trait IssueTracker: Send + Sync {
    fn issue_title(&self, id: u64) -> Result<String, CoreError>;
}

struct OfflineTracker {
    logger: Arc<dyn Logger>,
}

impl IssueTracker for OfflineTracker {
    fn issue_title(&self, id: u64) -> Result<String, CoreError> {
        self.logger.info(&format!("looking up work item {}", id));
        Ok(format!("Work item #{}", id))
    }
}

struct IssueTrackerToken;

impl ServiceToken for IssueTrackerToken {
    type Service = dyn IssueTracker;
}

/// Accumulates minutes for the work session it belongs to
struct TimeTracker {
    minutes: AtomicU64,
    entries: Mutex<Vec<String>>,
}

impl TimeTracker {
    fn new() -> Self {
        Self {
            minutes: AtomicU64::new(0),
            entries: Mutex::new(Vec::new()),
        }
    }

    fn log(&self, title: String, minutes: u64) {
        self.minutes.fetch_add(minutes, Ordering::SeqCst);
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(title);
        }
    }

    fn total(&self) -> u64 {
        self.minutes.load(Ordering::SeqCst)
    }
}

fn main() -> Result<(), CoreError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let options = ContainerOptions::from_env()?;

    let mut services = ServiceCollection::new();
    services
        .add_singleton_with(Implementation::constructor(|| {
            Arc::new(ConsoleLogger) as Arc<dyn Logger>
        }))
        .add_by_token::<IssueTrackerToken>(
            taskpilot_core::ServiceLifetime::Singleton,
            Implementation::factory(|resolver| {
                let tracker: Arc<dyn IssueTracker> = Arc::new(OfflineTracker {
                    logger: resolver.get_required_service::<dyn Logger>()?,
                });
                Ok(tracker)
            }),
        )
        .add_scoped_factory(|_| Ok(Arc::new(TimeTracker::new())));

    let provider = services.build_with_options(options)?;
    let tracker = provider.get_required_service_by_token::<IssueTrackerToken>()?;

    for (session, items) in [(1, [101u64, 102]), (2, [201, 202])] {
        let scope = provider.create_scope();
        let time = scope.get_required_service::<TimeTracker>()?;

        for id in items {
            time.log(tracker.issue_title(id)?, 25);
        }

        // same instance for the whole session
        let again = scope.get_required_service::<TimeTracker>()?;
        println!(
            "session {}: {} minutes tracked, shared tracker: {}",
            session,
            again.total(),
            Arc::ptr_eq(&time, &again)
        );

        scope.dispose();
    }

    Ok(())
}
