//! Scripted input services for session and server tests.

use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use pime_service::{
    Message, ReplyFields, Service, ServiceOutcome, SessionContext, StaticRegistry,
};
use serde_json::Value;

/// How long the `slow` method holds its caller.
pub const SLOW_HANDLER_DELAY: Duration = Duration::from_millis(25);

/// Ordered record of service calls shared across instances.
#[derive(Clone, Debug, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    fn push(&self, event: String) {
        self.0
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(event);
    }

    /// Snapshot of recorded events.
    pub fn events(&self) -> Vec<String> {
        self.0
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

/// Tracks how many `slow` handlers run at the same time.
#[derive(Debug, Default)]
pub struct ConcurrencyProbe {
    active: AtomicUsize,
    peak: AtomicUsize,
    completed: AtomicUsize,
}

impl ConcurrencyProbe {
    fn enter(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    /// Highest number of overlapping `slow` handlers observed.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Number of `slow` handlers that finished.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

/// Service whose behaviour is selected by the method name.
///
/// - `echo` returns the request's `value` and queues it as `echoed`.
/// - `fail` queues `leaked` and reports failure.
/// - `slow` sleeps while tracked by the [`ConcurrencyProbe`].
/// - `spoof` queues fields named like the reply envelope keys.
/// - `panic` panics.
/// - anything else fails without queuing fields.
#[derive(Debug)]
pub struct ScriptedService {
    name: &'static str,
    log: EventLog,
    probe: Arc<ConcurrencyProbe>,
    queued: ReplyFields,
}

impl ScriptedService {
    fn queue(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.queued.insert(key.into(), value.into());
    }
}

impl Service for ScriptedService {
    fn activate(&mut self, context: &SessionContext) {
        self.log.push(format!("activate:{}", self.name));
        self.queue("composition", "");
        self.queue(format!("{}Active", self.name), true);
        if let Some(host) = context.host {
            self.queue("hostConsole", host.console);
        }
    }

    fn deactivate(&mut self) {
        self.log.push(format!("deactivate:{}", self.name));
        self.queue(format!("{}Active", self.name), false);
    }

    fn handle(&mut self, method: &str, message: &Message) -> ServiceOutcome {
        self.log.push(format!("handle:{}:{method}", self.name));
        match method {
            "echo" => {
                let value = message.field("value").cloned().unwrap_or(Value::Null);
                self.queue("echoed", value.clone());
                ServiceOutcome::returning(value)
            }
            "fail" => {
                self.queue("leaked", true);
                ServiceOutcome::failed()
            }
            "slow" => {
                self.probe.enter();
                thread::sleep(SLOW_HANDLER_DELAY);
                self.probe.exit();
                self.queue("slowDone", true);
                ServiceOutcome::succeeded()
            }
            "spoof" => {
                self.queue("success", false);
                self.queue("seqNum", 999);
                self.queue("return", "spoofed");
                ServiceOutcome::succeeded()
            }
            "panic" => panic!("scripted service panic"),
            _ => ServiceOutcome::failed(),
        }
    }

    fn drain_reply_fields(&mut self) -> ReplyFields {
        mem::take(&mut self.queued)
    }
}

/// Registry serving scripted services under `alpha`, `beta` and `demo`.
pub fn scripted_registry(log: &EventLog, probe: &Arc<ConcurrencyProbe>) -> StaticRegistry {
    let mut registry = StaticRegistry::new();
    for name in ["alpha", "beta", "demo"] {
        let log = log.clone();
        let probe = Arc::clone(probe);
        registry
            .register(
                name,
                Arc::new(move || {
                    Box::new(ScriptedService {
                        name,
                        log: log.clone(),
                        probe: Arc::clone(&probe),
                        queued: ReplyFields::new(),
                    }) as Box<dyn Service>
                }),
            )
            .expect("register scripted service");
    }
    registry
}
