//! # EventKernel: single-threaded cooperative event dispatch.
//!
//! Handlers register for an [`EventClass`]; the kernel owns a FIFO queue and
//! delivers each event to every handler whose class the event's kind satisfies,
//! in registration order. Whatever a handler returns is appended to the back of
//! the queue.
//!
//! ## Pass
//! ```text
//! run_pass(now):
//!   for each event queued at pass start:
//!     pop front
//!     for each matching handler (registration order):
//!       catch_unwind(handler.handle(&event, now))
//!         ├─ Ok(events) → push back
//!         ├─ Err(e)     → log, continue with the next handler
//!         └─ panic      → log, continue with the next handler
//! ```
//!
//! ## Waiting
//! A handler waits for time `T` by returning the event it was given, unchanged,
//! until `now >= T`. [`EventKernel::run`] repeats passes while they make progress
//! and returns as soon as a pass only produced such re-emissions, so waiting
//! never spins; the caller runs the kernel again later with a fresh `now`.
//!
//! ## Rules
//! - Handlers run to completion, one at a time, on the caller's thread.
//! - A failing handler never prevents other handlers or later events from running.
//! - The triggering event is consumed unless a handler re-emits it.

use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::SystemTime;

use tracing::{error, warn};

use crate::error::{HandlerError, panic_message};
use crate::events::{Event, EventClass};

/// Upper bound of passes per [`EventKernel::run`] call.
const MAX_PASSES: usize = 1024;

/// Synchronous event handler.
///
/// # Example
/// ```
/// use std::time::SystemTime;
/// use scanvisor::{Event, Handler, HandlerError};
///
/// struct CountTicks(u64);
///
/// impl Handler for CountTicks {
///     fn name(&self) -> &str { "count-ticks" }
///
///     fn handle(&mut self, ev: &Event, _now: SystemTime) -> Result<Vec<Event>, HandlerError> {
///         if let Event::Tick { .. } = ev {
///             self.0 += 1;
///         }
///         Ok(Vec::new())
///     }
/// }
/// ```
pub trait Handler: Send {
    /// Name used in fault logs.
    fn name(&self) -> &str;

    /// Handles one event and returns follow-up events.
    fn handle(&mut self, event: &Event, now: SystemTime) -> Result<Vec<Event>, HandlerError>;

    /// Called once when the kernel stops; events still queued are not delivered.
    fn on_stop(&mut self) {}
}

/// Closure-backed [`Handler`].
pub struct HandlerFn<F> {
    name: String,
    f: F,
}

impl<F> HandlerFn<F>
where
    F: FnMut(&Event, SystemTime) -> Result<Vec<Event>, HandlerError> + Send,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> Handler for HandlerFn<F>
where
    F: FnMut(&Event, SystemTime) -> Result<Vec<Event>, HandlerError> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&mut self, event: &Event, now: SystemTime) -> Result<Vec<Event>, HandlerError> {
        (self.f)(event, now)
    }
}

struct Registration {
    classes: Vec<EventClass>,
    handler: Box<dyn Handler>,
}

impl Registration {
    fn matches(&self, event: &Event) -> bool {
        let kind = event.kind();
        self.classes.iter().any(|class| kind.satisfies(*class))
    }
}

/// Event registry and dispatch loop.
#[derive(Default)]
pub struct EventKernel {
    handlers: Vec<Registration>,
    queue: VecDeque<Event>,
    stopped: bool,
}

impl EventKernel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for every event satisfying `class`.
    pub fn register<H: Handler + 'static>(&mut self, class: EventClass, handler: H) {
        self.register_for(&[class], handler);
    }

    /// Registers one handler instance for several classes.
    ///
    /// An event matching more than one of them is delivered once.
    pub fn register_for<H: Handler + 'static>(&mut self, classes: &[EventClass], handler: H) {
        self.handlers.push(Registration {
            classes: classes.to_vec(),
            handler: Box::new(handler),
        });
    }

    /// Appends `event` to the queue.
    pub fn push(&mut self, event: Event) {
        self.queue.push_back(event);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = Event>) {
        self.queue.extend(events);
    }

    /// Events waiting in the queue.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Requests the loop to stop; [`run`](Self::run) becomes a no-op.
    ///
    /// The first call runs every handler's [`Handler::on_stop`] in registration order.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        for reg in &mut self.handlers {
            let handler = &mut reg.handler;
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| handler.on_stop())) {
                error!(
                    handler = handler.name(),
                    panic = %panic_message(&*payload),
                    "handler panicked while stopping"
                );
            }
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Delivers `event` to every matching handler and collects their output.
    pub fn dispatch(&mut self, event: &Event, now: SystemTime) -> Vec<Event> {
        let mut out = Vec::new();
        for reg in self.handlers.iter_mut().filter(|r| r.matches(event)) {
            let handler = &mut reg.handler;
            match catch_unwind(AssertUnwindSafe(|| handler.handle(event, now))) {
                Ok(Ok(events)) => out.extend(events),
                Ok(Err(e)) => log_fault(handler.name(), event, &e),
                Err(payload) => {
                    let e = HandlerError::Panicked {
                        message: panic_message(&*payload),
                    };
                    log_fault(handler.name(), event, &e);
                }
            }
        }
        out
    }

    /// Processes exactly the events queued when the pass starts.
    ///
    /// Returns `true` if any event produced something other than an unchanged copy
    /// of itself (consumed, transformed or fanned out).
    pub fn run_pass(&mut self, now: SystemTime) -> bool {
        let mut progressed = false;
        for _ in 0..self.queue.len() {
            let Some(event) = self.queue.pop_front() else {
                break;
            };
            let out = self.dispatch(&event, now);
            let waiting = out.len() == 1 && out[0] == event;
            progressed |= !waiting;
            self.queue.extend(out);
        }
        progressed
    }

    /// Runs passes until the queue is empty, the kernel is stopped, or a pass
    /// made no progress. Returns the number of passes run.
    pub fn run(&mut self, now: SystemTime) -> usize {
        let mut passes = 0;
        while !self.stopped && !self.queue.is_empty() {
            passes += 1;
            if !self.run_pass(now) {
                break;
            }
            if passes >= MAX_PASSES {
                warn!(
                    passes,
                    pending = self.queue.len(),
                    "event kernel still busy; yielding"
                );
                break;
            }
        }
        passes
    }
}

fn log_fault(handler: &str, event: &Event, e: &HandlerError) {
    error!(
        handler,
        event = event.kind().as_label(),
        label = e.as_label(),
        error = %e,
        "handler failed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crate::events::EventKind;
    use crate::packs::SourceId;

    type Log = Arc<Mutex<Vec<String>>>;

    fn t(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn recorder(log: &Log, tag: &'static str) -> impl Handler + 'static {
        let log = log.clone();
        HandlerFn::new(tag, move |ev: &Event, _now| {
            log.lock().unwrap().push(format!("{tag}:{}", ev.kind().as_label()));
            Ok(Vec::new())
        })
    }

    fn started(n: usize) -> Event {
        Event::ScanStarted {
            source: SourceId(n),
        }
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let log = Log::default();
        let mut k = EventKernel::new();
        k.register(EventClass::Any, recorder(&log, "a"));
        k.register(EventClass::Lifecycle, recorder(&log, "b"));
        k.register(EventClass::Outcome, recorder(&log, "c"));

        k.push(started(0));
        k.run(t(0));
        assert_eq!(*log.lock().unwrap(), vec!["a:scan_started", "b:scan_started"]);
    }

    #[test]
    fn multi_class_registration_delivers_once() {
        let log = Log::default();
        let mut k = EventKernel::new();
        k.register_for(
            &[EventClass::Worker, EventClass::Lifecycle],
            recorder(&log, "w"),
        );
        k.push(started(0));
        k.run(t(0));
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn fault_does_not_stop_the_loop() {
        let log = Log::default();
        let mut k = EventKernel::new();
        k.register(
            EventClass::Exact(EventKind::ScanStarted),
            HandlerFn::new("faulty", |ev: &Event, _| match ev.source() {
                Some(SourceId(0)) => Err(HandlerError::fault("boom")),
                _ => Ok(Vec::new()),
            }),
        );
        k.register(
            EventClass::Exact(EventKind::ScanStarted),
            HandlerFn::new("panicky", |ev: &Event, _| {
                if ev.source() == Some(SourceId(0)) {
                    panic!("handler blew up");
                }
                Ok(Vec::new())
            }),
        );
        k.register(EventClass::Any, recorder(&log, "after"));

        k.push(started(0));
        k.push(started(1));
        k.run(t(0));

        assert_eq!(
            *log.lock().unwrap(),
            vec!["after:scan_started", "after:scan_started"]
        );
        assert_eq!(k.pending(), 0);
    }

    #[test]
    fn outputs_go_to_the_back_of_the_queue() {
        let log = Log::default();
        let mut k = EventKernel::new();
        k.register(
            EventClass::Exact(EventKind::ScanStarted),
            HandlerFn::new("fan", |_: &Event, now| Ok(vec![Event::Tick { now }])),
        );
        k.register(EventClass::Any, recorder(&log, "seen"));

        k.push(started(0));
        k.push(started(1));
        k.run(t(0));
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "seen:scan_started",
                "seen:scan_started",
                "seen:tick",
                "seen:tick"
            ]
        );
    }

    #[test]
    fn waiting_event_idles_until_due() {
        let mut k = EventKernel::new();
        k.register(
            EventClass::Gate,
            HandlerFn::new("wait", |ev: &Event, now| {
                if ev.is_due(now) {
                    Ok(Vec::new())
                } else {
                    Ok(vec![ev.clone()])
                }
            }),
        );
        k.push(Event::GateOpen { at: t(10) });

        assert_eq!(k.run(t(5)), 1, "one idle pass, then yield");
        assert_eq!(k.pending(), 1);

        k.run(t(10));
        assert_eq!(k.pending(), 0);
    }

    #[test]
    fn run_pass_handles_only_the_events_present_at_start() {
        let mut k = EventKernel::new();
        k.register(
            EventClass::Exact(EventKind::ScanStarted),
            HandlerFn::new("fan", |_: &Event, now| Ok(vec![Event::Tick { now }])),
        );
        k.push(started(0));
        assert!(k.run_pass(t(0)));
        assert_eq!(k.pending(), 1);
    }

    #[test]
    fn stop_makes_run_a_noop() {
        let mut k = EventKernel::new();
        k.push(started(0));
        k.stop();
        assert_eq!(k.run(t(0)), 0);
        assert!(k.is_stopped());
        assert_eq!(k.pending(), 1);
    }

    struct Stoppable {
        log: Log,
    }

    impl Handler for Stoppable {
        fn name(&self) -> &str {
            "stoppable"
        }

        fn handle(&mut self, _: &Event, _: SystemTime) -> Result<Vec<Event>, HandlerError> {
            Ok(Vec::new())
        }

        fn on_stop(&mut self) {
            self.log.lock().unwrap().push("stopped".into());
        }
    }

    struct PanicsOnStop;

    impl Handler for PanicsOnStop {
        fn name(&self) -> &str {
            "panics-on-stop"
        }

        fn handle(&mut self, _: &Event, _: SystemTime) -> Result<Vec<Event>, HandlerError> {
            Ok(Vec::new())
        }

        fn on_stop(&mut self) {
            panic!("stop hook blew up");
        }
    }

    #[test]
    fn stop_hooks_run_once_and_survive_a_panic() {
        let log = Log::default();
        let mut k = EventKernel::new();
        k.register(EventClass::Any, PanicsOnStop);
        k.register(EventClass::Any, Stoppable { log: log.clone() });

        k.stop();
        k.stop();
        assert_eq!(*log.lock().unwrap(), vec!["stopped"]);
    }

    #[test]
    fn dispatch_returns_outputs_without_queueing() {
        let mut k = EventKernel::new();
        k.register(
            EventClass::Any,
            HandlerFn::new("echo", |ev: &Event, _| Ok(vec![ev.clone()])),
        );
        let out = k.dispatch(&started(3), t(0));
        assert_eq!(out, vec![started(3)]);
        assert_eq!(k.pending(), 0);
    }
}
