//! Calculator engine with evaluator dispatch and deferred error recovery.
//!
//! The `CalcEngine` owns the expression buffer, the evaluator, the timer
//! queue and the display context. Front-ends feed it edit events through
//! [`CalcEngine::process_event`] and call [`CalcEngine::poll`] from their
//! loop to collect evaluation responses and fire due timers. After either
//! call, the front-end reads `context()` to update what it shows.

use crate::buffer::{EditResult, ExpressionBuffer, ResponseResult};
use crate::context::{DisplayContext, Presented, RenderOptions, RenderSink};
use crate::evaluator::{EvalResponse, Evaluator};
use crate::events::EditEvent;
use crate::timer::{Clock, SystemClock, TaskId, TimerQueue};
use crate::Config;
use std::time::Duration;

/// Result of processing an edit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    /// Buffer changed
    Changed,
    /// Nothing to do
    Unchanged,
    /// Edit refused by the adjacency rules
    Rejected,
    /// Expression handed to the evaluator
    Dispatched { generation: u64 },
}

/// Work deferred to a later poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeferredTask {
    /// Leave the error display if the buffer is still at `version`
    ExpireError { version: u64 },
}

/// Calculator session.
pub struct CalcEngine<E: Evaluator, C: Clock = SystemClock> {
    buffer: ExpressionBuffer,
    evaluator: E,
    clock: C,
    timers: TimerQueue<DeferredTask>,
    /// Auto-clear scheduled for the current error display
    pending_clear: Option<TaskId>,
    context: DisplayContext,
    config: Config,
}

impl<E: Evaluator> CalcEngine<E, SystemClock> {
    /// Create an engine with default configuration on the system clock.
    pub fn new(evaluator: E) -> Self {
        Self::with_config(evaluator, Config::default())
    }

    pub fn with_config(evaluator: E, config: Config) -> Self {
        Self::with_clock(evaluator, SystemClock::new(), config)
    }
}

impl<E: Evaluator, C: Clock> CalcEngine<E, C> {
    /// Create an engine driven by a custom clock.
    pub fn with_clock(evaluator: E, clock: C, config: Config) -> Self {
        Self {
            buffer: ExpressionBuffer::new(),
            evaluator,
            clock,
            timers: TimerQueue::new(),
            pending_clear: None,
            context: DisplayContext::new(),
            config,
        }
    }

    /// Get a reference to the context for reading display state.
    pub fn context(&self) -> &DisplayContext {
        &self.context
    }

    pub fn buffer(&self) -> &ExpressionBuffer {
        &self.buffer
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    pub fn evaluator_mut(&mut self) -> &mut E {
        &mut self.evaluator
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// True while a dispatched expression has not been answered.
    pub fn is_awaiting(&self) -> bool {
        self.buffer.in_flight().is_some()
    }

    /// Whether an error auto-clear is scheduled.
    pub fn has_pending_clear(&self) -> bool {
        self.pending_clear.is_some()
    }

    /// When the next deferred task becomes due, measured on the engine clock.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_due()
    }

    /// Process an edit event and update the display context.
    pub fn process_event(&mut self, event: EditEvent) -> EventResult {
        let result = match self.buffer.apply(event) {
            EditResult::Changed => {
                // A change leaves any error display, so its auto-clear is moot.
                self.cancel_pending_clear();
                EventResult::Changed
            }
            EditResult::Unchanged => EventResult::Unchanged,
            EditResult::Rejected => EventResult::Rejected,
            EditResult::Dispatch(request) => {
                let generation = request.generation;
                self.evaluator.submit(request);
                EventResult::Dispatched { generation }
            }
        };
        self.sync_context();
        result
    }

    /// Process a keypad label such as `"AC"` or `"÷"`.
    ///
    /// Returns `None` for labels that map to no event.
    pub fn process_label(&mut self, label: &str) -> Option<EventResult> {
        EditEvent::from_label(label).map(|event| self.process_event(event))
    }

    /// Collect evaluation responses and fire due timers.
    ///
    /// Returns true if the display context changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Some(response) = self.evaluator.poll_response() {
            changed |= self.apply_response(response);
        }

        let now = self.clock.now();
        for task in self.timers.drain_due(now) {
            match task {
                DeferredTask::ExpireError { version } => {
                    if self.buffer.expire_error(version) {
                        tracing::debug!(version, "error display expired");
                    }
                }
            }
        }
        if let Some(id) = self.pending_clear {
            if !self.timers.is_scheduled(id) {
                self.pending_clear = None;
            }
        }

        changed | self.sync_context()
    }

    /// Apply a response obtained outside [`CalcEngine::poll`], e.g. from a
    /// blocking wait on the evaluator. Returns true if the display changed.
    pub fn apply_response(&mut self, response: EvalResponse) -> bool {
        match self.buffer.apply_response(response) {
            ResponseResult::Applied => {
                self.cancel_pending_clear();
                let text = self.buffer.text();
                match text.parse::<f64>() {
                    Ok(value) => {
                        self.context
                            .show_result(text, value, &self.config.result_format)
                    }
                    Err(_) => self.sync_context(),
                }
            }
            ResponseResult::Failed { version, .. } => {
                self.schedule_clear(version);
                self.sync_context()
            }
            ResponseResult::Stale => false,
        }
    }

    /// Present the display context to a render sink.
    pub fn present<S: RenderSink + ?Sized>(&self, sink: &mut S) -> Presented {
        let options = RenderOptions {
            display_mode: self.config.display_mode,
        };
        self.context.present(sink, options)
    }

    /// Reset the engine to its initial state. Pending timers are dropped and
    /// outstanding responses will be discarded.
    pub fn reset(&mut self) {
        self.buffer.reset();
        self.timers.clear();
        self.pending_clear = None;
        self.sync_context();
    }

    fn schedule_clear(&mut self, version: u64) {
        self.cancel_pending_clear();
        let delay = self.config.error_clear_delay();
        let due = self.clock.now() + delay;
        let id = self
            .timers
            .schedule(due, DeferredTask::ExpireError { version });
        tracing::debug!(version, delay_ms = delay.as_millis() as u64, "scheduled error auto-clear");
        self.pending_clear = Some(id);
    }

    fn cancel_pending_clear(&mut self) {
        if let Some(id) = self.pending_clear.take() {
            if self.timers.cancel(id) {
                tracing::debug!("cancelled error auto-clear");
            }
        }
    }

    fn sync_context(&mut self) -> bool {
        self.context.update(self.buffer.text(), self.buffer.state())
    }
}
