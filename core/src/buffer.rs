//! Expression buffer state machine.
//!
//! The buffer holds the raw text of the expression being composed (e.g.
//! `"8÷2"`) and enforces the edit rules: no two adjacent operator glyphs,
//! sign toggling on the leading minus, and the error sentinel shown after a
//! failed evaluation. It never talks to the evaluator or the renderer itself:
//! commits come out as [`EvalRequest`]s and responses are fed back in.
//!
//! Every change bumps [`ExpressionBuffer::version`]. Deferred work (the error
//! auto-clear) and outstanding evaluation requests are keyed to it, so any
//! later edit supersedes them.

use crate::evaluator::{EvalRequest, EvalResponse, EvaluationOutcome};
use crate::events::{EditEvent, Operator};
use crate::utils;

/// Text shown in place of the expression after a failed evaluation.
pub const ERROR_SENTINEL: &str = "Error";

/// Current state of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferState {
    /// Normal editing
    #[default]
    Editing,
    /// Showing [`ERROR_SENTINEL`] until cleared, edited or timed out
    ErrorDisplay,
}

/// Result of applying an edit event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditResult {
    /// Buffer text or state changed
    Changed,
    /// Valid event with nothing to do (e.g. backspace on empty buffer)
    Unchanged,
    /// Event refused by the adjacency rules
    Rejected,
    /// Buffer should be sent to the evaluator
    Dispatch(EvalRequest),
}

/// Result of feeding an evaluation response back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseResult {
    /// Result text now fills the buffer
    Applied,
    /// Buffer shows the error sentinel; schedule the auto-clear for `version`
    Failed { version: u64, message: String },
    /// Response was superseded and ignored
    Stale,
}

/// Buffer text plus the editing state machine.
#[derive(Debug, Clone, Default)]
pub struct ExpressionBuffer {
    text: String,
    state: BufferState,
    version: u64,
    generation: u64,
    in_flight: Option<u64>,
}

impl ExpressionBuffer {
    /// Create an empty buffer in the editing state.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn state(&self) -> BufferState {
        self.state
    }

    pub fn is_error(&self) -> bool {
        self.state == BufferState::ErrorDisplay
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Number of characters (not bytes).
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    /// Change counter, bumped on every modification.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Generation of the request whose response is still awaited.
    pub fn in_flight(&self) -> Option<u64> {
        self.in_flight
    }

    /// Apply one edit event.
    pub fn apply(&mut self, event: EditEvent) -> EditResult {
        match event {
            EditEvent::Clear => self.apply_clear(),
            EditEvent::Digit(d) => self.apply_digit(d),
            EditEvent::DecimalPoint => self.apply_decimal(),
            EditEvent::Operator(op) => self.apply_operator(op),
            EditEvent::Backspace => self.apply_backspace(),
            EditEvent::SignToggle => self.apply_sign_toggle(),
            EditEvent::Commit => self.apply_commit(),
        }
    }

    /// Empty the buffer. Valid in any state.
    pub fn apply_clear(&mut self) -> EditResult {
        if self.text.is_empty() && !self.is_error() {
            return EditResult::Unchanged;
        }
        self.text.clear();
        self.state = BufferState::Editing;
        self.touch();
        EditResult::Changed
    }

    /// Append a digit (0-9).
    pub fn apply_digit(&mut self, digit: u8) -> EditResult {
        let Some(ch) = char::from_digit(u32::from(digit), 10) else {
            tracing::debug!(digit, "rejected digit out of range");
            return EditResult::Rejected;
        };
        self.edit(|text| {
            text.push(ch);
            EditResult::Changed
        })
    }

    /// Append a decimal point. Repeated points in one number are allowed
    /// here; the evaluator reports them.
    pub fn apply_decimal(&mut self) -> EditResult {
        self.edit(|text| {
            text.push('.');
            EditResult::Changed
        })
    }

    /// Append an operator glyph unless the buffer is empty or already ends
    /// with one.
    pub fn apply_operator(&mut self, op: Operator) -> EditResult {
        self.edit(|text| {
            let ends_with_operator = text.chars().last().is_some_and(utils::is_operator_glyph);
            if text.is_empty() || ends_with_operator {
                tracing::debug!(operator = %op, buffer = %text, "rejected operator");
                return EditResult::Rejected;
            }
            text.push(op.glyph());
            EditResult::Changed
        })
    }

    /// Remove the last character.
    pub fn apply_backspace(&mut self) -> EditResult {
        self.edit(|text| match text.pop() {
            Some(_) => EditResult::Changed,
            None => EditResult::Unchanged,
        })
    }

    /// Strip a leading `-`, or prepend one to a non-empty buffer.
    pub fn apply_sign_toggle(&mut self) -> EditResult {
        self.edit(|text| {
            if let Some(rest) = text.strip_prefix('-') {
                *text = rest.to_string();
                EditResult::Changed
            } else if !text.is_empty() {
                text.insert(0, '-');
                EditResult::Changed
            } else {
                EditResult::Unchanged
            }
        })
    }

    /// Produce an evaluation request for the current text.
    ///
    /// Nothing is dispatched for an empty buffer. While the error sentinel is
    /// showing, commit only discards it.
    pub fn apply_commit(&mut self) -> EditResult {
        if self.leave_error_display() {
            self.touch();
            return EditResult::Changed;
        }
        if self.text.is_empty() {
            return EditResult::Unchanged;
        }

        self.generation += 1;
        self.in_flight = Some(self.generation);
        let expression = utils::normalize_for_evaluator(&self.text);
        tracing::debug!(generation = self.generation, %expression, "dispatching evaluation");
        EditResult::Dispatch(EvalRequest {
            generation: self.generation,
            expression,
        })
    }

    /// Feed back the response to a dispatched request.
    ///
    /// Only the response to the latest request, with no edit since, is
    /// applied.
    pub fn apply_response(&mut self, response: EvalResponse) -> ResponseResult {
        if self.in_flight != Some(response.generation) {
            tracing::debug!(
                generation = response.generation,
                awaited = ?self.in_flight,
                "discarding stale evaluation response"
            );
            return ResponseResult::Stale;
        }
        self.in_flight = None;
        self.version += 1;

        match response.outcome {
            EvaluationOutcome::Success(result) => {
                self.text = result;
                self.state = BufferState::Editing;
                ResponseResult::Applied
            }
            EvaluationOutcome::Failure(message) => {
                tracing::debug!(%message, "evaluation failed");
                self.text = ERROR_SENTINEL.to_string();
                self.state = BufferState::ErrorDisplay;
                ResponseResult::Failed {
                    version: self.version,
                    message,
                }
            }
        }
    }

    /// Timed recovery from the error state.
    ///
    /// Only acts if the buffer is still showing the sentinel produced at
    /// `version`; returns whether it did.
    pub fn expire_error(&mut self, version: u64) -> bool {
        if !self.is_error() || self.version != version {
            return false;
        }
        self.text.clear();
        self.state = BufferState::Editing;
        self.version += 1;
        true
    }

    /// Drop all content and forget any outstanding request.
    pub fn reset(&mut self) {
        self.text.clear();
        self.state = BufferState::Editing;
        self.touch();
    }

    /// Run a text edit, discarding the error sentinel first.
    fn edit(&mut self, apply: impl FnOnce(&mut String) -> EditResult) -> EditResult {
        let discarded = self.leave_error_display();
        let result = apply(&mut self.text);
        if discarded || result == EditResult::Changed {
            self.touch();
            EditResult::Changed
        } else {
            result
        }
    }

    fn leave_error_display(&mut self) -> bool {
        if !self.is_error() {
            return false;
        }
        self.text.clear();
        self.state = BufferState::Editing;
        true
    }

    /// Record a change. Supersedes any outstanding request.
    fn touch(&mut self) {
        self.version += 1;
        self.in_flight = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_with(keys: &str) -> ExpressionBuffer {
        let mut buffer = ExpressionBuffer::new();
        for ch in keys.chars() {
            let event = EditEvent::from_char(ch).expect("test key");
            buffer.apply(event);
        }
        buffer
    }

    fn dispatch(buffer: &mut ExpressionBuffer) -> EvalRequest {
        match buffer.apply_commit() {
            EditResult::Dispatch(request) => request,
            other => panic!("expected dispatch, got {other:?}"),
        }
    }

    #[test]
    fn test_new_buffer() {
        let buffer = ExpressionBuffer::new();
        assert!(buffer.is_empty());
        assert_eq!(buffer.state(), BufferState::Editing);
        assert_eq!(buffer.version(), 0);
    }

    #[test]
    fn test_digits_and_decimal() {
        let mut buffer = ExpressionBuffer::new();
        assert_eq!(buffer.apply_digit(1), EditResult::Changed);
        assert_eq!(buffer.apply_decimal(), EditResult::Changed);
        assert_eq!(buffer.apply_decimal(), EditResult::Changed);
        assert_eq!(buffer.apply_digit(5), EditResult::Changed);
        assert_eq!(buffer.text(), "1..5");
        assert_eq!(buffer.apply_digit(10), EditResult::Rejected);
        assert_eq!(buffer.text(), "1..5");
    }

    #[test]
    fn test_operator_rejected_on_empty() {
        let mut buffer = ExpressionBuffer::new();
        assert_eq!(buffer.apply_operator(Operator::Add), EditResult::Rejected);
        assert_eq!(buffer.apply_operator(Operator::Subtract), EditResult::Rejected);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_operator_adjacency() {
        let mut buffer = buffer_with("5+");
        let version = buffer.version();
        assert_eq!(buffer.apply_operator(Operator::Multiply), EditResult::Rejected);
        assert_eq!(buffer.text(), "5+");
        assert_eq!(buffer.version(), version);

        for op in [Operator::Add, Operator::Divide, Operator::Percent, Operator::Subtract] {
            assert_eq!(buffer.apply_operator(op), EditResult::Rejected);
        }
        buffer.apply_digit(2);
        assert_eq!(buffer.apply_operator(Operator::Multiply), EditResult::Changed);
        assert_eq!(buffer.text(), "5+2×");
    }

    #[test]
    fn test_operator_after_lone_sign_rejected() {
        let mut buffer = buffer_with("5");
        buffer.apply_sign_toggle();
        buffer.apply_backspace();
        assert_eq!(buffer.text(), "-");
        assert_eq!(buffer.apply_operator(Operator::Add), EditResult::Rejected);
    }

    #[test]
    fn test_backspace() {
        let mut buffer = buffer_with("12");
        assert_eq!(buffer.apply_backspace(), EditResult::Changed);
        assert_eq!(buffer.text(), "1");
        buffer.apply_backspace();
        assert_eq!(buffer.apply_backspace(), EditResult::Unchanged);
        assert!(buffer.is_empty());

        let mut buffer = buffer_with("3×");
        buffer.apply_backspace();
        assert_eq!(buffer.text(), "3");
    }

    #[test]
    fn test_sign_toggle_involutive() {
        let mut buffer = buffer_with("5");
        buffer.apply_sign_toggle();
        assert_eq!(buffer.text(), "-5");
        buffer.apply_sign_toggle();
        assert_eq!(buffer.text(), "5");

        let mut buffer = buffer_with("5+3");
        buffer.apply_sign_toggle();
        assert_eq!(buffer.text(), "-5+3");
    }

    #[test]
    fn test_sign_toggle_on_empty() {
        let mut buffer = ExpressionBuffer::new();
        assert_eq!(buffer.apply_sign_toggle(), EditResult::Unchanged);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut buffer = buffer_with("7×8");
        assert_eq!(buffer.apply_clear(), EditResult::Changed);
        assert!(buffer.is_empty());
        assert_eq!(buffer.apply_clear(), EditResult::Unchanged);
    }

    #[test]
    fn test_commit_empty_dispatches_nothing() {
        let mut buffer = ExpressionBuffer::new();
        assert_eq!(buffer.apply_commit(), EditResult::Unchanged);
        assert!(buffer.is_empty());
        assert_eq!(buffer.in_flight(), None);
    }

    #[test]
    fn test_commit_normalizes_glyphs() {
        let mut buffer = buffer_with("8÷2×3");
        let request = dispatch(&mut buffer);
        assert_eq!(request.expression, "8/2*3");
        assert_eq!(buffer.text(), "8÷2×3");
        assert_eq!(buffer.in_flight(), Some(request.generation));
    }

    #[test]
    fn test_success_replaces_buffer() {
        let mut buffer = buffer_with("8÷2");
        let request = dispatch(&mut buffer);
        let result =
            buffer.apply_response(request.respond(EvaluationOutcome::Success("4".into())));
        assert_eq!(result, ResponseResult::Applied);
        assert_eq!(buffer.text(), "4");
        assert_eq!(buffer.state(), BufferState::Editing);
        assert_eq!(buffer.in_flight(), None);
    }

    #[test]
    fn test_failure_shows_sentinel() {
        let mut buffer = buffer_with("1÷0");
        let request = dispatch(&mut buffer);
        let result = buffer
            .apply_response(request.respond(EvaluationOutcome::Failure("div by zero".into())));
        match result {
            ResponseResult::Failed { version, message } => {
                assert_eq!(version, buffer.version());
                assert_eq!(message, "div by zero");
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(buffer.text(), ERROR_SENTINEL);
        assert!(buffer.is_error());
    }

    #[test]
    fn test_expire_error_only_at_matching_version() {
        let mut buffer = buffer_with("1÷0");
        let request = dispatch(&mut buffer);
        let ResponseResult::Failed { version, .. } =
            buffer.apply_response(request.respond(EvaluationOutcome::Failure("x".into())))
        else {
            panic!("expected failure");
        };

        assert!(!buffer.expire_error(version - 1));
        assert!(buffer.expire_error(version));
        assert!(buffer.is_empty());
        assert_eq!(buffer.state(), BufferState::Editing);
        assert!(!buffer.expire_error(version));
    }

    #[test]
    fn test_edit_during_error_discards_sentinel() {
        let mut buffer = buffer_with("1÷0");
        let request = dispatch(&mut buffer);
        let ResponseResult::Failed { version, .. } =
            buffer.apply_response(request.respond(EvaluationOutcome::Failure("x".into())))
        else {
            panic!("expected failure");
        };

        assert_eq!(buffer.apply_digit(7), EditResult::Changed);
        assert_eq!(buffer.text(), "7");
        assert_eq!(buffer.state(), BufferState::Editing);
        assert!(!buffer.expire_error(version));
        assert_eq!(buffer.text(), "7");
    }

    #[test]
    fn test_rejected_edit_during_error_still_leaves_error() {
        let mut buffer = buffer_with("1÷0");
        let request = dispatch(&mut buffer);
        buffer.apply_response(request.respond(EvaluationOutcome::Failure("x".into())));

        assert_eq!(buffer.apply_operator(Operator::Add), EditResult::Changed);
        assert!(buffer.is_empty());
        assert!(!buffer.is_error());
    }

    #[test]
    fn test_commit_during_error_only_discards() {
        let mut buffer = buffer_with("1÷0");
        let request = dispatch(&mut buffer);
        buffer.apply_response(request.respond(EvaluationOutcome::Failure("x".into())));

        assert_eq!(buffer.apply_commit(), EditResult::Changed);
        assert!(buffer.is_empty());
        assert_eq!(buffer.in_flight(), None);
    }

    #[test]
    fn test_newer_commit_supersedes_older() {
        let mut buffer = buffer_with("2×3");
        let first = dispatch(&mut buffer);
        let second = dispatch(&mut buffer);
        assert!(second.generation > first.generation);

        let stale = buffer.apply_response(first.respond(EvaluationOutcome::Success("6".into())));
        assert_eq!(stale, ResponseResult::Stale);
        assert_eq!(buffer.text(), "2×3");

        let applied =
            buffer.apply_response(second.respond(EvaluationOutcome::Success("6".into())));
        assert_eq!(applied, ResponseResult::Applied);
        assert_eq!(buffer.text(), "6");
    }

    #[test]
    fn test_edit_supersedes_in_flight_request() {
        let mut buffer = buffer_with("8÷2");
        let request = dispatch(&mut buffer);
        buffer.apply_digit(5);

        let result = buffer.apply_response(request.respond(EvaluationOutcome::Success("4".into())));
        assert_eq!(result, ResponseResult::Stale);
        assert_eq!(buffer.text(), "8÷25");
    }

    #[test]
    fn test_rejected_edit_keeps_request_alive() {
        let mut buffer = buffer_with("5+");
        let request = dispatch(&mut buffer);
        assert_eq!(buffer.apply_operator(Operator::Multiply), EditResult::Rejected);
        assert_eq!(buffer.in_flight(), Some(request.generation));

        let result =
            buffer.apply_response(request.respond(EvaluationOutcome::Failure("syntax".into())));
        assert!(matches!(result, ResponseResult::Failed { .. }));
    }

    #[test]
    fn test_sign_toggle_round_trip_supersedes_request() {
        let mut buffer = buffer_with("8÷2");
        let request = dispatch(&mut buffer);
        buffer.apply_sign_toggle();
        buffer.apply_sign_toggle();
        assert_eq!(buffer.text(), "8÷2");
        assert_eq!(
            buffer.apply_response(request.respond(EvaluationOutcome::Success("4".into()))),
            ResponseResult::Stale
        );
    }

    #[test]
    fn test_unicode_length() {
        let buffer = buffer_with("8÷2");
        assert_eq!(buffer.len(), 3);
    }
}
