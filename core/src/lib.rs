//! mathpad-core
//!
//! Expression editing and typesetting core shared by mathpad front-ends.
//!
//! Public API:
//! - `ExpressionBuffer` - Edit-buffer state machine (adjacency rules, sign
//!   toggle, error display)
//! - `transform` - Infix expression text → typeset markup
//! - `CalcEngine` - Session object tying buffer, evaluator, timers and
//!   display together
//! - `Evaluator` / `EvalBackend` - Seam to the external evaluation engine
//! - `DisplayContext` / `RenderSink` - What the front-end reads and renders
//! - `Config` - Configuration
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod notation;
pub use notation::{result_to_markup, transform, FractionSpan, ResultFormat};

pub mod events;
pub use events::{EditEvent, Operator};

pub mod evaluator;
pub use evaluator::{
    EvalBackend, EvalCall, EvalRequest, EvalResponse, EvalResult, EvaluationOutcome, Evaluator,
    InlineEvaluator, ResultValue, ThreadedEvaluator,
};

pub mod buffer;
pub use buffer::{BufferState, EditResult, ExpressionBuffer, ResponseResult, ERROR_SENTINEL};

pub mod timer;
pub use timer::{Clock, ManualClock, SystemClock, TaskId, TimerQueue};

pub mod context;
pub use context::{DisplayContext, Presented, RenderOptions, RenderSink};

pub mod engine;
pub use engine::{CalcEngine, EventResult};

/// Core configuration.
///
/// Front-end specific options (evaluator endpoint, timeouts) belong in the
/// front-end crate's config, which flattens this one.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// How long the error sentinel stays before the buffer clears itself (ms)
    pub error_clear_delay_ms: u64,

    /// Render markup in display (block) mode rather than inline
    pub display_mode: bool,

    /// Typesetting of numeric evaluation results
    pub result_format: ResultFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            error_clear_delay_ms: 2000,
            display_mode: true,
            result_format: ResultFormat::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<std::path::Path>>(
        path: P,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize configuration to TOML string.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    // ========== Error Display ==========

    /// Delay before the error sentinel clears itself.
    pub fn error_clear_delay(&self) -> Duration {
        Duration::from_millis(self.error_clear_delay_ms)
    }

    pub fn set_error_clear_delay_ms(&mut self, delay_ms: u64) {
        self.error_clear_delay_ms = delay_ms;
    }

    // ========== Rendering ==========

    /// Toggle display/inline rendering.
    pub fn toggle_display_mode(&mut self) {
        self.display_mode = !self.display_mode;
    }

    pub fn set_display_mode(&mut self, enabled: bool) {
        self.display_mode = enabled;
    }

    pub fn is_display_mode(&self) -> bool {
        self.display_mode
    }

    /// Set the mantissa precision used for scientific results.
    pub fn set_result_precision(&mut self, precision: usize) {
        self.result_format.precision = precision;
    }

    /// Set the magnitudes outside of which results switch to scientific
    /// notation. Ignored unless `below < above`.
    pub fn set_scientific_range(&mut self, below: f64, above: f64) {
        if below < above {
            self.result_format.scientific_below = below;
            self.result_format.scientific_above = above;
        }
    }
}

/// Utility helpers.
pub mod utils {
    /// Whether `ch` belongs to the operator-glyph class used by the buffer's
    /// adjacency rule.
    pub fn is_operator_glyph(ch: char) -> bool {
        matches!(ch, '+' | '-' | '−' | '×' | '÷' | '%')
    }

    /// Rewrite display glyphs into the evaluator's operator tokens
    /// (`×` → `*`, `÷` → `/`, `−` → `-`).
    pub fn normalize_for_evaluator(s: &str) -> String {
        s.chars()
            .map(|ch| match ch {
                '×' => '*',
                '÷' => '/',
                '−' => '-',
                _ => ch,
            })
            .collect()
    }
}
