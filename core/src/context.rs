//! Display context for front-end communication.
//!
//! The `DisplayContext` struct is a plain data container with public fields.
//! After an event or a poll, the front-end reads these fields (or calls
//! [`DisplayContext::present`]) to update what the user sees.
//!
//! The engine never pushes into a renderer; the display owner pulls.

use crate::buffer::BufferState;
use crate::notation::ResultFormat;

/// Options passed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Block (display) layout rather than inline
    pub display_mode: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { display_mode: true }
    }
}

/// Something that can typeset markup, e.g. a math renderer.
pub trait RenderSink {
    /// Render typeset markup. May fail on markup the renderer cannot handle.
    fn render(&mut self, markup: &str, options: RenderOptions) -> anyhow::Result<()>;

    /// Show plain text. Used as the fallback when `render` fails.
    fn render_text(&mut self, text: &str);
}

/// How the context ended up being shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presented {
    Markup,
    RawText,
}

/// Display state for the front-end.
///
/// # Fields
///
/// - `text`: raw buffer text (e.g. `"8÷2"`, or `"Error"`)
/// - `markup`: transformer output for `text`, never empty
/// - `state`: buffer state, so the front-end can style the error display
/// - `revision`: bumped whenever `text` or `state` changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayContext {
    /// Raw buffer text
    pub text: String,

    /// Typeset markup for `text`
    pub markup: String,

    /// Buffer state at the last refresh
    pub state: BufferState,

    /// Change counter for cheap "did anything change" checks
    pub revision: u64,
}

impl Default for DisplayContext {
    fn default() -> Self {
        Self {
            text: String::new(),
            markup: crate::notation::ZERO_MARKUP.to_string(),
            state: BufferState::Editing,
            revision: 0,
        }
    }
}

impl DisplayContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refresh from buffer contents. Returns true if anything changed.
    pub fn update(&mut self, text: &str, state: BufferState) -> bool {
        if self.text == text && self.state == state {
            return false;
        }
        self.text = text.to_string();
        self.markup = crate::notation::transform(text);
        self.state = state;
        self.revision += 1;
        true
    }

    /// Show an evaluation result. Large and tiny magnitudes are written in
    /// scientific form instead of going through the transformer.
    ///
    /// The result markup lasts until the text changes: the next edit (even a
    /// sign toggle) goes back through [`DisplayContext::update`], which shows
    /// the transformed raw text, e.g. `-1e300` rather than `-1.00 \times 10^{300}`.
    pub fn show_result(&mut self, text: &str, value: f64, format: &ResultFormat) -> bool {
        let markup = crate::notation::result_to_markup(value, format);
        if self.text == text && self.markup == markup && self.state == BufferState::Editing {
            return false;
        }
        self.text = text.to_string();
        self.markup = markup;
        self.state = BufferState::Editing;
        self.revision += 1;
        true
    }

    pub fn is_error(&self) -> bool {
        self.state == BufferState::ErrorDisplay
    }

    /// Hand the context to a render sink.
    ///
    /// Render failures are caught here: the raw text is shown instead. An
    /// empty buffer still displays as `0`.
    pub fn present<S: RenderSink + ?Sized>(&self, sink: &mut S, options: RenderOptions) -> Presented {
        match sink.render(&self.markup, options) {
            Ok(()) => Presented::Markup,
            Err(err) => {
                tracing::warn!(markup = %self.markup, error = %err, "render failed, showing raw text");
                let raw = if self.text.is_empty() {
                    crate::notation::ZERO_MARKUP
                } else {
                    self.text.as_str()
                };
                sink.render_text(raw);
                Presented::RawText
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        fail: bool,
        rendered: Vec<(String, bool)>,
        raw: Vec<String>,
    }

    impl RenderSink for RecordingSink {
        fn render(&mut self, markup: &str, options: RenderOptions) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("parse error in {markup}");
            }
            self.rendered.push((markup.to_string(), options.display_mode));
            Ok(())
        }

        fn render_text(&mut self, text: &str) {
            self.raw.push(text.to_string());
        }
    }

    #[test]
    fn test_default_shows_zero() {
        let ctx = DisplayContext::new();
        assert_eq!(ctx.markup, "0");
        assert!(ctx.text.is_empty());
        assert_eq!(ctx.revision, 0);
    }

    #[test]
    fn test_update_tracks_revision() {
        let mut ctx = DisplayContext::new();
        assert!(ctx.update("1/2", BufferState::Editing));
        assert_eq!(ctx.markup, r"\frac{1}{2}");
        assert_eq!(ctx.revision, 1);

        assert!(!ctx.update("1/2", BufferState::Editing));
        assert_eq!(ctx.revision, 1);

        assert!(ctx.update("Error", BufferState::ErrorDisplay));
        assert!(ctx.is_error());
        assert_eq!(ctx.revision, 2);
    }

    #[test]
    fn test_show_result_uses_scientific_form() {
        let mut ctx = DisplayContext::new();
        ctx.update("5000000×3", BufferState::Editing);
        assert!(ctx.show_result("15000000", 15_000_000.0, &ResultFormat::default()));
        assert_eq!(ctx.text, "15000000");
        assert_eq!(ctx.markup, r"1.50 \times 10^{7}");

        // Same text again keeps the result markup.
        assert!(!ctx.update("15000000", BufferState::Editing));
        assert_eq!(ctx.markup, r"1.50 \times 10^{7}");
    }

    #[test]
    fn test_present_markup() {
        let mut ctx = DisplayContext::new();
        ctx.update("2×3", BufferState::Editing);
        let mut sink = RecordingSink::default();

        let shown = ctx.present(&mut sink, RenderOptions { display_mode: false });
        assert_eq!(shown, Presented::Markup);
        assert_eq!(sink.rendered, vec![(r"2 \times 3".to_string(), false)]);
        assert!(sink.raw.is_empty());
    }

    #[test]
    fn test_present_falls_back_to_raw_text() {
        let mut ctx = DisplayContext::new();
        ctx.update("sqrt(", BufferState::Editing);
        let mut sink = RecordingSink {
            fail: true,
            ..Default::default()
        };

        let shown = ctx.present(&mut sink, RenderOptions::default());
        assert_eq!(shown, Presented::RawText);
        assert_eq!(sink.raw, vec!["sqrt(".to_string()]);
    }

    #[test]
    fn test_fallback_for_empty_buffer_is_zero() {
        let ctx = DisplayContext::new();
        let mut sink = RecordingSink {
            fail: true,
            ..Default::default()
        };
        ctx.present(&mut sink, RenderOptions::default());
        assert_eq!(sink.raw, vec!["0".to_string()]);
    }
}
