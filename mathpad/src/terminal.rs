//! Terminal rendering and key-line parsing.

use mathpad_core::{EditEvent, RenderOptions, RenderSink};
use std::io::Write;

/// Render sink that prints markup as text.
///
/// A terminal cannot typeset, but it still refuses markup a typesetter would
/// reject (unbalanced braces, a dangling `\`), so the raw-text fallback
/// behaves as it would in a graphical front-end.
pub struct TerminalSink<W: Write> {
    out: W,
}

impl<W: Write> TerminalSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl TerminalSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> RenderSink for TerminalSink<W> {
    fn render(&mut self, markup: &str, options: RenderOptions) -> anyhow::Result<()> {
        check_markup(markup)?;
        if options.display_mode {
            writeln!(self.out, "    {markup}")?;
        } else {
            writeln!(self.out, "{markup}")?;
        }
        Ok(())
    }

    fn render_text(&mut self, text: &str) {
        if let Err(err) = writeln!(self.out, "{text}") {
            tracing::warn!(error = %err, "failed to write to terminal");
        }
    }
}

/// Reject markup a typesetter could not parse.
pub fn check_markup(markup: &str) -> anyhow::Result<()> {
    let mut depth: usize = 0;
    let mut escaped = false;
    for ch in markup.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '{' => depth += 1,
            '}' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| anyhow::anyhow!("unexpected '}}' in {markup:?}"))?;
            }
            _ => {}
        }
    }
    if escaped {
        anyhow::bail!("dangling '\\' in {markup:?}");
    }
    if depth != 0 {
        anyhow::bail!("{depth} unclosed '{{' in {markup:?}");
    }
    Ok(())
}

/// Parse one line of keypad input.
///
/// Whitespace-separated words that are keypad labels (`AC`, `⌫`, `±`) map
/// directly; any other word is read character by character.
pub fn parse_line(line: &str) -> anyhow::Result<Vec<EditEvent>> {
    let mut events = Vec::new();
    for word in line.split_whitespace() {
        if let Some(event) = EditEvent::from_label(word) {
            events.push(event);
            continue;
        }
        for ch in word.chars() {
            let event = EditEvent::from_char(ch)
                .ok_or_else(|| anyhow::anyhow!("unknown key {ch:?}"))?;
            events.push(event);
        }
    }
    Ok(events)
}
