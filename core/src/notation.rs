//! Infix expression → typeset markup.
//!
//! The transformer reshapes the raw text of a (possibly partial) expression
//! into LaTeX-style markup for display. It does not parse: every stage is a
//! whole-string pattern substitution, applied in a fixed order.
//!
//! Pipeline:
//! 1. empty / `"0"` guard
//! 2. fractions: `a/b` → `\frac{a}{b}`, up to [`FRACTION_PASSES`] passes
//! 3. named functions: `sqrt(x)`, `sin(x)`, `abs(x)`, ...
//! 4. exponents: `^12` → `^{12}`, `^(a+b)` → `^{a+b}`
//! 5. glyphs: `×`, `÷`, `π`, `pi`, `∞`, `≤`, `≥`, `≠`
//!
//! Factorials (`5!`, `n!`) are already valid markup and need no stage.
//!
//! Known bounds of the substitution approach:
//! - nesting beyond [`FRACTION_PASSES`] levels of fractions is not fully
//!   converted;
//! - a function call or `^(...)` exponent whose argument contains
//!   parentheses is left as literal text;
//! - a bare `^x` is left unbraced.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

/// Markup for an empty or zero buffer.
pub const ZERO_MARKUP: &str = "0";

/// Maximum number of fraction rewrite passes.
pub const FRACTION_PASSES: usize = 3;

/// Operand of a fraction: a parenthesized group without nested parentheses,
/// a decimal literal with at most one point, or a bare identifier.
const OPERAND: &str = r"\([^()]+\)|\d+(?:\.\d*)?|\.\d+|[a-zA-Z]+";

static FRACTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"({OPERAND})\s*/\s*({OPERAND})")).expect("fraction pattern")
});

// Longer names come first so that `asin(` is never read as `a` + `sin(`.
static FUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(asin|acos|atan|sqrt|sin|cos|tan|log|ln|abs|exp)\(([^()]+)\)")
        .expect("function pattern")
});

static POWER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\^(?:(\d+)|\(([^()]+)\))").expect("power pattern"));

static PI_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bpi\b").expect("pi pattern"));

/// Single-character glyphs and their markup.
///
/// Macros carry a trailing space so that a following letter cannot extend
/// the control word (`πr` must not become `\pir`).
const GLYPHS: &[(char, &str)] = &[
    ('×', r" \times "),
    ('*', r" \times "),
    ('÷', r" \div "),
    ('π', r"\pi "),
    ('∞', r"\infty "),
    ('≤', r"\leq "),
    ('≥', r"\geq "),
    ('≠', r"\neq "),
];

/// A numerator/denominator pair found by the fraction pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FractionSpan<'a> {
    pub numerator: &'a str,
    pub denominator: &'a str,
}

impl<'a> FractionSpan<'a> {
    fn from_captures(caps: &Captures<'a>) -> Option<Self> {
        Some(Self {
            numerator: caps.get(1)?.as_str(),
            denominator: caps.get(2)?.as_str(),
        })
    }

    /// Render as `\frac{..}{..}` with one layer of parentheses removed from
    /// each operand.
    pub fn to_markup(&self) -> String {
        format!(
            r"\frac{{{}}}{{{}}}",
            strip_parens(self.numerator),
            strip_parens(self.denominator)
        )
    }
}

fn strip_parens(operand: &str) -> &str {
    operand
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .filter(|inner| !inner.is_empty())
        .unwrap_or(operand)
}

/// Transform buffer text into typeset markup.
///
/// Total: any input, including malformed or partial expressions, yields a
/// non-empty string.
pub fn transform(expression: &str) -> String {
    if expression.is_empty() || expression == "0" {
        return ZERO_MARKUP.to_string();
    }

    let markup = convert_fractions(expression);
    let markup = wrap_functions(&markup);
    let markup = brace_powers(&markup);
    let markup = substitute_glyphs(&markup);

    tracing::trace!(input = expression, output = %markup, "transformed expression");
    markup
}

/// Rewrite `a/b` spans as fractions, repeating until nothing changes or
/// [`FRACTION_PASSES`] passes have run.
pub fn convert_fractions(expression: &str) -> String {
    let mut current = expression.to_string();
    for _ in 0..FRACTION_PASSES {
        let next = FRACTION
            .replace_all(&current, |caps: &Captures| {
                match FractionSpan::from_captures(caps) {
                    Some(span) => span.to_markup(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned();
        if next == current {
            break;
        }
        current = next;
    }
    current
}

/// Wrap `name(arg)` calls in their markup form.
pub fn wrap_functions(expression: &str) -> String {
    FUNCTION
        .replace_all(expression, |caps: &Captures| {
            let arg = &caps[2];
            match &caps[1] {
                "sqrt" => format!(r"\sqrt{{{arg}}}"),
                "sin" => format!(r"\sin({arg})"),
                "cos" => format!(r"\cos({arg})"),
                "tan" => format!(r"\tan({arg})"),
                "asin" => format!(r"\arcsin({arg})"),
                "acos" => format!(r"\arccos({arg})"),
                "atan" => format!(r"\arctan({arg})"),
                "log" => format!(r"\log({arg})"),
                "ln" => format!(r"\ln({arg})"),
                "abs" => format!("|{arg}|"),
                "exp" => format!("e^{{{arg}}}"),
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Brace numeric and parenthesized exponents.
pub fn brace_powers(expression: &str) -> String {
    POWER
        .replace_all(expression, |caps: &Captures| {
            let exponent = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            format!("^{{{exponent}}}")
        })
        .into_owned()
}

/// Replace operator and symbol glyphs with their markup.
pub fn substitute_glyphs(expression: &str) -> String {
    // The word form goes first: `π` expands to `\pi`, which must not be
    // seen again by the word pattern.
    let mut out = PI_WORD.replace_all(expression, r"\pi").into_owned();
    for (glyph, markup) in GLYPHS {
        if out.contains(*glyph) {
            out = out.replace(*glyph, markup);
        }
    }
    out
}

/// How evaluation results are typeset.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ResultFormat {
    /// Magnitudes above this switch to scientific notation.
    pub scientific_above: f64,
    /// Non-zero magnitudes below this switch to scientific notation.
    pub scientific_below: f64,
    /// Mantissa decimals in scientific notation.
    pub precision: usize,
}

impl Default for ResultFormat {
    fn default() -> Self {
        Self {
            scientific_above: 1e6,
            scientific_below: 1e-6,
            precision: 2,
        }
    }
}

/// Typeset a numeric result, using `m \times 10^{e}` for very large or very
/// small magnitudes.
pub fn result_to_markup(value: f64, format: &ResultFormat) -> String {
    if value.is_nan() {
        return r"\text{NaN}".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { r"\infty" } else { r"-\infty" }.to_string();
    }
    if value == 0.0 {
        return ZERO_MARKUP.to_string();
    }

    let magnitude = value.abs();
    if magnitude > format.scientific_above || magnitude < format.scientific_below {
        let exponent = magnitude.log10().floor() as i32;
        let mantissa = value / 10f64.powi(exponent);
        return format!(
            r"{:.*} \times 10^{{{}}}",
            format.precision, mantissa, exponent
        );
    }

    value.to_string()
}
