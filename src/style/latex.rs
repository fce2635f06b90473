//! LaTeX-aware emphasis wrapping.
//!
//! With LaTeX text rendering on, font weight/style flags cannot be applied by
//! the renderer, so plain text is wrapped in `\textbf{}` / `\textit{}` instead.
//! Text that already carries markup is left alone.

use once_cell::sync::Lazy;
use regex::Regex;

static COMMAND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\[A-Za-z@]+").expect("static regex"));

/// True when `text` has no LaTeX command, no brace markup and is not `$...$`.
pub fn is_plain(text: &str) -> bool {
    let t = text.trim();
    if COMMAND.is_match(t) || t.contains('{') || t.contains('}') {
        return false;
    }
    !(t.len() >= 2 && t.starts_with('$') && t.ends_with('$'))
}

/// Weight names that count as bold.
pub fn is_bold_weight(weight: &str) -> bool {
    match weight.trim().to_ascii_lowercase().as_str() {
        "bold" | "bolder" | "heavy" | "black" | "extra bold" | "semibold" | "demibold" => true,
        other => other.parse::<u32>().map(|w| w >= 600).unwrap_or(false),
    }
}

/// Style names that count as italic.
pub fn is_italic_style(style: &str) -> bool {
    matches!(
        style.trim().to_ascii_lowercase().as_str(),
        "italic" | "oblique"
    )
}

/// Wrap plain text in LaTeX emphasis commands when `use_tex` is on.
pub fn wrap_emphasis(text: &str, bold: bool, italic: bool, use_tex: bool) -> String {
    if !use_tex || text.is_empty() || !is_plain(text) {
        return text.to_string();
    }
    let mut out = text.to_string();
    if italic {
        out = format!("\\textit{{{}}}", out);
    }
    if bold {
        out = format!("\\textbf{{{}}}", out);
    }
    out
}

/// Wrap a formatted tick label in math mode, optionally bold/italic.
pub fn wrap_math(text: &str, wrap: bool, bold: bool, italic: bool) -> String {
    if !(wrap || bold || italic) {
        return text.to_string();
    }
    let inner = text
        .strip_prefix('$')
        .and_then(|t| t.strip_suffix('$'))
        .unwrap_or(text);
    let mut out = inner.to_string();
    if italic {
        out = format!("\\mathit{{{}}}", out);
    }
    if bold {
        out = format!("\\mathbf{{{}}}", out);
    }
    format!("${}$", out)
}

static SUPERSCRIPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\^\{([^{}]*)\}|\^([0-9A-Za-z+-])").expect("static regex"));
static SUBSCRIPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_\{([^{}]*)\}").expect("static regex"));

fn symbol(command: &str) -> Option<&'static str> {
    Some(match command {
        "times" => "×",
        "cdot" => "·",
        "pm" => "±",
        "circ" | "degree" => "°",
        "alpha" => "α",
        "beta" => "β",
        "gamma" => "γ",
        "delta" => "δ",
        "epsilon" => "ε",
        "theta" => "θ",
        "lambda" => "λ",
        "mu" => "µ",
        "pi" => "π",
        "sigma" => "σ",
        "tau" => "τ",
        "omega" => "ω",
        "Delta" => "Δ",
        "Sigma" => "Σ",
        "Omega" => "Ω",
        "infty" => "∞",
        "leq" | "le" => "≤",
        "geq" | "ge" => "≥",
        _ => return None,
    })
}

fn superscript(text: &str) -> Option<String> {
    text.chars()
        .map(|c| {
            Some(match c {
                '0' => '⁰',
                '1' => '¹',
                '2' => '²',
                '3' => '³',
                '4' => '⁴',
                '5' => '⁵',
                '6' => '⁶',
                '7' => '⁷',
                '8' => '⁸',
                '9' => '⁹',
                '-' => '⁻',
                '+' => '⁺',
                'n' => 'ⁿ',
                _ => return None,
            })
        })
        .collect()
}

/// Best-effort plain rendering of LaTeX-flavored text for backends without TeX.
///
/// Emphasis and font commands are dropped (the look carries weight and
/// style), common symbols become their Unicode characters and simple
/// superscripts are raised.
pub fn to_display(text: &str) -> String {
    if !text.contains('\\') && !text.contains('{') && text.matches('$').count() < 2 {
        return text.to_string();
    }
    let out = text.replace(r"\%", "%").replace(r"\$", "\u{0}").replace(r"\,", " ");
    let out = COMMAND.replace_all(&out, |caps: &regex::Captures| {
        let name = &caps[0][1..];
        symbol(name).unwrap_or("").to_string()
    });
    let out = SUPERSCRIPT.replace_all(&out, |caps: &regex::Captures| {
        let body = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        superscript(body).unwrap_or_else(|| format!("^{}", body))
    });
    let out = SUBSCRIPT.replace_all(&out, "$1");
    out.chars()
        .filter(|c| !matches!(c, '{' | '}' | '$'))
        .map(|c| if c == '\u{0}' { '$' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_detection() {
        assert!(is_plain("Time (s)"));
        assert!(is_plain("cost in $"));
        assert!(!is_plain(r"\alpha decay"));
        assert!(!is_plain("$x^2$"));
        assert!(!is_plain(r"{\bf x}"));
    }

    #[test]
    fn emphasis_only_with_tex() {
        assert_eq!(wrap_emphasis("Title", true, false, true), r"\textbf{Title}");
        assert_eq!(wrap_emphasis("Title", true, true, true), r"\textbf{\textit{Title}}");
        assert_eq!(wrap_emphasis("Title", true, false, false), "Title");
    }

    #[test]
    fn markup_passes_through() {
        assert_eq!(wrap_emphasis("$x_1$", true, true, true), "$x_1$");
        assert_eq!(wrap_emphasis(r"\mu m", true, false, true), r"\mu m");
    }

    #[test]
    fn weights_and_styles() {
        assert!(is_bold_weight("bold"));
        assert!(is_bold_weight("700"));
        assert!(!is_bold_weight("normal"));
        assert!(!is_bold_weight("400"));
        assert!(is_italic_style("oblique"));
        assert!(!is_italic_style("normal"));
    }

    #[test]
    fn math_wrapping() {
        assert_eq!(wrap_math("1.5", false, false, false), "1.5");
        assert_eq!(wrap_math("1.5", true, false, false), "$1.5$");
        assert_eq!(wrap_math("1.5", false, true, false), r"$\mathbf{1.5}$");
        assert_eq!(wrap_math(r"$10^{3}$", true, false, true), r"$\mathit{10^{3}}$");
    }

    #[test]
    fn display_text_drops_markup() {
        assert_eq!(to_display("Time (s)"), "Time (s)");
        assert_eq!(to_display("cost in $"), "cost in $");
        assert_eq!(to_display(r"\textbf{\textit{Title}}"), "Title");
        assert_eq!(to_display(r"$1.5\times10^{3}$"), "1.5×10³");
        assert_eq!(to_display(r"$\mathbf{10^{-2}}$"), "10⁻²");
        assert_eq!(to_display(r"50\%"), "50%");
        assert_eq!(to_display(r"$\mu$s"), "µs");
        assert_eq!(to_display(r"$x_{max}$"), "xmax");
    }
}
