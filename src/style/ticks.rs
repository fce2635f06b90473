//! Tick placement and tick label formatting.
//!
//! A [`TickFormatterSpec`] is compiled once into a [`TickFormatter`]; patterns
//! and expressions are parsed up front so a malformed one is reported at load
//! time with the field path, not halfway through drawing.

use crate::style::expr::Expr;
use crate::style::latex::wrap_math;
use crate::style::units::Scale;
use chrono::format::{Item, StrftimeItems};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

closed_set! {
    /// Tick label formatting strategy.
    pub enum FormatterKind {
        Printf => "printf",
        Strfmt => "strfmt",
        Sci => "sci",
        Eng => "eng",
        Percent => "percent",
        Thousands => "thousands",
        Si => "si",
        Date => "date",
        Custom => "custom",
    }
}

impl Default for FormatterKind {
    fn default() -> Self {
        FormatterKind::Strfmt
    }
}

/// Validated formatter configuration. Which fields matter depends on `kind`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TickFormatterSpec {
    pub kind: FormatterKind,
    pub pattern: Option<String>,
    /// Exponent window `[lo, hi]` inside which `sci` falls back to plain digits.
    pub sci_limits: Option<(i32, i32)>,
    pub unit: Option<String>,
    pub places: Option<usize>,
    pub scale: Option<f64>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub use_mathtext: bool,
    pub expression: Option<String>,
    pub wrap_mathtext: bool,
    pub bold: bool,
    pub italic: bool,
}

/// A user formatter callable, referenced from a spec as `expression: "@name"`.
pub type FormatterFn = Arc<dyn Fn(f64, usize) -> String + Send + Sync>;

static FORMATTERS: Lazy<RwLock<HashMap<String, FormatterFn>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Register a named formatter callable; a later registration replaces an earlier one.
pub fn register_formatter<F>(name: &str, f: F)
where
    F: Fn(f64, usize) -> String + Send + Sync + 'static,
{
    if let Ok(mut map) = FORMATTERS.write() {
        map.insert(name.to_string(), Arc::new(f));
    }
}

fn registered_formatter(name: &str) -> Option<FormatterFn> {
    FORMATTERS.read().ok().and_then(|map| map.get(name).cloned())
}

// ---------------------------------------------------------------------------
// Number rendering shared by printf and strfmt
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
struct NumberSpec {
    fill: char,
    align: Option<char>,
    sign: Option<char>,
    alt: bool,
    zero: bool,
    width: usize,
    grouping: bool,
    precision: Option<usize>,
    ty: Option<char>,
}

impl Default for NumberSpec {
    fn default() -> Self {
        Self {
            fill: ' ',
            align: None,
            sign: None,
            alt: false,
            zero: false,
            width: 0,
            grouping: false,
            precision: None,
            ty: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    X,
    Pos,
}

#[derive(Debug, Clone, PartialEq)]
enum Piece {
    Literal(String),
    Number(Field, NumberSpec),
}

fn fixed(v: f64, prec: usize) -> String {
    format!("{:.*}", prec, v)
}

/// Mantissa and exponent of `v` rounded to `prec` decimals in scientific form.
fn split_exp(v: f64, prec: usize) -> (String, i32) {
    let s = format!("{:.*e}", prec, v);
    match s.split_once('e') {
        Some((m, e)) => (m.to_string(), e.parse().unwrap_or(0)),
        None => (s, 0),
    }
}

fn exp_form(v: f64, prec: usize, upper: bool) -> String {
    let (m, e) = split_exp(v, prec);
    let sign = if e < 0 { '-' } else { '+' };
    let e_char = if upper { 'E' } else { 'e' };
    format!("{}{}{}{:02}", m, e_char, sign, e.abs())
}

fn strip_zeros(s: &str) -> String {
    if !s.contains('.') {
        return s.to_string();
    }
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn general(v: f64, prec: usize, alt: bool, upper: bool) -> String {
    let p = prec.max(1);
    let exp = if v == 0.0 { 0 } else { split_exp(v, p - 1).1 };
    if exp >= -4 && (exp as i64) < p as i64 {
        let s = fixed(v, (p as i32 - 1 - exp).max(0) as usize);
        if alt { s } else { strip_zeros(&s) }
    } else {
        let s = exp_form(v, p - 1, upper);
        if alt {
            return s;
        }
        match s.split_once(if upper { 'E' } else { 'e' }) {
            Some((m, e)) => format!("{}{}{}", strip_zeros(m), if upper { 'E' } else { 'e' }, e),
            None => s,
        }
    }
}

/// Shortest representation that reads back to the same value, `1.0` style.
fn repr(v: f64) -> String {
    let s = format!("{:?}", v);
    match s.split_once('e') {
        Some((m, e)) => {
            let e: i32 = e.parse().unwrap_or(0);
            format!("{}e{}{:02}", m, if e < 0 { '-' } else { '+' }, e.abs())
        }
        None => s,
    }
}

fn group_thousands(digits: &str, sep: char) -> String {
    let (int, frac) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };
    let mut out = String::new();
    for (i, ch) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(ch);
    }
    if let Some(f) = frac {
        out.push('.');
        out.push_str(f);
    }
    out
}

fn render_number(v: f64, spec: &NumberSpec) -> String {
    let neg = v < 0.0;
    let a = v.abs();
    let body = if a.is_nan() {
        "nan".to_string()
    } else if a.is_infinite() {
        "inf".to_string()
    } else {
        let upper = spec.ty.is_some_and(|t| t.is_ascii_uppercase());
        let mut body = match spec.ty {
            Some('f') | Some('F') => fixed(a, spec.precision.unwrap_or(6)),
            Some('e') | Some('E') => exp_form(a, spec.precision.unwrap_or(6), upper),
            Some('g') | Some('G') | Some('n') => {
                general(a, spec.precision.unwrap_or(6), spec.alt, upper)
            }
            Some('%') => format!("{}%", fixed(a * 100.0, spec.precision.unwrap_or(6))),
            Some('d') | Some('i') | Some('u') => format!("{}", a.round() as i128),
            Some('x') => format!("{:x}", a.round() as i128),
            Some('X') => format!("{:X}", a.round() as i128),
            Some('o') => format!("{:o}", a.round() as i128),
            Some('b') => format!("{:b}", a.round() as i128),
            _ => match spec.precision {
                Some(p) => general(a, p, spec.alt, false),
                None => repr(a),
            },
        };
        if spec.grouping && !body.contains(['e', 'E']) {
            body = group_thousands(&body, ',');
        }
        body
    };

    let sign = if neg {
        "-"
    } else {
        match spec.sign {
            Some('+') => "+",
            Some(' ') => " ",
            _ => "",
        }
    };

    let len = sign.chars().count() + body.chars().count();
    if spec.width <= len {
        return format!("{}{}", sign, body);
    }
    let pad = spec.width - len;
    if spec.zero && spec.align.is_none() {
        return format!("{}{}{}", sign, "0".repeat(pad), body);
    }
    let fill = spec.fill.to_string();
    match spec.align.unwrap_or('>') {
        '<' => format!("{}{}{}", sign, body, fill.repeat(pad)),
        '^' => format!(
            "{}{}{}{}",
            fill.repeat(pad / 2),
            sign,
            body,
            fill.repeat(pad - pad / 2)
        ),
        '=' => format!("{}{}{}", sign, fill.repeat(pad), body),
        _ => format!("{}{}{}", fill.repeat(pad), sign, body),
    }
}

fn render_pieces(pieces: &[Piece], x: f64, pos: usize) -> String {
    let mut out = String::new();
    for piece in pieces {
        match piece {
            Piece::Literal(s) => out.push_str(s),
            Piece::Number(Field::X, spec) => out.push_str(&render_number(x, spec)),
            Piece::Number(Field::Pos, spec) => out.push_str(&render_number(pos as f64, spec)),
        }
    }
    out
}

static PRINTF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"%([-+ 0#]*)(\d+)?(?:\.(\d*))?([diouxXeEfFgGs%])").expect("static regex")
});

/// Compile a C-style pattern such as `%.2f` or `%5.1e%%`.
fn compile_printf(pattern: &str) -> Result<Vec<Piece>, String> {
    let mut pieces = Vec::new();
    let mut last = 0;
    for caps in PRINTF.captures_iter(pattern) {
        let whole = caps.get(0).map(|m| (m.start(), m.end())).unwrap_or((0, 0));
        let literal = &pattern[last..whole.0];
        if literal.contains('%') {
            return Err(format!("invalid printf conversion in {:?}", pattern));
        }
        if !literal.is_empty() {
            pieces.push(Piece::Literal(literal.to_string()));
        }
        last = whole.1;

        let conv = caps.get(4).map(|m| m.as_str()).unwrap_or("");
        if conv == "%" {
            pieces.push(Piece::Literal("%".to_string()));
            continue;
        }
        let flags = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let mut spec = NumberSpec {
            width: caps
                .get(2)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0),
            precision: caps
                .get(3)
                .map(|m| m.as_str().parse().unwrap_or(0)),
            ty: conv.chars().next().filter(|c| *c != 's'),
            alt: flags.contains('#'),
            zero: flags.contains('0'),
            ..NumberSpec::default()
        };
        if flags.contains('-') {
            spec.align = Some('<');
            spec.zero = false;
        }
        if flags.contains('+') {
            spec.sign = Some('+');
        } else if flags.contains(' ') {
            spec.sign = Some(' ');
        }
        pieces.push(Piece::Number(Field::X, spec));
    }
    let tail = &pattern[last..];
    if tail.contains('%') {
        return Err(format!("invalid printf conversion in {:?}", pattern));
    }
    if !tail.is_empty() {
        pieces.push(Piece::Literal(tail.to_string()));
    }
    Ok(pieces)
}

static STR_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{|\}\}|\{([A-Za-z_]*)(?::([^{}]*))?\}").expect("static regex")
});

static STR_SPEC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(.)?([<>=^]))?([-+ ])?(#)?(0)?(\d+)?([,_])?(?:\.(\d+))?([bdeEfFgGnoxX%])?$",
    )
    .expect("static regex")
});

fn parse_format_spec(spec: &str) -> Result<NumberSpec, String> {
    let caps = STR_SPEC
        .captures(spec)
        .ok_or_else(|| format!("invalid format spec {:?}", spec))?;
    let get = |i: usize| caps.get(i).map(|m| m.as_str());
    Ok(NumberSpec {
        fill: get(1).and_then(|s| s.chars().next()).unwrap_or(' '),
        align: get(2).and_then(|s| s.chars().next()),
        sign: get(3).and_then(|s| s.chars().next()),
        alt: get(4).is_some(),
        zero: get(5).is_some(),
        width: get(6).and_then(|s| s.parse().ok()).unwrap_or(0),
        grouping: get(7).is_some(),
        precision: get(8).and_then(|s| s.parse().ok()),
        ty: get(9).and_then(|s| s.chars().next()),
    })
}

/// Compile a `str.format`-style pattern with `{x}` / `{pos}` fields.
fn compile_strfmt(pattern: &str) -> Result<Vec<Piece>, String> {
    let mut pieces = Vec::new();
    let mut last = 0;
    for caps in STR_FIELD.captures_iter(pattern) {
        let Some(whole) = caps.get(0) else { continue };
        let literal = &pattern[last..whole.start()];
        if literal.contains(['{', '}']) {
            return Err(format!("unbalanced brace in {:?}", pattern));
        }
        if !literal.is_empty() {
            pieces.push(Piece::Literal(literal.to_string()));
        }
        last = whole.end();

        match whole.as_str() {
            "{{" => pieces.push(Piece::Literal("{".to_string())),
            "}}" => pieces.push(Piece::Literal("}".to_string())),
            _ => {
                let field = match caps.get(1).map(|m| m.as_str()).unwrap_or("") {
                    "x" | "" => Field::X,
                    "pos" => Field::Pos,
                    other => return Err(format!("unknown field {{{}}} in {:?}", other, pattern)),
                };
                let mut spec = parse_format_spec(caps.get(2).map(|m| m.as_str()).unwrap_or(""))?;
                if field == Field::Pos && spec.ty.is_none() && spec.precision.is_none() {
                    spec.ty = Some('d');
                }
                pieces.push(Piece::Number(field, spec));
            }
        }
    }
    let tail = &pattern[last..];
    if tail.contains(['{', '}']) {
        return Err(format!("unbalanced brace in {:?}", pattern));
    }
    if !tail.is_empty() {
        pieces.push(Piece::Literal(tail.to_string()));
    }
    Ok(pieces)
}

// ---------------------------------------------------------------------------
// Compiled formatter
// ---------------------------------------------------------------------------

const SI_PREFIXES: &[(i32, &str)] = &[
    (-24, "y"),
    (-21, "z"),
    (-18, "a"),
    (-15, "f"),
    (-12, "p"),
    (-9, "n"),
    (-6, "\u{b5}"),
    (-3, "m"),
    (0, ""),
    (3, "k"),
    (6, "M"),
    (9, "G"),
    (12, "T"),
    (15, "P"),
    (18, "E"),
    (21, "Z"),
    (24, "Y"),
];

fn si_parts(v: f64, places: usize) -> (String, &'static str) {
    if v == 0.0 || !v.is_finite() {
        return (fixed(v, places), "");
    }
    let mut k = ((v.abs().log10() / 3.0).floor() as i32 * 3).clamp(-24, 24);
    let mut mant = v / 10f64.powi(k);
    // Rounding can carry the mantissa to 1000; move up one prefix.
    if fixed(mant.abs(), places).parse::<f64>().unwrap_or(0.0) >= 1000.0 && k < 24 {
        k += 3;
        mant /= 1000.0;
    }
    let prefix = SI_PREFIXES
        .iter()
        .find(|(e, _)| *e == k)
        .map(|(_, p)| *p)
        .unwrap_or("");
    (fixed(mant, places), prefix)
}

#[derive(Clone)]
enum Body {
    Pieces(Vec<Piece>),
    Sci {
        places: usize,
        limits: Option<(i32, i32)>,
        mathtext: bool,
    },
    Eng {
        places: usize,
        unit: String,
    },
    Percent {
        places: usize,
        scale: f64,
    },
    Thousands {
        places: usize,
    },
    Si {
        places: usize,
        unit: String,
    },
    Date {
        pattern: String,
    },
    Expr {
        expr: Expr,
        pieces: Vec<Piece>,
    },
    Registered(String),
}

/// Ready-to-use tick label formatter.
#[derive(Clone)]
pub struct TickFormatter {
    body: Body,
    prefix: String,
    suffix: String,
    wrap_mathtext: bool,
    bold: bool,
    italic: bool,
}

impl std::fmt::Debug for TickFormatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickFormatter")
            .field("prefix", &self.prefix)
            .field("suffix", &self.suffix)
            .finish_non_exhaustive()
    }
}

impl Default for TickFormatter {
    fn default() -> Self {
        Self {
            body: Body::Pieces(vec![Piece::Number(
                Field::X,
                NumberSpec {
                    ty: Some('g'),
                    ..NumberSpec::default()
                },
            )]),
            prefix: String::new(),
            suffix: String::new(),
            wrap_mathtext: false,
            bold: false,
            italic: false,
        }
    }
}

impl TickFormatter {
    /// Parse patterns and expressions. Errors describe the offending field value.
    pub fn compile(spec: &TickFormatterSpec) -> Result<Self, String> {
        let pattern = spec.pattern.as_deref();
        let body = match spec.kind {
            FormatterKind::Printf => Body::Pieces(compile_printf(pattern.unwrap_or("%g"))?),
            FormatterKind::Strfmt => Body::Pieces(compile_strfmt(pattern.unwrap_or("{x:g}"))?),
            FormatterKind::Sci => Body::Sci {
                places: spec.places.unwrap_or(1),
                limits: spec.sci_limits,
                mathtext: spec.use_mathtext,
            },
            FormatterKind::Eng => Body::Eng {
                places: spec.places.unwrap_or(1),
                unit: spec.unit.clone().unwrap_or_default(),
            },
            FormatterKind::Percent => {
                let scale = spec.scale.unwrap_or(100.0);
                if scale == 0.0 || !scale.is_finite() {
                    return Err(format!("percent scale must be non-zero, got {}", scale));
                }
                Body::Percent {
                    places: spec.places.unwrap_or(0),
                    scale,
                }
            }
            FormatterKind::Thousands => Body::Thousands {
                places: spec.places.unwrap_or(0),
            },
            FormatterKind::Si => Body::Si {
                places: spec.places.unwrap_or(1),
                unit: spec.unit.clone().unwrap_or_default(),
            },
            FormatterKind::Date => {
                let pattern = pattern.unwrap_or("%Y-%m-%d");
                if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
                    return Err(format!("invalid date pattern {:?}", pattern));
                }
                Body::Date {
                    pattern: pattern.to_string(),
                }
            }
            FormatterKind::Custom => {
                let src = spec
                    .expression
                    .as_deref()
                    .ok_or_else(|| "custom formatter requires an expression".to_string())?;
                match src.trim().strip_prefix('@') {
                    Some(name) => Body::Registered(name.trim().to_string()),
                    None => Body::Expr {
                        expr: Expr::parse(src)?,
                        pieces: compile_strfmt(pattern.unwrap_or("{x:g}"))?,
                    },
                }
            }
        };
        Ok(Self {
            body,
            prefix: spec.prefix.clone().unwrap_or_default(),
            suffix: spec.suffix.clone().unwrap_or_default(),
            wrap_mathtext: spec.wrap_mathtext,
            bold: spec.bold,
            italic: spec.italic,
        })
    }

    /// Label for the tick at `value`, the `pos`-th tick on its axis.
    ///
    /// `latex` is true when text goes through a LaTeX renderer.
    pub fn format(&self, value: f64, pos: usize, latex: bool) -> String {
        let mut math = false;
        let body = match &self.body {
            Body::Pieces(pieces) => render_pieces(pieces, value, pos),
            Body::Sci {
                places,
                limits,
                mathtext,
            } => {
                let (mant, exp) = split_exp(value, *places);
                let plain = limits.is_some_and(|(lo, hi)| lo <= exp && exp <= hi);
                if value == 0.0 || plain {
                    fixed(value, *places)
                } else if *mathtext {
                    math = true;
                    format!("{}\\times10^{{{}}}", mant, exp)
                } else {
                    exp_form(value, *places, false)
                }
            }
            Body::Eng { places, unit } => {
                let (mant, prefix) = si_parts(value, *places);
                if prefix.is_empty() && unit.is_empty() {
                    mant
                } else {
                    format!("{} {}{}", mant, prefix, unit)
                }
            }
            Body::Percent { places, scale } => {
                let sign = if latex { "\\%" } else { "%" };
                format!("{}{}", fixed(value / scale * 100.0, *places), sign)
            }
            Body::Thousands { places } => {
                let s = fixed(value.abs(), *places);
                let grouped = group_thousands(&s, ',');
                if value < 0.0 { format!("-{}", grouped) } else { grouped }
            }
            Body::Si { places, unit } => {
                let (mant, prefix) = si_parts(value, *places);
                format!("{}{}{}", strip_zeros(&mant), prefix, unit)
            }
            Body::Date { pattern } => format_date(value, pattern),
            Body::Expr { expr, pieces } => render_pieces(pieces, expr.eval(value, pos), pos),
            Body::Registered(name) => match registered_formatter(name) {
                Some(f) => f(value, pos),
                None => {
                    crate::diagnostics::warn(format!(
                        "tick formatter @{} is not registered; using default",
                        name
                    ));
                    TickFormatter::default().format(value, pos, latex)
                }
            },
        };

        let text = format!("{}{}{}", self.prefix, body, self.suffix);
        wrap_math(&text, self.wrap_mathtext || math, self.bold, self.italic)
    }
}

fn format_date(days: f64, pattern: &str) -> String {
    if !days.is_finite() {
        return String::new();
    }
    let secs = (days * 86_400.0).floor();
    let nanos = ((days * 86_400.0 - secs) * 1e9).round().clamp(0.0, 999_999_999.0) as u32;
    match chrono::DateTime::from_timestamp(secs as i64, nanos) {
        Some(dt) => dt.format(pattern).to_string(),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Placement
// ---------------------------------------------------------------------------

/// Upper bound on ticks one axis may carry.
pub const MAX_TICKS: usize = 10_000;

/// Inclusive `[min, max]` sequence with the given step.
///
/// A step too fine for [`MAX_TICKS`] falls back to automatic placement.
pub fn range_ticks(min: f64, max: f64, step: f64) -> Vec<f64> {
    if !(step > 0.0) || !(max >= min) {
        return Vec::new();
    }
    let n = ((max - min) / step + 1e-9).floor();
    if !(n <= MAX_TICKS as f64) {
        crate::diagnostics::warn(format_args!(
            "tick range [{}, {}, {}] exceeds {} ticks; using automatic ticks",
            min, max, step, MAX_TICKS
        ));
        return nice_ticks(min, max, 6);
    }
    (0..=n as usize).map(|i| min + i as f64 * step).collect()
}

fn nice_step(raw: f64) -> f64 {
    let mag = 10f64.powf(raw.log10().floor());
    let norm = raw / mag;
    let nice = [1.0, 2.0, 2.5, 5.0, 10.0]
        .into_iter()
        .find(|n| *n >= norm - 1e-12)
        .unwrap_or(10.0);
    nice * mag
}

/// Round-numbered ticks covering `[min, max]`, roughly `target` of them.
///
/// Spans too narrow to step through at their magnitude yield the two ends.
pub fn nice_ticks(min: f64, max: f64, target: usize) -> Vec<f64> {
    if !min.is_finite() || !max.is_finite() {
        return Vec::new();
    }
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    if hi == lo {
        return vec![lo];
    }
    let step = nice_step((hi - lo) / target.max(2).saturating_sub(1) as f64);
    let start = (lo / step - 1e-9).ceil();
    let end = (hi / step + 1e-9).floor();
    // Index precision is lost once start + 1 rounds back to start.
    if !(step.is_normal() && step > 0.0) || start + 1.0 == start || !(end - start <= MAX_TICKS as f64) {
        return vec![lo, hi];
    }
    if end < start {
        return Vec::new();
    }
    // Snap to a few decimals past the step to drop noise such as 0.6000000000000001.
    let decimals = (-(step.log10().floor()) as i32).max(0) + 2;
    let snap = 10f64.powi(decimals);
    (0..=(end - start) as usize)
        .map(|k| {
            let v = ((start + k as f64) * step * snap).round() / snap;
            if v == 0.0 { 0.0 } else { v }
        })
        .collect()
}

/// Decades `10^k` inside a positive range.
pub fn log_ticks(min: f64, max: f64) -> Vec<f64> {
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    if !(hi > 0.0) {
        return Vec::new();
    }
    let lo = if lo > 0.0 { lo } else { hi / 1e3 };
    let first = (lo.log10() - 1e-9).ceil() as i32;
    let last = (hi.log10() + 1e-9).floor() as i32;
    (first..=last).map(|k| 10f64.powi(k)).collect()
}

/// Tick positions for one axis: explicit locations, then a range, then automatic.
pub fn tick_locations(
    locations: Option<&[f64]>,
    range: Option<[f64; 3]>,
    view_min: f64,
    view_max: f64,
    scale: Scale,
) -> Vec<f64> {
    if let Some(locs) = locations {
        return locs.to_vec();
    }
    if let Some([min, max, step]) = range {
        return range_ticks(min, max, step);
    }
    match scale {
        Scale::Log => {
            let decades = log_ticks(view_min, view_max);
            if decades.len() >= 2 {
                decades
            } else {
                nice_ticks(view_min, view_max, 6)
            }
        }
        Scale::Linear | Scale::Symlog => nice_ticks(view_min, view_max, 6),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fmt(kind: FormatterKind, f: impl FnOnce(&mut TickFormatterSpec)) -> TickFormatter {
        let mut spec = TickFormatterSpec {
            kind,
            ..Default::default()
        };
        f(&mut spec);
        TickFormatter::compile(&spec).unwrap()
    }

    #[test]
    fn default_is_general_format() {
        let f = TickFormatter::default();
        assert_eq!(f.format(0.1 + 0.2, 0, false), "0.3");
        assert_eq!(f.format(1500.0, 0, false), "1500");
        assert_eq!(f.format(1e7, 0, false), "1e+07");
        assert_eq!(f.format(-2.5, 0, false), "-2.5");
    }

    #[test]
    fn printf_patterns() {
        let f = fmt(FormatterKind::Printf, |s| s.pattern = Some("%.2f".into()));
        assert_eq!(f.format(3.14159, 0, false), "3.14");

        let f = fmt(FormatterKind::Printf, |s| s.pattern = Some("%05.1f%%".into()));
        assert_eq!(f.format(2.26, 0, false), "002.3%");

        let f = fmt(FormatterKind::Printf, |s| s.pattern = Some("%d ms".into()));
        assert_eq!(f.format(12.0, 0, false), "12 ms");

        let f = fmt(FormatterKind::Printf, |s| s.pattern = Some("%.1e".into()));
        assert_eq!(f.format(1234.0, 0, false), "1.2e+03");

        let f = fmt(FormatterKind::Printf, |s| s.pattern = Some("%+g".into()));
        assert_eq!(f.format(2.0, 0, false), "+2");

        let f = fmt(FormatterKind::Printf, |s| s.pattern = Some("%-4d|".into()));
        assert_eq!(f.format(7.0, 0, false), "7   |");
    }

    #[test]
    fn printf_rejects_stray_percent() {
        let spec = TickFormatterSpec {
            kind: FormatterKind::Printf,
            pattern: Some("%q".into()),
            ..Default::default()
        };
        assert!(TickFormatter::compile(&spec).is_err());
    }

    #[test]
    fn strfmt_fields_and_specs() {
        let f = fmt(FormatterKind::Strfmt, |s| s.pattern = Some("{x:.1f} s".into()));
        assert_eq!(f.format(2.26, 0, false), "2.3 s");

        let f = fmt(FormatterKind::Strfmt, |s| s.pattern = Some("{x:,.0f}".into()));
        assert_eq!(f.format(1234567.0, 0, false), "1,234,567");

        let f = fmt(FormatterKind::Strfmt, |s| s.pattern = Some("#{pos}: {x}".into()));
        assert_eq!(f.format(0.5, 3, false), "#3: 0.5");

        let f = fmt(FormatterKind::Strfmt, |s| s.pattern = Some("{x:.0%}".into()));
        assert_eq!(f.format(0.25, 0, false), "25%");

        let f = fmt(FormatterKind::Strfmt, |s| s.pattern = Some("{x:*>6.1f}".into()));
        assert_eq!(f.format(1.0, 0, false), "***1.0");

        let f = fmt(FormatterKind::Strfmt, |s| s.pattern = Some("{{{x:g}}}".into()));
        assert_eq!(f.format(4.0, 0, false), "{4}");
    }

    #[test]
    fn strfmt_rejects_unknown_fields() {
        let spec = TickFormatterSpec {
            pattern: Some("{value:.2f}".into()),
            ..Default::default()
        };
        assert!(TickFormatter::compile(&spec).is_err());
        let spec = TickFormatterSpec {
            pattern: Some("{x:.2f".into()),
            ..Default::default()
        };
        assert!(TickFormatter::compile(&spec).is_err());
    }

    #[test]
    fn scientific_and_engineering() {
        let f = fmt(FormatterKind::Sci, |s| s.places = Some(2));
        assert_eq!(f.format(12345.0, 0, false), "1.23e+04");

        let f = fmt(FormatterKind::Sci, |s| s.use_mathtext = true);
        assert_eq!(f.format(1500.0, 0, false), r"$1.5\times10^{3}$");

        let f = fmt(FormatterKind::Sci, |s| s.sci_limits = Some((-2, 3)));
        assert_eq!(f.format(150.0, 0, false), "150.0");

        let f = fmt(FormatterKind::Eng, |s| {
            s.unit = Some("Hz".into());
            s.places = Some(1);
        });
        assert_eq!(f.format(47000.0, 0, false), "47.0 kHz");
        assert_eq!(f.format(0.0022, 0, false), "2.2 mHz");
        assert_eq!(f.format(999_999.0, 0, false), "1.0 MHz");
    }

    #[test]
    fn percent_thousands_si() {
        let f = fmt(FormatterKind::Percent, |s| s.scale = Some(1.0));
        assert_eq!(f.format(0.42, 0, false), "42%");
        assert_eq!(f.format(0.42, 0, true), r"42\%");

        let f = fmt(FormatterKind::Percent, |_| {});
        assert_eq!(f.format(42.0, 0, false), "42%");

        let f = fmt(FormatterKind::Thousands, |s| s.places = Some(1));
        assert_eq!(f.format(-1234567.26, 0, false), "-1,234,567.3");

        let f = fmt(FormatterKind::Si, |_| {});
        assert_eq!(f.format(1500.0, 0, false), "1.5k");
        assert_eq!(f.format(2_000_000.0, 0, false), "2M");
        assert_eq!(f.format(12.0, 0, false), "12");
    }

    #[test]
    fn dates_count_days_from_epoch() {
        let f = fmt(FormatterKind::Date, |_| {});
        assert_eq!(f.format(0.0, 0, false), "1970-01-01");
        assert_eq!(f.format(365.0, 0, false), "1971-01-01");

        let f = fmt(FormatterKind::Date, |s| s.pattern = Some("%b %d %H:%M".into()));
        assert_eq!(f.format(1.5, 0, false), "Jan 02 12:00");

        let spec = TickFormatterSpec {
            kind: FormatterKind::Date,
            pattern: Some("%Q".into()),
            ..Default::default()
        };
        assert!(TickFormatter::compile(&spec).is_err());
    }

    #[test]
    fn custom_expressions() {
        let f = fmt(FormatterKind::Custom, |s| {
            s.expression = Some("x / 1000".into());
            s.pattern = Some("{x:.1f}".into());
            s.suffix = Some(" kB".into());
        });
        assert_eq!(f.format(2560.0, 0, false), "2.6 kB");

        let spec = TickFormatterSpec {
            kind: FormatterKind::Custom,
            ..Default::default()
        };
        assert!(TickFormatter::compile(&spec).is_err());
    }

    #[test]
    fn registered_callables() {
        register_formatter("roman_test", |x, _| match x as i64 {
            1 => "I".into(),
            2 => "II".into(),
            _ => "?".into(),
        });
        let f = fmt(FormatterKind::Custom, |s| s.expression = Some("@roman_test".into()));
        assert_eq!(f.format(2.0, 0, false), "II");
    }

    #[test]
    fn decorations_wrap_in_math() {
        let f = fmt(FormatterKind::Strfmt, |s| {
            s.pattern = Some("{x:.1f}".into());
            s.prefix = Some("~".into());
            s.bold = true;
        });
        assert_eq!(f.format(1.0, 0, false), r"$\mathbf{~1.0}$");

        let f = fmt(FormatterKind::Strfmt, |s| s.wrap_mathtext = true);
        assert_eq!(f.format(2.0, 0, false), "$2$");
    }

    #[test]
    fn range_is_inclusive() {
        assert_eq!(range_ticks(0.0, 1.0, 0.25), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(range_ticks(0.0, 1.0, 0.3).len(), 4);
        assert!(range_ticks(0.0, 1.0, 0.0).is_empty());
    }

    #[test]
    fn dense_ranges_fall_back_to_automatic_ticks() {
        let ticks = range_ticks(0.0, 1e12, 1e-9);
        assert!(ticks.len() <= MAX_TICKS);
        assert_eq!(ticks, nice_ticks(0.0, 1e12, 6));
        assert_eq!(range_ticks(0.0, MAX_TICKS as f64, 1.0).len(), MAX_TICKS + 1);
    }

    #[test]
    fn spans_below_float_resolution_yield_their_ends() {
        let hi = 1.0 + f64::EPSILON;
        assert_eq!(nice_ticks(1.0, hi, 6), vec![1.0, hi]);
        assert_eq!(nice_ticks(0.0, 5e-324, 6), vec![0.0, 5e-324]);
    }

    #[test]
    fn nice_ticks_use_round_steps() {
        assert_eq!(nice_ticks(0.0, 10.0, 6), vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
        assert_eq!(nice_ticks(0.0, 1.0, 6), vec![0.0, 0.2, 0.4, 0.6, 0.8, 1.0]);
        assert_eq!(nice_ticks(-0.3, 0.3, 6), vec![-0.2, 0.0, 0.2]);
    }

    #[test]
    fn explicit_locations_win() {
        let locs = [1.0, 5.0];
        assert_eq!(
            tick_locations(Some(&locs), Some([0.0, 10.0, 1.0]), 0.0, 10.0, Scale::Linear),
            vec![1.0, 5.0]
        );
        assert_eq!(
            tick_locations(None, Some([0.0, 2.0, 1.0]), 0.0, 10.0, Scale::Linear),
            vec![0.0, 1.0, 2.0]
        );
        assert_eq!(
            tick_locations(None, None, 1.0, 1000.0, Scale::Log),
            vec![1.0, 10.0, 100.0, 1000.0]
        );
    }
}
