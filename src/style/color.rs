//! Color parsing and categorical palettes.
//!
//! Supported spellings:
//!
//! - Named colors: `black`, `red`, `steelblue`, ... and the single-letter
//!   shorthands `k w r g b c m y`
//! - Hex: `#rgb`, `#rrggbb`, `#rrggbbaa`
//! - Palette cycle references: `C0` .. `C9`, resolved through the figure palette
//! - `none`: fully transparent

/// An sRGB color with straight alpha in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const TRANSPARENT: Color = Color {
        r: 0,
        g: 0,
        b: 0,
        a: 0.0,
    };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn with_alpha(self, a: f64) -> Self {
        Self {
            a: a.clamp(0.0, 1.0),
            ..self
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.a <= 0.0
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

closed_set! {
    /// Categorical palette used for `C0`..`C9` references.
    pub enum Palette {
        OkabeIto => "okabe_ito",
        Tab10 => "tab10",
        Grayscale => "grayscale",
    }
}

impl Default for Palette {
    fn default() -> Self {
        Palette::OkabeIto
    }
}

const OKABE_ITO: &[(u8, u8, u8)] = &[
    (0, 0, 0),
    (230, 159, 0),
    (86, 180, 233),
    (0, 158, 115),
    (240, 228, 66),
    (0, 114, 178),
    (213, 94, 0),
    (204, 121, 167),
];

const TAB10: &[(u8, u8, u8)] = &[
    (31, 119, 180),
    (255, 127, 14),
    (44, 160, 44),
    (214, 39, 40),
    (148, 103, 189),
    (140, 86, 75),
    (227, 119, 194),
    (127, 127, 127),
    (188, 189, 34),
    (23, 190, 207),
];

const GRAYSCALE: &[(u8, u8, u8)] = &[
    (0, 0, 0),
    (85, 85, 85),
    (136, 136, 136),
    (187, 187, 187),
    (51, 51, 51),
    (170, 170, 170),
];

impl Palette {
    pub fn colors(self) -> &'static [(u8, u8, u8)] {
        match self {
            Palette::OkabeIto => OKABE_ITO,
            Palette::Tab10 => TAB10,
            Palette::Grayscale => GRAYSCALE,
        }
    }

    /// The `i`-th cycle color; wraps around.
    pub fn cycle(self, i: usize) -> Color {
        let colors = self.colors();
        let (r, g, b) = colors[i % colors.len()];
        Color::rgb(r, g, b)
    }
}

fn named(name: &str) -> Option<Color> {
    let (r, g, b) = match name {
        "black" | "k" => (0, 0, 0),
        "white" | "w" => (255, 255, 255),
        "red" | "r" => (255, 0, 0),
        "green" | "g" => (0, 128, 0),
        "blue" | "b" => (0, 0, 255),
        "cyan" | "c" => (0, 191, 191),
        "magenta" | "m" => (191, 0, 191),
        "yellow" | "y" => (191, 191, 0),
        "gray" | "grey" => (128, 128, 128),
        "darkgray" | "darkgrey" => (169, 169, 169),
        "lightgray" | "lightgrey" => (211, 211, 211),
        "silver" => (192, 192, 192),
        "orange" => (255, 165, 0),
        "purple" => (128, 0, 128),
        "brown" => (165, 42, 42),
        "pink" => (255, 192, 203),
        "olive" => (128, 128, 0),
        "navy" => (0, 0, 128),
        "teal" => (0, 128, 128),
        "maroon" => (128, 0, 0),
        "lime" => (0, 255, 0),
        "gold" => (255, 215, 0),
        "crimson" => (220, 20, 60),
        "steelblue" => (70, 130, 180),
        "darkred" => (139, 0, 0),
        "darkblue" => (0, 0, 139),
        "darkgreen" => (0, 100, 0),
        "darkorange" => (255, 140, 0),
        "tab:blue" => TAB10[0],
        "tab:orange" => TAB10[1],
        "tab:green" => TAB10[2],
        "tab:red" => TAB10[3],
        "tab:purple" => TAB10[4],
        _ => return None,
    };
    Some(Color::rgb(r, g, b))
}

fn hex_pair(s: &str) -> Result<u8, String> {
    u8::from_str_radix(s, 16).map_err(|_| format!("invalid hex component {:?}", s))
}

/// Parse a color string, resolving `Cn` through `palette`.
pub fn parse_color(s: &str, palette: Palette) -> Result<Color, String> {
    let s = s.trim();
    let lower = s.to_ascii_lowercase();

    if lower == "none" || lower == "transparent" {
        return Ok(Color::TRANSPARENT);
    }

    if let Some(hex) = s.strip_prefix('#') {
        return match hex.len() {
            3 => {
                let mut out = [0u8; 3];
                for (i, ch) in hex.chars().enumerate() {
                    let d = ch
                        .to_digit(16)
                        .ok_or_else(|| format!("invalid hex color {:?}", s))?
                        as u8;
                    out[i] = d * 17;
                }
                Ok(Color::rgb(out[0], out[1], out[2]))
            }
            6 | 8 if hex.is_ascii() => {
                let r = hex_pair(&hex[0..2])?;
                let g = hex_pair(&hex[2..4])?;
                let b = hex_pair(&hex[4..6])?;
                let a = if hex.len() == 8 {
                    hex_pair(&hex[6..8])? as f64 / 255.0
                } else {
                    1.0
                };
                Ok(Color::rgb(r, g, b).with_alpha(a))
            }
            _ => Err(format!("invalid hex color {:?}", s)),
        };
    }

    if let Some(idx) = lower.strip_prefix('c') {
        if let Ok(i) = idx.parse::<usize>() {
            return Ok(palette.cycle(i));
        }
    }

    named(&lower).ok_or_else(|| format!("unknown color {:?}", s))
}
