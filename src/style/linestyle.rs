//! Linestyle aliases and dash geometry.

/// Canonical line styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
    DashDot,
}

impl LineStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            LineStyle::Solid => "solid",
            LineStyle::Dashed => "dashed",
            LineStyle::Dotted => "dotted",
            LineStyle::DashDot => "dashdot",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            LineStyle::Solid => "-",
            LineStyle::Dashed => "--",
            LineStyle::Dotted => ":",
            LineStyle::DashDot => "-.",
        }
    }

    /// On/off lengths in multiples of the line width. Empty means solid.
    pub fn dash_pattern(self) -> &'static [f64] {
        match self {
            LineStyle::Solid => &[],
            LineStyle::Dashed => &[3.7, 1.6],
            LineStyle::Dotted => &[1.0, 1.65],
            LineStyle::DashDot => &[6.4, 1.6, 1.0, 1.6],
        }
    }
}

impl std::fmt::Display for LineStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalize any accepted spelling. An empty string means solid.
pub fn resolve_linestyle(s: &str) -> Option<LineStyle> {
    match s.trim().to_ascii_lowercase().as_str() {
        "" | "solid" | "-" => Some(LineStyle::Solid),
        "dashed" | "--" | "dash" => Some(LineStyle::Dashed),
        "dotted" | ":" | "dot" => Some(LineStyle::Dotted),
        "dashdot" | "-." | "dash-dot" => Some(LineStyle::DashDot),
        _ => None,
    }
}

/// Split a polyline into the "on" pieces of a dash pattern.
///
/// `pattern` holds alternating on/off lengths in the same unit as the points.
/// The pattern phase carries over vertices, so dashes wrap around corners.
pub fn dash_segments(points: &[(f64, f64)], pattern: &[f64]) -> Vec<Vec<(f64, f64)>> {
    if points.len() < 2 {
        return Vec::new();
    }
    if pattern.is_empty() || pattern.iter().all(|l| *l <= 0.0) {
        return vec![points.to_vec()];
    }

    let mut out = Vec::new();
    let mut idx = 0usize;
    let mut left = pattern[0];
    let mut current: Vec<(f64, f64)> = vec![points[0]];

    for pair in points.windows(2) {
        let (mut x0, mut y0) = pair[0];
        let (x1, y1) = pair[1];
        let mut seg = ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt();

        while seg > left {
            let t = left / seg;
            let (xm, ym) = (x0 + (x1 - x0) * t, y0 + (y1 - y0) * t);
            if idx % 2 == 0 {
                current.push((xm, ym));
                out.push(std::mem::take(&mut current));
            } else {
                current = vec![(xm, ym)];
            }
            seg -= left;
            x0 = xm;
            y0 = ym;
            idx = (idx + 1) % pattern.len();
            left = pattern[idx].max(f64::EPSILON);
        }

        left -= seg;
        if idx % 2 == 0 {
            current.push((x1, y1));
        }
    }

    if idx % 2 == 0 && current.len() >= 2 {
        out.push(current);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn aliases_normalize() {
        for s in ["solid", "-", "", "SOLID"] {
            assert_eq!(resolve_linestyle(s), Some(LineStyle::Solid), "{s:?}");
        }
        for s in ["dashed", "--", "dash"] {
            assert_eq!(resolve_linestyle(s), Some(LineStyle::Dashed), "{s:?}");
        }
        for s in ["dotted", ":", "dot"] {
            assert_eq!(resolve_linestyle(s), Some(LineStyle::Dotted), "{s:?}");
        }
        for s in ["dashdot", "-.", "dash-dot"] {
            assert_eq!(resolve_linestyle(s), Some(LineStyle::DashDot), "{s:?}");
        }
        assert_eq!(resolve_linestyle("wavy"), None);
    }

    #[test]
    fn solid_is_one_piece() {
        let pts = vec![(0.0, 0.0), (10.0, 0.0)];
        assert_eq!(dash_segments(&pts, &[]), vec![pts.clone()]);
    }

    #[test]
    fn dashes_alternate_on_and_off() {
        let pts = vec![(0.0, 0.0), (10.0, 0.0)];
        let pieces = dash_segments(&pts, &[2.0, 3.0]);
        assert_eq!(
            pieces,
            vec![
                vec![(0.0, 0.0), (2.0, 0.0)],
                vec![(5.0, 0.0), (7.0, 0.0)],
            ]
        );
    }

    #[test]
    fn dashes_wrap_around_corners() {
        let pts = vec![(0.0, 0.0), (1.0, 0.0), (1.0, 2.0)];
        let pieces = dash_segments(&pts, &[2.0, 1.0]);
        assert_eq!(pieces[0], vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]);
        assert_eq!(pieces.len(), 1);
    }
}
