use crate::data::Table;
use crate::error::LayerError;
use crate::layers::Layer;
use crate::spec::{Marker, SeriesSpec};
use crate::surface::{Stroke, Surface};

const DEFAULT_BINS: usize = 30;
/// Marker area in points squared.
const SCATTER_SIZE: f64 = 36.0;

fn column(layer: &str, table: &Table, name: Option<&str>, axis: &str) -> Result<Vec<f64>, LayerError> {
    let name = name.ok_or_else(|| LayerError::Invalid {
        layer: layer.to_string(),
        message: format!("series needs an `{}` column", axis),
    })?;
    Ok(table.column_f64(name)?)
}

fn stroke(series: &SeriesSpec) -> Stroke {
    Stroke::new(series.style.color, series.style.width, series.style.style)
}

fn label(series: &SeriesSpec) -> Option<String> {
    series.label_text().map(str::to_string)
}

pub struct LineLayer;

impl Layer for LineLayer {
    fn draw(&self, surface: &mut dyn Surface, table: &Table, series: &SeriesSpec) -> Result<(), LayerError> {
        let xs = column("line", table, series.x.as_deref(), "x")?;
        let ys = column("line", table, series.y.as_deref(), "y")?;
        surface.plot(xs, ys, stroke(series), series.style.marker, label(series));
        Ok(())
    }
}

pub struct ScatterLayer;

impl Layer for ScatterLayer {
    fn draw(&self, surface: &mut dyn Surface, table: &Table, series: &SeriesSpec) -> Result<(), LayerError> {
        let xs = column("scatter", table, series.x.as_deref(), "x")?;
        let ys = column("scatter", table, series.y.as_deref(), "y")?;
        let marker = series.style.marker.unwrap_or(Marker::Circle);
        surface.scatter(xs, ys, marker, SCATTER_SIZE, series.style.color, label(series));
        Ok(())
    }
}

pub struct HistLayer;

/// Equal-width bin edges and counts over `[min, max]` of the finite values.
pub(crate) fn histogram(values: &[f64], bins: usize) -> (Vec<f64>, Vec<f64>) {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let bins = bins.max(1);
    let (mut lo, mut hi) = finite
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    if finite.is_empty() {
        (lo, hi) = (0.0, 1.0);
    } else if lo == hi {
        (lo, hi) = (lo - 0.5, hi + 0.5);
    }
    let width = (hi - lo) / bins as f64;
    let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();
    let mut counts = vec![0.0; bins];
    for v in finite {
        // The last bin is closed on the right.
        let i = (((v - lo) / width) as usize).min(bins - 1);
        counts[i] += 1.0;
    }
    (edges, counts)
}

impl Layer for HistLayer {
    fn draw(&self, surface: &mut dyn Surface, table: &Table, series: &SeriesSpec) -> Result<(), LayerError> {
        let xs = column("hist", table, series.x.as_deref(), "x")?;
        let (edges, counts) = histogram(&xs, series.bins.unwrap_or(DEFAULT_BINS));
        surface.bars(edges, counts, series.style.color, label(series));
        Ok(())
    }
}

/// Empirical CDF, registered as both `cdf` and `ecdf`.
pub struct CdfLayer;

impl Layer for CdfLayer {
    fn draw(&self, surface: &mut dyn Surface, table: &Table, series: &SeriesSpec) -> Result<(), LayerError> {
        let mut xs = column(&series.kind, table, series.x.as_deref(), "x")?;
        xs.retain(|v| !v.is_nan());
        xs.sort_by(f64::total_cmp);
        let n = xs.len() as f64;
        let ys: Vec<f64> = (1..=xs.len()).map(|i| i as f64 / n).collect();
        surface.plot(xs, ys, stroke(series), series.style.marker, label(series));
        surface.pin_ylim(0.0, 1.0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DataError;
    use crate::spec::TextSpec;
    use crate::style::Palette;
    use crate::surface::{Axes, Mark};
    use pretty_assertions::assert_eq;

    fn series(kind: &str) -> SeriesSpec {
        SeriesSpec {
            x: Some("x".into()),
            y: Some("y".into()),
            ..SeriesSpec::new(kind)
        }
    }

    fn table() -> Table {
        Table::from_columns(vec![("x", vec![3.0, 1.0, 2.0]), ("y", vec![30.0, 10.0, 20.0])]).unwrap()
    }

    #[test]
    fn cdf_sorts_and_pins_limits() {
        let mut ax = Axes::new(Palette::default());
        CdfLayer.draw(&mut ax, &table(), &series("cdf")).unwrap();
        match &ax.artists()[0].mark {
            Mark::Line { xs, ys, .. } => {
                assert_eq!(xs, &vec![1.0, 2.0, 3.0]);
                assert_eq!(ys, &vec![1.0 / 3.0, 2.0 / 3.0, 1.0]);
            }
            other => panic!("expected a line, got {other:?}"),
        }
        assert_eq!(ax.pinned_ylim(), Some((0.0, 1.0)));
    }

    #[test]
    fn line_keeps_row_order_and_label() {
        let mut ax = Axes::new(Palette::default());
        let s = SeriesSpec {
            label: Some(TextSpec::plain("runs")),
            ..series("line")
        };
        LineLayer.draw(&mut ax, &table(), &s).unwrap();
        let artist = &ax.artists()[0];
        assert_eq!(artist.legend_label(), Some("runs"));
        assert!(matches!(&artist.mark, Mark::Line { xs, .. } if xs == &vec![3.0, 1.0, 2.0]));
    }

    #[test]
    fn scatter_defaults_to_circles() {
        let mut ax = Axes::new(Palette::default());
        ScatterLayer.draw(&mut ax, &table(), &series("scatter")).unwrap();
        assert!(matches!(ax.artists()[0].mark, Mark::Scatter { marker: Marker::Circle, .. }));
    }

    #[test]
    fn histogram_uses_equal_width_bins() {
        let (edges, counts) = histogram(&[0.0, 1.0, 2.0, 3.0, 4.0, f64::NAN], 4);
        assert_eq!(edges, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(counts, vec![1.0, 1.0, 1.0, 2.0]);
        assert_eq!(histogram(&[], 3).1, vec![0.0; 3]);
        assert_eq!(histogram(&[2.0, 2.0], 1), (vec![1.5, 2.5], vec![2.0]));
    }

    #[test]
    fn missing_columns_are_data_errors() {
        let mut ax = Axes::new(Palette::default());
        let s = SeriesSpec {
            y: Some("latency".into()),
            ..series("line")
        };
        let err = LineLayer.draw(&mut ax, &table(), &s).unwrap_err();
        assert!(matches!(err, LayerError::Data(DataError::Column { column, .. }) if column == "latency"));
        assert!(ax.artists().is_empty());
    }

    #[test]
    fn unset_columns_are_invalid() {
        let mut ax = Axes::new(Palette::default());
        let s = SeriesSpec {
            x: None,
            ..series("hist")
        };
        assert!(matches!(
            HistLayer.draw(&mut ax, &table(), &s),
            Err(LayerError::Invalid { .. })
        ));
    }
}
