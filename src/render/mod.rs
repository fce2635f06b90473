//! Figure orchestration: panels, series, overlays, axes styling, export.

pub mod axes;
pub mod export;
pub mod layout;

use crate::data::{self, External};
use crate::diagnostics;
use crate::layers::{LayerRegistry, global_registry};
use crate::overlay::draw_overlays;
use crate::spec::{FigureSpec, SpecSource, load};
use crate::surface::Figure;
use crate::Result;
use std::path::PathBuf;

/// Directory relative export paths are resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportRoot {
    /// The directory of the figure document.
    #[default]
    Spec,
    /// The process working directory.
    Cwd,
}

/// Knobs for programmatic renders.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Tables injected in place of the series' own data.
    pub external: Option<External>,
    pub export_root: ExportRoot,
    /// Layers to dispatch to; the process-wide registry when `None`.
    pub registry: Option<LayerRegistry>,
    /// Replaces the document's export path.
    pub out: Option<PathBuf>,
}

impl RenderOptions {
    pub fn with_external(mut self, external: impl Into<External>) -> Self {
        self.external = Some(external.into());
        self
    }

    pub fn with_registry(mut self, registry: LayerRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Write to `out`, resolved against the working directory.
    pub fn with_out(mut self, out: impl Into<PathBuf>) -> Self {
        self.out = Some(out.into());
        self.export_root = ExportRoot::Cwd;
        self
    }
}

/// Load a document and render it with default options.
pub fn render(source: impl Into<SpecSource>) -> Result<Vec<PathBuf>> {
    let spec = load(source)?;
    render_spec(&spec)
}

pub fn render_spec(spec: &FigureSpec) -> Result<Vec<PathBuf>> {
    render_with(spec, &RenderOptions::default())
}

/// Build the figure and write every requested format. Returns the written paths.
pub fn render_with(spec: &FigureSpec, options: &RenderOptions) -> Result<Vec<PathBuf>> {
    let figure = build_figure(spec, options)?;
    let mut export = spec.export.clone();
    if let Some(out) = &options.out {
        export.path = out.to_string_lossy().into_owned();
    }
    let root = match options.export_root {
        ExportRoot::Spec => spec.base_dir.clone(),
        ExportRoot::Cwd => std::env::current_dir().map_err(|source| crate::error::ExportError::Io {
            path: PathBuf::from("."),
            source,
        })?,
    };
    Ok(export::save(&figure, &export, &root)?)
}

/// Draw every panel into an in-memory figure without writing anything.
pub fn build_figure(spec: &FigureSpec, options: &RenderOptions) -> Result<Figure> {
    let registry = options.registry.clone().unwrap_or_else(global_registry);
    let mut figure = Figure::new(spec);

    for (i, panel) in spec.panels.iter().enumerate() {
        let Some(ax) = figure.axes_mut(i) else { continue };
        ax.xscale = panel.axes.xscale;
        ax.yscale = panel.axes.yscale;
        for series in &panel.series {
            let layer = registry.get(&series.kind)?;
            let table = data::resolve(series, &spec.base_dir, options.external.as_ref())?;
            layer.draw(ax, &table, series)?;
        }
        let drawn = draw_overlays(ax, &panel.overlays);
        if drawn < panel.overlays.len() {
            diagnostics::warn(format!(
                "panel {}: drew {} of {} overlays",
                i,
                drawn,
                panel.overlays.len()
            ));
        }
        axes::view_limits(ax, &panel.axes);
    }

    let removed = figure.remove_unused(spec.panels.len());
    if removed > 0 {
        tracing::debug!("removed {} unused axes", removed);
    }

    share_limits(&mut figure, spec.layout.shared_x, spec.layout.shared_y);

    for (i, panel) in spec.panels.iter().enumerate() {
        if let Some(ax) = figure.axes_mut(i) {
            axes::apply_pinned(ax);
            axes::decorate(ax, &panel.axes, &spec.font, &format!("panels[{}].axes", i))?;
        }
    }
    hide_inner_tick_labels(&mut figure, spec.layout.shared_x, spec.layout.shared_y);
    Ok(figure)
}

fn union(a: Option<(f64, f64)>, b: Option<(f64, f64)>) -> Option<(f64, f64)> {
    match (a, b) {
        (Some((a0, a1)), Some((b0, b1))) => Some((a0.min(b0), a1.max(b1))),
        (x, None) | (None, x) => x,
    }
}

/// Give shared axes the union of their view limits.
fn share_limits(figure: &mut Figure, x: bool, y: bool) {
    if !(x || y) {
        return;
    }
    let (mut xs, mut ys) = (None, None);
    for (_, ax) in figure.visible() {
        xs = union(xs, ax.xlim);
        ys = union(ys, ax.ylim);
    }
    for (_, ax) in figure.visible_mut() {
        if x {
            ax.xlim = xs;
        }
        if y {
            ax.ylim = ys;
        }
    }
}

/// Shared axes only label the outer row and column.
fn hide_inner_tick_labels(figure: &mut Figure, x: bool, y: bool) {
    let rows = figure.rows();
    let cols = figure.cols();
    let cells: Vec<(usize, (usize, usize))> = figure.visible().map(|(i, _)| (i, figure.cell(i))).collect();
    for (i, (row, col)) in cells {
        // A cell is the bottom of its column when nothing visible sits below it.
        let bottom = (row + 1..rows).all(|r| figure.axes(r * cols + col).is_none());
        let Some(ax) = figure.axes_mut(i) else { continue };
        if x && !bottom {
            if let Some(t) = ax.xticks.as_mut() {
                t.labels.iter_mut().for_each(|l| l.text.clear());
            }
        }
        if y && col > 0 {
            if let Some(t) = ax.yticks.as_mut() {
                t.labels.iter_mut().for_each(|l| l.text.clear());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Table;
    use crate::error::{DataError, FigureError, LayerError};
    use crate::spec::SeriesSpec;
    use crate::surface::{Mark, Surface};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::HashMap;

    fn spec(doc: serde_json::Value) -> FigureSpec {
        load(doc).unwrap()
    }

    fn runs() -> Table {
        Table::from_columns(vec![("t", vec![1.0, 2.0, 3.0]), ("v", vec![2.0, 4.0, 8.0])]).unwrap()
    }

    fn options() -> RenderOptions {
        let mut tables = HashMap::new();
        tables.insert("runs".to_string(), runs());
        RenderOptions::default()
            .with_external(External::Named(tables))
            .with_registry(LayerRegistry::builtin())
    }

    #[test]
    fn panels_fill_the_grid_row_major() {
        let s = spec(json!({
            "size": {"width": 6, "height": 3},
            "layout": {"rows": 1, "cols": 3},
            "panels": [
                {"series": [{"type": "line", "x": "t", "y": "v", "data": "runs"}]},
                {"series": [{"type": "scatter", "x": "t", "y": "v", "data": "runs"}]}
            ]
        }));
        let fig = build_figure(&s, &options()).unwrap();
        assert_eq!(fig.visible().count(), 2);
        assert!(fig.axes(2).is_none());
        assert!(matches!(fig.axes(1).unwrap().artists()[0].mark, Mark::Scatter { .. }));
    }

    #[test]
    fn unknown_layers_stop_before_drawing() {
        let s = spec(json!({
            "size": {"width": 3, "height": 3},
            "panels": [{"series": [{"type": "nonexistent", "data": "runs"}]}]
        }));
        match build_figure(&s, &options()) {
            Err(FigureError::UnknownLayer(e)) => assert_eq!(e.0, "nonexistent"),
            other => panic!("expected an unknown layer error, got {other:?}"),
        }
    }

    #[test]
    fn cdf_limits_beat_configured_limits() {
        let s = spec(json!({
            "size": {"width": 3, "height": 3},
            "panels": [{
                "axes": {"yscale": "log", "limits": {"y": [5, 50]}},
                "series": [{"type": "ecdf", "x": "v", "data": "runs"}]
            }]
        }));
        let fig = build_figure(&s, &options()).unwrap();
        assert_eq!(fig.axes(0).unwrap().ylim, Some((0.0, 1.0)));
    }

    #[test]
    fn layer_errors_propagate() {
        let mut registry = LayerRegistry::builtin();
        registry.register("broken", |_: &mut dyn Surface, _: &Table, _: &SeriesSpec| -> std::result::Result<(), LayerError> {
            Err(DataError::Callable("no rows".into()).into())
        });
        let s = spec(json!({
            "size": {"width": 3, "height": 3},
            "panels": [{"series": [{"type": "broken", "data": "runs"}]}]
        }));
        let opts = RenderOptions {
            registry: Some(registry),
            ..options()
        };
        assert!(matches!(build_figure(&s, &opts), Err(FigureError::Data(DataError::Callable(_)))));
    }

    #[test]
    fn shared_axes_use_one_range_and_label_the_outside() {
        let mut tables = HashMap::new();
        tables.insert("a".to_string(), Table::from_columns(vec![("x", vec![0.0, 1.0]), ("y", vec![0.0, 1.0])]).unwrap());
        tables.insert("b".to_string(), Table::from_columns(vec![("x", vec![0.0, 3.0]), ("y", vec![0.0, 2.0])]).unwrap());
        let s = spec(json!({
            "size": {"width": 4, "height": 4},
            "layout": {"rows": 2, "cols": 1, "shared_x": true},
            "panels": [
                {"series": [{"type": "line", "x": "x", "y": "y", "data": "a"}]},
                {"series": [{"type": "line", "x": "x", "y": "y", "data": "b"}]}
            ]
        }));
        let opts = RenderOptions::default()
            .with_external(External::Named(tables))
            .with_registry(LayerRegistry::builtin());
        let fig = build_figure(&s, &opts).unwrap();
        let (top, bottom) = (fig.axes(0).unwrap(), fig.axes(1).unwrap());
        assert_eq!(top.xlim, bottom.xlim);
        assert_ne!(top.ylim, bottom.ylim);
        let texts = |ax: &crate::surface::Axes| -> Vec<String> {
            ax.xticks.as_ref().unwrap().labels.iter().map(|l| l.text.clone()).collect()
        };
        assert!(texts(top).iter().all(String::is_empty));
        assert!(texts(bottom).iter().any(|t| !t.is_empty()));
    }
}
