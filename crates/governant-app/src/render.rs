//! Render use case: one report, one output format.

use governant_render::RenderableReport;
use governant_settings::OutputFormat;

/// Render `report` for stdout. The result always ends with a newline unless it is empty.
pub fn render(report: &RenderableReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => line(governant_render::render_json(report)),
        OutputFormat::Pretty => line(governant_render::render_json_pretty(report)),
        OutputFormat::Text => governant_render::render_text(report),
        OutputFormat::Markdown => governant_render::render_markdown(report),
        OutputFormat::Github => governant_render::render_github_annotations(report)
            .into_iter()
            .map(line)
            .collect(),
    }
}

fn line(mut s: String) -> String {
    s.push('\n');
    s
}
