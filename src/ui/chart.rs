// ============================================================================
// Chart - Graphique historique et bandeau de variation
// ============================================================================
// - Série principale : Close (et Open pour une source OHLC)
// - Avec un coin de comparaison : les deux séries rebasées à 100 sur leur
//   premier point, axe de temps partagé
// - Bandeau : variation jour précédent → dernier, coloré selon la polarité
//
// CONCEPTS RATATUI :
// 1. Chart widget : graphique ligne
// 2. Dataset : série de données à afficher
// 3. Axis : configuration des axes X et Y
// ============================================================================

use chrono::DateTime;
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame,
};

use crate::app::App;
use crate::models::{coin_label, Polarity};
use crate::models::ranking::format_price;

/// Dessine le graphique historique
pub fn render_history(frame: &mut Frame, app: &App, area: Rect) {
    let primary = match app.primary() {
        Some(series) if series.is_chartable() => series,
        _ => {
            render_no_data(frame, area, &empty_message(app));
            return;
        }
    };

    let primary_label = coin_label(&primary.coin);
    let title = format!(
        " {} - {} - {} ",
        primary_label,
        primary.window.label(),
        app.selection.source.label()
    );

    // Superposition : deux séries rebasées
    if let Some(other) = app.comparison().filter(|s| s.is_chartable()) {
        let main_points = primary.rebased_chart_points();
        let other_points = other.rebased_chart_points();
        let other_label = coin_label(&other.coin);

        let datasets = vec![
            line_dataset(&primary_label, Color::Cyan, &main_points),
            line_dataset(&other_label, Color::Magenta, &other_points),
        ];
        let chart = build_chart(
            datasets,
            &[main_points.as_slice(), other_points.as_slice()],
            format!(" {} vs {} (base 100) ", primary_label, other_label),
            "Base 100",
        );
        frame.render_widget(chart, area);
        return;
    }

    let close = primary.chart_points();
    let open = primary.open_chart_points();

    let mut datasets = vec![line_dataset("Close", Color::Cyan, &close)];
    let mut series: Vec<&[(f64, f64)]> = vec![close.as_slice()];
    if primary.is_ohlc() {
        datasets.push(line_dataset("Open", Color::DarkGray, &open));
        series.push(open.as_slice());
    }

    frame.render_widget(build_chart(datasets, &series, title, "Prix ($)"), area);
}

/// Dessine le bandeau de variation
pub fn render_change_banner(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let line = match (app.primary(), app.pass.as_ref().and_then(|p| p.change)) {
        (Some(series), Some(change)) => {
            let color = match change.polarity {
                Polarity::Positive => Color::Green,
                Polarity::Negative => Color::Red,
                Polarity::Flat => Color::Gray,
            };
            let price = series.last().map(|p| format_price(p.price)).unwrap_or_default();

            Line::from(vec![
                Span::styled(
                    coin_label(&series.coin),
                    Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
                ),
                Span::raw("  Prix: "),
                Span::styled(price, Style::default().fg(color).add_modifier(Modifier::BOLD)),
                Span::raw("  "),
                Span::styled(
                    format!("{} {}", change.arrow(), change.label()),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ),
            ])
        }
        (Some(_), None) => Line::from(Span::styled(
            "Variation indisponible (moins de deux points)",
            Style::default().fg(Color::Gray),
        )),
        (None, _) => Line::from(Span::styled("-", Style::default().fg(Color::Gray))),
    };

    let paragraph = Paragraph::new(vec![line])
        .block(block)
        .alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

// ============================================================================
// Helpers partagés avec la vue prévision
// ============================================================================

/// Dataset ligne
pub(crate) fn line_dataset<'a>(name: &str, color: Color, points: &'a [(f64, f64)]) -> Dataset<'a> {
    Dataset::default()
        .name(name.to_string())
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(color))
        .data(points)
}

/// Bornes [min, max] en X et Y de plusieurs séries, avec 5% de marge en Y
pub(crate) fn chart_bounds(series: &[&[(f64, f64)]]) -> Option<([f64; 2], [f64; 2])> {
    let mut points = series.iter().flat_map(|s| s.iter()).peekable();
    points.peek()?;

    let (x_min, x_max, y_min, y_max) = points.fold(
        (f64::MAX, f64::MIN, f64::MAX, f64::MIN),
        |(x0, x1, y0, y1), &(x, y)| (x0.min(x), x1.max(x), y0.min(y), y1.max(y)),
    );

    let margin = ((y_max - y_min) * 0.05).max(y_max.abs() * 0.01).max(1e-9);
    let x_max = if x_max > x_min { x_max } else { x_min + 1.0 };
    Some(([x_min, x_max], [y_min - margin, y_max + margin]))
}

/// Date courte (AAAA-MM-JJ) d'une abscisse en secondes Unix
pub(crate) fn date_label(x: f64) -> String {
    DateTime::from_timestamp(x as i64, 0)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Label de prix pour l'axe Y
pub(crate) fn value_label(y: f64) -> String {
    if y.abs() >= 100.0 {
        format!("{:.0}", y)
    } else {
        format!("{:.4}", y)
    }
}

/// Chart complet avec axes datés
pub(crate) fn build_chart<'a>(
    datasets: Vec<Dataset<'a>>,
    series: &[&[(f64, f64)]],
    title: String,
    y_title: &'a str,
) -> Chart<'a> {
    let ([x_min, x_max], [y_min, y_max]) =
        chart_bounds(series).unwrap_or(([0.0, 1.0], [0.0, 1.0]));

    let x_axis = Axis::default()
        .style(Style::default().fg(Color::Gray))
        .bounds([x_min, x_max])
        .labels(vec![
            Span::raw(date_label(x_min)),
            Span::raw(date_label((x_min + x_max) / 2.0)),
            Span::raw(date_label(x_max)),
        ]);

    let y_axis = Axis::default()
        .title(y_title)
        .style(Style::default().fg(Color::Gray))
        .bounds([y_min, y_max])
        .labels(vec![
            Span::raw(value_label(y_min)),
            Span::raw(value_label((y_min + y_max) / 2.0)),
            Span::raw(value_label(y_max)),
        ]);

    Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(title),
        )
        .x_axis(x_axis)
        .y_axis(y_axis)
}

/// Message quand la passe n'a rien à afficher
pub(crate) fn empty_message(app: &App) -> String {
    if app.is_loading_data() && app.pass.is_none() {
        return "Chargement...".to_string();
    }
    match &app.pass {
        Some(pass) if pass.halted => "Données indisponibles (voir le bandeau)".to_string(),
        Some(_) => "Pas de données à afficher".to_string(),
        None => "Aucune donnée".to_string(),
    }
}

/// Affiche un message quand il n'y a pas de données à afficher
pub(crate) fn render_no_data(frame: &mut Frame, area: Rect, message: &str) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let text = vec![
        Line::from(""),
        Line::from(Span::styled(message, Style::default().fg(Color::Gray))),
    ];

    let paragraph = Paragraph::new(text)
        .block(block)
        .alignment(Alignment::Center);

    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_bounds() {
        let a = [(0.0, 10.0), (10.0, 20.0)];
        let b = [(5.0, 5.0), (20.0, 15.0)];
        let ([x0, x1], [y0, y1]) = chart_bounds(&[&a[..], &b[..]]).unwrap();

        assert_eq!((x0, x1), (0.0, 20.0));
        assert!(y0 < 5.0 && y1 > 20.0);
        assert!(chart_bounds(&[]).is_none());
    }

    #[test]
    fn test_flat_series_has_non_empty_bounds() {
        let flat = [(0.0, 42.0), (0.0, 42.0)];
        let ([x0, x1], [y0, y1]) = chart_bounds(&[&flat[..]]).unwrap();
        assert!(x1 > x0);
        assert!(y1 > y0);
    }

    #[test]
    fn test_date_label() {
        assert_eq!(date_label(1_704_067_200.0), "2024-01-01");
    }
}
