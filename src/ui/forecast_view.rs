// ============================================================================
// Vue prévision et composantes
// ============================================================================
// Prévision : historique réel, estimation (yhat) et bande [lower, upper]
// Composantes : tendance puis chaque saisonnalité active, un graphique par
// composante empilés verticalement
// ============================================================================

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Color,
    Frame,
};

use crate::app::App;
use crate::models::{coin_label, Forecast, ForecastComponents};
use crate::ui::chart::{build_chart, empty_message, line_dataset, render_no_data};

/// Dessine la prévision à 5 ans
pub fn render_forecast(frame: &mut Frame, app: &App, area: Rect) {
    let forecast = match app.forecast() {
        Some(f) if !f.is_empty() => f,
        _ => {
            render_no_data(frame, area, &forecast_empty_message(app));
            return;
        }
    };

    let (yhat, lower, upper) = forecast.chart_lines();
    let actual = app.primary().map(|s| s.chart_points()).unwrap_or_default();

    let mut datasets = vec![
        line_dataset("Borne basse", Color::DarkGray, &lower),
        line_dataset("Borne haute", Color::DarkGray, &upper),
        line_dataset("Prévision", Color::Yellow, &yhat),
    ];
    let mut series: Vec<&[(f64, f64)]> = vec![lower.as_slice(), upper.as_slice(), yhat.as_slice()];
    if !actual.is_empty() {
        datasets.push(line_dataset("Réel", Color::Cyan, &actual));
        series.push(actual.as_slice());
    }

    let title = format!(" {} ", forecast_title(forecast));
    frame.render_widget(build_chart(datasets, &series, title, "Prix ($)"), area);
}

/// Dessine la décomposition (tendance + saisonnalités actives)
pub fn render_components(frame: &mut Frame, app: &App, area: Rect) {
    let forecast = match app.forecast() {
        Some(f) if !f.components.is_empty() => f,
        _ => {
            render_no_data(frame, area, &forecast_empty_message(app));
            return;
        }
    };

    let panels = component_series(&forecast.components);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Ratio(1, panels.len() as u32); panels.len()])
        .split(area)
        .to_vec();

    for ((name, points), chunk) in panels.iter().zip(chunks) {
        let datasets = vec![line_dataset(name, Color::Yellow, points)];
        let title = format!(" {} - {} ", coin_label(&forecast.coin), name);
        frame.render_widget(build_chart(datasets, &[points.as_slice()], title, *name), chunk);
    }
}

/// Séries (nom, points) des composantes présentes
///
/// La tendance est toujours présente ; une saisonnalité n'apparaît que si
/// elle a été activée lors de l'ajustement.
pub fn component_series(components: &[ForecastComponents]) -> Vec<(&'static str, Vec<(f64, f64)>)> {
    let x = |c: &ForecastComponents| c.timestamp.timestamp() as f64;

    let mut panels: Vec<(&'static str, Vec<(f64, f64)>)> =
        vec![("Tendance", components.iter().map(|c| (x(c), c.trend)).collect())];

    let seasonal: [(&'static str, fn(&ForecastComponents) -> Option<f64>); 3] = [
        ("Annuelle", |c| c.yearly),
        ("Hebdomadaire", |c| c.weekly),
        ("Journalière", |c| c.daily),
    ];
    for (name, get) in seasonal {
        if components.first().and_then(get).is_some() {
            panels.push((name, components.iter().filter_map(|c| get(c).map(|v| (x(c), v))).collect()));
        }
    }

    panels
}

fn forecast_title(forecast: &Forecast) -> String {
    let horizon = forecast.future().len();
    if horizon == 0 {
        format!("{} - {}", coin_label(&forecast.coin), forecast.mode.label())
    } else {
        format!(
            "{} - {} - +{} jours",
            coin_label(&forecast.coin),
            forecast.mode.label(),
            horizon
        )
    }
}

fn forecast_empty_message(app: &App) -> String {
    match &app.pass {
        Some(pass) if !pass.halted && pass.primary.is_some() => {
            "Prévision indisponible (voir le bandeau)".to_string()
        }
        _ => empty_message(app),
    }
}
