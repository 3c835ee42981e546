// ============================================================================
// Dashboard - Rendu de l'interface principale
// ============================================================================
// Dessine l'interface TUI en utilisant les widgets de ratatui
//
//   ┌ onglets ─────────────────────────────┐
//   │ sélections (coin, comparaison, ...)  │
//   │ bandeau de messages (si non vide)    │
//   │ contenu de l'onglet                  │
//   │ raccourcis                           │
//   └──────────────────────────────────────┘
//
// CONCEPTS RATATUI :
// 1. Frame : surface de dessin
// 2. Layout : découpage de l'espace en zones
// 3. Tabs : barre d'onglets
// ============================================================================

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};

use crate::app::{App, Screen};
use crate::error::Severity;
use crate::models::coin_label;
use crate::pipeline::worst_severity;
use crate::ui::{chart, forecast_view, markets};

/// Dessine l'interface complète
///
/// CONCEPT RUST : Routing avec match sur enum
/// - Le compilateur garantit l'exhaustivité (tous les écrans gérés)
pub fn render(frame: &mut Frame, app: &App) {
    let notices = app.notices();
    let chunks = create_layout(frame.size(), notices.len());

    render_tabs(frame, app, chunks[0]);
    render_selection_bar(frame, app, chunks[1]);
    if !notices.is_empty() {
        render_notices(frame, app, chunks[2]);
    }

    let content = chunks[3];
    match app.current_screen {
        Screen::History => {
            let parts = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(3), Constraint::Min(0)])
                .split(content);
            chart::render_change_banner(frame, app, parts[0]);
            chart::render_history(frame, app, parts[1]);
        }
        Screen::Forecast => forecast_view::render_forecast(frame, app, content),
        Screen::Components => forecast_view::render_components(frame, app, content),
        Screen::Markets => markets::render_markets(frame, app, content),
    }

    render_footer(frame, app, chunks[4]);
}

// ============================================================================
// Layout : Découpage de l'écran
// ============================================================================

/// Crée le layout principal (onglets, sélections, messages, contenu, footer)
///
/// Le bandeau de messages prend une ligne par message (zéro si aucun).
fn create_layout(area: Rect, notice_count: usize) -> Vec<Rect> {
    let notice_height = if notice_count == 0 {
        0
    } else {
        notice_count.min(4) as u16 + 2
    };

    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(notice_height),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(area)
        .to_vec()
}

// ============================================================================
// Header : onglets
// ============================================================================

fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = Screen::ALL
        .iter()
        .enumerate()
        .map(|(i, screen)| Line::from(format!("{} {}", i + 1, screen.title())))
        .collect();

    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(" CoinCast ")
                .title_alignment(Alignment::Center),
        )
        .select(app.current_screen.index())
        .style(Style::default().fg(Color::Gray))
        .highlight_style(
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        );

    frame.render_widget(tabs, area);
}

// ============================================================================
// Sélections courantes
// ============================================================================

fn render_selection_bar(frame: &mut Frame, app: &App, area: Rect) {
    let selection = &app.selection;
    let key = |k: &'static str| {
        Span::styled(k, Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    };
    let value = |v: String| Span::styled(v, Style::default().fg(Color::White));

    let compare = selection
        .compare
        .as_deref()
        .map(coin_label)
        .unwrap_or_else(|| "aucune".to_string());

    let mut spans = vec![
        key("Coin "),
        value(coin_label(&selection.coin)),
        Span::raw("   "),
        key("Comparaison "),
        value(compare),
        Span::raw("   "),
        key("Fenêtre "),
        value(selection.window.label()),
        Span::raw("   "),
        key("Source "),
        value(selection.source.label().to_string()),
        Span::raw("   "),
        key("Mode "),
        value(selection.mode.label().to_string()),
    ];

    if app.is_loading_data() {
        let message = app.loading_message.as_deref().unwrap_or("Chargement...");
        spans.push(Span::raw("   "));
        spans.push(Span::styled(
            format!("⟳ {}", message),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
        ));
    }

    let paragraph = Paragraph::new(Line::from(spans))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .alignment(Alignment::Center);

    frame.render_widget(paragraph, area);
}

// ============================================================================
// Bandeau de messages
// ============================================================================

fn severity_style(severity: Severity) -> (Color, &'static str) {
    match severity {
        Severity::Error => (Color::Red, "✖"),
        Severity::Warning => (Color::Yellow, "⚠"),
        Severity::Info => (Color::Green, "ℹ"),
    }
}

fn render_notices(frame: &mut Frame, app: &App, area: Rect) {
    let notices = app.notices();

    let border = worst_severity(notices.iter().copied())
        .map(|s| severity_style(s).0)
        .unwrap_or(Color::Gray);

    let lines: Vec<Line> = notices
        .iter()
        .take(4)
        .map(|notice| {
            let (color, icon) = severity_style(notice.severity);
            Line::from(Span::styled(
                format!("{} {}", icon, notice.message),
                Style::default().fg(color),
            ))
        })
        .collect();

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(" Messages "),
    );

    frame.render_widget(paragraph, area);
}

// ============================================================================
// Footer : Instructions
// ============================================================================

/// Dessine le footer avec les raccourcis clavier
fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let shortcut = |k: &'static str| {
        Span::styled(k, Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    };

    let line = if app.is_awaiting_quit_confirmation() {
        Line::from(vec![
            Span::styled(
                "⚠  Appuyez sur ",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                "[q]",
                Style::default()
                    .fg(Color::Red)
                    .add_modifier(Modifier::BOLD)
                    .add_modifier(Modifier::SLOW_BLINK),
            ),
            Span::styled(
                " à nouveau pour quitter, ou n'importe quelle autre touche pour annuler ⚠",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
        ])
    } else {
        Line::from(vec![
            shortcut("[q]"),
            Span::raw(" Quit  "),
            shortcut("[c/C]"),
            Span::raw(" Coin  "),
            shortcut("[v]"),
            Span::raw(" Comparer  "),
            shortcut("[ [ ] ]"),
            Span::raw(" Fenêtre  "),
            shortcut("[s]"),
            Span::raw(" Source  "),
            shortcut("[f]"),
            Span::raw(" Mode  "),
            shortcut("[Tab/1-4]"),
            Span::raw(" Onglet  "),
            shortcut("[r]"),
            Span::raw(" Rafraîchir  "),
            shortcut("[e]"),
            Span::raw(" Export"),
        ])
    };

    let paragraph = Paragraph::new(vec![line])
        .block(block)
        .alignment(Alignment::Center);

    frame.render_widget(paragraph, area);
}
