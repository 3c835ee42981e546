// ============================================================================
// Vue marchés : classement par capitalisation
// ============================================================================
// CONCEPT RATATUI : Table widget
// - header() : ligne d'en-tête
// - widths : contraintes de largeur par colonne
// - Row / Cell : une ligne, une cellule (avec style)
// ============================================================================

use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Row, Table},
    Frame,
};

use crate::app::App;
use crate::models::ranking::{format_market_cap, format_price};
use crate::models::MarketRankingRow;
use crate::ui::chart::{empty_message, render_no_data};

/// Dessine le classement
pub fn render_markets(frame: &mut Frame, app: &App, area: Rect) {
    let rows = match &app.pass {
        Some(pass) if !pass.rankings.is_empty() => &pass.rankings,
        Some(pass) if !pass.halted => {
            render_no_data(frame, area, "Classement indisponible (voir le bandeau)");
            return;
        }
        _ => {
            render_no_data(frame, area, &empty_message(app));
            return;
        }
    };

    let header = Row::new(vec!["#", "Nom", "Symbole", "Prix", "Capitalisation", "24h"])
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .bottom_margin(1);

    let widths = [
        Constraint::Length(3),
        Constraint::Min(12),
        Constraint::Length(8),
        Constraint::Length(14),
        Constraint::Length(16),
        Constraint::Length(10),
    ];

    let table = Table::new(rows.iter().enumerate().map(|(i, row)| ranking_row(i + 1, row)), widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(format!(" Top {} par capitalisation ", rows.len())),
        );

    frame.render_widget(table, area);
}

fn ranking_row(rank: usize, row: &MarketRankingRow) -> Row<'static> {
    let change_color = match row.price_change_24h {
        Some(_) if row.is_positive() => Color::Green,
        Some(_) => Color::Red,
        None => Color::Gray,
    };

    Row::new(vec![
        Cell::from(rank.to_string()),
        Cell::from(row.name.clone()),
        Cell::from(row.symbol.to_uppercase()),
        Cell::from(format_price(row.current_price)),
        Cell::from(format_market_cap(row.market_cap)),
        Cell::from(row.change_label()).style(Style::default().fg(change_color)),
    ])
}
