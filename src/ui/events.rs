// ============================================================================
// Gestion des événements
// ============================================================================
// Lecture des événements clavier (crossterm) et helpers de reconnaissance
// des touches
//
// CONCEPTS RUST :
// 1. Enums avec variants : représenter différents types d'événements
// 2. Pattern matching : reconnaître une touche en une ligne
// 3. Error handling avec Result
// ============================================================================

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind};

/// Événements de l'application
#[derive(Debug, Clone)]
pub enum Event {
    /// Touche pressée
    Key(KeyEvent),

    /// Tick régulier (réception des passes, rafraîchissement)
    Tick,
}

/// Gestionnaire d'événements
pub struct EventHandler {
    tick_rate: Duration,
}

impl EventHandler {
    pub fn new() -> Self {
        Self {
            tick_rate: Duration::from_millis(250),
        }
    }

    /// Lit le prochain événement (bloquant avec timeout)
    ///
    /// Sans événement avant le timeout, retourne Event::Tick.
    pub fn next(&self) -> Result<Event> {
        if event::poll(self.tick_rate)? {
            match event::read()? {
                // Sur certains OS, on reçoit Press ET Release : seul Press compte
                CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => Ok(Event::Key(key)),
                _ => Ok(Event::Tick),
            }
        } else {
            Ok(Event::Tick)
        }
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Helpers : Convertir KeyEvent en action
// ============================================================================

/// Code de touche d'un événement clavier
fn key_code(event: &Event) -> Option<KeyCode> {
    match event {
        Event::Key(key) => Some(key.code),
        Event::Tick => None,
    }
}

/// 'q' : quitter (two-step)
pub fn is_quit_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('q') | KeyCode::Char('Q')))
}

pub fn is_escape_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Esc))
}

/// 'c' : coin suivant
pub fn is_next_coin_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('c')))
}

/// 'C' : coin précédent
pub fn is_previous_coin_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('C')))
}

/// 'v' : coin de comparaison suivant (ou aucun)
pub fn is_compare_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('v') | KeyCode::Char('V')))
}

/// ']' : fenêtre suivante
pub fn is_next_window_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char(']')))
}

/// '[' : fenêtre précédente
pub fn is_previous_window_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('[')))
}

/// 's' : bascule OHLC / market chart
pub fn is_source_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('s') | KeyCode::Char('S')))
}

/// 'f' : bascule du mode de prévision
pub fn is_mode_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('f') | KeyCode::Char('F')))
}

/// 'r' : rafraîchir (vide le cache)
pub fn is_refresh_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('r') | KeyCode::Char('R')))
}

/// 'e' : exporter la prévision
pub fn is_export_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('e') | KeyCode::Char('E')))
}

/// Tab : onglet suivant
pub fn is_tab_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Tab))
}

/// '1'..'4' : numéro d'onglet
pub fn screen_number(event: &Event) -> Option<u32> {
    match key_code(event) {
        Some(KeyCode::Char(c @ '1'..='4')) => c.to_digit(10),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::empty()))
    }

    #[test]
    fn test_is_quit_event() {
        assert!(is_quit_event(&key(KeyCode::Char('q'))));
        assert!(!is_quit_event(&key(KeyCode::Char('a'))));
        assert!(!is_quit_event(&Event::Tick));
    }

    #[test]
    fn test_coin_keys_are_case_sensitive() {
        assert!(is_next_coin_event(&key(KeyCode::Char('c'))));
        assert!(!is_next_coin_event(&key(KeyCode::Char('C'))));
        assert!(is_previous_coin_event(&key(KeyCode::Char('C'))));
    }

    #[test]
    fn test_window_keys() {
        assert!(is_next_window_event(&key(KeyCode::Char(']'))));
        assert!(is_previous_window_event(&key(KeyCode::Char('['))));
    }

    #[test]
    fn test_screen_number() {
        assert_eq!(screen_number(&key(KeyCode::Char('1'))), Some(1));
        assert_eq!(screen_number(&key(KeyCode::Char('4'))), Some(4));
        assert_eq!(screen_number(&key(KeyCode::Char('5'))), None);
        assert_eq!(screen_number(&Event::Tick), None);
    }
}
