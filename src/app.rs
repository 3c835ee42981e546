// ============================================================================
// Structure : App
// ============================================================================
// Gère l'état global de l'application TUI
//
// - Sélections courantes (coin, comparaison, fenêtre, source, mode)
// - Écran affiché (onglets)
// - Dernière passe de rendu reçue du worker
// - Messages locaux (export, etc.)
//
// PATTERN : "Application State"
// - Tous les composants de l'UI lisent depuis App
// - Toutes les modifications passent par les méthodes de App
// - Chaque écran est une fonction pure de (sélections, dernière passe)
// ============================================================================

use crate::api::SourceKind;
use crate::models::{Forecast, PriceSeries, COINS};
use crate::pipeline::{Notice, RenderPass, Selection};

// ============================================================================
// Enum : Screen
// ============================================================================
// CONCEPT RUST : Enums pour state machines
// - Un seul écran actif à la fois
// - Le compilateur force à gérer tous les cas (exhaustivité)
// ============================================================================

/// Écrans (onglets) de l'application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Graphique historique + bandeau de variation
    History,
    /// Prévision à 5 ans avec intervalle
    Forecast,
    /// Décomposition tendance / saisonnalités
    Components,
    /// Classement par capitalisation
    Markets,
}

impl Screen {
    /// Ordre des onglets
    pub const ALL: [Screen; 4] = [
        Screen::History,
        Screen::Forecast,
        Screen::Components,
        Screen::Markets,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Screen::History => "Historique",
            Screen::Forecast => "Prévision",
            Screen::Components => "Composantes",
            Screen::Markets => "Marchés",
        }
    }

    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|s| s == self).unwrap_or(0)
    }

    /// Onglet suivant (cycle)
    pub fn next(&self) -> Screen {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    /// Onglet depuis un numéro 1..=4
    pub fn from_number(n: u32) -> Option<Screen> {
        match n {
            1..=4 => Some(Self::ALL[n as usize - 1]),
            _ => None,
        }
    }
}

/// État principal de l'application
pub struct App {
    /// Indique si l'application doit continuer à tourner
    pub running: bool,

    /// Écran actuellement affiché
    pub current_screen: Screen,

    /// Sélections de l'utilisateur
    pub selection: Selection,

    /// Two-step quit : première pression de 'q' = confirmation demandée
    pub confirm_quit: bool,

    /// Une passe est en cours dans le worker
    pub is_loading: bool,

    /// Message affiché pendant le chargement
    pub loading_message: Option<String>,

    /// Dernière passe reçue (None avant la première)
    pub pass: Option<RenderPass>,

    /// Messages produits côté UI (export), vidés à chaque nouvelle passe
    pub local_notices: Vec<Notice>,
}

impl App {
    pub fn new() -> Self {
        Self::with_selection(Selection::default())
    }

    /// Crée une App avec des sélections initiales
    pub fn with_selection(selection: Selection) -> Self {
        Self {
            running: true,
            current_screen: Screen::History,
            selection,
            confirm_quit: false,
            is_loading: false,
            loading_message: None,
            pass: None,
            local_notices: Vec::new(),
        }
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    // ========================================================================
    // Écrans
    // ========================================================================

    pub fn next_screen(&mut self) {
        self.current_screen = self.current_screen.next();
    }

    pub fn show_screen(&mut self, screen: Screen) {
        self.current_screen = screen;
    }

    // ========================================================================
    // Sélections
    // ========================================================================
    // Chaque changement de sélection invalide la passe affichée : l'appelant
    // doit demander une nouvelle passe au worker.

    fn coin_index(&self) -> usize {
        COINS
            .iter()
            .position(|c| *c == self.selection.coin)
            .unwrap_or(0)
    }

    /// Coin suivant dans le catalogue (cycle)
    pub fn next_coin(&mut self) {
        let i = (self.coin_index() + 1) % COINS.len();
        self.selection.coin = COINS[i].to_string();
    }

    /// Coin précédent dans le catalogue (cycle)
    pub fn previous_coin(&mut self) {
        let i = (self.coin_index() + COINS.len() - 1) % COINS.len();
        self.selection.coin = COINS[i].to_string();
    }

    /// Coin de comparaison suivant : aucun → coins (sauf le principal) → aucun
    pub fn cycle_compare(&mut self) {
        let candidates: Vec<&str> = COINS
            .iter()
            .copied()
            .filter(|c| *c != self.selection.coin)
            .collect();

        let next = match self.selection.compare.as_deref() {
            None => candidates.first().copied(),
            Some(current) => candidates
                .iter()
                .position(|c| *c == current)
                .and_then(|i| candidates.get(i + 1).copied()),
        };
        self.selection.compare = next.map(str::to_string);
    }

    pub fn next_window(&mut self) {
        self.selection.window = self.selection.window.next();
    }

    pub fn previous_window(&mut self) {
        self.selection.window = self.selection.window.previous();
    }

    pub fn toggle_source(&mut self) {
        self.selection.source = self.selection.source.toggle();
    }

    pub fn toggle_mode(&mut self) {
        self.selection.mode = self.selection.mode.toggle();
    }

    pub fn source(&self) -> SourceKind {
        self.selection.source
    }

    // ========================================================================
    // Quit
    // ========================================================================

    pub fn request_quit(&mut self) {
        self.confirm_quit = true;
    }

    pub fn cancel_quit(&mut self) {
        self.confirm_quit = false;
    }

    pub fn is_awaiting_quit_confirmation(&self) -> bool {
        self.confirm_quit
    }

    // ========================================================================
    // Chargement et passes
    // ========================================================================

    pub fn start_loading(&mut self, message: Option<String>) {
        self.is_loading = true;
        self.loading_message = message;
    }

    pub fn stop_loading(&mut self) {
        self.is_loading = false;
        self.loading_message = None;
    }

    pub fn is_loading_data(&self) -> bool {
        self.is_loading
    }

    /// Installe une passe reçue du worker
    ///
    /// Retourne false si la passe correspond à d'anciennes sélections (une
    /// autre passe est alors attendue et le chargement continue).
    pub fn apply_pass(&mut self, pass: RenderPass) -> bool {
        let current = pass.selection == self.selection;
        self.pass = Some(pass);
        self.local_notices.clear();
        if current {
            self.stop_loading();
        }
        current
    }

    /// Ajoute un message local (export, etc.)
    pub fn push_notice(&mut self, notice: Notice) {
        self.local_notices.push(notice);
    }

    /// Tous les messages à afficher : ceux de la passe puis les locaux
    pub fn notices(&self) -> Vec<&Notice> {
        self.pass
            .iter()
            .flat_map(|p| p.notices.iter())
            .chain(self.local_notices.iter())
            .collect()
    }

    pub fn primary(&self) -> Option<&PriceSeries> {
        self.pass.as_ref().and_then(|p| p.primary.as_ref())
    }

    pub fn comparison(&self) -> Option<&PriceSeries> {
        self.pass.as_ref().and_then(|p| p.comparison.as_ref())
    }

    pub fn forecast(&self) -> Option<&Forecast> {
        self.pass.as_ref().and_then(|p| p.forecast.as_ref())
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Severity;
    use crate::models::{ForecastMode, Window};

    #[test]
    fn test_app_creation() {
        let app = App::new();
        assert!(app.is_running());
        assert_eq!(app.current_screen, Screen::History);
        assert_eq!(app.selection.coin, "bitcoin");
        assert!(app.pass.is_none());
        assert!(app.notices().is_empty());
    }

    #[test]
    fn test_app_quit() {
        let mut app = App::new();
        app.request_quit();
        assert!(app.is_awaiting_quit_confirmation());
        app.cancel_quit();
        assert!(!app.is_awaiting_quit_confirmation());

        app.quit();
        assert!(!app.is_running());
    }

    #[test]
    fn test_screen_cycle() {
        let mut app = App::new();
        app.next_screen();
        assert_eq!(app.current_screen, Screen::Forecast);
        app.next_screen();
        app.next_screen();
        app.next_screen();
        assert_eq!(app.current_screen, Screen::History);

        assert_eq!(Screen::from_number(4), Some(Screen::Markets));
        assert_eq!(Screen::from_number(0), None);
        assert_eq!(Screen::from_number(5), None);
    }

    #[test]
    fn test_coin_cycle() {
        let mut app = App::new();
        app.next_coin();
        assert_eq!(app.selection.coin, "ethereum");
        app.previous_coin();
        app.previous_coin();
        assert_eq!(app.selection.coin, "solana");
    }

    #[test]
    fn test_compare_cycle_skips_primary_and_wraps_to_none() {
        let mut app = App::new();
        assert_eq!(app.selection.compare, None);

        let mut seen = Vec::new();
        for _ in 0..COINS.len() {
            app.cycle_compare();
            seen.push(app.selection.compare.clone());
        }

        assert_eq!(
            seen,
            vec![
                Some("ethereum".to_string()),
                Some("dogecoin".to_string()),
                Some("cardano".to_string()),
                Some("solana".to_string()),
                None,
            ]
        );
    }

    #[test]
    fn test_toggles() {
        let mut app = App::new();
        app.toggle_mode();
        assert_eq!(app.selection.mode, ForecastMode::FlatProjection);
        app.toggle_source();
        assert_eq!(app.source(), SourceKind::MarketChart);
        app.next_window();
        assert_eq!(app.selection.window, Window::Days(90));
    }

    #[test]
    fn test_apply_pass() {
        let mut app = App::new();
        app.start_loading(Some("Chargement".to_string()));
        app.push_notice(Notice::info("ancien"));

        // Passe obsolète : le chargement continue
        let stale = RenderPass {
            selection: Selection {
                coin: "cardano".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(!app.apply_pass(stale));
        assert!(app.is_loading_data());

        let pass = RenderPass {
            selection: app.selection.clone(),
            notices: vec![Notice::new(Severity::Warning, "vide")],
            ..Default::default()
        };
        assert!(app.apply_pass(pass));
        assert!(!app.is_loading_data());
        assert_eq!(app.notices().len(), 1);

        app.push_notice(Notice::info("export"));
        assert_eq!(app.notices().len(), 2);
    }
}
