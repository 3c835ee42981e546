// ============================================================================
// Structure : Window (fenêtre historique) et catalogue de coins
// ============================================================================
// La fenêtre détermine combien de jours d'historique sont demandés à l'API.
// CoinGecko accepte un nombre de jours ou la sentinelle "max".
// ============================================================================

/// Coins proposés dans le sélecteur (identifiants CoinGecko)
pub const COINS: [&str; 5] = ["bitcoin", "ethereum", "dogecoin", "cardano", "solana"];

/// Fenêtre historique demandée
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// Nombre de jours fixe
    Days(u32),
    /// Tout l'historique disponible
    Max,
}

impl Window {
    /// Préréglages du sélecteur, dans l'ordre d'affichage
    pub const PRESETS: [Window; 8] = [
        Window::Days(1),
        Window::Days(7),
        Window::Days(14),
        Window::Days(30),
        Window::Days(90),
        Window::Days(180),
        Window::Days(365),
        Window::Max,
    ];

    /// Valeur du paramètre `days` de l'API
    pub fn as_query(&self) -> String {
        match self {
            Window::Days(n) => n.to_string(),
            Window::Max => "max".to_string(),
        }
    }

    /// Label court pour l'affichage
    pub fn label(&self) -> String {
        match self {
            Window::Days(1) => "1J".to_string(),
            Window::Days(n) => format!("{}J", n),
            Window::Max => "MAX".to_string(),
        }
    }

    /// Position dans les préréglages (None pour une fenêtre libre)
    fn preset_index(&self) -> Option<usize> {
        Self::PRESETS.iter().position(|w| w == self)
    }

    /// Préréglage suivant (cycle)
    ///
    /// Une fenêtre libre passe au premier préréglage plus long.
    pub fn next(&self) -> Window {
        match self.preset_index() {
            Some(i) => Self::PRESETS[(i + 1) % Self::PRESETS.len()],
            None => Self::PRESETS
                .iter()
                .copied()
                .find(|w| w.rank() > self.rank())
                .unwrap_or(Window::Max),
        }
    }

    /// Préréglage précédent (cycle)
    pub fn previous(&self) -> Window {
        match self.preset_index() {
            Some(0) => Self::PRESETS[Self::PRESETS.len() - 1],
            Some(i) => Self::PRESETS[i - 1],
            None => Self::PRESETS
                .iter()
                .rev()
                .copied()
                .find(|w| w.rank() < self.rank())
                .unwrap_or(Window::Max),
        }
    }

    /// Clé d'ordre : Max est plus long que toute fenêtre en jours
    fn rank(&self) -> u64 {
        match self {
            Window::Days(n) => *n as u64,
            Window::Max => u64::MAX,
        }
    }
}

impl Default for Window {
    /// 30 jours par défaut
    fn default() -> Self {
        Window::Days(30)
    }
}

/// Label d'un coin pour l'affichage (ex: "BITCOIN")
pub fn coin_label(coin: &str) -> String {
    coin.to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_query() {
        assert_eq!(Window::Days(7).as_query(), "7");
        assert_eq!(Window::Max.as_query(), "max");
    }

    #[test]
    fn test_preset_cycle() {
        assert_eq!(Window::Days(1).next(), Window::Days(7));
        assert_eq!(Window::Days(365).next(), Window::Max);
        assert_eq!(Window::Max.next(), Window::Days(1)); // Boucle
        assert_eq!(Window::Days(1).previous(), Window::Max);
        assert_eq!(Window::Days(30).previous(), Window::Days(14));
    }

    #[test]
    fn test_free_window_snaps_to_presets() {
        assert_eq!(Window::Days(45).next(), Window::Days(90));
        assert_eq!(Window::Days(45).previous(), Window::Days(30));
        assert_eq!(Window::Days(500).next(), Window::Max);
    }

    #[test]
    fn test_labels() {
        assert_eq!(Window::Days(1).label(), "1J");
        assert_eq!(Window::Days(90).label(), "90J");
        assert_eq!(Window::Max.label(), "MAX");
        assert_eq!(coin_label("solana"), "SOLANA");
    }
}
