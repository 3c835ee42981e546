// ============================================================================
// Moindres carrés pénalisés pour l'ajustement du modèle
// ============================================================================
// Équations normales avec pénalité ridge par coefficient :
//   (XᵀX + diag(λ)) β = Xᵀy
// Symétrique définie positive dès que λ > 0 : résolue par la factorisation
// de Cholesky de nalgebra.
//
// CONCEPT RUST : DMatrix / DVector
// - Dimensions connues à l'exécution (nombre de changepoints et de termes
//   de Fourier variables selon l'historique)
// ============================================================================

use nalgebra::{Cholesky, DMatrix, DVector};

/// Accumulateur des équations normales, ligne par ligne
///
/// Évite de stocker la matrice de design complète.
#[derive(Debug, Clone)]
pub struct NormalEquations {
    xtx: DMatrix<f64>,
    xty: DVector<f64>,
}

impl NormalEquations {
    pub fn new(n: usize) -> Self {
        Self {
            xtx: DMatrix::zeros(n, n),
            xty: DVector::zeros(n),
        }
    }

    /// Ajoute une observation (ligne de features, valeur cible)
    pub fn add_row(&mut self, row: &[f64], y: f64) {
        debug_assert_eq!(row.len(), self.xty.len());
        let x = DVector::from_column_slice(row);

        // XᵀX += x·xᵀ ; Xᵀy += y·x
        self.xtx.ger(1.0, &x, &x, 1.0);
        self.xty.axpy(y, &x, 1.0);
    }

    /// Résout avec une pénalité ridge par coefficient
    ///
    /// Retourne None si le système n'est pas défini positif (pivot nul ou
    /// négligeable devant la diagonale).
    pub fn solve(&self, penalties: &[f64]) -> Option<Vec<f64>> {
        debug_assert_eq!(penalties.len(), self.xty.len());

        let mut a = self.xtx.clone();
        for (i, lambda) in penalties.iter().enumerate() {
            a[(i, i)] += lambda;
        }

        let diagonal: Vec<f64> = a.diagonal().iter().copied().collect();
        let cholesky = Cholesky::new(a)?;

        let l = cholesky.l_dirty();
        let well_posed = diagonal.iter().enumerate().all(|(i, d)| {
            let pivot = l[(i, i)] * l[(i, i)];
            pivot.is_finite() && pivot > d.abs() * 1e-12
        });
        if !well_posed {
            return None;
        }

        let beta = cholesky.solve(&self.xty);
        Some(beta.iter().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solve_2x2() {
        // [4 2; 2 3] x = [2; 1]  →  x = [0.5; 0]
        let mut eq = NormalEquations::new(2);
        eq.xtx = DMatrix::from_row_slice(2, 2, &[4.0, 2.0, 2.0, 3.0]);
        eq.xty = DVector::from_column_slice(&[2.0, 1.0]);

        let x = eq.solve(&[0.0, 0.0]).unwrap();
        assert!((x[0] - 0.5).abs() < 1e-12);
        assert!(x[1].abs() < 1e-12);
    }

    #[test]
    fn test_not_positive_definite() {
        let mut eq = NormalEquations::new(2);
        eq.xtx = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        eq.xty = DVector::from_column_slice(&[1.0, 1.0]);

        assert!(eq.solve(&[0.0, 0.0]).is_none());
    }

    #[test]
    fn test_least_squares_line() {
        // y = 3 + 2x exactement
        let mut eq = NormalEquations::new(2);
        for x in 0..10 {
            let x = x as f64;
            eq.add_row(&[1.0, x], 3.0 + 2.0 * x);
        }

        let beta = eq.solve(&[1e-12, 1e-12]).unwrap();
        assert!((beta[0] - 3.0).abs() < 1e-8);
        assert!((beta[1] - 2.0).abs() < 1e-8);
    }

    #[test]
    fn test_ridge_makes_collinear_system_solvable() {
        // Deux colonnes identiques : singulier sans pénalité
        let mut eq = NormalEquations::new(2);
        for _ in 0..5 {
            eq.add_row(&[1.0, 1.0], 4.0);
        }

        assert!(eq.solve(&[0.0, 0.0]).is_none());

        let beta = eq.solve(&[1e-6, 1e-6]).unwrap();
        assert!((beta[0] + beta[1] - 4.0).abs() < 1e-4);
    }
}
