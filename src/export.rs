// ============================================================================
// Module : export
// ============================================================================
// Export de la prévision vers un classeur Excel (.xlsx)
//
// - Une seule feuille "Forecast"
// - Colonnes : ds, yhat, yhat_lower, yhat_upper
// - ds écrit en texte "AAAA-MM-JJ HH:MM:SS.mmm" (UTC, à la milliseconde)
//
// Le classeur est produit en mémoire ; il peut ensuite être écrit sur disque
// ou encodé en URI data: base64 pour un lien de téléchargement.
// ============================================================================

use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use chrono::{NaiveDateTime, Utc};
use rust_xlsxwriter::Workbook;
use tracing::{debug, info, instrument};

use crate::error::{DashboardError, Result};
use crate::models::{Forecast, ForecastPoint};

/// Nom de la feuille du classeur
pub const SHEET_NAME: &str = "Forecast";

/// En-têtes de colonnes
pub const HEADERS: [&str; 4] = ["ds", "yhat", "yhat_lower", "yhat_upper"];

/// Type MIME d'un classeur OOXML
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Format d'écriture de ds (les timestamps CoinGecko sont en millisecondes)
const DS_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Format de relecture : la fraction de seconde est optionnelle
const DS_PARSE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Sérialise la prévision en classeur .xlsx (octets)
#[instrument(skip(forecast), fields(coin = %forecast.coin, rows = forecast.len()))]
pub fn forecast_workbook(forecast: &Forecast) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (col, header) in HEADERS.iter().enumerate() {
        worksheet.write_string(0, col as u16, *header)?;
    }

    for (i, point) in forecast.points.iter().enumerate() {
        let row = (i + 1) as u32;
        worksheet.write_string(row, 0, point.timestamp.format(DS_FORMAT).to_string())?;
        worksheet.write_number(row, 1, point.yhat)?;
        worksheet.write_number(row, 2, point.yhat_lower)?;
        worksheet.write_number(row, 3, point.yhat_upper)?;
    }

    let bytes = workbook.save_to_buffer()?;
    debug!(bytes = bytes.len(), "Workbook serialized");
    Ok(bytes)
}

/// Nom de fichier : {coin}_forecast_{AAAAMMJJ}.xlsx
pub fn export_file_name(coin: &str) -> String {
    format!("{}_forecast_{}.xlsx", coin, Utc::now().format("%Y%m%d"))
}

/// Fichiers produits par un export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedForecast {
    /// Classeur .xlsx
    pub workbook: PathBuf,

    /// Page HTML portant le lien de téléchargement (URI data:)
    pub link: PathBuf,
}

/// Écrit la prévision dans `dir` : le classeur et sa page de téléchargement
pub fn write_forecast(forecast: &Forecast, dir: &Path) -> Result<ExportedForecast> {
    let bytes = forecast_workbook(forecast)?;

    // Relecture avant écriture : un classeur illisible n'est jamais livré
    let written = read_forecast(&bytes)?;
    if written.len() != forecast.len() {
        return Err(DashboardError::Export(format!(
            "{} lignes relues sur {}",
            written.len(),
            forecast.len()
        )));
    }

    std::fs::create_dir_all(dir)
        .map_err(|e| DashboardError::Export(format!("{} : {}", dir.display(), e)))?;

    let file_name = export_file_name(&forecast.coin);
    let workbook = dir.join(&file_name);
    write_file(&workbook, &bytes)?;

    let link = workbook.with_extension("html");
    write_file(&link, download_link_html(&file_name, &bytes).as_bytes())?;

    info!(path = %workbook.display(), bytes = bytes.len(), "Forecast exported");
    Ok(ExportedForecast { workbook, link })
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).map_err(|e| DashboardError::Export(format!("{} : {}", path.display(), e)))
}

/// URI data: prête à servir de lien de téléchargement
pub fn data_uri(bytes: &[u8]) -> String {
    format!("data:{};base64,{}", XLSX_MIME, STANDARD.encode(bytes))
}

/// Page HTML minimale avec un lien de téléchargement du classeur
///
/// Le classeur est embarqué dans le lien, la page s'ouvre sans serveur.
pub fn download_link_html(file_name: &str, bytes: &[u8]) -> String {
    format!(
        "<!DOCTYPE html>\n<html><body>\n<a download=\"{name}\" href=\"{uri}\">Télécharger {name}</a>\n</body></html>\n",
        name = file_name,
        uri = data_uri(bytes),
    )
}

/// Relit un classeur produit par `forecast_workbook`
pub fn read_forecast(bytes: &[u8]) -> Result<Vec<ForecastPoint>> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes.to_vec()))?;
    let range = workbook.worksheet_range(SHEET_NAME)?;

    let mut rows = range.rows();
    let header: Vec<String> = rows
        .next()
        .ok_or_else(|| DashboardError::Export("feuille vide".to_string()))?
        .iter()
        .map(|cell| cell.to_string())
        .collect();
    if header != HEADERS {
        return Err(DashboardError::Export(format!("en-têtes inattendus : {:?}", header)));
    }

    rows.enumerate()
        .map(|(i, row)| parse_row(row).ok_or_else(|| {
            DashboardError::Export(format!("ligne {} invalide", i + 2))
        }))
        .collect()
}

fn parse_row(row: &[Data]) -> Option<ForecastPoint> {
    let ds = match row.first()? {
        Data::String(s) => NaiveDateTime::parse_from_str(s, DS_PARSE_FORMAT).ok()?.and_utc(),
        _ => return None,
    };
    let number = |i: usize| match row.get(i)? {
        Data::Float(f) => Some(*f),
        Data::Int(n) => Some(*n as f64),
        _ => None,
    };

    Some(ForecastPoint {
        timestamp: ds,
        yhat: number(1)?,
        yhat_lower: number(2)?,
        yhat_upper: number(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::{self, ForecastConfig};
    use crate::models::{ForecastMode, Window};
    use crate::normalize;
    use chrono::{Duration, TimeZone};

    fn sample() -> Forecast {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let points = (0..3)
            .map(|i| ForecastPoint {
                timestamp: start + Duration::days(i),
                yhat: 100.0 + i as f64,
                yhat_lower: 90.0 + i as f64,
                yhat_upper: 110.5 + i as f64,
            })
            .collect();
        Forecast {
            coin: "solana".to_string(),
            mode: ForecastMode::Historical,
            points,
            components: Vec::new(),
            history_len: 2,
        }
    }

    #[test]
    fn test_workbook_reads_back() {
        let forecast = sample();
        let bytes = forecast_workbook(&forecast).unwrap();
        let points = read_forecast(&bytes).unwrap();

        assert_eq!(points, forecast.points);
    }

    #[test]
    fn test_millisecond_timestamps_survive_export() {
        // market_chart : le dernier point ("maintenant") porte des millisecondes
        let rows: Vec<[f64; 2]> = (0..30)
            .map(|i| [1_704_200_123_456.0 - (29 - i) as f64 * 86_400_000.0, 40_000.0 + i as f64 * 10.0])
            .collect();
        let series = normalize::market_chart_series("bitcoin", Window::Days(30), &rows).unwrap();
        let config = ForecastConfig {
            horizon_days: 10,
            ..Default::default()
        };
        let forecast = forecast::forecast(&series, ForecastMode::Historical, &config).unwrap();

        let points = read_forecast(&forecast_workbook(&forecast).unwrap()).unwrap();

        assert_eq!(points.len(), forecast.points.len());
        for (back, orig) in points.iter().zip(&forecast.points) {
            assert_eq!(back.timestamp, orig.timestamp);
            assert_eq!(back.timestamp.timestamp_subsec_millis(), 456);
        }
    }

    #[test]
    fn test_whole_seconds_still_parse() {
        let row = [
            Data::String("2024-03-01 12:30:00".to_string()),
            Data::Float(1.0),
            Data::Float(0.5),
            Data::Float(1.5),
        ];
        let point = parse_row(&row).unwrap();
        assert_eq!(point.timestamp, Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap());
    }

    #[test]
    fn test_file_name() {
        let name = export_file_name("bitcoin");
        assert!(name.starts_with("bitcoin_forecast_"));
        assert!(name.ends_with(".xlsx"));
        assert_eq!(name.len(), "bitcoin_forecast_20240101.xlsx".len());
    }

    #[test]
    fn test_data_uri_prefix() {
        let uri = data_uri(b"abc");
        assert_eq!(
            uri,
            "data:application/vnd.openxmlformats-officedocument.spreadsheetml.sheet;base64,YWJj"
        );
    }

    #[test]
    fn test_write_forecast_to_dir() {
        let dir = std::env::temp_dir().join(format!("coincast-export-{}", std::process::id()));
        let exported = write_forecast(&sample(), &dir).unwrap();

        assert!(exported.workbook.starts_with(&dir));
        let bytes = std::fs::read(&exported.workbook).unwrap();
        assert_eq!(read_forecast(&bytes).unwrap().len(), 3);

        // La page de téléchargement embarque exactement le classeur écrit
        let html = std::fs::read_to_string(&exported.link).unwrap();
        assert!(exported.link.extension().is_some_and(|ext| ext == "html"));
        assert!(html.contains(&data_uri(&bytes)));
        assert!(html.contains("download=\"solana_forecast_"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_garbage_is_export_error() {
        let err = read_forecast(b"not a workbook").unwrap_err();
        assert!(matches!(err, DashboardError::Export(_)));
    }
}
