// ============================================================================
// CoinCast - Tableau de bord crypto en terminal
// ============================================================================
// Historique des prix (CoinGecko), comparaison de deux coins, classement des
// capitalisations et prévision à 5 ans, le tout dans un TUI.
//
// CONCEPTS RUST CLÉS :
// 1. Terminal raw mode : contrôle total du terminal
// 2. Event loop : boucle qui gère événements et rendering
// 3. Async dans sync : un worker thread avec son propre runtime tokio
// 4. Channels mpsc : l'UI envoie des commandes, le worker renvoie des passes
// ============================================================================

use std::io;
use std::sync::mpsc;

use anyhow::{Context, Result};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{debug, error, info, warn};

use coincast::api::CoinGeckoClient;
use coincast::app::{App, Screen};
use coincast::config::Config;
use coincast::error::Severity;
use coincast::export;
use coincast::models::coin_label;
use coincast::pipeline::{self, Notice, RenderPass, Selection};
use coincast::ui::{events::EventHandler, render};

// ============================================================================
// AppCommand / AppResult : protocole UI ↔ worker
// ============================================================================

/// Commandes envoyées au worker thread
#[derive(Debug, Clone)]
enum AppCommand {
    /// Exécuter une passe de rendu pour ces sélections
    /// - clear_cache : rafraîchissement manuel, ignore le cache
    Refresh { selection: Selection, clear_cache: bool },
}

/// Résultats renvoyés par le worker thread
#[derive(Debug)]
enum AppResult {
    /// Passe terminée (les erreurs sont dans pass.notices)
    PassCompleted(Box<RenderPass>),

    /// Le worker n'a pas pu démarrer (runtime ou client HTTP)
    WorkerFailed(String),
}

// ============================================================================
// Initialisation du logging
// ============================================================================
// Les println! ne fonctionnent pas une fois le TUI lancé : on log vers un
// fichier avec rotation quotidienne.
// ============================================================================

/// Initialise le système de logging vers fichier
///
/// Les logs sont écrits dans ./logs/coincast.log (rotation quotidienne)
///
/// # Utilisation
/// ```bash
/// tail -f logs/coincast.log
/// RUST_LOG=coincast=trace cargo run
/// ```
fn init_logging() -> Result<()> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let log_dir = std::path::PathBuf::from("./logs");
    std::fs::create_dir_all(&log_dir).context("Échec de la création du répertoire de logs")?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir.clone(), "coincast.log");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true),
        )
        .with(
            // Par défaut : debug pour coincast, info pour les dépendances
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coincast=debug,info".into()),
        )
        .init();

    info!(?log_dir, "Logging initialisé");
    Ok(())
}

// ============================================================================
// Point d'entrée du programme
// ============================================================================

fn main() -> Result<()> {
    init_logging().unwrap_or_else(|e| {
        eprintln!("⚠️  Warning: Failed to initialize logging: {}", e);
        eprintln!("   Continuing without logging...");
    });

    info!("CoinCast starting up");
    let config = Config::default();

    let (command_tx, command_rx) = mpsc::channel::<AppCommand>();
    let (result_tx, result_rx) = mpsc::channel::<AppResult>();

    info!("Spawning background worker thread");
    spawn_background_worker(config.clone(), command_rx, result_tx);

    debug!("Setting up terminal");
    let mut terminal = setup_terminal()?;

    let mut app = App::new();
    let events = EventHandler::new();

    // Première passe dès le démarrage
    request_pass(&mut app, &command_tx, false);

    info!("Starting event loop");
    let result = run(&mut terminal, &mut app, &config, &events, &command_tx, &result_rx);

    // Restaure le terminal (même en cas d'erreur)
    debug!("Restoring terminal");
    restore_terminal(&mut terminal)?;

    match &result {
        Ok(_) => info!("Application exited normally"),
        Err(e) => error!(error = ?e, "Application exited with error"),
    }

    result
}

// ============================================================================
// Background Worker Thread
// ============================================================================
// - Possède le client CoinGecko (et donc le cache de la session)
// - Exécute les passes de manière séquentielle
// - Si plusieurs commandes s'accumulent, seule la plus récente est exécutée
// ============================================================================

/// Worker thread qui exécute les passes de rendu en arrière-plan
fn spawn_background_worker(
    config: Config,
    command_rx: mpsc::Receiver<AppCommand>,
    result_tx: mpsc::Sender<AppResult>,
) {
    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Runtime::new() {
            Ok(runtime) => runtime,
            Err(e) => {
                error!(error = %e, "Failed to create tokio runtime");
                let _ = result_tx.send(AppResult::WorkerFailed(e.to_string()));
                return;
            }
        };

        let client = match CoinGeckoClient::new(&config) {
            Ok(client) => client,
            Err(e) => {
                error!(error = %e, "Failed to create CoinGecko client");
                let _ = result_tx.send(AppResult::WorkerFailed(e.to_string()));
                return;
            }
        };
        let forecast_config = config.forecast();

        while let Ok(mut command) = command_rx.recv() {
            // Coalesce : ne garde que la dernière commande en attente
            let mut clear_cache = false;
            while let Ok(next) = command_rx.try_recv() {
                let AppCommand::Refresh { clear_cache: c, .. } = &command;
                clear_cache |= *c;
                command = next;
            }

            let AppCommand::Refresh { selection, clear_cache: c } = command;
            info!(coin = %selection.coin, window = %selection.window.as_query(), "Worker received refresh");

            if clear_cache || c {
                debug!("Clearing response cache");
                client.clear_cache();
            }

            let source = client.price_source(selection.source);
            let pass = runtime.block_on(pipeline::run_pass(
                source.as_ref(),
                &client,
                &selection,
                &forecast_config,
            ));

            if result_tx.send(AppResult::PassCompleted(Box::new(pass))).is_err() {
                break;
            }
        }

        info!("Worker thread exiting (channel closed)");
    });
}

/// Envoie une demande de passe pour les sélections courantes
fn request_pass(app: &mut App, command_tx: &mpsc::Sender<AppCommand>, clear_cache: bool) {
    app.start_loading(Some(format!(
        "Chargement de {} ({})...",
        coin_label(&app.selection.coin),
        app.selection.window.label()
    )));

    let command = AppCommand::Refresh {
        selection: app.selection.clone(),
        clear_cache,
    };
    if command_tx.send(command).is_err() {
        error!("Worker thread disconnected");
        app.stop_loading();
        app.push_notice(Notice::new(Severity::Error, "Le worker de données est arrêté"));
    }
}

// ============================================================================
// Event Loop Principal
// ============================================================================
// À chaque itération :
//   0. Résultats du worker
//   1. Rendu
//   2. Événements clavier
// ============================================================================

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    config: &Config,
    events: &EventHandler,
    command_tx: &mpsc::Sender<AppCommand>,
    result_rx: &mpsc::Receiver<AppResult>,
) -> Result<()> {
    while app.is_running() {
        // 0. Résultats du worker (non bloquant)
        match result_rx.try_recv() {
            Ok(AppResult::PassCompleted(pass)) => {
                let notices = pass.notices.len();
                let worst = pass.worst_severity();
                if app.apply_pass(*pass) {
                    info!(notices, worst = ?worst, "Render pass applied");
                } else {
                    debug!("Stale render pass received, waiting for the next one");
                }
            }
            Ok(AppResult::WorkerFailed(message)) => {
                app.stop_loading();
                app.push_notice(Notice::new(
                    Severity::Error,
                    format!("Le worker de données n'a pas démarré : {}", message),
                ));
            }
            Err(mpsc::TryRecvError::Empty) => {}
            Err(mpsc::TryRecvError::Disconnected) => {
                if app.is_loading_data() {
                    error!("Worker thread disconnected");
                    app.stop_loading();
                }
            }
        }

        // 1. Rendu
        terminal.draw(|frame| render(frame, app))?;

        // 2. Événements
        match events.next() {
            Ok(event) => handle_event(app, config, event, command_tx),
            Err(e) => warn!(error = %e, "Failed to read terminal event"),
        }
    }

    Ok(())
}

// ============================================================================
// Gestion des événements
// ============================================================================

/// Traite un événement et met à jour l'état de l'application
///
/// Chaque changement de sélection déclenche une nouvelle passe.
fn handle_event(
    app: &mut App,
    config: &Config,
    event: coincast::ui::events::Event,
    command_tx: &mpsc::Sender<AppCommand>,
) {
    use coincast::ui::events::{
        is_compare_event, is_escape_event, is_export_event, is_mode_event, is_next_coin_event,
        is_next_window_event, is_previous_coin_event, is_previous_window_event, is_quit_event,
        is_refresh_event, is_source_event, is_tab_event, screen_number, Event,
    };

    if let Event::Tick = event {
        return;
    }

    // Two-step quit : toute autre touche annule la confirmation
    if is_quit_event(&event) {
        if app.is_awaiting_quit_confirmation() {
            info!("User confirmed quit");
            app.quit();
        } else {
            info!("User requested quit (awaiting confirmation)");
            app.request_quit();
        }
        return;
    }
    app.cancel_quit();

    if is_escape_event(&event) {
        app.show_screen(Screen::History);
    } else if is_tab_event(&event) {
        app.next_screen();
    } else if let Some(screen) = screen_number(&event).and_then(Screen::from_number) {
        app.show_screen(screen);
    } else if is_next_coin_event(&event) {
        app.next_coin();
        info!(coin = %app.selection.coin, "User changed coin");
        request_pass(app, command_tx, false);
    } else if is_previous_coin_event(&event) {
        app.previous_coin();
        info!(coin = %app.selection.coin, "User changed coin");
        request_pass(app, command_tx, false);
    } else if is_compare_event(&event) {
        app.cycle_compare();
        info!(compare = ?app.selection.compare, "User changed comparison coin");
        request_pass(app, command_tx, false);
    } else if is_next_window_event(&event) {
        app.next_window();
        info!(window = %app.selection.window.label(), "User changed window");
        request_pass(app, command_tx, false);
    } else if is_previous_window_event(&event) {
        app.previous_window();
        info!(window = %app.selection.window.label(), "User changed window");
        request_pass(app, command_tx, false);
    } else if is_source_event(&event) {
        app.toggle_source();
        info!(source = app.selection.source.label(), "User changed source shape");
        request_pass(app, command_tx, false);
    } else if is_mode_event(&event) {
        app.toggle_mode();
        info!(mode = app.selection.mode.label(), "User changed forecast mode");
        request_pass(app, command_tx, false);
    } else if is_refresh_event(&event) {
        info!("User requested refresh");
        request_pass(app, command_tx, true);
    } else if is_export_event(&event) {
        export_forecast(app, config);
    }
}

/// Exporte la prévision affichée dans le répertoire d'export
fn export_forecast(app: &mut App, config: &Config) {
    let result = match app.forecast() {
        Some(forecast) => export::write_forecast(forecast, &config.export_dir),
        None => {
            app.push_notice(Notice::new(Severity::Warning, "Aucune prévision à exporter"));
            return;
        }
    };

    match result {
        Ok(exported) => app.push_notice(Notice::info(format!(
            "Prévision exportée : {} (lien : {})",
            exported.workbook.display(),
            exported.link.display()
        ))),
        Err(e) => {
            error!(error = %e, "Export failed");
            app.push_notice(Notice::new(e.severity(), e.to_string()));
        }
    }
}

// ============================================================================
// Setup et restauration du terminal
// ============================================================================
// IMPORTANT : Toujours restaurer le terminal avant de quitter !
// ============================================================================

/// Configure le terminal en mode TUI
fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode().context("Échec de l'activation du raw mode")?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("Échec de la création du terminal")
}

/// Restaure le terminal à son état normal
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    Ok(())
}
