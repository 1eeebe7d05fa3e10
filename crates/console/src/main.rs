//! `scriptrunner` -- run a Kotlin or Swift script and stream its console.
//!
//! Usage: `scriptrunner [SCRIPT_PATH]`. Without a path the language
//! template is run. Ctrl-C or SIGTERM stops the script; the process exits
//! with the script's exit code (130 when stopped).
//!
//! # Environment variables
//!
//! | Variable                      | Default              | Description                        |
//! |-------------------------------|----------------------|------------------------------------|
//! | `SCRIPTRUNNER_LANGUAGE`       | `kotlin`             | Language when the path has no known extension |
//! | `SCRIPTRUNNER_KOTLIN_COMMAND` | `kotlinc -script`    | Kotlin interpreter prefix          |
//! | `SCRIPTRUNNER_SWIFT_COMMAND`  | `/usr/bin/env swift` | Swift interpreter prefix           |
//! | `SCRIPTRUNNER_TEMP_DIR`       | system temp dir      | Where scripts are written          |
//! | `SCRIPTRUNNER_LOG_FORMAT`     | `text`               | `text` or `json` log lines         |
//! | `RUST_LOG`                    | `scriptrunner=info,scriptrunner_core=info` | Log filter |

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scriptrunner_console::config::{ConsoleConfig, LogFormat};
use scriptrunner_console::render::Renderer;
use scriptrunner_console::session::{Intent, RunState, Session, SessionEffect};
use scriptrunner_core::language::ScriptLanguage;
use scriptrunner_core::scripting::run::RunScript;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = ConsoleConfig::from_env()?;
    init_tracing(config.log_format);

    let script_path = std::env::args_os().nth(1).map(PathBuf::from);
    let language = script_path
        .as_deref()
        .and_then(language_for)
        .unwrap_or(config.default_language);

    let run_script = RunScript::new(Arc::new(config.executor()));
    let mut session = Session::new(run_script, language);
    if let Some(path) = &script_path {
        let code = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        session.on_intent(Intent::UpdateCode(code));
    }

    tracing::info!(
        language = language.id(),
        script = ?script_path,
        "Starting script runner"
    );

    let mut effects = session
        .take_effects()
        .context("Session effects already taken")?;
    let mut states = session.subscribe();
    let mut renderer = Renderer::new(std::io::stdout(), std::io::stderr());

    session.on_intent(Intent::RunScript);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    let mut stop_requested = false;

    loop {
        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let idle = {
                    let state = states.borrow_and_update();
                    renderer.render(state.run_count, &state.output_lines)?;
                    state.run_state == RunState::Idle
                };
                if idle {
                    break;
                }
            }
            Some(effect) = effects.recv() => {
                if let SessionEffect::ShowErrorToast(message) = effect {
                    tracing::warn!(%message, "Script execution failed");
                }
            }
            _ = &mut shutdown, if !stop_requested => {
                stop_requested = true;
                tracing::info!("Stop requested, terminating script");
                session.on_intent(Intent::StopScript);
            }
        }
    }

    // Let the execution finish its teardown and deliver any trailing output.
    session.wait().await;
    let state = session.state();
    renderer.render(state.run_count, &state.output_lines)?;

    let code = state.exit_code.unwrap_or_default();
    tracing::info!(exit_code = code, "Script runner finished");
    std::process::exit(code);
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "scriptrunner=info,scriptrunner_core=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

fn language_for(path: &Path) -> Option<ScriptLanguage> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(ScriptLanguage::from_extension)
}

/// Resolves on Ctrl-C or SIGTERM. A handler that fails to install is
/// logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
