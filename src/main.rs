use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

use metascope::config::Config;
use metascope::dispatch::Router;
use metascope::logging::build_dispatch;
use metascope::pipeline;

#[derive(Parser)]
#[command(name = "metascope")]
#[command(about = "Extrae metadata de imágenes y documentos hacia un sobre JSON")]
#[command(version)]
struct Cli {
    /// Archivo de configuración JSON
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Hilos de extracción (0 = uno por CPU)
    #[arg(short, long, global = true)]
    workers: Option<usize>,

    /// Nivel de log cuando METASCOPE_LOG no está definido
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clasifica por tipo MIME cada archivo de un directorio
    Classify {
        dir: PathBuf,

        /// Sobre de tipos MIME (por defecto `<temp_dir>/mime.json`)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Extrae metadata a partir de un sobre de tipos MIME
    Extract {
        mime_envelope: PathBuf,

        /// Sobre de resultados (por defecto `<results_dir>/result_<fecha>.json`)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Clasifica y extrae en una sola pasada
    Run {
        /// Directorio de entrada (por defecto `input_dir`)
        dir: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err:#}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    if let Some(level) = cli.log_level.clone() {
        config.log_level = level;
    }

    let dispatch = build_dispatch(&config.log_level);
    let router = Router::new(dispatch.clone(), config.workers);
    let outcome = tracing::dispatcher::with_default(&dispatch, || {
        let result = execute(cli.command, &config, &router);
        if let Err(err) = &result {
            error!("{err:#}");
        }
        result
    });

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}

fn execute(command: Commands, config: &Config, router: &Router) -> Result<()> {
    match command {
        Commands::Classify { dir, output } => {
            let output = output.unwrap_or_else(|| config.mime_envelope_path());
            let map = pipeline::classify(&dir, &output)?;
            info!(files = map.len(), path = %output.display(), "clasificación completa");
        }
        Commands::Extract {
            mime_envelope,
            output,
        } => {
            let output = output.unwrap_or_else(|| config.timestamped_result_path());
            let envelope = pipeline::extract(router, &mime_envelope, &output)?;
            let diagnostics = envelope
                .values()
                .filter(|result| result.diagnostic().is_some())
                .count();
            info!(
                files = envelope.len(),
                diagnostics,
                path = %output.display(),
                "extracción completa"
            );
        }
        Commands::Run { dir } => {
            let output = pipeline::run(config, router, dir.as_deref())?;
            info!(path = %output.display(), "ejecución completa");
        }
    }
    Ok(())
}
