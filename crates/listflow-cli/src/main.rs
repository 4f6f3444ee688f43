//! CLI de listflow.
//!
//! ```bash
//! listflow run --workflow flows/listing.json --config-dir config --resume
//! listflow run --workflow flows/listing.json --allow-shrink
//! listflow history listings/mug.json
//! listflow insight best_niche --include-expired
//! ```
//!
//! Códigos de salida:
//! - 0: corrida completa / consulta exitosa
//! - 1: error de entorno o de ejecución
//! - 2: error de configuración
//! - 3: corrida detenida (halt suave)
//! - 4: ya hay una corrida en curso

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "listflow", version, about = "Motor de workflows declarativos con persistencia versionada")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ejecuta un workflow.
    Run {
        /// Definición del workflow (JSON).
        #[arg(long)]
        workflow: PathBuf,
        /// Directorio con policy / rules / profiles / contracts.
        #[arg(long, env = "LISTFLOW_CONFIG_DIR")]
        config_dir: Option<PathBuf>,
        /// Reanuda desde el último step completado en el run-state.
        #[arg(long)]
        resume: bool,
        /// Permite que una corrida nueva reemplace un run-state más grande.
        #[arg(long, conflicts_with = "resume")]
        allow_shrink: bool,
    },
    /// Lista las versiones de un artifact.
    History {
        base_path: String,
    },
    /// Muestra el insight más reciente para una clave.
    Insight {
        key: String,
        #[arg(long)]
        include_expired: bool,
    },
}

fn main() -> ExitCode {
    listflow_persistence::init_dotenv();
    let cli = Cli::parse();
    let code = match commands::dispatch(cli.command) {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("{err:#}");
            eprintln!("error: {err:#}");
            commands::exit_code_for(&err)
        }
    };
    ExitCode::from(code)
}
