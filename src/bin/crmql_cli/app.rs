use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use crmql::{DatabaseConfig, WhereMode};
use log::info;

use crate::commands;
use crate::context::Context;
use crate::formatters::OutputFormat;
use crate::repl::Repl;

#[derive(Parser)]
#[command(name = "crmql")]
#[command(about = "CLI pour les bases crmql", long_about = None)]
struct Cli {
    /// Niveau de verbosité
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Format de sortie (text, json, table)
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Désactive les couleurs
    #[arg(long)]
    no_color: bool,

    /// Mode interactif (REPL)
    #[arg(short, long)]
    interactive: bool,

    /// Fichier JSON de la base locale
    #[arg(short, long, conflicts_with = "server")]
    db: Option<PathBuf>,

    /// URL du serveur crmql
    #[arg(short, long)]
    server: Option<String>,

    /// Refuse les fragments WHERE non reconnus
    #[arg(long)]
    strict_where: bool,

    /// Délai d'écriture après la dernière modification (ms)
    #[arg(long, default_value_t = 100)]
    debounce_ms: u64,

    /// Commande à exécuter
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Exécuter une instruction
    Exec {
        /// Instruction à exécuter
        sql: String,

        /// Paramètres positionnels (scalaires JSON, sinon chaînes)
        #[arg(allow_hyphen_values = true)]
        params: Vec<String>,
    },

    /// Nombre de lignes par table
    Tables,

    /// Insérer les données de démonstration
    Seed,
}

impl Cli {
    fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            save_debounce_ms: self.debounce_ms,
            where_mode: if self.strict_where {
                WhereMode::Strict
            } else {
                WhereMode::Lenient
            },
            ..DatabaseConfig::default()
        }
    }
}

/// Initialise le logger; `RUST_LOG` reste prioritaire
fn init_logger(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();
}

/// Exécute l'application CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);
    info!("Démarrage de l'application crmql CLI");

    let config = cli.database_config();

    let mut context = Context::new(cli.verbose, cli.format, !cli.no_color)?;

    if let Some(path) = &cli.db {
        commands::connect::open(&mut context, path, config.clone())?;
    }
    if let Some(server) = &cli.server {
        commands::connect::execute(&mut context, server)?;
    }

    let outcome = match cli.command {
        Some(Commands::Exec { sql, params }) => {
            let params = commands::exec::parse_params(&params);
            commands::exec::execute(&mut context, &sql, &params)
        }
        Some(Commands::Tables) => commands::tables::execute(&mut context),
        Some(Commands::Seed) => commands::seed::execute(&mut context),
        None if cli.interactive || context.is_connected() => {
            return Repl::new(context, config)?.run()?.close();
        }
        None => {
            println!("Erreur : Aucune commande spécifiée et aucune base ouverte.");
            println!("Utilisez --help pour voir les options disponibles.");
            Ok(())
        }
    };

    // Écrire la base même si la commande a échoué
    let closed = context.close();
    outcome.and(closed)
}
