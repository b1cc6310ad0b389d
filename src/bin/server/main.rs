use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;
use crmql::server::{lock_database, CrmqlServer, ServerConfig};
use crmql::{Database, DatabaseConfig, WhereMode};
use log::{info, warn};
use tokio::runtime::Runtime;

#[derive(Parser)]
#[command(name = "crmql-server")]
#[command(about = "Serveur HTTP pour les bases crmql", long_about = None)]
struct Cli {
    /// Chemin vers le fichier JSON de la base
    #[arg(short, long, default_value = "crm-data.json")]
    db_path: PathBuf,

    /// Port d'écoute
    #[arg(short, long, default_value_t = 3001)]
    port: u16,

    /// Adresse d'écoute
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Délai d'écriture après la dernière modification (ms)
    #[arg(long, default_value_t = 100)]
    debounce_ms: u64,

    /// Refuse les fragments WHERE non reconnus
    #[arg(long)]
    strict_where: bool,
}

fn main() -> Result<()> {
    // Initialiser le logger
    env_logger::init();

    // Parser les arguments
    let args = Cli::parse();

    let config = DatabaseConfig {
        save_debounce_ms: args.debounce_ms,
        where_mode: if args.strict_where {
            WhereMode::Strict
        } else {
            WhereMode::Lenient
        },
        ..DatabaseConfig::default()
    };

    // Ouvrir la base hors du runtime: le worker de sauvegarde a le sien
    info!("Ouverture de la base de données: {:?}", args.db_path);
    let database = Database::open_with_config(&args.db_path, config)?;

    let server = CrmqlServer::new(
        database,
        ServerConfig {
            port: args.port,
            host: args.host,
        },
    );

    // Créer un runtime Tokio manuellement au lieu d'utiliser la macro
    let rt = Runtime::new()?;
    let served = rt.block_on(server.run());
    drop(rt);

    // Dernière écriture une fois le serveur arrêté
    match server.into_database() {
        Ok(database) => database.close()?,
        Err(shared) => {
            warn!("Base encore partagée, écriture sans fermeture");
            lock_database(&shared).flush()?;
        }
    }
    info!("Base de données fermée");

    served.map_err(|e| anyhow!("Serveur: {}", e))
}
