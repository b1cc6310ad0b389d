use std::path::Path;

use anyhow::Result;
use crmql::DatabaseConfig;
use log::info;

use crate::context::Context;

/// Exécute la commande de connexion à un serveur
pub fn execute(context: &mut Context, server_url: &str) -> Result<()> {
    // Se connecter au serveur
    context.connect(server_url)?;

    // Afficher un message de succès
    println!("{}", context.formatter().format_success(&format!("Connecté au serveur: {}", server_url)));

    Ok(())
}

/// Ouvre un fichier local
pub fn open(context: &mut Context, path: &Path, config: DatabaseConfig) -> Result<()> {
    context.open(path, config)?;
    info!("Base ouverte: {}", path.display());
    Ok(())
}
