use crmql::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Erreur de base de données: {0}")]
    Store(#[from] StoreError),

    #[error("Erreur du serveur: {0}")]
    Server(String),

    #[error("Commande inconnue: {0}")]
    UnknownCommand(String),

    #[error("Aucune base ouverte (utilisez --db ou --server)")]
    NotConnected,

    #[error("{0} n'est disponible que sur une base locale")]
    LocalOnly(&'static str),
}
