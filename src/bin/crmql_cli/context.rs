use std::path::Path;

use anyhow::{anyhow, Result};
use crmql::{Database, DatabaseConfig, Record, Value};
use log::debug;
use tokio::runtime::Runtime;

use crate::client::{ClientConfig, CrmqlClient};
use crate::formatters::json::JsonFormatter;
use crate::formatters::table::TableFormatter;
use crate::formatters::text::TextFormatter;
use crate::formatters::{Formatter, OutputFormat};
use crate::utils::error::CliError;

/// Cible des instructions: un fichier local ou un serveur distant
pub enum Backend {
    Local(Database),
    Remote(CrmqlClient),
}

/// Contexte d'exécution du CLI
pub struct Context {
    /// Base ouverte
    backend: Option<Backend>,

    /// Format de sortie
    format: OutputFormat,

    /// Couleurs dans la sortie
    colored: bool,

    /// Niveau de verbosité
    verbosity: u8,

    /// Formateur actuel
    formatter: Box<dyn Formatter>,

    /// Paramètres liés par `.bind`
    bindings: Vec<Value>,

    /// Runtime Tokio pour les appels asynchrones
    runtime: Runtime,
}

fn make_formatter(format: OutputFormat, colored: bool) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter::new(colored)),
        OutputFormat::Json => Box::new(JsonFormatter::new()),
        OutputFormat::Table => Box::new(TableFormatter::new(colored)),
    }
}

impl Context {
    /// Crée un nouveau contexte
    pub fn new(verbosity: u8, format: OutputFormat, colored: bool) -> Result<Self> {
        // Créer un runtime Tokio
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| anyhow!("Failed to create Tokio runtime: {}", e))?;

        Ok(Context {
            backend: None,
            format,
            colored,
            verbosity,
            formatter: make_formatter(format, colored),
            bindings: Vec::new(),
            runtime,
        })
    }

    /// Vérifie si une base est ouverte
    pub fn is_connected(&self) -> bool {
        self.backend.is_some()
    }

    /// Description de la base ouverte, pour le prompt
    pub fn target(&self) -> Option<String> {
        match &self.backend {
            Some(Backend::Local(_)) => Some("local".to_string()),
            Some(Backend::Remote(client)) => Some(client.server_url().to_string()),
            None => None,
        }
    }

    /// Ouvre un fichier local, en fermant la base précédente
    pub fn open(&mut self, path: &Path, config: DatabaseConfig) -> Result<()> {
        let database = Database::open_with_config(path, config)?;
        self.release()?;
        self.backend = Some(Backend::Local(database));
        Ok(())
    }

    /// Se connecte à un serveur, en fermant la base précédente
    pub fn connect(&mut self, server_url: &str) -> Result<()> {
        let client = CrmqlClient::with_config(ClientConfig {
            server_url: server_url.to_string(),
        });

        // Vérifier la connexion
        let reachable = self.runtime.block_on(client.check_connection())?;
        if !reachable {
            return Err(CliError::Server(format!("{} ne répond pas", server_url)).into());
        }

        self.release()?;
        self.backend = Some(Backend::Remote(client));
        Ok(())
    }

    /// Exécute une instruction sur la base ouverte
    pub fn execute(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Record>> {
        debug!("Exécution de {:?} avec {} paramètre(s)", sql, params.len());
        match self.backend.as_mut() {
            Some(Backend::Local(database)) => Ok(database.execute(sql, params)?),
            Some(Backend::Remote(client)) => self.runtime.block_on(client.execute(sql, params)),
            None => Err(CliError::NotConnected.into()),
        }
    }

    /// Nombre de lignes par table
    pub fn tables(&self) -> Result<Vec<(String, usize)>> {
        match &self.backend {
            Some(Backend::Local(database)) => Ok(database.document().counts()),
            Some(Backend::Remote(client)) => {
                let counts = self.runtime.block_on(client.tables())?;
                Ok(counts.into_iter().map(|t| (t.name, t.rows)).collect())
            }
            None => Err(CliError::NotConnected.into()),
        }
    }

    /// Base locale, pour les commandes qui ne passent pas par HTTP
    pub fn database_mut(&mut self, command: &'static str) -> Result<&mut Database> {
        match self.backend.as_mut() {
            Some(Backend::Local(database)) => Ok(database),
            Some(Backend::Remote(_)) => Err(CliError::LocalOnly(command).into()),
            None => Err(CliError::NotConnected.into()),
        }
    }

    /// Obtient le formateur actuel
    pub fn formatter(&self) -> &dyn Formatter {
        self.formatter.as_ref()
    }

    /// Définit le format de sortie
    pub fn set_format(&mut self, format: OutputFormat) {
        if format != self.format {
            self.format = format;
            self.formatter = make_formatter(format, self.colored);
        }
    }

    /// Obtient le niveau de verbosité
    pub fn verbosity(&self) -> u8 {
        self.verbosity
    }

    /// Paramètres liés
    pub fn bindings(&self) -> &[Value] {
        &self.bindings
    }

    /// Remplace les paramètres liés
    pub fn set_bindings(&mut self, bindings: Vec<Value>) {
        self.bindings = bindings;
    }

    /// Écrit et libère la base ouverte
    fn release(&mut self) -> Result<()> {
        match self.backend.take() {
            Some(Backend::Local(database)) => database.close()?,
            Some(Backend::Remote(client)) => self.runtime.block_on(client.flush())?,
            None => {}
        }
        Ok(())
    }

    /// Ferme le contexte
    pub fn close(mut self) -> Result<()> {
        self.release()
    }
}
