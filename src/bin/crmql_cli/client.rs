//! Client HTTP pour communiquer avec le serveur crmql
//!
//! Ce module fournit une interface pour envoyer des instructions au serveur.

use anyhow::{anyhow, Result};
use crmql::server::routes::{ApiResponse, TableCount};
use crmql::{Record, Value};
use reqwest::Client as HttpClient;
use serde::Serialize;

use crate::utils::error::CliError;

/// Configuration du client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// URL du serveur
    pub server_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            server_url: "http://localhost:3001".to_string(),
        }
    }
}

/// Corps de POST /api/execute
#[derive(Serialize)]
struct ExecuteRequest<'a> {
    sql: &'a str,
    params: &'a [Value],
}

/// Client pour communiquer avec le serveur crmql
pub struct CrmqlClient {
    /// Configuration du client
    config: ClientConfig,
    /// Client HTTP
    http_client: HttpClient,
}

impl CrmqlClient {
    /// Crée un nouveau client avec la configuration fournie
    pub fn with_config(config: ClientConfig) -> Self {
        CrmqlClient {
            config,
            http_client: HttpClient::new(),
        }
    }

    /// URL du serveur
    pub fn server_url(&self) -> &str {
        &self.config.server_url
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.config.server_url.trim_end_matches('/'), route)
    }

    /// Exécute une instruction sur le serveur
    pub async fn execute(&self, sql: &str, params: &[Value]) -> Result<Vec<Record>> {
        let response: ApiResponse<Vec<Record>> = self
            .http_client
            .post(self.url("/api/execute"))
            .json(&ExecuteRequest { sql, params })
            .send()
            .await?
            .json()
            .await?;

        into_data(response)
    }

    /// Nombre de lignes par table
    pub async fn tables(&self) -> Result<Vec<TableCount>> {
        let response: ApiResponse<Vec<TableCount>> = self
            .http_client
            .get(self.url("/api/tables"))
            .send()
            .await?
            .json()
            .await?;

        into_data(response)
    }

    /// Demande au serveur d'écrire le document
    pub async fn flush(&self) -> Result<()> {
        let response: ApiResponse<String> = self
            .http_client
            .post(self.url("/api/flush"))
            .send()
            .await?
            .json()
            .await?;

        into_data(response).map(|_| ())
    }

    /// Vérifie la connexion au serveur
    pub async fn check_connection(&self) -> Result<bool> {
        let response = self.http_client.get(self.url("/health")).send().await?;

        Ok(response.status().is_success())
    }
}

fn into_data<T>(response: ApiResponse<T>) -> Result<T> {
    if response.success {
        response.data.ok_or_else(|| anyhow!("No data returned"))
    } else {
        let message = response.error.unwrap_or_else(|| "Unknown error".to_string());
        Err(CliError::Server(message).into())
    }
}
