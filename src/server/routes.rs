//! Routes API pour le serveur crmql

use serde::{Deserialize, Serialize};
use warp::filters::body::json;
use warp::{Filter, Rejection, Reply};

use super::{lock_database, SharedDatabase};
use crate::core::document::Record;
use crate::core::value::Value;

/// Requête pour exécuter une instruction
#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    /// Instruction à exécuter
    pub sql: String,
    /// Paramètres positionnels
    #[serde(default)]
    pub params: Vec<serde_json::Value>,
}

/// Nombre de lignes d'une table
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct TableCount {
    pub name: String,
    pub rows: usize,
}

/// Réponse générique pour l'API
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Statut de la réponse
    pub success: bool,
    /// Message d'erreur éventuel
    pub error: Option<String>,
    /// Données de la réponse
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            error: None,
            data: Some(data),
        }
    }

    fn failed(error: String) -> Self {
        ApiResponse {
            success: false,
            error: Some(error),
            data: None,
        }
    }
}

/// Crée les routes pour l'API crmql
pub fn api_routes(database: SharedDatabase) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    // Route POST /api/execute
    let execute_route = warp::path!("api" / "execute")
        .and(warp::post())
        .and(json::<ExecuteRequest>())
        .and(with_database(database.clone()))
        .and_then(handle_execute);

    // Route GET /api/tables
    let tables_route = warp::path!("api" / "tables")
        .and(warp::get())
        .and(with_database(database.clone()))
        .and_then(handle_tables);

    // Route POST /api/flush
    let flush_route = warp::path!("api" / "flush")
        .and(warp::post())
        .and(with_database(database))
        .and_then(handle_flush);

    execute_route.or(tables_route).or(flush_route)
}

/// Fonction utilitaire pour partager la base avec les gestionnaires
fn with_database(
    database: SharedDatabase,
) -> impl Filter<Extract = (SharedDatabase,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || database.clone())
}

/// Gestionnaire pour POST /api/execute
async fn handle_execute(req: ExecuteRequest, database: SharedDatabase) -> Result<impl Reply, Rejection> {
    let params: Vec<Value> = req.params.into_iter().map(Value::from).collect();

    let response = {
        let mut db = lock_database(&database);
        match db.execute(&req.sql, &params) {
            Ok(rows) => ApiResponse::<Vec<Record>>::ok(rows),
            Err(e) => ApiResponse::failed(format!("Error: {}", e)),
        }
    };

    Ok(warp::reply::json(&response))
}

/// Gestionnaire pour GET /api/tables
async fn handle_tables(database: SharedDatabase) -> Result<impl Reply, Rejection> {
    let counts: Vec<TableCount> = lock_database(&database)
        .document()
        .counts()
        .into_iter()
        .map(|(name, rows)| TableCount { name, rows })
        .collect();

    Ok(warp::reply::json(&ApiResponse::ok(counts)))
}

/// Gestionnaire pour POST /api/flush
async fn handle_flush(database: SharedDatabase) -> Result<impl Reply, Rejection> {
    // L'écriture attend le worker de sauvegarde: hors du runtime
    let outcome = tokio::task::spawn_blocking(move || lock_database(&database).flush()).await;

    let response = match outcome {
        Ok(Ok(())) => ApiResponse::ok("flushed"),
        Ok(Err(e)) => ApiResponse::failed(format!("Error: {}", e)),
        Err(e) => ApiResponse::failed(format!("Flush task failed: {}", e)),
    };

    Ok(warp::reply::json(&response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use std::sync::{Arc, Mutex};

    fn shared() -> SharedDatabase {
        Arc::new(Mutex::new(Database::new_in_memory()))
    }

    #[tokio::test]
    async fn test_execute_route_round_trip() {
        let routes = api_routes(shared());

        let insert = warp::test::request()
            .method("POST")
            .path("/api/execute")
            .json(&serde_json::json!({
                "sql": "INSERT INTO leads (id, name) VALUES (?, ?)",
                "params": ["l1", "Acme"]
            }))
            .reply(&routes)
            .await;
        assert_eq!(insert.status(), 200);

        let select = warp::test::request()
            .method("POST")
            .path("/api/execute")
            .json(&serde_json::json!({ "sql": "SELECT * FROM leads WHERE id = ?", "params": ["l1"] }))
            .reply(&routes)
            .await;
        let body: ApiResponse<Vec<serde_json::Value>> = serde_json::from_slice(select.body()).unwrap();
        assert!(body.success);
        let rows = body.data.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], "Acme");
    }

    #[tokio::test]
    async fn test_execute_route_reports_errors() {
        let routes = api_routes(shared());

        let reply = warp::test::request()
            .method("POST")
            .path("/api/execute")
            .json(&serde_json::json!({ "sql": "INSERT INTO invoices (id) VALUES (?)", "params": ["i1"] }))
            .reply(&routes)
            .await;
        let body: ApiResponse<serde_json::Value> = serde_json::from_slice(reply.body()).unwrap();
        assert!(!body.success);
        assert!(body.error.unwrap().contains("invoices"));
    }

    #[tokio::test]
    async fn test_tables_route_lists_every_table() {
        let routes = api_routes(shared());

        let reply = warp::test::request().method("GET").path("/api/tables").reply(&routes).await;
        let body: ApiResponse<Vec<TableCount>> = serde_json::from_slice(reply.body()).unwrap();
        let tables = body.data.unwrap();
        assert_eq!(tables.len(), 8);
        assert!(tables.iter().all(|t| t.rows == 0));
    }

    #[tokio::test]
    async fn test_flush_route() {
        let routes = api_routes(shared());

        let reply = warp::test::request().method("POST").path("/api/flush").reply(&routes).await;
        let body: ApiResponse<String> = serde_json::from_slice(reply.body()).unwrap();
        assert!(body.success);
    }
}
