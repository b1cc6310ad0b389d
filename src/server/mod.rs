//! Serveur HTTP pour crmql
//!
//! Ce module expose l'interface d'exécution des requêtes sur HTTP.

pub mod routes;

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{info, warn};
use warp::Filter;

use crate::Database;

/// Configuration du serveur
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port d'écoute
    pub port: u16,
    /// Adresse d'écoute
    pub host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: 3001,
            host: "127.0.0.1".to_string(),
        }
    }
}

impl ServerConfig {
    /// Adresse de liaison; repli sur 127.0.0.1 si l'hôte est invalide
    pub fn socket_addr(&self) -> SocketAddr {
        let ip = self.host.parse::<IpAddr>().unwrap_or_else(|_| {
            warn!("Adresse invalide {:?}, utilisation de 127.0.0.1", self.host);
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        });
        SocketAddr::new(ip, self.port)
    }
}

/// Base partagée entre les gestionnaires
pub type SharedDatabase = Arc<Mutex<Database>>;

/// Verrouille la base, même après la panique d'un autre gestionnaire
pub fn lock_database(database: &SharedDatabase) -> MutexGuard<'_, Database> {
    database.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Serveur HTTP pour crmql
pub struct CrmqlServer {
    /// Base de données
    database: SharedDatabase,
    /// Configuration du serveur
    config: ServerConfig,
}

impl CrmqlServer {
    /// Crée un nouveau serveur avec la base fournie
    pub fn new(database: Database, config: ServerConfig) -> Self {
        CrmqlServer {
            database: Arc::new(Mutex::new(database)),
            config,
        }
    }

    /// Référence partagée vers la base
    pub fn database(&self) -> SharedDatabase {
        Arc::clone(&self.database)
    }

    /// Toutes les routes du serveur
    pub fn routes(&self) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        // Route GET /health pour vérifier l'état du serveur
        let health_route = warp::path("health")
            .and(warp::get())
            .map(|| "crmql server is running");

        health_route.or(routes::api_routes(self.database()))
    }

    /// Démarre le serveur et s'arrête quand `shutdown` se termine
    pub async fn run_until<F>(&self, shutdown: F) -> Result<(), warp::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.socket_addr();
        let (bound, server) = warp::serve(self.routes()).try_bind_with_graceful_shutdown(addr, shutdown)?;
        info!("crmql server running at {}", bound);
        server.await;
        info!("Serveur arrêté");
        Ok(())
    }

    /// Démarre le serveur jusqu'à Ctrl-C
    pub async fn run(&self) -> Result<(), warp::Error> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Impossible d'écouter Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Récupère la base une fois le serveur arrêté, ou la référence
    /// partagée si un gestionnaire la détient encore
    pub fn into_database(self) -> Result<Database, SharedDatabase> {
        Arc::try_unwrap(self.database).map(|mutex| mutex.into_inner().unwrap_or_else(PoisonError::into_inner))
    }
}
