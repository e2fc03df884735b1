use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot::Receiver;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::req::{Method::DELETE, Method::GET, Method::POST, Method::PUT, Request};
use crate::svc::{Reply, Service};
use crate::txlog::model::TransactionRecord;
use crate::utils::write_json;

pub struct Server {
    svc: Arc<Service>,
    addr: String,
}

impl Server {
    pub fn new(svc: Service, addr: String) -> Self {
        Self {
            svc: Arc::new(svc),
            addr,
        }
    }

    pub async fn start(self, mut shutdown_rx: Receiver<()>) -> Result<()> {
        let listener = TcpListener::bind(&self.addr).await?;
        info!("Server running on http://{}", self.addr);

        loop {
            tokio::select! {
                conn = listener.accept() => {
                    let (stream, peer) = match conn {
                        Ok(conn) => conn,
                        Err(e) => {
                            warn!("accept failed: {}", e);
                            continue;
                        }
                    };
                    let svc = Arc::clone(&self.svc);
                    tokio::spawn(async move {
                        crate::logging::thread_logging(crate::constant::LOGGING_INCOMING_REQUEST);
                        if let Err(e) = Self::handle_client(stream, &svc).await {
                            error!(%peer, "Connection error: {}", e);
                        }
                    });
                },
                _ = &mut shutdown_rx => {
                    info!("shutting down ...");
                    break;
                }
            }
        }
        Ok(())
    }

    async fn handle_client(mut stream: TcpStream, svc: &Arc<Service>) -> Result<()> {
        let (reader, mut writer) = stream.split();
        let (status, body) = match Request::new(reader).await {
            Ok(request) => Self::respond(svc, &request).await,
            Err(e) => {
                info!("unreadable request: {:?}", e);
                (e.status(), e.body())
            }
        };
        write_json(&mut writer, status, &body).await?;
        Ok(())
    }

    /// Routes one request, logs it and records it in the transaction log.
    pub async fn respond(svc: &Service, request: &Request) -> (u16, Value) {
        let started = Instant::now();
        let user_id = svc
            .authenticate(request)
            .ok()
            .and_then(|claims| Uuid::parse_str(&claims.sub).ok());

        let (status, body, error_code) = match Self::route(svc, request).await {
            Ok((status, body)) => (status, body, None),
            Err(e) => {
                if e.status() >= 500 {
                    error!(path = %request.path, "request failed: {:?}", e);
                }
                (e.status(), e.body(), Some(e.code().to_string()))
            }
        };

        let elapsed = started.elapsed();
        info!(
            method = request.method.as_str(),
            path = %request.path,
            status,
            elapsed_ms = elapsed.as_millis() as u64,
            "request handled"
        );
        svc.record(TransactionRecord {
            id: Uuid::new_v4(),
            user_id,
            method: request.method.as_str().to_string(),
            path: Self::route_pattern(request),
            status: i32::from(status),
            error_code,
            duration_ms: i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX),
            created_at: svc.clock().now(),
        })
        .await;

        (status, body)
    }

    /// Path as logged in the transaction log; resource ids collapse to `{id}`.
    fn route_pattern(request: &Request) -> String {
        match request.segments().as_slice() {
            [collection @ ("products" | "investments"), _] => format!("/{}/{{id}}", collection),
            _ => request.path.clone(),
        }
    }

    async fn route(svc: &Service, request: &Request) -> Reply {
        let segments = request.segments();

        //Router
        match (request.method, segments.as_slice()) {
            (POST, ["auth", "signup"]) => svc.signup(request).await,
            (POST, ["auth", "login"]) => svc.login(request).await,
            (POST, ["auth", "forgot-password"]) => svc.forgot_password(request).await,
            (POST, ["auth", "reset-password"]) => svc.reset_password(request).await,
            (GET, ["auth", "me"]) => svc.me(&svc.authenticate(request)?).await,
            (PUT, ["auth", "profile"]) => {
                let claims = svc.authenticate(request)?;
                svc.update_profile(request, &claims).await
            }
            (GET, ["products"]) => svc.list_products().await,
            (GET, ["products", id]) => svc.get_product(id).await,
            (POST, ["products"]) => {
                let claims = svc.authenticate(request)?;
                svc.create_product(request, &claims).await
            }
            (DELETE, ["products", id]) => {
                let claims = svc.authenticate(request)?;
                svc.delete_product(&claims, id).await
            }
            (GET, ["investments"]) => {
                let claims = svc.authenticate(request)?;
                svc.get_investments(&claims).await
            }
            (POST, ["investments"]) => {
                let claims = svc.authenticate(request)?;
                svc.create_investment(request, &claims).await
            }
            (GET, ["investments", id]) => {
                let claims = svc.authenticate(request)?;
                svc.get_investment(&claims, id).await
            }
            (GET, ["admin", "transactions", "insights"]) => {
                let claims = svc.authenticate(request)?;
                svc.error_insights(&claims).await
            }
            _ => Err(AppError::NotFound),
        }
    }
}
