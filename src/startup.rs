use crate::config::AppConfig;
use crate::error::AppError;
use crate::handlers;
use crate::middleware::{auth_middleware, metrics_middleware, request_id_middleware};
use crate::services::{MongoDb, TokenVerifier};
use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, put},
    Router,
};
use std::future::IntoFuture;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: MongoDb,
    pub verifier: TokenVerifier,
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
    state: AppState,
}

impl Application {
    pub async fn build(config: AppConfig) -> Result<Self, AppError> {
        let db = MongoDb::connect(&config.mongodb.uri, &config.mongodb.database)
            .await
            .map_err(|e| {
                tracing::error!("Failed to connect to MongoDB: {}", e);
                e
            })?;
        db.initialize_indexes().await.map_err(|e| {
            tracing::error!("Failed to initialize database indexes: {}", e);
            e
        })?;

        let verifier = TokenVerifier::new(&config.auth)?;

        let state = AppState {
            config: config.clone(),
            db: db.clone(),
            verifier,
        };

        // Every /api route requires a verified bearer token
        let api_routes = Router::new()
            .route(
                "/projects",
                get(handlers::list_projects).post(handlers::create_project),
            )
            .route(
                "/projects/:project_id",
                get(handlers::get_project)
                    .put(handlers::update_project)
                    .delete(handlers::delete_project),
            )
            .route(
                "/projects/:project_id/tasks",
                get(handlers::list_tasks).post(handlers::create_task),
            )
            .route(
                "/tasks/:task_id",
                put(handlers::update_task).delete(handlers::delete_task),
            )
            .layer(from_fn_with_state(state.clone(), auth_middleware));

        let app = Router::new()
            .route("/health", get(handlers::health_check))
            .route("/metrics", get(handlers::metrics_endpoint))
            .nest("/api", api_routes)
            .with_state(state.clone())
            .layer(from_fn(metrics_middleware))
            .layer(TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or("-");

                    tracing::info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                        user_id = tracing::field::Empty,
                    )
                },
            ))
            .layer(from_fn(request_id_middleware))
            .layer(
                CorsLayer::new()
                    .allow_origin(
                        state
                            .config
                            .security
                            .allowed_origins
                            .iter()
                            .map(|o| {
                                o.parse::<HeaderValue>().unwrap_or_else(|e| {
                                    tracing::error!(
                                        "Invalid CORS origin '{}': {}. Using fallback.",
                                        o,
                                        e
                                    );
                                    HeaderValue::from_static("null")
                                })
                            })
                            .collect::<Vec<HeaderValue>>(),
                    )
                    .allow_methods([
                        Method::GET,
                        Method::POST,
                        Method::PUT,
                        Method::DELETE,
                        Method::OPTIONS,
                    ])
                    .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
            );

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(listener, app);

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
            state,
        })
    }

    pub fn db(&self) -> &MongoDb {
        &self.state.db
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}
