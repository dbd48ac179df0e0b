mod config;
mod handlers;
mod period;
mod response;
mod scoring;
mod store;
mod types;

use std::{env, path::PathBuf, sync::Arc, time::Duration};

use actix_cors::Cors;
use actix_web::{error::InternalError, http::StatusCode, middleware, web, App, HttpServer};

pub(crate) use config::{AppState, ServerPolicy};
use config::{
    read_env_optional_usize, read_env_u64, read_env_usize, DEFAULT_DATA_DIR,
    DEFAULT_HTTP_KEEP_ALIVE_SECS, DEFAULT_HTTP_MAX_CONNECTIONS, DEFAULT_JSON_LIMIT_BYTES,
    DEFAULT_SESSION_SWEEP_SECS, DEFAULT_SESSION_TTL_SECS,
};
use handlers::{create_session, finish_session, health, list_scores, submit_score};
use response::json_error_with_code;
pub(crate) use scoring::ScoreError;
use scoring::spawn_session_cleanup_task;
pub(crate) use store::{FinishOutcome, RecordOutcome, ScoreStore, SessionRecord};
pub(crate) use types::*;

pub(crate) fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/api/tokens", web::post().to(create_session))
        .route("/api/sessions/{token}", web::post().to(finish_session))
        .route("/api/scores/{token}", web::post().to(submit_score))
        .route("/api/scores", web::get().to(list_scores));
}

fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(|err, _req| {
            let response =
                json_error_with_code(StatusCode::BAD_REQUEST, err.to_string(), Some("invalid_json"));
            InternalError::from_response(err, response).into()
        })
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        let response =
            json_error_with_code(StatusCode::BAD_REQUEST, err.to_string(), Some("invalid_query"));
        InternalError::from_response(err, response).into()
    })
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let bind_addr = env::var("API_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let data_dir =
        PathBuf::from(env::var("DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string()));
    let session_ttl_secs = read_env_u64("SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS);
    let session_sweep_secs = read_env_u64("SESSION_SWEEP_SECS", DEFAULT_SESSION_SWEEP_SECS);
    let json_limit = read_env_usize("JSON_LIMIT_BYTES", DEFAULT_JSON_LIMIT_BYTES);
    let http_workers = read_env_optional_usize("HTTP_WORKERS");
    let http_max_connections = read_env_usize("HTTP_MAX_CONNECTIONS", DEFAULT_HTTP_MAX_CONNECTIONS);
    let http_keep_alive_secs = read_env_u64("HTTP_KEEP_ALIVE_SECS", DEFAULT_HTTP_KEEP_ALIVE_SECS);
    let policy = ServerPolicy::from_env();

    let store = ScoreStore::open(&data_dir).map_err(std::io::Error::other)?;

    tracing::info!(
        "starting flappy score api: bind_addr={} data_dir={} max_trace_len={} max_replay_ticks={} timing_slack={} session_ttl_secs={}",
        bind_addr,
        data_dir.display(),
        policy.max_trace_len,
        policy.verify.max_ticks,
        policy.verify.timing.slack_multiplier,
        session_ttl_secs
    );

    let state = AppState {
        store: Arc::new(store),
        policy,
        session_ttl_secs,
        http_workers,
        http_max_connections,
        http_keep_alive_secs,
    };
    spawn_session_cleanup_task(state.clone(), session_sweep_secs);

    let mut server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .expose_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(state.clone()))
            .app_data(json_config(json_limit))
            .app_data(query_config())
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .configure(configure_routes)
    })
    .max_connections(http_max_connections)
    .keep_alive(Duration::from_secs(http_keep_alive_secs));

    if let Some(workers) = http_workers {
        server = server.workers(workers);
    }

    server.bind(bind_addr)?.run().await
}
