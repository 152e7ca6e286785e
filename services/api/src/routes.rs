use crate::infra::{deserialize_amount, AppState};
use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, Path};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::json;
use solar_proposal::error::AppError;
use solar_proposal::proposal::{DerivedParameters, FinancialFigures};
use std::net::SocketAddr;
use tracing::{info, warn};
use uuid::Uuid;

const SERVICE_BANNER: &str = "Proposta - Sistema de Webhook para Geração de Propostas";
const SUCCESS_MESSAGE: &str = "Proposta gerada com sucesso";

#[derive(Debug, Deserialize)]
pub(crate) struct ProposalRequest {
    #[serde(default)]
    pub(crate) nome_completo: String,
    #[serde(default)]
    pub(crate) endereco: String,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub(crate) valor_fatura: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProposalResponse {
    pub(crate) status: &'static str,
    pub(crate) message: &'static str,
    pub(crate) arquivo_url: String,
    pub(crate) arquivo_nome: String,
    pub(crate) arquivo_base64: String,
    pub(crate) dados_processados: ProcessedData,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProcessedData {
    pub(crate) nome_completo: String,
    pub(crate) endereco: String,
    pub(crate) valor_fatura: f64,
    pub(crate) timestamp: String,
    pub(crate) parametros: DerivedParameters,
    pub(crate) valores: FinancialFigures,
}

pub(crate) fn router() -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/webhook_proposta", post(webhook_proposta))
        .route("/media/:file", get(media_file))
}

pub(crate) async fn banner() -> Json<serde_json::Value> {
    Json(json!({
        "status": 200,
        "message": SERVICE_BANNER,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn webhook_proposta(
    Extension(state): Extension<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: Result<Json<ProposalRequest>, JsonRejection>,
) -> Result<Json<ProposalResponse>, AppError> {
    let client = connect_info
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    // Counted before the body is parsed: malformed requests spend the budget too.
    if let Err(err) = state.rate_limiter.check(&client) {
        warn!(%client, "webhook rate limit exceeded");
        return Err(err);
    }

    let Json(request) =
        payload.map_err(|rejection| AppError::InvalidPayload(rejection.body_text()))?;
    let request_id = Uuid::new_v4().simple().to_string();
    info!(%client, %request_id, nome = %request.nome_completo, "webhook received");

    let service = state.proposals.clone();
    let ProposalRequest {
        nome_completo,
        endereco,
        valor_fatura,
    } = request;
    let generated = tokio::task::spawn_blocking({
        let request_id = request_id.clone();
        move || service.generate(&nome_completo, &endereco, &valor_fatura, &request_id)
    })
    .await
    .map_err(|err| AppError::Task(err.to_string()))??;

    let now = Local::now();
    let arquivo_nome = state.media.publish(&generated.pdf_bytes, now).await?;
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok());
    let arquivo_url = state.media.url_for(&arquivo_nome, host);
    info!(%request_id, arquivo = %arquivo_nome, "proposal published");

    Ok(Json(ProposalResponse {
        status: "sucesso",
        message: SUCCESS_MESSAGE,
        arquivo_url,
        arquivo_base64: STANDARD.encode(&generated.pdf_bytes),
        arquivo_nome,
        dados_processados: ProcessedData {
            nome_completo: generated.parameters.name.clone(),
            endereco: generated.parameters.address.clone(),
            valor_fatura: generated.parameters.original_bill_amount,
            timestamp: now.to_rfc3339(),
            parametros: generated.parameters,
            valores: generated.figures,
        },
    }))
}

pub(crate) async fn media_file(
    Extension(state): Extension<AppState>,
    Path(file): Path<String>,
) -> Result<Response, AppError> {
    let Some(path) = state.media.resolve(&file) else {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "status": "erro", "message": "arquivo não encontrado" })),
        )
            .into_response());
    };

    let bytes = tokio::fs::read(&path).await?;
    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    Ok(([(header::CONTENT_TYPE, mime.essence_str().to_string())], bytes).into_response())
}
