use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use validator::Validate;

use crate::database::Database;
use crate::rag::ingest::DocumentIngestor;
use crate::workflow::{CorrectiveRagWorkflow, RouterWorkflow};

#[derive(Clone)]
pub struct AppState {
    router: Arc<Mutex<RouterWorkflow>>,
    corrective: Arc<CorrectiveRagWorkflow>,
    ingestor: Arc<DocumentIngestor>,
    db: Database,
}

#[derive(Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, max = 2000))]
    message: String,
}

#[derive(Deserialize, Validate)]
pub struct AskRequest {
    #[validate(length(min = 1, max = 2000))]
    question: String,
}

#[derive(Deserialize)]
pub struct IngestRequest {
    path: String,
}

#[derive(Serialize)]
pub struct ChatResponse {
    response: String,
    tokens: TokenInfo,
}

#[derive(Serialize)]
pub struct TokenInfo {
    input: usize,
    response: usize,
    total: usize,
}

#[derive(Serialize)]
pub struct AskResponse {
    answer: String,
    web_search_used: bool,
    kept_chunks: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    transformed_query: Option<String>,
}

#[derive(Serialize)]
pub struct IngestResponse {
    source: String,
    chunks: usize,
}

#[derive(Serialize)]
struct ApiResponse {
    status: String,
}

/// Create and configure the API router
pub fn create_api(
    router: RouterWorkflow,
    corrective: CorrectiveRagWorkflow,
    ingestor: Arc<DocumentIngestor>,
    db: Database,
) -> Router {
    let state = AppState {
        router: Arc::new(Mutex::new(router)),
        corrective: Arc::new(corrective),
        ingestor,
        db,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/chat", post(chat_handler))
        .route("/ask", post(ask_handler))
        .route("/ingest", post(ingest_handler))
        .route("/health", get(health_check))
        .layer(cors)
        .with_state(state)
}

async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Response {
    if let Err(e) = request.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse {
                status: format!("Invalid request: {}", e),
            }),
        )
            .into_response();
    }

    let input_tokens = request.message.split_whitespace().count();

    let response = {
        let mut router = state.router.lock().await;
        router.run(&request.message).await
    };

    let response = match response {
        Ok(text) => text,
        Err(e) => {
            log::error!("Router workflow failed: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse {
                    status: format!("Agent error: {}", e),
                }),
            )
                .into_response();
        }
    };

    let response_tokens = response.split_whitespace().count();

    if let Err(e) = state
        .db
        .save_conversation(request.message.clone(), response.clone(), "router".to_string())
        .await
    {
        log::warn!("Failed to save conversation: {}", e);
    }

    Json(ChatResponse {
        response,
        tokens: TokenInfo {
            input: input_tokens,
            response: response_tokens,
            total: input_tokens + response_tokens,
        },
    })
    .into_response()
}

async fn ask_handler(State(state): State<AppState>, Json(request): Json<AskRequest>) -> Response {
    if let Err(e) = request.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse {
                status: format!("Invalid request: {}", e),
            }),
        )
            .into_response();
    }

    match state.corrective.run(&request.question).await {
        Ok(result) => Json(AskResponse {
            answer: result.answer,
            web_search_used: result.web_search_used,
            kept_chunks: result.kept_chunks,
            transformed_query: result.transformed_query,
        })
        .into_response(),
        Err(e) => {
            log::error!("Corrective workflow failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse {
                    status: format!("Workflow error: {}", e),
                }),
            )
                .into_response()
        }
    }
}

async fn ingest_handler(
    State(state): State<AppState>,
    Json(request): Json<IngestRequest>,
) -> Response {
    match state.ingestor.ingest_file(Path::new(&request.path)).await {
        Ok(report) => Json(IngestResponse {
            source: report.source,
            chunks: report.chunks,
        })
        .into_response(),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse {
                status: format!("Ingest failed: {}", e),
            }),
        )
            .into_response(),
    }
}

async fn health_check() -> Response {
    Json(ApiResponse {
        status: "Server is running and healthy".to_string(),
    })
    .into_response()
}
