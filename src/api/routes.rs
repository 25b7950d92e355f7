//! HTTP 路由与出入参编组
//!
//! 薄层：校验入参、查/建聊天记录、调引擎、落消息流水。handler 错误统一
//! 折叠为 {success: false, error} / {error} 信封，状态 500。

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::api::state::AppState;
use crate::quiz::ChatMode;
use crate::retrieval::SourceType;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/chat", post(create_chat))
        .route("/api/chat/:chat_id", delete(delete_chat))
        .route("/api/chat/message", post(send_message))
        .route("/api/fetchChat/:chat_id", get(fetch_chat))
        .route("/api/allChats", get(all_chats))
        .route("/api/chat/:chat_id/title", post(generate_title).put(update_title))
        .route("/api/ingest/:chat_id", post(ingest))
        .with_state(state)
}

async fn create_chat(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.chats.create().await)
}

async fn delete_chat(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<String>,
) -> impl IntoResponse {
    state.chats.delete(&chat_id).await;
    StatusCode::OK
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageRequest {
    chat_id: Option<String>,
    message: String,
    mode: Option<String>,
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SendMessageRequest>,
) -> impl IntoResponse {
    let mode = ChatMode::parse_or_default(request.mode.as_deref());
    let chat = state.chats.get_or_create(request.chat_id.as_deref()).await;

    state
        .chats
        .append_message(&chat.id, &request.message, false)
        .await;

    match state.engine.respond(&chat.id, &request.message, mode).await {
        Ok(response) => {
            state.chats.append_message(&chat.id, &response, true).await;
            Json(json!({
                "success": true,
                "response": response,
                "mode": mode.as_str(),
                "chatId": chat.id,
            }))
            .into_response()
        }
        Err(e) => {
            error!("message handling failed for chat {}: {}", chat.id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"success": false, "error": e})),
            )
                .into_response()
        }
    }
}

async fn fetch_chat(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<String>,
) -> impl IntoResponse {
    Json(state.chats.get_or_create(Some(&chat_id)).await)
}

async fn all_chats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.chats.list().await)
}

#[derive(Debug, Deserialize)]
struct TitlePromptRequest {
    prompt: Option<String>,
}

async fn generate_title(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<String>,
    Json(request): Json<TitlePromptRequest>,
) -> impl IntoResponse {
    let prompt = match request.prompt {
        Some(p) if !p.trim().is_empty() => p,
        _ => return StatusCode::BAD_REQUEST.into_response(),
    };

    let chat = state.chats.get_or_create(Some(&chat_id)).await;
    let title = state.assistant.generate_title(&prompt).await;
    state.chats.set_title(&chat.id, &title).await;
    StatusCode::OK.into_response()
}

#[derive(Debug, Deserialize)]
struct TitleUpdateRequest {
    title: Option<String>,
}

async fn update_title(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<String>,
    Json(request): Json<TitleUpdateRequest>,
) -> impl IntoResponse {
    let Some(title) = request.title else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Missing 'title' in request body"})),
        )
            .into_response();
    };

    let chat = state.chats.get_or_create(Some(&chat_id)).await;
    match state.chats.set_title(&chat.id, &title).await {
        Some(summary) => Json(json!({"id": summary.id, "title": summary.title})).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IngestRequest {
    /// 提取好的纯文本（PDF 解析、转写、图像描述在系统外完成）
    content: String,
    file_name: String,
    source_type: SourceType,
}

async fn ingest(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<String>,
    Json(request): Json<IngestRequest>,
) -> impl IntoResponse {
    let chat = state.chats.get_or_create(Some(&chat_id)).await;

    match state
        .ingestor
        .ingest(&chat.id, &request.file_name, request.source_type, &request.content)
        .await
    {
        Ok(segments) => {
            let note = format!(
                "✅ Material `{}` processed successfully. You can now ask questions based on this file.",
                request.file_name
            );
            state.chats.append_message(&chat.id, &note, true).await;
            Json(json!({
                "status": "success",
                "chatId": chat.id,
                "segments": segments,
            }))
            .into_response()
        }
        Err(e) => {
            error!("ingestion failed for chat {}: {}", chat.id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": format!("Error processing file: {}", e)})),
            )
                .into_response()
        }
    }
}
