//! Exercises the HTTP adapters against an in-process stub of the backend.

use axum::{
    extract::{Multipart, Path},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use client_lib::adapters::{HttpConversationStore, HttpUploadAdapter, SseChatAdapter};
use docustream_core::{
    ChatRequest, ChatTransport, ConversationId, ConversationStore, ExtractionProfile,
    FileUploadService, MessagePart, MessageStatus, PortError, Role, StagedAttachment,
    StreamEvent, UploadedFile,
};
use futures::StreamExt;
use reqwest::{Client, Url};
use serde_json::{json, Value};
use std::time::Duration;

//=========================================================================================
// Stub Backend
//=========================================================================================

async fn chat(Json(body): Json<Value>) -> Response {
    let chat_id = body["chat_id"].as_str().unwrap_or_default().to_string();
    if chat_id == "broken" {
        return (StatusCode::INTERNAL_SERVER_ERROR, "model offline").into_response();
    }
    let content = body["messages"][0]["content"].as_str().unwrap_or_default();
    let industry = body["industry"].as_str().unwrap_or("none");

    let echo = json!(format!("lo {}/{}/{}", chat_id, industry, content));
    let stream = format!(
        "event: start\ndata: \n\n\
         data: \"Hel\"\n\n\
         : keep-alive\n\n\
         data: {{\"type\":\"tool-call\",\"name\":\"query_data\"}}\n\n\
         data: {}\n\n\
         event: end\ndata: \n\n",
        echo
    );
    ([(header::CONTENT_TYPE, "text/event-stream")], stream).into_response()
}

async fn upload(mut multipart: Multipart) -> Response {
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let Ok(bytes) = field.bytes().await else {
            return StatusCode::BAD_REQUEST.into_response();
        };
        return Json(json!({
            "id": format!("f-{}", bytes.len()),
            "filename": filename,
            "url": format!("/uploads/{}", filename),
        }))
        .into_response();
    }
    StatusCode::BAD_REQUEST.into_response()
}

async fn list() -> Json<Value> {
    Json(json!([{ "id": "c1", "title": "Bank statement" }]))
}

async fn fetch(Path(id): Path<String>) -> Response {
    if id != "c1" {
        return StatusCode::NOT_FOUND.into_response();
    }
    Json(json!([
        {
            "id": "m1",
            "role": "user",
            "parts": [{ "type": "text", "content": "What is the balance?" }],
            "created_at": "2024-05-01T10:00:00Z"
        },
        {
            "id": "m2",
            "role": "assistant",
            "parts": [
                { "type": "tool-call", "name": "query_data" },
                { "type": "text", "content": "It is 1,204.50." }
            ]
        }
    ]))
    .into_response()
}

async fn delete(Path(id): Path<String>) -> StatusCode {
    if id == "c1" {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn spawn_backend() -> Url {
    let app = Router::new()
        .route("/api/chat", post(chat))
        .route("/api/upload", post(upload))
        .route("/api/chats", get(list))
        .route("/api/chats/{id}", get(fetch).delete(delete));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Url::parse(&format!("http://{}/api/", addr)).unwrap()
}

//=========================================================================================
// Tests
//=========================================================================================

#[tokio::test]
async fn chat_stream_is_decoded_in_order() {
    let base = spawn_backend().await;
    let transport = SseChatAdapter::new(Client::new(), base);

    let stream = transport
        .open_stream(ChatRequest {
            text: "hi".to_string(),
            extraction_profile: Some(ExtractionProfile::Banking),
            conversation_id: ConversationId::from("c-9"),
        })
        .await
        .ok()
        .expect("stream opens");
    let events: Vec<_> = stream.collect().await;

    assert_eq!(
        events,
        vec![
            Ok(StreamEvent::MessageStart { id: None }),
            Ok(StreamEvent::TextDelta("Hel".into())),
            Ok(StreamEvent::ToolCall { name: "query_data".into() }),
            Ok(StreamEvent::TextDelta("lo c-9/banking/hi".into())),
            Ok(StreamEvent::End),
        ]
    );
}

#[tokio::test]
async fn rejected_chat_is_reported_before_streaming() {
    let base = spawn_backend().await;
    let transport = SseChatAdapter::new(Client::new(), base);

    let err = transport
        .open_stream(ChatRequest {
            text: "hi".to_string(),
            extraction_profile: None,
            conversation_id: ConversationId::from("broken"),
        })
        .await
        .err();

    assert_eq!(
        err,
        Some(PortError::Rejected {
            status: 500,
            message: "model offline".to_string(),
        })
    );
}

#[tokio::test]
async fn upload_posts_a_multipart_file() {
    let base = spawn_backend().await;
    let uploader = HttpUploadAdapter::new(Client::new(), base, Duration::from_secs(5));

    let uploaded = uploader
        .upload_file(&StagedAttachment::new("statement.pdf", b"12345".to_vec()))
        .await
        .unwrap();

    assert_eq!(
        uploaded,
        UploadedFile {
            id: "f-5".to_string(),
            filename: "statement.pdf".to_string(),
        }
    );
}

#[tokio::test]
async fn store_lists_fetches_and_deletes() {
    let base = spawn_backend().await;
    let store = HttpConversationStore::new(Client::new(), base, Duration::from_secs(5));

    let listed = store.list_conversations().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].title, "Bank statement");

    let messages = store.fetch_transcript(&ConversationId::from("c1")).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].text(), "What is the balance?");
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].parts[0], MessagePart::tool_call("query_data"));
    assert!(messages.iter().all(|m| m.status == MessageStatus::Complete));

    let missing = store.fetch_transcript(&ConversationId::from("nope")).await;
    assert!(matches!(missing, Err(PortError::NotFound(_))));

    store.delete_conversation(&ConversationId::from("c1")).await.unwrap();
    let missing = store.delete_conversation(&ConversationId::from("nope")).await;
    assert!(matches!(missing, Err(PortError::NotFound(_))));
}
