//! Integration tests driving `create_router` end-to-end: a plain HTTP
//! request to `/healthz` and a full WebSocket turn over `/ws`.

use std::sync::Arc;

use base64::Engine;
use futures_util::{SinkExt, StreamExt};
use http_body_util::BodyExt;
use tower::ServiceExt;

use vgw_core::ports::hooks::{ErrorCounters, NullHookSink};
use vgw_core::ports::tool::ToolRegistry;
use vgw_gateway::session_store::{SessionStore, SessionStoreConfig};
use vgw_gateway::supervisor::SupervisorDeps;
use vgw_gateway::{create_router, CorsConfig};
use vgw_providers::{MockLlm, MockStt, MockTts};

fn deps() -> Arc<SupervisorDeps> {
    Arc::new(SupervisorDeps {
        store: SessionStore::new(SessionStoreConfig::default()),
        turn_deps: Arc::new(vgw_agent::TurnDeps {
            stt: Arc::new(MockStt::new("hello there")),
            llm: Arc::new(MockLlm::new()),
            tts: Arc::new(MockTts::default()),
        }),
        tool_registry: Arc::new(ToolRegistry::new()),
        playbook: None,
        hook_sink: Arc::new(NullHookSink),
        error_counters: Arc::new(ErrorCounters::new()),
        turn_pipeline_config: Default::default(),
        playbook_runner_config: Default::default(),
    })
}

#[tokio::test]
async fn healthz_reports_ok_with_an_empty_error_snapshot() {
    let router = create_router(deps(), &CorsConfig::AllowAll);
    let response = router
        .oneshot(axum::http::Request::builder().uri("/healthz").body(axum::body::Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert!(json["errors"].as_object().unwrap().is_empty());
}

#[tokio::test]
async fn websocket_turn_roundtrips_audio_to_a_tts_complete() {
    let router = create_router(deps(), &CorsConfig::AllowAll);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service()).await.unwrap();
    });

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws")).await.unwrap();

    let ready = ws.next().await.unwrap().unwrap();
    let ready: serde_json::Value = serde_json::from_str(ready.to_text().unwrap()).unwrap();
    assert_eq!(ready["type"], "ready");

    let pcm = vec![0u8; 320];
    let audio = serde_json::json!({
        "type": "audio",
        "data": base64::engine::general_purpose::STANDARD.encode(&pcm),
    });
    ws.send(tokio_tungstenite::tungstenite::Message::Text(audio.to_string())).await.unwrap();

    let mut saw_transcript = false;
    let mut saw_tts_complete = false;
    while let Some(Ok(msg)) = ws.next().await {
        let Ok(text) = msg.to_text() else { continue };
        let Ok(value) = serde_json::from_str::<serde_json::Value>(text) else { continue };
        match value["type"].as_str() {
            Some("transcript") => saw_transcript = true,
            Some("tts-complete") => {
                saw_tts_complete = true;
                break;
            }
            _ => {}
        }
    }

    assert!(saw_transcript);
    assert!(saw_tts_complete);
}
