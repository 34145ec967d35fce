//! Server entry point — the composition root.
//!
//! This is the only place infrastructure is wired together: concrete
//! provider adapters, the tool registry, the optional playbook, and the
//! HTTP/WS gateway, mirroring `gglib-axum::bootstrap`'s relationship to the
//! binary that calls `start_server`.

use std::env;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use vgw_agent::TurnDeps;
use vgw_core::domain::playbook::{ModelConfig, Playbook, Stage, ToolChoicePolicy};
use vgw_core::ports::hooks::{ErrorCounters, NullHookSink};
use vgw_core::ports::tool::ToolRegistry;
use vgw_gateway::session_store::{SessionStore, SessionStoreConfig};
use vgw_gateway::supervisor::SupervisorDeps;
use vgw_gateway::{create_router, CorsConfig};
use vgw_providers::{DescribeImageTool, MockLlm, MockStt, MockTts, MockVision};

/// Server configuration, resolved from the environment (spec.md is silent
/// on deployment config; this follows the teacher's env-first convention).
#[derive(Debug, Clone)]
struct ServerConfig {
    port: u16,
    cors: CorsConfig,
    enable_demo_playbook: bool,
}

impl ServerConfig {
    fn from_env() -> Self {
        let port = env::var("VGW_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(8080);
        let enable_demo_playbook = env::var("VGW_DEMO_PLAYBOOK").is_ok_and(|v| v == "1");
        Self { port, cors: CorsConfig::AllowAll, enable_demo_playbook }
    }
}

fn demo_playbook() -> Playbook {
    Playbook {
        initial_stage: "greeting".to_string(),
        stages: vec![
            Stage {
                id: "greeting".to_string(),
                name: "Greeting".to_string(),
                system_prompt: "Greet the caller and ask how you can help.".to_string(),
                tools: vec!["describe_image".to_string()],
                tool_choice: ToolChoicePolicy::Auto,
                model_config: ModelConfig::default(),
                max_turns: None,
                timeout_ms: None,
                on_exit: None,
                on_enter: None,
            },
            Stage {
                id: "weather".to_string(),
                name: "Weather".to_string(),
                system_prompt: "Answer questions about the weather.".to_string(),
                tools: vec![],
                tool_choice: ToolChoicePolicy::Auto,
                model_config: ModelConfig::default(),
                max_turns: None,
                timeout_ms: None,
                on_exit: None,
                on_enter: None,
            },
        ],
        transitions: vec![],
        global_tools: vec![],
        global_prompt: Some("Keep responses brief and conversational.".to_string()),
        default_model_config: ModelConfig::default(),
    }
}

fn build_deps(config: &ServerConfig) -> Arc<SupervisorDeps> {
    let mut tool_registry = ToolRegistry::new();
    tool_registry
        .register(Arc::new(DescribeImageTool::new(Arc::new(MockVision))))
        .expect("describe_image is registered exactly once at startup");

    let playbook = config.enable_demo_playbook.then(|| Arc::new(demo_playbook()));

    Arc::new(SupervisorDeps {
        store: SessionStore::new(SessionStoreConfig::default()),
        turn_deps: Arc::new(TurnDeps {
            stt: Arc::new(MockStt::new("")),
            llm: Arc::new(MockLlm::new()),
            tts: Arc::new(MockTts::default()),
        }),
        tool_registry: Arc::new(tool_registry),
        playbook,
        hook_sink: Arc::new(NullHookSink),
        error_counters: Arc::new(ErrorCounters::new()),
        turn_pipeline_config: Default::default(),
        playbook_runner_config: Default::default(),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    if dotenvy::dotenv().is_err() {
        // No .env file is fine; config falls back to process env/defaults.
    }
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let config = ServerConfig::from_env();
    let deps = build_deps(&config);
    let router = create_router(deps, &config.cors);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("voice gateway listening on http://{addr}");
    axum::serve(listener, router).await?;
    Ok(())
}
