//! Example consumer: mounts remo CRUD routes for a couple of models.
//!
//! Run from repo root: `cargo run -p example-consumer`
//! With `DATABASE_URL` set documents go to PostgreSQL, otherwise to an in-memory store.

use remo::{
    common_routes, mount, AccessDecision, AccessRule, AccessRules, Action, AppState, Callbacks,
    FieldConfig, MemoryDocumentStore, ModelDef, ModelRegistry, RemoOptions,
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("remo=info,example_consumer=info")),
        )
        .init();

    let registry = ModelRegistry::new()
        .with_model(ModelDef::new("User").with_field("name", FieldConfig::required()))?
        .with_model(
            ModelDef::new("Widget")
                .with_field("name", FieldConfig::required())
                .with_field("owner", FieldConfig::reference("User")),
        )?;

    // Widgets can only be deleted by callers presenting an admin header.
    let access = AccessRules::new().rule(
        "Widget",
        Action::Delete,
        AccessRule::check(|ctx, options| {
            if ctx.request.header("x-role") == Some("admin") {
                AccessDecision::Allow(options)
            } else {
                AccessDecision::Deny
            }
        }),
    );
    let callbacks = Callbacks::new().on("Widget", Action::Create, |doc: &serde_json::Value| {
        tracing::info!(id = %doc["_id"], "widget created");
    });

    let mut options = RemoOptions::from_env()?
        .with_access(access)
        .with_callbacks(callbacks);
    if options.store_uri.is_none() {
        options = options.with_store(Arc::new(MemoryDocumentStore::new()));
    }

    let state = AppState::build(options, registry).await?;
    let app = mount(common_routes(state.clone()), state);
    let listener = TcpListener::bind("127.0.0.1:3000").await?;
    let port = listener.local_addr()?.port();
    tracing::info!("Example consumer listening on http://127.0.0.1:{}", port);
    axum::serve(listener, app).await?;
    Ok(())
}
