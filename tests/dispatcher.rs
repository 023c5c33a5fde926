//! End-to-end dispatch over the in-memory store: routing, access rules, soft delete,
//! query translation, populate, delete modes and error rendering.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use remo::{
    remo_routes, AccessDecision, AccessRule, AccessRules, Action, AppState, Callbacks, DeleteMode,
    FieldConfig, MemoryDocumentStore, ModelDef, ModelRegistry, RemoOptions, RemoveHook, StoreError,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

fn enc(s: &str) -> String {
    s.bytes()
        .map(|b| {
            if b.is_ascii_alphanumeric() || b == b'_' || b == b'-' {
                (b as char).to_string()
            } else {
                format!("%{:02X}", b)
            }
        })
        .collect()
}

fn widget() -> ModelDef {
    ModelDef::new("Widget")
        .with_field("name", FieldConfig::required())
        .with_field("rank", FieldConfig::default())
        .with_field("secret", FieldConfig::default())
        .with_field("owner", FieldConfig::reference("User"))
}

fn registry_with(widget: ModelDef) -> ModelRegistry {
    ModelRegistry::new()
        .with_model(ModelDef::new("User").with_field("name", FieldConfig::default()))
        .unwrap()
        .with_model(widget)
        .unwrap()
}

async fn app_with(options: RemoOptions, registry: ModelRegistry) -> (Router, Arc<MemoryDocumentStore>) {
    let store = Arc::new(MemoryDocumentStore::new());
    let state = AppState::build(options.with_store(store.clone()), registry)
        .await
        .unwrap();
    (remo_routes(state), store)
}

async fn app(options: RemoOptions) -> (Router, Arc<MemoryDocumentStore>) {
    app_with(options, registry_with(widget())).await
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    headers: &[(&str, &str)],
) -> (StatusCode, Vec<u8>) {
    let mut req = Request::builder().method(method).uri(uri);
    for (k, v) in headers {
        req = req.header(*k, *v);
    }
    let req = match body {
        Some(b) => req
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

fn json_of(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}

async fn create(app: &Router, alias: &str, body: Value) -> Value {
    let (status, bytes) = send(app, Method::POST, &format!("/remo/{}", alias), Some(body), &[]).await;
    assert_eq!(status, StatusCode::OK);
    json_of(&bytes)
}

#[tokio::test]
async fn unknown_alias_is_not_found_with_empty_body() {
    let (app, _) = app(RemoOptions::default()).await;
    for (method, uri, payload) in [
        (Method::GET, "/remo/gadget", None),
        (Method::GET, "/remo/gadget/1", None),
        (Method::GET, "/remo/gadget/count", None),
        (Method::DELETE, "/remo/gadget/1", None),
        (Method::POST, "/remo/gadget", Some(json!({"name": "x"}))),
        (Method::POST, "/remo/gadget", Some(json!([1]))),
        (Method::POST, "/remo/gadget", None),
        (Method::PUT, "/remo/gadget/1", Some(json!({"name": "x"}))),
        (Method::PUT, "/remo/gadget/1", Some(json!("x"))),
        (Method::PUT, "/remo/gadget/1", None),
    ] {
        let (status, body) = send(&app, method.clone(), uri, payload, &[]).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{} {}", method, uri);
        assert!(body.is_empty());
    }
}

#[tokio::test]
async fn malformed_bodies_are_bad_requests_with_empty_body() {
    let (app, store) = app(RemoOptions::default()).await;
    let req = Request::builder()
        .method(Method::POST)
        .uri("/remo/widget")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.is_empty());

    let (status, body) = send(&app, Method::POST, "/remo/widget", None, &[]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.is_empty());
    let (status, _) = send(&app, Method::POST, "/remo/widget", Some(json!([1])), &[]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(store.documents("widgets").is_empty());
}

#[tokio::test]
async fn create_then_get_round_trips() {
    let (app, _) = app(RemoOptions::default()).await;
    let created = create(&app, "widget", json!({"name": "bolt", "rank": 2, "junk": true})).await;
    let id = created["_id"].as_str().unwrap().to_string();
    assert_eq!(id.len(), 32);
    assert!(created.get("junk").is_none());

    let (status, body) = send(&app, Method::GET, &format!("/remo/widget/{}", id), None, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&body), created);

    let (status, _) = send(&app, Method::GET, "/remo/widget/nope", None, &[]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn soft_deleted_documents_are_hidden_unless_asked_for() {
    let (app, _) = app(RemoOptions::default()).await;
    create(&app, "widget", json!({"name": "kept"})).await;
    let gone = create(&app, "widget", json!({"name": "gone", "_destroy": true})).await;

    let (_, body) = send(&app, Method::GET, "/remo/widget", None, &[]).await;
    let names: Vec<Value> = json_of(&body).as_array().unwrap().iter().map(|d| d["name"].clone()).collect();
    assert_eq!(names, vec![json!("kept")]);

    let (_, body) = send(&app, Method::GET, "/remo/widget/count", None, &[]).await;
    assert_eq!(json_of(&body), json!({"response": 1}));

    let uri = format!("/remo/widget/{}", gone["_id"].as_str().unwrap());
    let (status, _) = send(&app, Method::GET, &uri, None, &[]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let uri = format!("/remo/widget?where={}", enc(r#"{"_destroy":true}"#));
    let (_, body) = send(&app, Method::GET, &uri, None, &[]).await;
    assert_eq!(json_of(&body).as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn soft_delete_can_be_disabled() {
    let (app, _) = app(RemoOptions::default().with_soft_delete_field(None)).await;
    create(&app, "widget", json!({"name": "kept"})).await;
    create(&app, "widget", json!({"name": "gone", "_destroy": true})).await;
    let (_, body) = send(&app, Method::GET, "/remo/widget/count", None, &[]).await;
    assert_eq!(json_of(&body), json!({"response": 2}));
}

#[tokio::test]
async fn sort_skip_and_limit_apply_to_lists() {
    let (app, _) = app(RemoOptions::default()).await;
    for rank in 1..=5 {
        create(&app, "widget", json!({"name": format!("w{}", rank), "rank": rank})).await;
    }
    let (_, body) = send(&app, Method::GET, "/remo/widget?sort=-rank&skip=1&limit=2", None, &[]).await;
    let ranks: Vec<Value> = json_of(&body).as_array().unwrap().iter().map(|d| d["rank"].clone()).collect();
    assert_eq!(ranks, vec![json!(4), json!(3)]);

    let uri = format!("/remo/widget/count?where={}&limit=1", enc(r#"{"rank":{"$gte":3}}"#));
    let (_, body) = send(&app, Method::GET, &uri, None, &[]).await;
    assert_eq!(json_of(&body), json!({"response": 3}));

    let (status, _) = send(&app, Method::GET, "/remo/widget?limit=abc", None, &[]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn select_and_populate_shape_documents() {
    let (app, _) = app(RemoOptions::default()).await;
    let user = create(&app, "user", json!({"name": "ann"})).await;
    let w = create(
        &app,
        "widget",
        json!({"name": "bolt", "secret": "s", "owner": user["_id"]}),
    )
    .await;
    let uri = format!("/remo/widget/{}?select=name&populate=owner", w["_id"].as_str().unwrap());
    let (_, body) = send(&app, Method::GET, &uri, None, &[]).await;
    assert_eq!(json_of(&body), json!({"_id": w["_id"], "name": "bolt"}));

    let uri = format!("/remo/widget/{}?pop=owner&fields=-secret", w["_id"].as_str().unwrap());
    let (_, body) = send(&app, Method::GET, &uri, None, &[]).await;
    let doc = json_of(&body);
    assert_eq!(doc["owner"], user);
    assert!(doc.get("secret").is_none());
}

#[tokio::test]
async fn populate_applies_on_create_and_list() {
    let (app, store) = app(RemoOptions::default()).await;
    let user = create(&app, "user", json!({"name": "ann"})).await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/remo/widget?pop=owner",
        Some(json!({"name": "bolt", "owner": user["_id"]})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let created = json_of(&body);
    assert_eq!(created["owner"], user);
    assert_eq!(store.documents("widgets")[0]["owner"], user["_id"]);

    create(&app, "widget", json!({"name": "orphan"})).await;
    let (_, body) = send(&app, Method::GET, "/remo/widget?populate=owner", None, &[]).await;
    let docs = json_of(&body);
    assert_eq!(docs.as_array().unwrap().len(), 2);
    assert_eq!(docs[0]["owner"], user);
    assert!(docs[1].get("owner").is_none());
}

#[tokio::test]
async fn update_merges_and_never_changes_id() {
    let (app, _) = app(RemoOptions::default()).await;
    let w = create(&app, "widget", json!({"name": "bolt", "rank": 1})).await;
    let id = w["_id"].as_str().unwrap();
    let uri = format!("/remo/widget/{}", id);
    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some(json!({"_id": "hijack", "rank": 9})),
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&body), json!({"_id": id, "name": "bolt", "rank": 9}));

    let (status, _) = send(&app, Method::GET, "/remo/widget/hijack", None, &[]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, Method::PUT, "/remo/widget/missing", Some(json!({"rank": 1})), &[]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, Method::PUT, &uri, Some(json!([1])), &[]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn denied_mutations_leave_the_store_untouched() {
    let access = AccessRules::new().rule_for(
        "Widget",
        &[Action::Update, Action::Delete, Action::Count],
        AccessRule::deny(),
    );
    let (app, store) = app(RemoOptions::default().with_access(access)).await;
    let w = create(&app, "widget", json!({"name": "bolt"})).await;
    let before = store.documents("widgets");
    let uri = format!("/remo/widget/{}", w["_id"].as_str().unwrap());

    let (status, body) = send(&app, Method::PUT, &uri, Some(json!({"name": "x"})), &[]).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.is_empty());
    let (status, _) = send(&app, Method::DELETE, &uri, None, &[]).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, Method::GET, "/remo/widget/count", None, &[]).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    assert_eq!(store.documents("widgets"), before);
}

#[tokio::test]
async fn access_checks_can_narrow_the_query() {
    let access = AccessRules::new().rule(
        "Widget",
        Action::List,
        AccessRule::check(|ctx, options| match ctx.request.header("x-owner") {
            Some(owner) => {
                let scope = json!({ "owner": owner }).to_string();
                AccessDecision::Allow(options.push_query("where", scope))
            }
            None => AccessDecision::Deny,
        }),
    );
    let (app, _) = app(RemoOptions::default().with_access(access)).await;
    let u1 = create(&app, "user", json!({"name": "a"})).await;
    let u2 = create(&app, "user", json!({"name": "b"})).await;
    create(&app, "widget", json!({"name": "mine", "owner": u1["_id"]})).await;
    create(&app, "widget", json!({"name": "theirs", "owner": u2["_id"]})).await;

    let owner = u1["_id"].as_str().unwrap();
    let (status, body) = send(&app, Method::GET, "/remo/widget", None, &[("x-owner", owner)]).await;
    assert_eq!(status, StatusCode::OK);
    let docs = json_of(&body);
    assert_eq!(docs.as_array().unwrap().len(), 1);
    assert_eq!(docs[0]["name"], "mine");

    let (status, _) = send(&app, Method::GET, "/remo/widget", None, &[]).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn count_suffix_is_configurable() {
    let (app, _) = app(RemoOptions::default().with_count_action("_count")).await;
    create(&app, "widget", json!({"name": "bolt"})).await;
    let (status, body) = send(&app, Method::GET, "/remo/widget/_count", None, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&body), json!({"response": 1}));
    let (status, _) = send(&app, Method::GET, "/remo/widget/count", None, &[]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn custom_prefix_and_alias_mapping() {
    let options = RemoOptions::default()
        .with_url("/api")
        .with_alias_to_name(|alias: &str| if alias == "things" { "Widget".into() } else { alias.into() });
    let (app, _) = app(options).await;
    let (status, _) = send(&app, Method::POST, "/api/things", Some(json!({"name": "x"})), &[]).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::GET, "/remo/widget", None, &[]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl RemoveHook for Recorder {
    async fn before_remove(&self, doc: &Value) -> Result<(), StoreError> {
        if doc["name"] == "locked" {
            return Err(StoreError::Hook("locked".into()));
        }
        self.calls.lock().unwrap().push(format!("before:{}", doc["name"]));
        Ok(())
    }

    async fn after_remove(&self, doc: &Value) -> Result<(), StoreError> {
        self.calls.lock().unwrap().push(format!("after:{}", doc["name"]));
        Ok(())
    }
}

#[tokio::test]
async fn remove_hooks_run_only_in_instance_mode() {
    let hooks = Arc::new(Recorder::default());
    let registry = registry_with(widget().with_remove_hook(hooks.clone()));
    let (app, store) = app_with(RemoOptions::default(), registry).await;
    let a = create(&app, "widget", json!({"name": "a"})).await;
    let b = create(&app, "widget", json!({"name": "b"})).await;
    let locked = create(&app, "widget", json!({"name": "locked"})).await;

    let uri = |d: &Value| format!("/remo/widget/{}", d["_id"].as_str().unwrap());
    let (status, body) = send(&app, Method::DELETE, &uri(&a), None, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&body), a);
    assert!(hooks.calls.lock().unwrap().is_empty());

    let (status, _) = send(&app, Method::DELETE, &uri(&b), None, &[("x-remo-mw", "1")]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        *hooks.calls.lock().unwrap(),
        vec!["before:\"b\"".to_string(), "after:\"b\"".to_string()]
    );

    let (status, _) = send(&app, Method::DELETE, &uri(&locked), None, &[("x-remo-mw", "1")]).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(store.documents("widgets").len(), 1);

    let (status, _) = send(&app, Method::DELETE, &uri(&a), None, &[]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn instance_mode_can_be_the_default() {
    let hooks = Arc::new(Recorder::default());
    let registry = registry_with(widget().with_remove_hook(hooks.clone()));
    let options = RemoOptions::default().with_delete_mode(DeleteMode::Instance);
    let (app, _) = app_with(options, registry).await;
    let a = create(&app, "widget", json!({"name": "a"})).await;
    let uri = format!("/remo/widget/{}", a["_id"].as_str().unwrap());
    let (status, _) = send(&app, Method::DELETE, &uri, None, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hooks.calls.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn callbacks_fire_after_successful_mutations() {
    let seen: Arc<Mutex<Vec<(Action, Value)>>> = Arc::default();
    let mut callbacks = Callbacks::new();
    for action in [Action::Create, Action::Update, Action::Delete] {
        let seen = seen.clone();
        callbacks = callbacks.on("Widget", action, move |doc: &Value| {
            seen.lock().unwrap().push((action, doc["name"].clone()));
        });
    }
    let (app, _) = app(RemoOptions::default().with_callbacks(callbacks)).await;
    let w = create(&app, "widget", json!({"name": "a"})).await;
    let uri = format!("/remo/widget/{}", w["_id"].as_str().unwrap());
    send(&app, Method::PUT, &uri, Some(json!({"name": "b"})), &[]).await;
    send(&app, Method::DELETE, &uri, None, &[]).await;
    send(&app, Method::DELETE, &uri, None, &[]).await;

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            (Action::Create, json!("a")),
            (Action::Update, json!("b")),
            (Action::Delete, json!("b")),
        ]
    );
}

#[tokio::test]
async fn store_failures_are_500_and_verbose_only_in_debug() {
    let (quiet, _) = app(RemoOptions::default()).await;
    let (status, body) = send(&quiet, Method::POST, "/remo/widget", Some(json!({"rank": 1})), &[]).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.is_empty());

    let (loud, _) = app(RemoOptions::default().with_debug(true)).await;
    let (status, body) = send(&loud, Method::POST, "/remo/widget", Some(json!({"rank": 1})), &[]).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_of(&body)["error"]["code"], "validation_error");

    let (status, body) = send(&loud, Method::GET, "/remo/gadget", None, &[]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.is_empty());
}
