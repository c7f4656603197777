// Stub of the instance REST API served by a real axum router on an ephemeral port.
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

pub const GOOD_REPO: &str = "https://github.com/org/good";

#[derive(Default)]
pub struct StubState {
    pub instances: Vec<Value>,
    pub statuses: HashMap<String, Value>,
    pub create_status: u16,
    pub created_bodies: Vec<Value>,
    pub deleted: Vec<String>,
    pub validated: Vec<String>,
}

pub type SharedStub = Arc<Mutex<StubState>>;

async fn list_vms(State(stub): State<SharedStub>) -> Json<Vec<Value>> {
    Json(stub.lock().unwrap().instances.clone())
}

async fn create_vm(State(stub): State<SharedStub>, Json(body): Json<Value>) -> impl IntoResponse {
    let mut stub = stub.lock().unwrap();
    stub.created_bodies.push(body);
    let code = StatusCode::from_u16(stub.create_status).unwrap_or(StatusCode::OK);
    (code, Json(json!({"id": "new"})))
}

async fn get_vm(State(stub): State<SharedStub>, Path(id): Path<String>) -> impl IntoResponse {
    let stub = stub.lock().unwrap();
    match stub.instances.iter().find(|i| i["id"] == json!(id)) {
        Some(found) => (StatusCode::OK, Json(found.clone())).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn delete_vm(State(stub): State<SharedStub>, Path(id): Path<String>) -> Json<Value> {
    let mut stub = stub.lock().unwrap();
    stub.instances.retain(|i| i["id"] != json!(id));
    stub.deleted.push(id);
    Json(json!(null))
}

async fn vm_status(State(stub): State<SharedStub>, Path(id): Path<String>) -> impl IntoResponse {
    let stub = stub.lock().unwrap();
    match stub.statuses.get(&id) {
        Some(body) => (StatusCode::OK, Json(body.clone())).into_response(),
        None => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
    }
}

async fn validate_repo(
    State(stub): State<SharedStub>,
    Path(repo): Path<String>,
) -> impl IntoResponse {
    let repo = repo.trim_start_matches('/').to_string();
    stub.lock().unwrap().validated.push(repo.clone());
    if repo == GOOD_REPO {
        (StatusCode::OK, Json(json!({"message": "Valid"})))
    } else {
        (StatusCode::BAD_REQUEST, Json(json!({"message": "Invalid"})))
    }
}

/// Serve the stub under `/path-hash/` and return the base url to point the client at.
pub async fn spawn_stub(stub: SharedStub) -> String {
    let api = Router::new()
        .route("/vms/", get(list_vms).post(create_vm))
        .route("/vms/{id}", get(get_vm).delete(delete_vm))
        .route("/vms/{id}/status", get(vm_status))
        .route("/repos/validate/{*repo}", get(validate_repo))
        .with_state(stub);
    let app = Router::new().nest("/path-hash", api);

    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().expect("stub addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    format!("http://{}/path-hash/", addr)
}

pub fn new_stub() -> SharedStub {
    Arc::new(Mutex::new(StubState {
        create_status: 200,
        ..Default::default()
    }))
}
