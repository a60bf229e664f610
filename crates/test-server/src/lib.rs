use axum::Router;
use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use serde_json::{Value as JsonValue, json};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tokio::time::sleep;
use upload_relay_core::Config;

/// Test harness that runs the service on its own runtime
pub struct TestServer {
    _handle: JoinHandle<()>,
    port: u16,
    workspace: PathBuf,
}

impl TestServer {
    /// Start the server relaying to `relay_url`
    pub async fn start(relay_url: &str) -> Self {
        Self::start_with_relay_timeout(relay_url, 10).await
    }

    /// Start the server with a custom relay timeout in seconds
    pub async fn start_with_relay_timeout(relay_url: &str, timeout_secs: u64) -> Self {
        // Only shows up with `--nocapture`
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let port = portpicker::pick_unused_port().expect("No available port");

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let workspace = std::env::temp_dir().join(format!("upload-relay-test-{now}-{port}"));

        let config = Config {
            listen_on_port: port,
            workspace: workspace.to_string_lossy().into_owned(),
            relay_url: relay_url.to_string(),
            relay_timeout_secs: Some(timeout_secs),
            ..Default::default()
        };

        // Spawn the server in a separate thread with its own runtime
        let handle = std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async move {
                upload_relay_core::run(config).await.unwrap();
            });
        });

        let server = TestServer {
            _handle: handle,
            port,
            workspace,
        };

        // Poll until server is ready
        let client = server.client();
        for _ in 0..200 {
            if let Ok(response) = client.get(server.url("/health")).send().await
                && response.status().is_success()
            {
                break;
            }

            sleep(Duration::from_millis(10)).await;
        }

        server
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{path}", self.port)
    }

    pub fn workspace(&self) -> &std::path::Path {
        &self.workspace
    }

    /// Upload directories created so far
    pub fn upload_dirs(&self) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(&self.workspace) else {
            return Vec::new();
        };

        let mut dirs = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect::<Vec<_>>();
        dirs.sort();
        dirs
    }

    pub fn client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap()
    }

    /// POST a multipart upload; `keywords` is sent verbatim when present
    pub async fn upload(
        &self,
        client: &reqwest::Client,
        keywords: Option<&str>,
        files: &[(&str, &[u8])],
    ) -> reqwest::Response {
        let mut form = reqwest::multipart::Form::new();
        if let Some(keywords) = keywords {
            form = form.text("keywords", keywords.to_string());
        }
        for (filename, content) in files {
            let part = reqwest::multipart::Part::bytes(content.to_vec())
                .file_name(filename.to_string())
                .mime_str("application/pdf")
                .unwrap();
            form = form.part("files", part);
        }

        client
            .post(self.url("/api/upload"))
            .multipart(form)
            .send()
            .await
            .unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        // Clean up test workspace
        std::fs::remove_dir_all(&self.workspace).ok();
    }
}

/// How the mock relay answers
#[derive(Debug, Clone, Copy)]
pub enum RelayMode {
    /// httpbin-style echo with `origin`, `url` and the received `json`
    Echo,
    /// Plain text body
    NonJson,
    /// JSON echo with the given status
    Status(u16),
    /// Never answers
    Hang,
    /// Valid JSON that is not an object
    Null,
}

#[derive(Clone)]
struct MockRelayState {
    mode: RelayMode,
    url: String,
    received_calls: Arc<Mutex<Vec<JsonValue>>>,
}

/// Mock relay endpoint recording every payload it receives
pub struct MockRelay {
    server_handle: tokio::task::JoinHandle<()>,
    pub port: u16,
    pub received_calls: Arc<Mutex<Vec<JsonValue>>>,
}

impl MockRelay {
    pub async fn start(mode: RelayMode) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("No available port for mock relay");
        let port = listener.local_addr().unwrap().port();
        let received_calls = Arc::new(Mutex::new(Vec::new()));

        let state = MockRelayState {
            mode,
            url: format!("http://127.0.0.1:{port}/post"),
            received_calls: received_calls.clone(),
        };

        let app = Router::new()
            .route("/post", post(receive))
            .with_state(state);

        let server_handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        MockRelay {
            server_handle,
            port,
            received_calls,
        }
    }

    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}/post", self.port)
    }

    pub async fn get_calls(&self) -> Vec<JsonValue> {
        self.received_calls.lock().await.clone()
    }
}

impl Drop for MockRelay {
    fn drop(&mut self) {
        self.server_handle.abort();
    }
}

async fn receive(State(state): State<MockRelayState>, Json(body): Json<JsonValue>) -> Response {
    state.received_calls.lock().await.push(body.clone());

    let echo = json!({
        "origin": "127.0.0.1",
        "url": state.url,
        "json": body,
    });

    match state.mode {
        RelayMode::Echo => (StatusCode::OK, Json(echo)).into_response(),
        RelayMode::NonJson => (StatusCode::OK, "<html>not json</html>").into_response(),
        RelayMode::Hang => {
            sleep(Duration::from_secs(3600)).await;
            (StatusCode::OK, Json(echo)).into_response()
        }
        RelayMode::Null => (StatusCode::OK, Json(JsonValue::Null)).into_response(),
        RelayMode::Status(code) => {
            let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(echo)).into_response()
        }
    }
}
