//! In-process Key Light used by the tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::{Value, json};

use crate::device::{DeviceAddress, DeviceInfo};
use crate::state::{LightState, LightsPayload};

#[derive(Debug)]
struct Inner {
    name: String,
    state: LightState,
    puts: usize,
    identified: usize,
    fail_after: Option<usize>,
    garbled: bool,
    gauge: Option<(Arc<InFlight>, Duration)>,
}

/// Counts requests being served across several mocks and remembers the peak.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlight {
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

type Shared = Arc<Mutex<Inner>>;

/// A fake light listening on an ephemeral localhost port.
pub(crate) struct MockLight {
    addr: SocketAddr,
    inner: Shared,
}

impl MockLight {
    pub async fn start(name: &str) -> Self {
        let inner = Arc::new(Mutex::new(Inner {
            name: name.to_string(),
            state: LightState::default(),
            puts: 0,
            identified: 0,
            fail_after: None,
            garbled: false,
            gauge: None,
        }));

        let app = Router::new()
            .route("/elgato/lights", get(get_lights).put(put_lights))
            .route("/elgato/lights/identify", post(identify))
            .route("/elgato/accessory-info", get(accessory_info))
            .with_state(inner.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        MockLight { addr, inner }
    }

    pub fn device(&self) -> DeviceInfo {
        let name = self.inner.lock().unwrap().name.clone();
        DeviceInfo::new(
            &format!("AA:BB:CC:00:{:04X}", self.addr.port()),
            &name,
            DeviceAddress::new("127.0.0.1", self.addr.port()),
        )
    }

    pub fn state(&self) -> LightState {
        self.inner.lock().unwrap().state
    }

    pub fn set(&self, state: LightState) {
        self.inner.lock().unwrap().state = state;
    }

    pub fn puts(&self) -> usize {
        self.inner.lock().unwrap().puts
    }

    pub fn identified(&self) -> usize {
        self.inner.lock().unwrap().identified
    }

    /// Stop answering writes once `n` have succeeded; later writes hang.
    pub fn fail_after(&self, n: usize) {
        self.inner.lock().unwrap().fail_after = Some(n);
    }

    /// Count reads in `gauge`, holding each one open for `delay`.
    pub fn track(&self, gauge: Arc<InFlight>, delay: Duration) {
        self.inner.lock().unwrap().gauge = Some((gauge, delay));
    }

    /// Answer reads with a body that is not JSON.
    pub fn garble(&self) {
        self.inner.lock().unwrap().garbled = true;
    }
}

/// A device whose port has nothing listening.
pub(crate) async fn unreachable_device(name: &str) -> DeviceInfo {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    DeviceInfo::new("", name, DeviceAddress::new("127.0.0.1", port))
}

async fn get_lights(State(inner): State<Shared>) -> Response {
    let gauge = inner.lock().unwrap().gauge.clone();
    if let Some((gauge, delay)) = gauge {
        gauge.enter();
        tokio::time::sleep(delay).await;
        gauge.leave();
    }
    let inner = inner.lock().unwrap();
    if inner.garbled {
        return (StatusCode::OK, "<html>not a light</html>").into_response();
    }
    Json(LightsPayload::single(&inner.state)).into_response()
}

async fn put_lights(State(inner): State<Shared>, Json(body): Json<LightsPayload>) -> Response {
    let hang = {
        let mut inner = inner.lock().unwrap();
        let hang = inner.fail_after.is_some_and(|n| inner.puts >= n);
        if !hang {
            inner.puts += 1;
            if let Some(state) = body.first() {
                inner.state = state;
            }
        }
        hang
    };
    if hang {
        tokio::time::sleep(Duration::from_secs(30)).await;
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    let state = inner.lock().unwrap().state;
    Json(LightsPayload::single(&state)).into_response()
}

async fn identify(State(inner): State<Shared>) -> StatusCode {
    inner.lock().unwrap().identified += 1;
    StatusCode::OK
}

async fn accessory_info(State(inner): State<Shared>) -> Json<Value> {
    let name = inner.lock().unwrap().name.clone();
    Json(json!({
        "productName": "Elgato Key Light",
        "hardwareBoardType": 53,
        "firmwareBuildNumber": 218,
        "firmwareVersion": "1.0.3",
        "serialNumber": "CW44J1A01234",
        "displayName": name,
        "features": ["lights"]
    }))
}
