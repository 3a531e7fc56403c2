// Mock of the portfolio backend served by warp on an ephemeral port.
#![allow(dead_code)]

use foliofy::auth::Claims;
use foliofy::config::Config;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

pub const EMAIL: &str = "ada@example.com";
pub const PASSWORD: &str = "Sup3r-secret!";
pub const REFRESH_TOKEN: &str = "refresh-1";

#[derive(Debug, Clone)]
pub struct MockHolding {
    pub id: String,
    pub symbol: String,
    pub shares: f64,
    pub avg_cost: f64,
}

impl MockHolding {
    pub fn new(id: &str, symbol: &str, shares: f64, avg_cost: f64) -> Self {
        MockHolding {
            id: id.into(),
            symbol: symbol.into(),
            shares,
            avg_cost,
        }
    }

    // Decimals go out as strings, the way the real backend sends them.
    fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "user_id": "user-123",
            "symbol": self.symbol,
            "name": format!("{} Corp", self.symbol),
            "shares": format!("{}", self.shares),
            "avg_cost": format!("{:.2}", self.avg_cost),
            "created_at": "2024-05-01T12:00:00.000123",
            "updated_at": "2024-05-02T08:30:00Z",
        })
    }
}

#[derive(Debug, Default)]
pub struct MockState {
    pub holdings: Vec<MockHolding>,
    /// "METHOD /path" of every request received.
    pub requests: Vec<String>,
    pub refresh_fails: bool,
    pub signout_fails: bool,
    pub refresh_delay: Duration,
    pub signout_delay: Duration,
    pub refresh_count: u32,
    pub next_id: u32,
    pub last_signout_token: Option<String>,
}

impl MockState {
    pub fn count(&self, request: &str) -> usize {
        self.requests.iter().filter(|r| r.as_str() == request).count()
    }
}

pub type Shared = Arc<Mutex<MockState>>;

pub struct MockBackend {
    pub addr: SocketAddr,
    pub state: Shared,
}

impl MockBackend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn config(&self, token_file: &Path, refresh_interval: Duration) -> Config {
        Config {
            api_url: self.url(),
            token_file: token_file.to_path_buf(),
            refresh_interval,
            request_timeout: Duration::from_secs(5),
        }
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }
}

pub fn id_token() -> String {
    let claims = Claims {
        sub: Some("user-123".into()),
        email: Some(EMAIL.into()),
        exp: Some(4_102_444_800),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"mock-secret"),
    )
    .unwrap()
}

fn respond(status: StatusCode, body: Value) -> Response {
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

fn detail(status: StatusCode, message: &str) -> Response {
    respond(status, json!({ "detail": message }))
}

fn with_state(state: Shared) -> impl Filter<Extract = (Shared,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn record(state: &Shared, request: String) {
    state.lock().unwrap().requests.push(request);
}

fn authorized(header: &Option<String>) -> bool {
    header
        .as_deref()
        .map_or(false, |h| h.starts_with("Bearer access-"))
}

pub async fn spawn(holdings: Vec<MockHolding>) -> MockBackend {
    let state: Shared = Arc::new(Mutex::new(MockState {
        holdings,
        next_id: 100,
        ..MockState::default()
    }));

    let signup = warp::path!("auth" / "signup")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .map(|body: Value, state: Shared| {
            record(&state, "POST /auth/signup".into());
            if body["email"] == EMAIL {
                return detail(StatusCode::BAD_REQUEST, "An account with this email already exists");
            }
            respond(
                StatusCode::CREATED,
                json!({
                    "user_sub": "user-456",
                    "user_confirmed": false,
                    "message": "Sign up complete. Please enter the verification code sent to your email."
                }),
            )
        });

    let confirm = warp::path!("auth" / "confirm")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .map(|body: Value, state: Shared| {
            record(&state, "POST /auth/confirm".into());
            if body["confirmation_code"] != "123456" {
                return detail(StatusCode::BAD_REQUEST, "Invalid verification code");
            }
            respond(
                StatusCode::OK,
                json!({ "confirmed": true, "message": "Email address confirmed." }),
            )
        });

    let resend = warp::path!("auth" / "resend-code")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .map(|_body: Value, state: Shared| {
            record(&state, "POST /auth/resend-code".into());
            respond(StatusCode::OK, json!({ "message": "Verification code resent." }))
        });

    let signin = warp::path!("auth" / "signin")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .map(|body: Value, state: Shared| {
            record(&state, "POST /auth/signin".into());
            if body["email"] != EMAIL || body["password"] != PASSWORD {
                return detail(StatusCode::UNAUTHORIZED, "Incorrect username or password.");
            }
            respond(
                StatusCode::OK,
                json!({
                    "id_token": id_token(),
                    "access_token": "access-1",
                    "refresh_token": REFRESH_TOKEN,
                    "expires_in": 3600,
                    "token_type": "Bearer"
                }),
            )
        });

    let refresh = warp::path!("auth" / "refresh")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .and_then(|body: Value, state: Shared| async move {
            let (delay, fails, count) = {
                let mut s = state.lock().unwrap();
                s.requests.push("POST /auth/refresh".into());
                s.refresh_count += 1;
                (s.refresh_delay, s.refresh_fails, s.refresh_count)
            };
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let reply = if fails || body["refresh_token"] != REFRESH_TOKEN {
                detail(StatusCode::UNAUTHORIZED, "Refresh Token has expired")
            } else {
                respond(
                    StatusCode::OK,
                    json!({
                        "id_token": format!("id-refreshed-{}", count + 1),
                        "access_token": format!("access-{}", count + 1),
                        "expires_in": 3600,
                        "token_type": "Bearer"
                    }),
                )
            };
            Ok::<_, Rejection>(reply)
        });

    let signout = warp::path!("auth" / "signout")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .and_then(|body: Value, state: Shared| async move {
            let (delay, fails) = {
                let mut s = state.lock().unwrap();
                s.requests.push("POST /auth/signout".into());
                s.last_signout_token = body["access_token"].as_str().map(str::to_string);
                (s.signout_delay, s.signout_fails)
            };
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let reply = if fails {
                detail(StatusCode::INTERNAL_SERVER_ERROR, "Identity provider unavailable")
            } else {
                respond(
                    StatusCode::OK,
                    json!({ "signed_out": true, "message": "Signed out successfully." }),
                )
            };
            Ok::<_, Rejection>(reply)
        });

    let list = warp::path!("holdings")
        .and(warp::get())
        .and(warp::header::optional::<String>("authorization"))
        .and(with_state(state.clone()))
        .map(|auth: Option<String>, state: Shared| {
            let mut s = state.lock().unwrap();
            s.requests.push("GET /holdings".into());
            if !authorized(&auth) {
                return detail(StatusCode::UNAUTHORIZED, "Not authenticated");
            }
            let body: Vec<Value> = s.holdings.iter().map(MockHolding::to_json).collect();
            respond(StatusCode::OK, Value::Array(body))
        });

    // Same-symbol creates merge into the existing row with a weighted cost.
    let create = warp::path!("holdings")
        .and(warp::post())
        .and(warp::header::optional::<String>("authorization"))
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .map(|auth: Option<String>, body: Value, state: Shared| {
            let mut s = state.lock().unwrap();
            s.requests.push("POST /holdings".into());
            if !authorized(&auth) {
                return detail(StatusCode::UNAUTHORIZED, "Not authenticated");
            }
            let symbol = body["symbol"].as_str().unwrap_or_default().to_uppercase();
            if symbol == "ZZZZ" {
                return detail(StatusCode::BAD_REQUEST, "Invalid stock symbol: ZZZZ");
            }
            let shares = body["shares"].as_f64().unwrap_or_default();
            let avg_cost = body["avg_cost"].as_f64().unwrap_or_default();
            if let Some(existing) = s.holdings.iter_mut().find(|h| h.symbol == symbol) {
                let total = existing.shares + shares;
                existing.avg_cost =
                    (existing.shares * existing.avg_cost + shares * avg_cost) / total;
                existing.shares = total;
                let json = existing.to_json();
                return respond(StatusCode::CREATED, json);
            }
            s.next_id += 1;
            let holding = MockHolding::new(&format!("h{}", s.next_id), &symbol, shares, avg_cost);
            let json = holding.to_json();
            s.holdings.push(holding);
            respond(StatusCode::CREATED, json)
        });

    let update = warp::path!("holdings" / String)
        .and(warp::put())
        .and(warp::header::optional::<String>("authorization"))
        .and(warp::body::json())
        .and(with_state(state.clone()))
        .map(|id: String, auth: Option<String>, body: Value, state: Shared| {
            let mut s = state.lock().unwrap();
            s.requests.push(format!("PUT /holdings/{}", id));
            if !authorized(&auth) {
                return detail(StatusCode::UNAUTHORIZED, "Not authenticated");
            }
            match s.holdings.iter_mut().find(|h| h.id == id) {
                Some(h) => {
                    if let Some(shares) = body["shares"].as_f64() {
                        h.shares = shares;
                    }
                    if let Some(avg_cost) = body["avg_cost"].as_f64() {
                        h.avg_cost = avg_cost;
                    }
                    respond(StatusCode::OK, h.to_json())
                }
                None => detail(
                    StatusCode::NOT_FOUND,
                    &format!("Holding with id {} not found", id),
                ),
            }
        });

    let delete = warp::path!("holdings" / String)
        .and(warp::delete())
        .and(warp::header::optional::<String>("authorization"))
        .and(with_state(state.clone()))
        .map(|id: String, auth: Option<String>, state: Shared| {
            let mut s = state.lock().unwrap();
            s.requests.push(format!("DELETE /holdings/{}", id));
            if !authorized(&auth) {
                return detail(StatusCode::UNAUTHORIZED, "Not authenticated");
            }
            let before = s.holdings.len();
            s.holdings.retain(|h| h.id != id);
            if s.holdings.len() == before {
                return detail(
                    StatusCode::NOT_FOUND,
                    &format!("Holding with id {} not found", id),
                );
            }
            warp::reply::with_status(warp::reply(), StatusCode::NO_CONTENT).into_response()
        });

    // Every symbol trades at 200 today, up from 190.
    let dashboard = warp::path!("dashboard")
        .and(warp::get())
        .and(warp::header::optional::<String>("authorization"))
        .and(with_state(state.clone()))
        .map(|auth: Option<String>, state: Shared| {
            let mut s = state.lock().unwrap();
            s.requests.push("GET /dashboard".into());
            if !authorized(&auth) {
                return detail(StatusCode::UNAUTHORIZED, "Not authenticated");
            }
            if s.holdings.is_empty() {
                return detail(StatusCode::NOT_FOUND, "No holdings found for user");
            }
            let price = 200.0;
            let total_value: f64 = s.holdings.iter().map(|h| h.shares * price).sum();
            let total_cost: f64 = s.holdings.iter().map(|h| h.shares * h.avg_cost).sum();
            let rows: Vec<Value> = s
                .holdings
                .iter()
                .map(|h| {
                    let value = h.shares * price;
                    let cost = h.shares * h.avg_cost;
                    json!({
                        "symbol": h.symbol,
                        "shares": format!("{}", h.shares),
                        "avg_cost": format!("{}", h.avg_cost),
                        "current_price": "200.00",
                        "previous_close": 190.0,
                        "daily_change_pct": "5.263157894736842",
                        "market_value": format!("{}", value),
                        "pnl": format!("{}", value - cost),
                        "pnl_pct": format!("{}", (value - cost) / cost * 100.0),
                        "allocation_pct": format!("{}", value / total_value * 100.0),
                    })
                })
                .collect();
            respond(
                StatusCode::OK,
                json!({
                    "total_value": format!("{}", total_value),
                    "total_cost": format!("{}", total_cost),
                    "total_pnl": format!("{}", total_value - total_cost),
                    "total_pnl_pct": (total_value - total_cost) / total_cost * 100.0,
                    "last_updated": "2024-05-02T16:00:00.123456",
                    "holdings": rows,
                }),
            )
        });

    let routes = signup
        .or(confirm)
        .or(resend)
        .or(signin)
        .or(refresh)
        .or(signout)
        .or(list)
        .or(create)
        .or(update)
        .or(delete)
        .or(dashboard);

    let (addr, server) = warp::serve(routes).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    MockBackend { addr, state }
}
