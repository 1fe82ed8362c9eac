//! Server-rendered login form and dashboard table.

use axum::extract::{Form, Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;

use crate::api::rest::AppState;
use crate::domain::auth::{LoginErrorTag, LoginForm, LoginState};
use crate::domain::snapshot::EnvironmentSnapshot;

/// Gathers navigator/screen/connection values, a geolocation outcome and
/// peer-connection host candidates, posts them, then reopens the dashboard
/// with `collected=true`. The reopen happens even if the post fails.
const COLLECT_SCRIPT: &str = r#"
(async () => {
  const geolocation = await new Promise((resolve) => {
    if (!('geolocation' in navigator)) return resolve({ status: 'unsupported' });
    navigator.geolocation.getCurrentPosition(
      (p) => resolve({ status: 'granted', latitude: p.coords.latitude, longitude: p.coords.longitude, accuracy: p.coords.accuracy }),
      (e) => resolve({ status: e.code === 3 ? 'timed_out' : 'denied' }),
      { enableHighAccuracy: true, timeout: 10000, maximumAge: 0 }
    );
  });
  const iceCandidates = await new Promise((resolve) => {
    if (typeof RTCPeerConnection === 'undefined') return resolve([]);
    const found = [];
    const rtc = new RTCPeerConnection({ iceServers: [] });
    rtc.createDataChannel('');
    rtc.onicecandidate = (e) => { if (e && e.candidate && e.candidate.candidate) found.push(e.candidate.candidate); };
    rtc.createOffer().then((o) => rtc.setLocalDescription(o)).catch(() => {});
    setTimeout(() => { rtc.close(); resolve(found); }, 1000);
  });
  const c = navigator.connection;
  const signals = {
    userAgent: navigator.userAgent,
    platform: navigator.platform,
    maxTouchPoints: navigator.maxTouchPoints || 0,
    pointerFine: window.matchMedia('(pointer:fine)').matches,
    screenWidth: window.screen.width,
    screenHeight: window.screen.height,
    timezone: Intl.DateTimeFormat().resolvedOptions().timeZone,
    localTime: new Date().toLocaleString(),
    connection: c ? { effectiveType: c.effectiveType || '', downlink: c.downlink } : null,
    geolocation,
    iceCandidates,
    originHost: window.location.hostname,
  };
  const params = new URLSearchParams(window.location.search);
  params.set('collected', 'true');
  try {
    await fetch('/api/v1/snapshot', {
      method: 'POST',
      headers: { 'Content-Type': 'application/json' },
      body: JSON.stringify(signals),
    });
  } finally {
    window.location.assign('/dashboard?' + params.toString());
  }
})();
"#;

const STYLE: &str = r#"
body { margin: 0; font-family: system-ui, sans-serif; display: flex; min-height: 100vh; }
nav { background: #212529; color: #fff; padding: 24px; width: 200px; }
nav a { display: block; color: #f8f9fa; padding: 12px; border-radius: 6px; text-decoration: none; }
nav a:hover { background: #007bff; }
main { flex: 1; padding: 20px; }
table { border-collapse: collapse; width: 100%; }
th, td { border: 1px solid #999; padding: 8px; text-align: left; }
.error { color: #c0392b; font-size: 0.9em; margin: 4px 0 12px; }
"#;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(login_page))
        .route("/login", post(submit_login))
        .route("/dashboard", get(dashboard))
        .route("/dashboard/refresh", post(refresh))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct LoginSubmission {
    username: String,
    password: String,
    #[serde(default)]
    attempts: u32,
}

#[derive(Debug, Default, Deserialize)]
struct DashboardQuery {
    attempts: Option<u32>,
    /// Set by the collector script once its cycle has been posted.
    #[serde(default)]
    collected: bool,
}

#[derive(Debug, Default, Deserialize)]
struct RefreshSubmission {
    attempts: Option<u32>,
}

async fn login_page() -> Html<String> {
    Html(render_login(&LoginState::default()))
}

async fn submit_login(
    State(state): State<AppState>,
    Form(submission): Form<LoginSubmission>,
) -> Response {
    let prior = LoginState {
        attempts: submission.attempts,
        ..LoginState::default()
    };
    let form = LoginForm {
        username: submission.username,
        password: submission.password,
    };
    let next = state.dashboard.login(&prior, &form);

    if next.submitted {
        Redirect::to(&dashboard_path(Some(next.attempts))).into_response()
    } else {
        Html(render_login(&next)).into_response()
    }
}

/// Every mount collects: the table is only rendered on the follow-up
/// request issued by the collector script.
async fn dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Html<String> {
    if !query.collected {
        return Html(render_collecting());
    }
    match state.dashboard.current().await {
        Some(snapshot) => Html(render_dashboard(&snapshot, query.attempts)),
        None => Html(render_unavailable(query.attempts)),
    }
}

/// Re-run collection from the browser, keeping the attempt count.
async fn refresh(Form(submission): Form<RefreshSubmission>) -> Redirect {
    Redirect::to(&dashboard_path(submission.attempts))
}

fn dashboard_path(attempts: Option<u32>) -> String {
    match attempts {
        Some(n) => format!("/dashboard?attempts={}", n),
        None => "/dashboard".to_string(),
    }
}

fn refresh_form(attempts: Option<u32>) -> String {
    let hidden = attempts
        .map(|n| format!("<input type=\"hidden\" name=\"attempts\" value=\"{}\">", n))
        .unwrap_or_default();
    format!(
        "<form method=\"post\" action=\"/dashboard/refresh\">{}<button type=\"submit\">Refresh</button></form>",
        hidden
    )
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{}</title><style>{}</style></head>\
         <body><nav><h2>Nectar</h2><a href=\"/dashboard\">Dashboard</a><a href=\"/\">Logout</a></nav>\
         <main>{}</main></body></html>",
        escape(title),
        STYLE,
        body
    )
}

fn field_error(state: &LoginState, tag: LoginErrorTag) -> String {
    match state.error {
        Some(current) if current == tag => {
            format!("<div class=\"error\">{}</div>", escape(tag.message()))
        }
        _ => String::new(),
    }
}

fn render_login(state: &LoginState) -> String {
    let body = format!(
        "<h1>Sign in</h1>\
         <form method=\"post\" action=\"/login\">\
         <input type=\"hidden\" name=\"attempts\" value=\"{}\">\
         <div><label>Username <input type=\"text\" name=\"username\" required></label></div>{}\
         <div><label>Password <input type=\"password\" name=\"password\" required></label></div>{}\
         <button type=\"submit\">Submit</button></form>",
        state.attempts,
        field_error(state, LoginErrorTag::Uname),
        field_error(state, LoginErrorTag::Pass),
    );
    page("Nectar · Sign in", &body)
}

fn render_dashboard(snapshot: &EnvironmentSnapshot, attempts: Option<u32>) -> String {
    let mut body = String::new();
    if let Some(n) = attempts {
        body.push_str(&format!("<p>Signed in after {} attempt(s).</p>", n));
    }
    body.push_str("<table><tbody>");
    for (label, value) in snapshot.display_rows() {
        body.push_str(&format!(
            "<tr><th>{}</th><td>{}</td></tr>",
            escape(label),
            escape(&value)
        ));
    }
    body.push_str("</tbody></table>");
    body.push_str(&refresh_form(attempts));
    page("Nectar · Dashboard", &body)
}

fn render_unavailable(attempts: Option<u32>) -> String {
    let body = format!(
        "<p>Device information could not be collected.</p>{}",
        refresh_form(attempts)
    );
    page("Nectar · Dashboard", &body)
}

fn render_collecting() -> String {
    let body = format!(
        "<p>Collecting device information…</p><script>{}</script>",
        COLLECT_SCRIPT
    );
    page("Nectar · Dashboard", &body)
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
