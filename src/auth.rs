//! Admin gate: an HS256 JWT carried in the `auth_token` cookie.
//!
//! Pages under `/admin` bounce to the login page with a `from` parameter;
//! `/api/admin` endpoints answer 401. The two login routes stay open.

use axum::{
    extract::{Query, Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::api::AppState;
use crate::config::AdminAccount;
use crate::domain::email::html_escape;
use crate::{Result, StoreError};

pub const AUTH_COOKIE: &str = "auth_token";
pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    pub email: String,
    pub role: String,
    pub name: String,
    #[serde(default)]
    pub iat: Option<usize>,
    pub exp: usize,
}

impl Claims {
    pub fn is_admin(&self) -> bool { self.role == ADMIN_ROLE }
}

pub fn issue_token(secret: &str, admin: &AdminAccount, ttl_hours: i64) -> Result<String> {
    let now = Utc::now();
    let claims = Claims {
        email: admin.email.clone(),
        role: ADMIN_ROLE.to_string(),
        name: admin.name.clone(),
        iat: Some(now.timestamp() as usize),
        exp: (now + Duration::hours(ttl_hours)).timestamp() as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| StoreError::Internal(format!("token encoding failed: {}", e)))
}

/// Signature, expiry and the email/role/name claims are all required.
pub fn verify_token(secret: &str, token: &str) -> Result<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_required_spec_claims(&["exp"]);
    let claims = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map_err(|e| StoreError::Unauthorized(format!("Invalid token: {}", e)))?
        .claims;
    if claims.email.trim().is_empty() || claims.name.trim().is_empty() || !claims.is_admin() {
        return Err(StoreError::Unauthorized("Token is missing required claims".into()));
    }
    Ok(claims)
}

/// Cookie first, then `Authorization: Bearer` for API tools.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    let from_cookie = jar.get(AUTH_COOKIE)
        .map(|c| c.value_trimmed().to_string())
        .filter(|t| !t.is_empty());
    from_cookie.or_else(|| {
        headers.get(header::AUTHORIZATION)?.to_str().ok()?
            .strip_prefix("Bearer ").map(str::trim).filter(|t| !t.is_empty()).map(str::to_string)
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Guard { Open, Page, Api }

fn guard_for(path: &str) -> Guard {
    match path {
        "/admin/login" | "/api/admin/login" => Guard::Open,
        "/admin" => Guard::Page,
        "/api/admin" => Guard::Api,
        p if p.starts_with("/api/admin/") => Guard::Api,
        p if p.starts_with("/admin/") => Guard::Page,
        _ => Guard::Open,
    }
}

pub fn login_redirect(path: &str) -> String {
    format!("/admin/login?from={}", urlencoding::encode(path))
}

pub async fn admin_gate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let guard = guard_for(&path);
    if guard == Guard::Open {
        return next.run(request).await;
    }

    let verified = token_from_headers(request.headers())
        .ok_or_else(|| StoreError::Unauthorized("Missing auth token".into()))
        .and_then(|token| verify_token(&state.config.jwt_secret, &token));

    match verified {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => {
            tracing::debug!(%path, error = %e, "admin request rejected");
            match guard {
                Guard::Page => Redirect::temporary(&login_redirect(&path)).into_response(),
                _ => e.into_response(),
            }
        }
    }
}

fn session_cookie(token: String, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE, token))
        .http_only(true)
        .path("/")
        .same_site(SameSite::Lax)
        .max_age(cookie::time::Duration::seconds(max_age_secs))
        .secure(secure)
        .build()
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

pub async fn login(State(state): State<AppState>, jar: CookieJar, Json(req): Json<LoginRequest>) -> Result<Response> {
    req.validate()?;
    let admin = &state.config.admin;
    let hash = admin.password_hash.clone().ok_or(StoreError::NotConfigured("Admin login"))?;
    let email_ok = req.email.trim().eq_ignore_ascii_case(admin.email.trim());
    let password = req.password;
    let password_ok = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?
        .unwrap_or(false);

    if !(email_ok && password_ok) {
        tracing::warn!(email = %req.email, "admin login rejected");
        return Err(StoreError::Unauthorized("Invalid email or password".into()));
    }

    let ttl = state.config.token_ttl_hours;
    let token = issue_token(&state.config.jwt_secret, admin, ttl)?;
    tracing::info!(email = %admin.email, "admin signed in");
    let cookie = session_cookie(token, ttl * 3600, state.config.secure_cookies);
    let body = Json(json!({ "email": admin.email, "name": admin.name, "role": ADMIN_ROLE }));
    Ok((jar.add(cookie), body).into_response())
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    let mut cookie = session_cookie(String::new(), 0, state.config.secure_cookies);
    cookie.make_removal();
    (jar.add(cookie), Json(json!({ "success": true }))).into_response()
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginPageParams {
    pub from: Option<String>,
}

/// Only same-site absolute paths are honored as post-login destinations.
fn safe_destination(from: Option<&str>) -> &str {
    match from {
        Some(p) if p.starts_with('/') && !p.starts_with("//") && !p.starts_with("/admin/login") => p,
        _ => "/admin",
    }
}

pub async fn login_page(Query(params): Query<LoginPageParams>) -> Html<String> {
    let destination = html_escape(safe_destination(params.from.as_deref()));
    Html(format!(
        r#"<!doctype html>
<html lang="en"><head><meta charset="utf-8"><title>Admin sign in</title></head>
<body>
<main style="max-width: 360px; margin: 80px auto; font-family: sans-serif;">
<h1>Admin sign in</h1>
<form id="login" data-destination="{destination}">
<label>Email <input type="email" name="email" required></label><br>
<label>Password <input type="password" name="password" required></label><br>
<button type="submit">Sign in</button>
<p id="error" role="alert"></p>
</form>
</main>
<script>
document.getElementById('login').addEventListener('submit', async (e) => {{
  e.preventDefault();
  const form = e.target;
  const res = await fetch('/api/admin/login', {{
    method: 'POST',
    headers: {{ 'Content-Type': 'application/json' }},
    body: JSON.stringify({{ email: form.email.value, password: form.password.value }}),
  }});
  if (res.ok) {{ window.location.assign(form.dataset.destination); return; }}
  const body = await res.json().catch(() => ({{}}));
  document.getElementById('error').textContent = body.error || 'Sign in failed';
}});
</script>
</body></html>"#
    ))
}

pub async fn dashboard_page(Extension(claims): Extension<Claims>) -> Html<String> {
    Html(format!(
        r#"<!doctype html>
<html lang="en"><head><meta charset="utf-8"><title>Back office</title></head>
<body style="font-family: sans-serif;">
<header><strong>Back office</strong> &middot; signed in as {name} ({email})</header>
<nav><a href="/api/admin/orders">Orders</a> &middot; <a href="/api/admin/orders/stats">Reports</a> &middot; <a href="/api/admin/products">Products</a></nav>
</body></html>"#,
        name = html_escape(&claims.name),
        email = html_escape(&claims.email),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "test-secret";

    fn admin() -> AdminAccount {
        AdminAccount { email: "office@sanctuary.av".into(), name: "Office".into(), password_hash: None }
    }

    #[test]
    fn test_issue_and_verify() {
        let token = issue_token(SECRET, &admin(), 1).unwrap();
        let claims = verify_token(SECRET, &token).unwrap();
        assert_eq!(claims.email, "office@sanctuary.av");
        assert!(claims.is_admin());
        assert!(verify_token("other-secret", &token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = issue_token(SECRET, &admin(), -2).unwrap();
        assert!(matches!(verify_token(SECRET, &token), Err(StoreError::Unauthorized(_))));
    }

    #[test]
    fn test_missing_claims_rejected() {
        #[derive(Serialize)]
        struct Partial { email: String, exp: usize }
        let exp = (Utc::now() + Duration::hours(1)).timestamp() as usize;
        let token = encode(&Header::default(), &Partial { email: "a@b.org".into(), exp }, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap();
        assert!(verify_token(SECRET, &token).is_err());
    }

    #[test]
    fn test_token_from_cookie_or_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; auth_token=abc.def.ghi"));
        assert_eq!(token_from_headers(&headers).as_deref(), Some("abc.def.ghi"));

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(token_from_headers(&headers).as_deref(), Some("xyz"));
        assert!(token_from_headers(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_guards() {
        assert_eq!(guard_for("/admin/login"), Guard::Open);
        assert_eq!(guard_for("/api/admin/login"), Guard::Open);
        assert_eq!(guard_for("/admin"), Guard::Page);
        assert_eq!(guard_for("/admin/orders"), Guard::Page);
        assert_eq!(guard_for("/api/admin/orders/3"), Guard::Api);
        assert_eq!(guard_for("/administrator"), Guard::Open);
        assert_eq!(guard_for("/api/products"), Guard::Open);
        assert_eq!(login_redirect("/admin/orders"), "/admin/login?from=%2Fadmin%2Forders");
    }

    #[test]
    fn test_safe_destination() {
        assert_eq!(safe_destination(Some("/admin/orders")), "/admin/orders");
        assert_eq!(safe_destination(Some("//evil.example")), "/admin");
        assert_eq!(safe_destination(Some("https://evil.example")), "/admin");
        assert_eq!(safe_destination(None), "/admin");
    }

    #[test]
    fn test_quoted_cookie_value() {
        let token = issue_token(SECRET, &admin(), 1).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(&format!("auth_token=\"{}\"", token)).unwrap());
        let found = token_from_headers(&headers).unwrap();
        assert_eq!(found, token);
        assert!(verify_token(SECRET, &found).is_ok());

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("auth_token="));
        assert!(token_from_headers(&headers).is_none());
    }

    #[test]
    fn test_token_without_iat_accepted() {
        #[derive(Serialize)]
        struct Minimal { email: String, role: String, name: String, exp: usize }
        let exp = (Utc::now() + Duration::hours(1)).timestamp() as usize;
        let minimal = Minimal { email: "office@sanctuary.av".into(), role: ADMIN_ROLE.into(), name: "Office".into(), exp };
        let token = encode(&Header::default(), &minimal, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap();
        let claims = verify_token(SECRET, &token).unwrap();
        assert_eq!(claims.iat, None);
        assert_eq!(claims.name, "Office");
    }

    #[test]
    fn test_session_cookie_flags() {
        let c = session_cookie("t".into(), 3600, true);
        assert_eq!(c.name(), AUTH_COOKIE);
        assert_eq!(c.http_only(), Some(true));
        assert_eq!(c.path(), Some("/"));
        assert_eq!(c.same_site(), Some(SameSite::Lax));
        assert_eq!(c.max_age(), Some(cookie::time::Duration::hours(1)));
        assert_eq!(c.secure(), Some(true));
        let header = c.to_string();
        assert!(header.contains("HttpOnly") && header.contains("Secure"));
        assert!(!session_cookie("t".into(), 0, false).to_string().contains("Secure"));
    }
}
