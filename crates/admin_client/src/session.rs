use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use reqwest::{Client, RequestBuilder, Response};
use shared::{
    error::{ApiError, ApiException},
    protocol::{OtpRequest, OtpVerifyRequest, OtpVerifyResponse},
};
use tokio::sync::{Mutex, RwLock};
use tracing::info;

use crate::otp::{OtpCooldown, OTP_RESEND_COOLDOWN};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Default)]
struct SessionState {
    token: Option<String>,
    admin_name: Option<String>,
}

/// Authenticated connection to the admin API.
///
/// Built once at startup and shared by `Arc` with every list view and
/// mutation that needs it; `logout` tears the credentials down.
pub struct AdminSession {
    http: Client,
    server_url: String,
    inner: RwLock<SessionState>,
    otp_cooldown: Mutex<OtpCooldown>,
}

impl AdminSession {
    pub fn new(server_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build admin api http client")?;
        Ok(Self {
            http,
            server_url: server_url.into().trim_end_matches('/').to_string(),
            inner: RwLock::new(SessionState::default()),
            otp_cooldown: Mutex::new(OtpCooldown::new(OTP_RESEND_COOLDOWN)),
        })
    }

    /// Session that reuses a token issued earlier.
    pub fn with_token(
        server_url: impl Into<String>,
        timeout: Duration,
        token: impl Into<String>,
    ) -> Result<Self> {
        let mut session = Self::new(server_url, timeout)?;
        session.inner.get_mut().token = Some(token.into());
        Ok(session)
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    pub async fn is_authenticated(&self) -> bool {
        self.inner.read().await.token.is_some()
    }

    pub async fn admin_name(&self) -> Option<String> {
        self.inner.read().await.admin_name.clone()
    }

    pub async fn token(&self) -> Option<String> {
        self.inner.read().await.token.clone()
    }

    /// Time left before another OTP may be requested.
    pub async fn otp_resend_remaining(&self) -> Duration {
        self.otp_cooldown.lock().await.remaining(Instant::now())
    }

    pub async fn request_otp(&self, email: &str) -> Result<()> {
        let email = normalize_email(email)?;
        {
            let cooldown = self.otp_cooldown.lock().await;
            let remaining = cooldown.remaining(Instant::now());
            if !remaining.is_zero() {
                return Err(anyhow!(
                    "an OTP was sent recently; retry in {}s",
                    remaining.as_secs().max(1)
                ));
            }
        }

        let response = self
            .http
            .post(format!("{}/auth/otp", self.server_url))
            .json(&OtpRequest {
                email: email.clone(),
            })
            .send()
            .await
            .context("failed to request OTP")?;
        ensure_success(response).await?;

        self.otp_cooldown.lock().await.start(Instant::now());
        info!(email = %email, "otp requested");
        Ok(())
    }

    /// Exchanges an emailed OTP for a session token; returns the admin's display name.
    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<String> {
        let email = normalize_email(email)?;
        let otp = otp.trim();
        if otp.is_empty() || !otp.chars().all(|c| c.is_ascii_digit()) {
            return Err(anyhow!("OTP must be a non-empty string of digits"));
        }

        let response = self
            .http
            .post(format!("{}/auth/verify", self.server_url))
            .json(&OtpVerifyRequest {
                email: email.clone(),
                otp: otp.to_string(),
            })
            .send()
            .await
            .context("failed to verify OTP")?;
        let body: OtpVerifyResponse = ensure_success(response)
            .await?
            .json()
            .await
            .context("invalid OTP verification response")?;

        let mut state = self.inner.write().await;
        state.token = Some(body.token);
        state.admin_name = Some(body.admin_name.clone());
        info!(email = %email, "admin session established");
        Ok(body.admin_name)
    }

    pub async fn logout(&self) {
        let mut state = self.inner.write().await;
        if state.token.take().is_some() {
            info!("admin session closed");
        }
        state.admin_name = None;
        self.otp_cooldown.lock().await.clear();
    }

    pub(crate) async fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.inner.read().await.token.as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

fn normalize_email(raw: &str) -> Result<String> {
    let email = raw.trim().to_ascii_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(anyhow!("invalid email address: {raw}")),
    }
}

/// Passes 2xx responses through; turns anything else into an error,
/// preferring the API's structured `{code, message}` body.
pub(crate) async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let err = match serde_json::from_str::<ApiError>(&body) {
        Ok(api_error) => ApiException::from(api_error),
        Err(_) => ApiException::from_http_status(status.as_u16(), format!("HTTP {status}")),
    };
    Err(err.into())
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
