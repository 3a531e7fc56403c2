// src/auth.rs
use crate::api::{http_client, read_error};
use crate::config::Config;
use crate::error::{FolioError, Result};
use crate::models::{
    ConfirmRequest, ConfirmResponse, Credentials, EmailRequest, MessageResponse, RefreshRequest,
    RefreshResponse, SignInResponse, SignOutRequest, SignUpResponse,
};
use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::dangerous_insecure_decode;
use log::debug;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Client for the identity operations exposed under `/auth`.
#[derive(Clone)]
pub struct AuthApi {
    client: Client,
    config: Config,
}

impl AuthApi {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(AuthApi {
            client: http_client(config)?,
            config: config.clone(),
        })
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpResponse> {
        self.post("/auth/signup", &Credentials { email, password }, "Signup failed")
            .await
    }

    pub async fn confirm_sign_up(&self, email: &str, code: &str) -> Result<ConfirmResponse> {
        let body = ConfirmRequest {
            email,
            confirmation_code: code,
        };
        self.post("/auth/confirm", &body, "Confirmation failed").await
    }

    pub async fn resend_code(&self, email: &str) -> Result<MessageResponse> {
        self.post("/auth/resend-code", &EmailRequest { email }, "Resend failed")
            .await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SignInResponse> {
        self.post("/auth/signin", &Credentials { email, password }, "Sign in failed")
            .await
    }

    pub async fn refresh_token(&self, refresh_token: &str) -> Result<RefreshResponse> {
        self.post(
            "/auth/refresh",
            &RefreshRequest { refresh_token },
            "Token refresh failed",
        )
        .await
    }

    pub async fn sign_out(&self, access_token: &str) -> Result<()> {
        let url = self.config.endpoint("/auth/signout");
        debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .json(&SignOutRequest { access_token })
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(auth_error(response, "Sign out failed").await)
        }
    }

    async fn post<B, R>(&self, path: &str, body: &B, fallback: &str) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.config.endpoint(path);
        debug!("POST {}", url);
        let response = self.client.post(&url).json(body).send().await?;
        if response.status().is_success() {
            Ok(response.json::<R>().await?)
        } else {
            Err(auth_error(response, fallback).await)
        }
    }
}

/// Client errors from the identity provider mean the credentials or code
/// were rejected; anything else is a server fault.
async fn auth_error(response: reqwest::Response, fallback: &str) -> FolioError {
    let (status, detail, code) = read_error(response).await;
    let message = detail.unwrap_or_else(|| fallback.to_string());
    if (400..500).contains(&status) {
        FolioError::AuthenticationFailed(message)
    } else {
        FolioError::Server {
            status,
            message,
            code,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
}

impl Claims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| Utc.timestamp_opt(exp, 0).single())
    }
}

/// Reads a JWT's claims without checking its signature.
///
/// Only for display (who is signed in, when the token lapses). The backend
/// remains the sole verifier of every token.
pub fn decode_claims(token: &str) -> Option<Claims> {
    match dangerous_insecure_decode::<Claims>(token) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            debug!("Token is not a decodable JWT: {}", e);
            None
        }
    }
}
