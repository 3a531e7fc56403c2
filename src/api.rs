// src/api.rs
use crate::config::Config;
use crate::error::{FolioError, Result};
use crate::models::{Dashboard, ErrorBody, Holding, HoldingCreate, HoldingUpdate};
use crate::session::SessionManager;
use log::{debug, error, info};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

pub(crate) fn http_client(config: &Config) -> Result<Client> {
    Client::builder()
        .timeout(config.request_timeout)
        .build()
        .map_err(|e| FolioError::Network(format!("failed to build HTTP client: {}", e)))
}

/// Pulls status, `detail` and `code` out of a failed response. The body is
/// optional; a missing or non-JSON body yields no detail.
pub(crate) async fn read_error(response: Response) -> (u16, Option<String>, Option<String>) {
    let status = response.status().as_u16();
    let body = response.json::<ErrorBody>().await.unwrap_or_default();
    (status, body.message(), body.code)
}

async fn server_error(response: Response) -> FolioError {
    let status = response.status();
    let (code_num, detail, code) = read_error(response).await;
    let message = detail
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| format!("Request failed: {}", code_num));
    FolioError::Server {
        status: code_num,
        message,
        code,
    }
}

/// Authenticated client for the holdings and dashboard resources.
///
/// The bearer token is read from the session on every call, so a silent
/// refresh is picked up without rebuilding the client.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    config: Config,
    session: SessionManager,
}

impl ApiClient {
    pub fn new(config: &Config, session: SessionManager) -> Result<Self> {
        Ok(ApiClient {
            client: http_client(config)?,
            config: config.clone(),
            session,
        })
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let token = self
            .session
            .access_token()
            .ok_or(FolioError::NotAuthenticated)?;
        let url = self.config.endpoint(path);
        debug!("{} {}", method, url);
        Ok(self.client.request(method, &url).bearer_auth(token))
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(server_error(response).await)
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.send(builder).await?;
        Ok(response.json::<T>().await?)
    }

    pub async fn list_holdings(&self) -> Result<Vec<Holding>> {
        let holdings: Vec<Holding> = self
            .send_json(self.request(Method::GET, "/holdings")?)
            .await?;
        info!("Fetched {} holdings", holdings.len());
        Ok(holdings)
    }

    pub async fn create_holding(&self, holding: &HoldingCreate) -> Result<Holding> {
        holding.validate()?;
        let builder = self.request(Method::POST, "/holdings")?.json(holding);
        let created: Holding = self.send_json(builder).await?;
        info!("Created holding {} ({})", created.symbol, created.id);
        Ok(created)
    }

    pub async fn update_holding(&self, id: &str, update: &HoldingUpdate) -> Result<Holding> {
        let path = holding_path(id)?;
        update.validate()?;
        let builder = self.request(Method::PUT, &path)?.json(update);
        let updated: Holding = self.send_json(builder).await?;
        info!("Updated holding {} ({})", updated.symbol, updated.id);
        Ok(updated)
    }

    pub async fn delete_holding(&self, id: &str) -> Result<()> {
        let path = holding_path(id)?;
        let response = self.send(self.request(Method::DELETE, &path)?).await?;
        if response.status() != StatusCode::NO_CONTENT {
            debug!(
                "DELETE {} answered {} instead of 204",
                path,
                response.status()
            );
        }
        info!("Deleted holding {}", id);
        Ok(())
    }

    pub async fn get_dashboard(&self) -> Result<Dashboard> {
        match self.send_json::<Dashboard>(self.request(Method::GET, "/dashboard")?).await {
            Ok(dashboard) => Ok(dashboard),
            Err(e) => {
                let e = e.into_dashboard_error();
                if !e.is_empty_portfolio() {
                    error!("Failed to fetch dashboard: {}", e);
                }
                Err(e)
            }
        }
    }
}

/// Ids are server-assigned UUIDs; anything that would need escaping in a
/// path segment is rejected.
fn holding_path(id: &str) -> Result<String> {
    let id = id.trim();
    let plain = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_';
    if id.is_empty() || !id.chars().all(plain) {
        return Err(FolioError::Validation(format!("Invalid holding id: {:?}", id)));
    }
    Ok(format!("/holdings/{}", id))
}
