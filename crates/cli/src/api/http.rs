// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-over-HTTP implementation of [`TicketApi`] using reqwest.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::header::ACCEPT;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use turno_core::{
    Error, IssueRequest, ObservationsRequest, RedirectRequest, Result, SectorId, SectorRef,
    Ticket, TicketId,
};

use super::{ApiFuture, TicketApi};

/// Error body returned by the server on non-success responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

/// HTTP client for the remote ticket API.
#[derive(Debug, Clone)]
pub struct HttpTicketApi {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpTicketApi {
    /// Create a client for `base_url` with a per-request timeout.
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Transport(format!("cannot build http client: {}", e)))?;
        Ok(Self::with_client(client, base_url, token))
    }

    /// Create a client around an existing reqwest client.
    pub fn with_client(client: Client, base_url: &str, token: Option<String>) -> Self {
        HttpTicketApi {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Build a request to `path` with auth applied.
    ///
    /// Shared with the push stream so both use the same credentials.
    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: String,
        query: Vec<(&'static str, String)>,
    ) -> Result<T> {
        debug!("GET {}", path);
        let resp = self
            .request(Method::GET, &path)
            .header(ACCEPT, "application/json")
            .query(&query)
            .send()
            .await
            .map_err(transport_error)?;
        decode(check(resp).await?).await
    }

    /// GET for endpoints that answer `204` or `null` when there is nothing.
    async fn get_optional<T: DeserializeOwned>(&self, path: String) -> Result<Option<T>> {
        debug!("GET {}", path);
        let resp = self
            .request(Method::GET, &path)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(transport_error)?;
        let resp = check(resp).await?;
        if resp.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let text = resp.text().await.map_err(transport_error)?;
        if text.trim().is_empty() || text.trim() == "null" {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&text)?))
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: String, body: B) -> Result<T> {
        debug!("POST {}", path);
        let resp = self
            .request(Method::POST, &path)
            .header(ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        decode(check(resp).await?).await
    }
}

/// Pass successful responses through, classify the rest.
async fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(status_error(status, &body))
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let text = resp.text().await.map_err(transport_error)?;
    Ok(serde_json::from_str(&text)?)
}

/// Map a non-success HTTP status to an error kind.
pub(crate) fn status_error(status: StatusCode, body: &str) -> Error {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message.or(b.error))
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.to_string()
            } else {
                body.trim().to_string()
            }
        });

    match status {
        StatusCode::NOT_FOUND => Error::NotFound(message),
        StatusCode::CONFLICT => Error::Conflict(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Forbidden(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Error::Validation(message),
        _ => Error::Transport(format!("server returned {}: {}", status, message)),
    }
}

pub(crate) fn transport_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Transport(format!("request timed out: {}", err))
    } else {
        Error::Transport(err.to_string())
    }
}

fn date_query(date: NaiveDate) -> Vec<(&'static str, String)> {
    vec![("date", date.format("%Y-%m-%d").to_string())]
}

impl TicketApi for HttpTicketApi {
    fn ticket(&self, id: TicketId) -> ApiFuture<'_, Ticket> {
        Box::pin(self.get(format!("/tickets/{}", id), Vec::new()))
    }

    fn ticket_by_code(&self, code: &str, date: Option<NaiveDate>) -> ApiFuture<'_, Ticket> {
        let path = format!("/tickets/code/{}", code.trim());
        let query = date.map(date_query).unwrap_or_default();
        Box::pin(self.get(path, query))
    }

    fn tickets_by_citizen(&self, national_id: &str) -> ApiFuture<'_, Vec<Ticket>> {
        Box::pin(self.get(format!("/tickets/citizen/{}", national_id.trim()), Vec::new()))
    }

    fn queue(&self, sector: SectorId) -> ApiFuture<'_, Vec<Ticket>> {
        Box::pin(self.get(format!("/sectors/{}/queue", sector), Vec::new()))
    }

    fn next(&self, sector: SectorId) -> ApiFuture<'_, Option<Ticket>> {
        Box::pin(self.get_optional(format!("/sectors/{}/next", sector)))
    }

    fn pending(&self, sector: SectorId) -> ApiFuture<'_, Vec<Ticket>> {
        Box::pin(self.get(format!("/sectors/{}/pending", sector), Vec::new()))
    }

    fn day_list(&self, sector: SectorId, date: NaiveDate) -> ApiFuture<'_, Vec<Ticket>> {
        Box::pin(self.get(format!("/sectors/{}/tickets", sector), date_query(date)))
    }

    fn sectors(&self) -> ApiFuture<'_, Vec<SectorRef>> {
        Box::pin(self.get("/sectors".to_string(), Vec::new()))
    }

    fn issue(&self, request: IssueRequest) -> ApiFuture<'_, Ticket> {
        Box::pin(self.post("/tickets".to_string(), request))
    }

    fn call(&self, id: TicketId, body: ObservationsRequest) -> ApiFuture<'_, Ticket> {
        Box::pin(self.post(format!("/tickets/{}/call", id), body))
    }

    fn start_attention(&self, id: TicketId) -> ApiFuture<'_, Ticket> {
        Box::pin(self.post(
            format!("/tickets/{}/start-attention", id),
            ObservationsRequest::default(),
        ))
    }

    fn finish(&self, id: TicketId, body: ObservationsRequest) -> ApiFuture<'_, Ticket> {
        Box::pin(self.post(format!("/tickets/{}/finish", id), body))
    }

    fn mark_absent(&self, id: TicketId, body: ObservationsRequest) -> ApiFuture<'_, Ticket> {
        Box::pin(self.post(format!("/tickets/{}/absent", id), body))
    }

    fn redirect(&self, id: TicketId, body: RedirectRequest) -> ApiFuture<'_, Ticket> {
        Box::pin(self.post(format!("/tickets/{}/redirect", id), body))
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
