//! API client for the shipping quote service

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use shipping_lib::{ErrorBody, HealthResponse, ShippingQuote, ShippingRequest};
use thiserror::Error;
use url::Url;

/// Non-success answer from the service
#[derive(Debug, Error)]
#[error("API error ({status}): {message}")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
}

/// HTTP client for the quote service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            // The service answers errors as {"error": "..."}; fall back to the raw body
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(ApiError { status, message }.into());
        }

        response.json().await.context("Failed to parse response")
    }

    pub async fn quote(&self, request: &ShippingRequest) -> Result<ShippingQuote> {
        self.post("calcular_envio", request).await
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        self.get("healthz").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shipping_lib::ComponentStatus;

    #[tokio::test]
    async fn test_quote_round_trip() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/calcular_envio")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "num_items": 2,
                "estado": "CDMX"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"num_items": 2, "subtotal": 0.0, "estado": "CDMX", "costo_envio": 150.0}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let quote = client.quote(&ShippingRequest::new(2, "CDMX")).await.unwrap();

        mock.assert_async().await;
        assert_eq!(quote.costo_envio, 150.0);
        assert_eq!(quote.estado, "CDMX");
    }

    #[tokio::test]
    async fn test_error_body_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/calcular_envio")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "estado 'XX' is not valid"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client.quote(&ShippingRequest::new(1, "XX")).await.unwrap_err();
        let api_err = err.downcast_ref::<ApiError>().unwrap();

        assert_eq!(api_err.status, 400);
        assert_eq!(api_err.message, "estado 'XX' is not valid");
    }

    #[tokio::test]
    async fn test_health() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/healthz")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"status": "degraded", "components": {
                    "model": {"status": "degraded", "message": "model unavailable", "loaded_at": 0}
                }}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let health = client.health().await.unwrap();
        assert_eq!(health.status, ComponentStatus::Degraded);
        assert_eq!(health.components["model"].status, ComponentStatus::Degraded);
    }

    #[test]
    fn test_invalid_url() {
        assert!(ApiClient::new("not a url").is_err());
    }
}
