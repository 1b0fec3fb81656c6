//! JSON-RPC 2.0 client for the account management service.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use aa_core::ports::AccountCreatorPort;
use aa_core::{AccountActivationResponse, ActivationConfig, ActivationStatus, ActivationSubmission};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

const METHOD_ACTIVATE_ACCOUNT: &str = "activate_account";
const METHOD_ACTIVATE_ALIAS: &str = "activate_alias";

#[derive(Debug, Serialize)]
struct RpcRequest<'a, P> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: P,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<R> {
    result: Option<R>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    #[allow(dead_code)]
    code: i64,
    message: String,
}

#[derive(Debug, Serialize)]
struct ActivationParams<'a> {
    username: &'a str,
    phone: &'a str,
    activation_code: &'a str,
    domain: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ha1: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ActivationResult {
    status: String,
    #[serde(default)]
    identity: Option<String>,
}

/// Outcome of one RPC round trip.
enum RpcReply<R> {
    Result(R),
    /// The service answered with an error object.
    Rejected(String),
    /// Non-success HTTP status.
    Failed(reqwest::StatusCode),
}

/// [`AccountCreatorPort`] adapter speaking JSON-RPC over HTTP.
///
/// HTTP error statuses map to `RequestFailed`; RPC error objects map to the
/// open-ended status bucket. Transport errors are returned as errors.
pub struct JsonRpcAccountCreator {
    client: reqwest::Client,
    endpoint: String,
    domain: String,
    next_id: AtomicU64,
}

impl JsonRpcAccountCreator {
    pub fn new(endpoint: impl Into<String>, domain: impl Into<String>) -> Result<Self> {
        Self::with_timeout(endpoint, domain, None)
    }

    pub fn from_config(config: &ActivationConfig) -> Result<Self> {
        Self::with_timeout(
            config.account_service_url.clone(),
            config.domain.clone(),
            Some(config.response_timeout()),
        )
    }

    fn with_timeout(
        endpoint: impl Into<String>,
        domain: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("build account service client failed")?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            domain: domain.into(),
            next_id: AtomicU64::new(1),
        })
    }

    async fn call<P, R>(&self, method: &str, params: P) -> Result<RpcReply<R>>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        debug!(method, id, endpoint = %self.endpoint, "account service call");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("{method} request failed"))?;

        let status = response.status();
        if !status.is_success() {
            warn!(method, %status, "account service returned error status");
            return Ok(RpcReply::Failed(status));
        }

        let body: RpcResponse<R> = response
            .json()
            .await
            .with_context(|| format!("{method} response is not valid JSON-RPC"))?;

        match (body.result, body.error) {
            (_, Some(error)) => Ok(RpcReply::Rejected(error.message)),
            (Some(result), None) => Ok(RpcReply::Result(result)),
            (None, None) => Err(anyhow::anyhow!("{method} response has neither result nor error")),
        }
    }

    fn params<'a>(&'a self, submission: &'a ActivationSubmission, with_ha1: bool) -> ActivationParams<'a> {
        ActivationParams {
            username: &submission.username,
            phone: &submission.phone,
            activation_code: &submission.activation_code,
            domain: &self.domain,
            ha1: if with_ha1 {
                submission.ha1.as_deref()
            } else {
                None
            },
        }
    }
}

#[async_trait]
impl AccountCreatorPort for JsonRpcAccountCreator {
    async fn activate_account(
        &self,
        submission: &ActivationSubmission,
    ) -> Result<AccountActivationResponse> {
        let reply = self
            .call::<_, ActivationResult>(METHOD_ACTIVATE_ACCOUNT, self.params(submission, false))
            .await?;
        Ok(match reply {
            RpcReply::Result(result) => AccountActivationResponse::new(
                ActivationStatus::from_wire(&result.status),
                result.identity,
            ),
            RpcReply::Rejected(message) => {
                AccountActivationResponse::new(ActivationStatus::Other(message), None)
            }
            RpcReply::Failed(_) => AccountActivationResponse::request_failed(),
        })
    }

    async fn activate_alias(&self, submission: &ActivationSubmission) -> Result<ActivationStatus> {
        let reply = self
            .call::<_, ActivationResult>(METHOD_ACTIVATE_ALIAS, self.params(submission, true))
            .await?;
        Ok(match reply {
            RpcReply::Result(result) => ActivationStatus::from_wire(&result.status),
            RpcReply::Rejected(message) => ActivationStatus::Other(message),
            RpcReply::Failed(_) => ActivationStatus::RequestFailed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn submission(ha1: Option<&str>) -> ActivationSubmission {
        ActivationSubmission {
            username: "alice".to_string(),
            ha1: ha1.map(str::to_string),
            phone: "+15551234".to_string(),
            activation_code: "1234".to_string(),
        }
    }

    #[tokio::test]
    async fn activate_account_maps_result_status_and_identity() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({
                "jsonrpc": "2.0",
                "method": "activate_account",
                "params": {
                    "username": "alice",
                    "phone": "+15551234",
                    "activation_code": "1234",
                    "domain": "sip.example.org"
                }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":{"status":"ACCOUNT_ACTIVATED","identity":"alice"}}"#)
            .create_async()
            .await;

        let creator = JsonRpcAccountCreator::new(server.url(), "sip.example.org").unwrap();
        let response = creator.activate_account(&submission(None)).await.unwrap();

        mock.assert_async().await;
        assert_eq!(
            response,
            AccountActivationResponse::new(ActivationStatus::Activated, Some("alice".to_string()))
        );
    }

    #[tokio::test]
    async fn activate_alias_sends_credential_hash() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({
                "method": "activate_alias",
                "params": { "ha1": "secret-ha1" }
            })))
            .with_status(200)
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":{"status":"OK"}}"#)
            .create_async()
            .await;

        let creator = JsonRpcAccountCreator::new(server.url(), "sip.example.org").unwrap();
        let status = creator
            .activate_alias(&submission(Some("secret-ha1")))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(status, ActivationStatus::Activated);
    }

    #[tokio::test]
    async fn rpc_error_object_lands_in_other_bucket() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(200)
            .with_body(
                r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"ERROR_KEY_DOESNT_MATCH"}}"#,
            )
            .create_async()
            .await;

        let creator = JsonRpcAccountCreator::new(server.url(), "sip.example.org").unwrap();
        let response = creator.activate_account(&submission(None)).await.unwrap();

        assert_eq!(
            response.status,
            ActivationStatus::Other("ERROR_KEY_DOESNT_MATCH".to_string())
        );
    }

    #[tokio::test]
    async fn http_error_status_is_request_failed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(503)
            .create_async()
            .await;

        let creator = JsonRpcAccountCreator::new(server.url(), "sip.example.org").unwrap();

        assert_eq!(
            creator.activate_account(&submission(None)).await.unwrap(),
            AccountActivationResponse::request_failed()
        );
        assert_eq!(
            creator.activate_alias(&submission(None)).await.unwrap(),
            ActivationStatus::RequestFailed
        );
    }

    #[tokio::test]
    async fn malformed_body_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let creator = JsonRpcAccountCreator::new(server.url(), "sip.example.org").unwrap();

        assert!(creator.activate_account(&submission(None)).await.is_err());
    }
}
