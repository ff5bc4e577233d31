//! The HTTP collaborator: sends the `{query, variables}` POST body an effect
//! builds and returns the response as UTF-8 text.

use async_trait::async_trait;
use serde::Serialize;

use crate::json::Json;

/// The wire body of a GraphQL-over-HTTP request.
#[derive(Debug, Clone, Serialize)]
pub struct GraphQLRequest {
    pub query: String,
    pub variables: Json,
}

/// Sends a GraphQL request and returns the raw response text, or an error
/// message on network/transport failure. Implementations send with
/// credential mode *include* so cookies accompany the request, matching a
/// browser-hosted client's default session behavior.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        endpoint: &str,
        request: GraphQLRequest,
        headers: Vec<(String, String)>,
    ) -> Result<String, String>;
}

/// A [`Transport`] backed by [`reqwest`], available behind the `reqwest`
/// feature for hosts that don't want to bring their own HTTP client.
#[cfg(feature = "reqwest")]
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

#[cfg(feature = "reqwest")]
impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(feature = "reqwest")]
#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        endpoint: &str,
        request: GraphQLRequest,
        headers: Vec<(String, String)>,
    ) -> Result<String, String> {
        let mut builder = self
            .client
            .post(endpoint)
            .header("content-type", "application/json");
        for (name, value) in headers {
            builder = builder.header(name, value);
        }

        let response = builder
            .json(&request)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status()));
        }

        response.text().await.map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingTransport {
        pub responses: Mutex<Vec<Result<String, String>>>,
        pub requests: Mutex<Vec<(String, GraphQLRequest)>>,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send(
            &self,
            endpoint: &str,
            request: GraphQLRequest,
            _headers: Vec<(String, String)>,
        ) -> Result<String, String> {
            self.requests
                .lock()
                .unwrap()
                .push((endpoint.to_string(), request));
            self.responses.lock().unwrap().remove(0)
        }
    }

    #[tokio::test]
    async fn recording_transport_returns_queued_responses() {
        let transport = Arc::new(RecordingTransport::default());
        transport
            .responses
            .lock()
            .unwrap()
            .push(Ok(r#"{"data":{}}"#.to_string()));

        let result = transport
            .send(
                "https://example.com/graphql",
                GraphQLRequest {
                    query: "query Q { x }".to_string(),
                    variables: Json::Object(Default::default()),
                },
                vec![],
            )
            .await;
        assert_eq!(result, Ok(r#"{"data":{}}"#.to_string()));
    }
}
