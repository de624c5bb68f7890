//! Concrete embedding providers.
//!
//! Each provider implements the core [`Embedder`] trait and makes exactly one
//! attempt per call; retries, backoff and deadlines are layered on by the
//! index. What a provider must get right is the error classification:
//!
//! - HTTP 429, 5xx, a body mentioning "quota", or a network error → [`Error::ProviderTransient`]
//! - any other HTTP 4xx, or a reply without a usable vector → [`Error::ProviderRejected`]
//!
//! | Config Value | Provider |
//! |-------------|----------|
//! | `"disabled"` | [`DisabledEmbedder`] |
//! | `"openai"` | [`OpenAIEmbedder`] |
//! | `"gemini"` | [`GeminiEmbedder`] |
//! | `"hash"` | [`HashEmbedder`] |

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use lexindex_core::{Embedder, Error, Result};
use sha2::{Digest, Sha256};

use crate::config::EmbeddingConfig;

const OPENAI_BASE_URL: &str = "https://api.openai.com";
const OPENAI_DEFAULT_MODEL: &str = "text-embedding-3-small";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const GEMINI_DEFAULT_MODEL: &str = "text-embedding-004";
const HASH_DEFAULT_DIMS: usize = 256;

// ============ Disabled Provider ============

/// Fails every call. Used when `embedding.provider = "disabled"`.
pub struct DisabledEmbedder;

#[async_trait]
impl Embedder for DisabledEmbedder {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(Error::rejected(
            "embedding provider is disabled; set [embedding] provider in the config",
        ))
    }
}

// ============ HTTP helpers ============

fn http_client(timeout_secs: u64) -> anyhow::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if timeout_secs > 0 {
        builder = builder.timeout(Duration::from_secs(timeout_secs));
    }
    Ok(builder.build()?)
}

fn api_key(config: &EmbeddingConfig, default_env: &str) -> anyhow::Result<String> {
    let var = config.api_key_env.as_deref().unwrap_or(default_env);
    std::env::var(var).with_context(|| format!("{} environment variable not set", var))
}

/// Map a non-success HTTP reply onto the transient/rejected split.
fn classify_status(provider: &str, status: reqwest::StatusCode, body: &str) -> Error {
    let message = format!("{} API error {}: {}", provider, status, body.trim());
    if status.as_u16() == 429
        || status.is_server_error()
        || body.to_ascii_lowercase().contains("quota")
    {
        Error::transient(message)
    } else {
        Error::rejected(message)
    }
}

fn classify_send_error(provider: &str, err: reqwest::Error) -> Error {
    if err.is_builder() {
        Error::rejected(format!("{} request could not be built: {}", provider, err))
    } else {
        Error::transient(format!("{} request failed: {}", provider, err))
    }
}

/// POST `body` as JSON and return the decoded reply, classifying failures.
async fn post_json(
    provider: &str,
    request: reqwest::RequestBuilder,
    body: &serde_json::Value,
) -> Result<serde_json::Value> {
    let response = request
        .json(body)
        .send()
        .await
        .map_err(|e| classify_send_error(provider, e))?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(classify_status(provider, status, &text));
    }

    response
        .json()
        .await
        .map_err(|e| Error::rejected(format!("{} returned malformed JSON: {}", provider, e)))
}

fn parse_vector(provider: &str, values: Option<&serde_json::Value>) -> Result<Vec<f32>> {
    let values = values
        .and_then(|v| v.as_array())
        .ok_or_else(|| Error::rejected(format!("invalid {} response: missing embedding", provider)))?;
    let vec: Vec<f32> = values
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect();
    if vec.is_empty() {
        return Err(Error::rejected(format!(
            "invalid {} response: empty embedding",
            provider
        )));
    }
    Ok(vec)
}

// ============ OpenAI Provider ============

/// Calls `POST {base_url}/v1/embeddings` with a bearer key.
pub struct OpenAIEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl OpenAIEmbedder {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    /// Build from configuration, reading the key from `api_key_env`
    /// (default `OPENAI_API_KEY`).
    pub fn from_config(config: &EmbeddingConfig) -> anyhow::Result<Self> {
        Ok(Self::new(
            http_client(config.timeout_secs)?,
            config.base_url.as_deref().unwrap_or(OPENAI_BASE_URL),
            config.model.as_deref().unwrap_or(OPENAI_DEFAULT_MODEL),
            api_key(config, "OPENAI_API_KEY")?,
        ))
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .bearer_auth(&self.api_key);
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });
        let json = post_json("OpenAI", request, &body).await?;
        parse_openai_response(&json)
    }
}

/// Extract `data[0].embedding` from an OpenAI embeddings reply.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<f32>> {
    let first = json
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|d| d.first());
    parse_vector("OpenAI", first.and_then(|item| item.get("embedding")))
}

// ============ Gemini Provider ============

/// Calls `POST {base_url}/v1beta/models/{model}:embedContent`.
pub struct GeminiEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiEmbedder {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    /// Build from configuration, reading the key from `api_key_env`
    /// (default `GEMINI_API_KEY`).
    pub fn from_config(config: &EmbeddingConfig) -> anyhow::Result<Self> {
        Ok(Self::new(
            http_client(config.timeout_secs)?,
            config.base_url.as_deref().unwrap_or(GEMINI_BASE_URL),
            config.model.as_deref().unwrap_or(GEMINI_DEFAULT_MODEL),
            api_key(config, "GEMINI_API_KEY")?,
        ))
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:embedContent",
                self.base_url, self.model
            ))
            .query(&[("key", self.api_key.as_str())]);
        let body = serde_json::json!({
            "model": format!("models/{}", self.model),
            "content": { "parts": [{ "text": text }] },
        });
        let json = post_json("Gemini", request, &body).await?;
        parse_vector(
            "Gemini",
            json.get("embedding").and_then(|e| e.get("values")),
        )
    }
}

// ============ Hash Provider ============

/// Offline bag-of-words embedder.
///
/// Lowercased alphanumeric tokens are hashed with SHA-256 into `dims`
/// buckets, and the counts are L2-normalized. Texts sharing vocabulary score
/// high, which is enough for local use and tests without network access.
pub struct HashEmbedder {
    dims: usize,
    name: String,
}

impl HashEmbedder {
    pub fn new(dims: usize) -> Self {
        Self {
            dims: dims.max(1),
            name: format!("hash-{}", dims.max(1)),
        }
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dims];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(token.to_lowercase().as_bytes());
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bytes) % self.dims as u64) as usize;
            vec[bucket] += 1.0;
        }
        let norm = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vec {
                *x /= norm;
            }
        }
        vec
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        &self.name
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vectorize(text))
    }
}

/// Instantiate the provider named by `config.provider`.
///
/// # Errors
///
/// Unknown provider names, and missing API keys for the remote providers.
pub fn create_embedder(config: &EmbeddingConfig) -> anyhow::Result<Arc<dyn Embedder>> {
    let embedder: Arc<dyn Embedder> = match config.provider.as_str() {
        "disabled" => Arc::new(DisabledEmbedder),
        "openai" => Arc::new(OpenAIEmbedder::from_config(config)?),
        "gemini" => Arc::new(GeminiEmbedder::from_config(config)?),
        "hash" => Arc::new(HashEmbedder::new(config.dims.unwrap_or(HASH_DEFAULT_DIMS))),
        other => bail!("Unknown embedding provider: {}", other),
    };
    tracing::debug!(provider = %config.provider, model = embedder.model_name(), "embedding provider ready");
    Ok(embedder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexindex_core::embedding::cosine_similarity;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response per accepted connection.
    async fn spawn_mock_server(responses: Vec<String>) -> (String, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move {
            for response in responses {
                let (mut stream, _) = listener.accept().await.unwrap();
                read_request(&mut stream).await;
                stream.write_all(response.as_bytes()).await.unwrap();
                stream.shutdown().await.ok();
            }
        });
        (format!("http://127.0.0.1:{}", port), handle)
    }

    /// Consume headers and body so the client never sees a reset.
    async fn read_request(stream: &mut tokio::net::TcpStream) {
        let mut buf = Vec::new();
        let mut tmp = [0u8; 4096];
        loop {
            let n = stream.read(&mut tmp).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&tmp[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text[..head_end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())?
                    })
                    .unwrap_or(0);
                if buf.len() >= head_end + 4 + content_length {
                    return;
                }
            }
        }
    }

    fn http_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        )
    }

    fn openai(base_url: &str) -> OpenAIEmbedder {
        OpenAIEmbedder::new(reqwest::Client::new(), base_url, "test-model", "sk-test")
    }

    #[tokio::test]
    async fn test_openai_success() {
        let (url, _h) = spawn_mock_server(vec![http_response(
            "200 OK",
            r#"{"data":[{"index":0,"embedding":[0.5,-0.25,1.0]}]}"#,
        )])
        .await;
        let v = openai(&url).embed("hello").await.unwrap();
        assert_eq!(v, vec![0.5, -0.25, 1.0]);
    }

    #[tokio::test]
    async fn test_rate_limit_is_transient() {
        let (url, _h) =
            spawn_mock_server(vec![http_response("429 Too Many Requests", "{}")]).await;
        let err = openai(&url).embed("hello").await.unwrap_err();
        assert!(matches!(err, Error::ProviderTransient { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let (url, _h) =
            spawn_mock_server(vec![http_response("503 Service Unavailable", "{}")]).await;
        let err = openai(&url).embed("hello").await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_quota_body_is_transient() {
        let (url, _h) = spawn_mock_server(vec![http_response(
            "400 Bad Request",
            r#"{"error":{"message":"Quota exceeded for this project"}}"#,
        )])
        .await;
        let err = openai(&url).embed("hello").await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_client_error_is_rejected() {
        let (url, _h) = spawn_mock_server(vec![http_response(
            "401 Unauthorized",
            r#"{"error":{"message":"bad key"}}"#,
        )])
        .await;
        let err = openai(&url).embed("hello").await.unwrap_err();
        assert!(matches!(err, Error::ProviderRejected { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_empty_embedding_is_rejected() {
        let (url, _h) = spawn_mock_server(vec![http_response(
            "200 OK",
            r#"{"data":[{"embedding":[]}]}"#,
        )])
        .await;
        let err = openai(&url).embed("hello").await.unwrap_err();
        assert!(matches!(err, Error::ProviderRejected { .. }));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transient() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let err = openai(&format!("http://127.0.0.1:{}", port))
            .embed("hello")
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_gemini_success() {
        let (url, _h) = spawn_mock_server(vec![http_response(
            "200 OK",
            r#"{"embedding":{"values":[0.1,0.2]}}"#,
        )])
        .await;
        let gemini = GeminiEmbedder::new(reqwest::Client::new(), url, "text-embedding-004", "k");
        assert_eq!(gemini.embed("hi").await.unwrap(), vec![0.1, 0.2]);
        assert_eq!(gemini.model_name(), "text-embedding-004");
    }

    #[tokio::test]
    async fn test_disabled_rejects() {
        let err = DisabledEmbedder.embed("x").await.unwrap_err();
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_hash_embedder_is_deterministic_and_lexical() {
        let e = HashEmbedder::new(128);
        let a = e.embed("Breach of contract damages").await.unwrap();
        let b = e.embed("breach of CONTRACT damages").await.unwrap();
        let c = e.embed("zoning variance hearing").await.unwrap();
        assert_eq!(a.len(), 128);
        assert_eq!(a, b);
        assert!(cosine_similarity(&a, &b) > 0.99);
        assert!(cosine_similarity(&a, &c) < cosine_similarity(&a, &b));
    }

    #[test]
    fn test_create_embedder_selects_provider() {
        let cfg = EmbeddingConfig {
            provider: "hash".into(),
            dims: Some(32),
            ..EmbeddingConfig::default()
        };
        assert_eq!(create_embedder(&cfg).unwrap().model_name(), "hash-32");
        assert_eq!(
            create_embedder(&EmbeddingConfig::default())
                .unwrap()
                .model_name(),
            "disabled"
        );

        let missing_key = EmbeddingConfig {
            provider: "openai".into(),
            api_key_env: Some("LEXINDEX_TEST_UNSET_KEY".into()),
            ..EmbeddingConfig::default()
        };
        let err = create_embedder(&missing_key).err().unwrap();
        assert!(err.to_string().contains("LEXINDEX_TEST_UNSET_KEY"));
    }
}
