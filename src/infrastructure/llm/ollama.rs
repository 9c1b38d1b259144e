use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::http_client::HttpClientTrait;
use crate::domain::DomainError;
use crate::domain::generation::{GenerationProvider, build_prompt};
use crate::domain::retrieval::Evidence;

/// Connection settings shared by the Ollama generation and embedding adapters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default)]
    pub temperature: f32,
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.1".to_string()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            embedding_model: default_embedding_model(),
            temperature: 0.0,
        }
    }
}

impl OllamaConfig {
    pub(crate) fn trimmed_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// Ollama completion provider
#[derive(Debug)]
pub struct OllamaProvider<C: HttpClientTrait> {
    client: C,
    base_url: String,
    model: String,
    temperature: f32,
}

impl<C: HttpClientTrait> OllamaProvider<C> {
    pub fn new(client: C, config: &OllamaConfig) -> Self {
        Self {
            client,
            base_url: config.trimmed_base_url().to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
        }
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }

    fn build_request(&self, question: &str, evidence: &[Evidence]) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "prompt": build_prompt(question, evidence),
            "stream": false,
            "options": {
                "temperature": self.temperature,
            },
        })
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<String, DomainError> {
        let response: OllamaGenerateResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::provider("ollama", format!("Failed to parse response: {}", e))
        })?;

        if let Some(error) = response.error {
            return Err(DomainError::provider("ollama", error));
        }

        let answer = response.response.unwrap_or_default().trim().to_string();
        if answer.is_empty() {
            return Err(DomainError::provider("ollama", "Empty response from model"));
        }

        Ok(answer)
    }
}

#[async_trait]
impl<C: HttpClientTrait> GenerationProvider for OllamaProvider<C> {
    async fn generate(&self, question: &str, evidence: &[Evidence]) -> Result<String, DomainError> {
        let body = self.build_request(question, evidence);

        let response = self
            .client
            .post_json(
                &self.generate_url(),
                vec![("Content-Type", "application/json")],
                &body,
            )
            .await?;

        self.parse_response(response)
    }

    fn provider_name(&self) -> &'static str {
        "ollama"
    }
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::llm::HttpClient;
    use crate::infrastructure::llm::http_client::mock::MockHttpClient;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TEST_URL: &str = "http://localhost:11434/api/generate";

    #[tokio::test]
    async fn test_generate_sends_grounded_prompt() {
        let client = MockHttpClient::new().with_response(
            TEST_URL,
            serde_json::json!({"model": "llama3.1", "response": " Paris. ", "done": true}),
        );
        let provider = OllamaProvider::new(client, &OllamaConfig::default());

        let evidence = vec![Evidence::vector("c1", "Paris is the capital of France.", 0.9)];
        let answer = provider
            .generate("What is the capital of France?", &evidence)
            .await
            .unwrap();

        assert_eq!(answer, "Paris.");

        let body = provider.client.last_body().unwrap();
        assert_eq!(body["model"], "llama3.1");
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["temperature"], 0.0);
        let prompt = body["prompt"].as_str().unwrap();
        assert!(prompt.contains("Paris is the capital of France."));
        assert!(prompt.contains("Question: What is the capital of France?"));
    }

    #[tokio::test]
    async fn test_generate_error_handling() {
        let client = MockHttpClient::new().with_error(TEST_URL, "connection refused");
        let provider = OllamaProvider::new(client, &OllamaConfig::default());

        let err = provider.generate("q", &[]).await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_generate_rejects_empty_answer() {
        let client = MockHttpClient::new().with_response(TEST_URL, serde_json::json!({"response": "  "}));
        let provider = OllamaProvider::new(client, &OllamaConfig::default());

        assert!(provider.generate("q", &[]).await.is_err());
    }

    #[tokio::test]
    async fn test_generate_surfaces_model_error() {
        let client = MockHttpClient::new()
            .with_response(TEST_URL, serde_json::json!({"error": "model 'llama3.1' not found"}));
        let provider = OllamaProvider::new(client, &OllamaConfig::default());

        let err = provider.generate("q", &[]).await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_generate_against_http_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(serde_json::json!({"model": "mistral", "stream": false})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"response": "42"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let config = OllamaConfig {
            base_url: format!("{}/", server.uri()),
            model: "mistral".to_string(),
            ..OllamaConfig::default()
        };
        let provider = OllamaProvider::new(HttpClient::new(), &config);

        assert_eq!(provider.generate("q", &[]).await.unwrap(), "42");
    }
}
