//! Integration tests for Model Provider Integration

use pagewright::provider::{ModelProvider, ProviderConfig, ProviderFactory, ProviderType};
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(30);

#[test]
fn test_factory_builds_every_provider() {
    let cases = [
        (
            ModelProvider::OpenAI {
                model: "gpt-4o".to_string(),
                api_key: "test-key".to_string(),
                base_url: None,
            },
            "openai",
            "gpt-4o",
        ),
        (
            ModelProvider::Anthropic {
                model: "claude-3-5-sonnet".to_string(),
                api_key: "test-key".to_string(),
            },
            "anthropic",
            "claude-3-5-sonnet",
        ),
        (
            ModelProvider::Ollama {
                model: "llama3.1".to_string(),
                base_url: None,
            },
            "ollama",
            "llama3.1",
        ),
        (
            ModelProvider::LocalCustom {
                model: "custom".to_string(),
                endpoint: "http://localhost:8080/v1".to_string(),
                api_key: None,
            },
            "local",
            "custom",
        ),
    ];

    for (provider, name, model) in cases {
        let client = ProviderFactory::create_client(&provider, TIMEOUT).unwrap();
        assert_eq!(client.provider_name(), name);
        assert_eq!(client.model_name(), model);
    }
}

#[test]
fn test_local_provider_without_endpoint_is_rejected() {
    let config = ProviderConfig {
        provider_type: ProviderType::LocalCustom,
        model: "custom".to_string(),
        api_key: None,
        endpoint: None,
    };
    assert!(config.create_client(TIMEOUT).is_err());
}

#[tokio::test]
async fn test_unreachable_endpoint_fails_to_open() {
    use pagewright::provider::ChatMessage;
    use pagewright::provider::CompletionOptions;

    // Port 9 (discard) is not expected to serve HTTP
    let config = ProviderConfig {
        provider_type: ProviderType::LocalCustom,
        model: "custom".to_string(),
        api_key: None,
        endpoint: Some("http://127.0.0.1:9/v1".to_string()),
    };
    let client = config.create_client(Duration::from_secs(2)).unwrap();
    let result = client
        .stream(vec![ChatMessage::user("hi")], CompletionOptions::default())
        .await;
    assert!(result.is_err());
}
