//! ID image field extraction through a vision model.

use asika_config::FieldSpec;
use asika_core::error::{ClientInputError, Error};
use asika_core::message::Message;
use asika_core::provider::{Provider, ProviderRequest};
use asika_telemetry::{PricingTable, UsageSummary};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::sync::Arc;
use tracing::{info, warn};

use crate::documents::StructuredFields;
use crate::prompts;

/// Fields read from an ID image.
#[derive(Debug, Clone)]
pub struct ImageExtraction {
    pub fields: StructuredFields,
    pub usage: UsageSummary,
}

/// Sends ID images to the vision model and parses the fields it reads.
pub struct ImageFieldExtractor {
    provider: Arc<dyn Provider>,
    model: String,
    fields: Vec<FieldSpec>,
    pricing: Arc<PricingTable>,
}

impl ImageFieldExtractor {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        fields: Vec<FieldSpec>,
        pricing: Arc<PricingTable>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            fields,
            pricing,
        }
    }

    /// Extract fields from a `data:image/...;base64,` URL.
    ///
    /// An invalid URL is a client error; a failed model call is a provider
    /// error. A reply that is not JSON degrades to its raw text.
    pub async fn extract(&self, data_url: &str) -> Result<ImageExtraction, Error> {
        validate_data_url(data_url)?;

        let request = ProviderRequest::new(
            self.model.clone(),
            vec![
                Message::system(prompts::id_card_instruction(&self.fields)),
                Message::user("Extract the fields from this ID document.").with_image(data_url),
            ],
        )
        .with_temperature(0.0)
        .json();

        let response = self.provider.complete(request).await.map_err(|e| {
            warn!(error = %e, "Vision extraction call failed");
            Error::Provider(e)
        })?;

        let fields = StructuredFields::from_reply(&response.message.content, &self.fields);
        info!(
            model = %self.model,
            structured = matches!(fields, StructuredFields::Parsed(_)),
            "ID image processed"
        );

        Ok(ImageExtraction {
            usage: UsageSummary::from_usage(response.usage, &self.model, &self.pricing),
            fields,
        })
    }
}

/// Check that `url` is `data:image/<type>;base64,<payload>` with a decodable
/// payload.
pub fn validate_data_url(url: &str) -> Result<(), ClientInputError> {
    let invalid = |reason: &str| ClientInputError::InvalidImage(reason.to_string());

    let rest = url
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| invalid("expected a data: URL"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| invalid("missing ',' separator"))?;
    let mime = meta
        .strip_suffix(";base64")
        .ok_or_else(|| invalid("image must be base64-encoded"))?;

    let subtype = mime
        .strip_prefix("image/")
        .ok_or_else(|| invalid("media type must be image/*"))?;
    if subtype.is_empty() {
        return Err(invalid("media type must be image/*"));
    }

    if payload.is_empty() {
        return Err(invalid("empty image payload"));
    }
    STANDARD
        .decode(payload)
        .map_err(|e| invalid(&format!("payload is not valid base64: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ScriptedProvider;
    use asika_config::RegistrationConfig;
    use asika_core::error::ProviderError;
    use serde_json::json;

    const PNG: &str = "data:image/png;base64,iVBORw0KGgo=";

    fn extractor(provider: Arc<ScriptedProvider>) -> ImageFieldExtractor {
        ImageFieldExtractor::new(
            provider,
            "meta-llama/llama-4-scout-17b-16e-instruct",
            RegistrationConfig::default().fields,
            Arc::new(PricingTable::default()),
        )
    }

    #[test]
    fn valid_data_url() {
        assert!(validate_data_url(PNG).is_ok());
        assert!(validate_data_url("data:image/jpeg;base64,/9j/4AAQ").is_ok());
    }

    #[test]
    fn rejects_malformed_data_urls() {
        for bad in [
            "https://example.org/id.png",
            "data:image/png,iVBORw0KGgo=",
            "data:text/plain;base64,aGVsbG8=",
            "data:image/;base64,aGVsbG8=",
            "data:image/png;base64,",
            "data:image/png;base64,***",
            "data:image/png;base64",
        ] {
            assert!(
                matches!(validate_data_url(bad), Err(ClientInputError::InvalidImage(_))),
                "accepted {bad}"
            );
        }
    }

    #[tokio::test]
    async fn invalid_image_never_calls_model() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let err = extractor(provider.clone()).extract("not-an-image").await.unwrap_err();
        assert!(matches!(err, Error::ClientInput(_)));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn sends_image_part_to_vision_model() {
        let provider = Arc::new(ScriptedProvider::texts(&[
            r#"{"firstName":"Ana","lastName":"Lee","dateOfBirth":"1990-04-12","gender":"F"}"#,
        ]));
        let result = extractor(provider.clone()).extract(PNG).await.unwrap();

        let StructuredFields::Parsed(map) = result.fields else {
            panic!("expected parsed fields");
        };
        assert_eq!(map["firstName"], json!("Ana"));
        assert_eq!(map["country"], serde_json::Value::Null);

        let request = provider.last_request().unwrap();
        assert_eq!(request.model, "meta-llama/llama-4-scout-17b-16e-instruct");
        assert_eq!(request.messages[1].images, vec![PNG.to_string()]);
        assert!(request.json_mode);
    }

    #[tokio::test]
    async fn rate_limit_propagates_as_provider_error() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(ProviderError::RateLimited {
            retry_after_secs: Some(3),
        })]));
        let err = extractor(provider).extract(PNG).await.unwrap_err();
        let Error::Provider(e) = err else {
            panic!("expected provider error");
        };
        assert_eq!(e.retry_after_secs(), Some(3));
    }
}
