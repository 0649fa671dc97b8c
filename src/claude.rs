//! Hosted content classification via the Anthropic Messages API.
//!
//! This is one provider implementation of the [`Classifier`] boundary. The
//! model is instructed to return the transcript document JSON schema and
//! nothing else; everything it sends back is strictly validated before it is
//! allowed anywhere near the assembler. Long transcripts are split into
//! chunks (see `chunker`) with a configurable pacing delay between chunk
//! requests, which keeps the service usable on rate-limited credentials and
//! resource-constrained hosting.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::chunker::{DEFAULT_MAX_CHUNK_BYTES, split_into_chunks};
use crate::classifier::Classifier;
use crate::config::Config;
use crate::error::{Error, Result, truncate_diagnostic};
use crate::transcript::TranscriptDocument;

/// Default Messages API endpoint.
pub const ANTHROPIC_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 8192;
const TEMPERATURE: f64 = 0.2;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const SYSTEM_PROMPT: &str = "\
You are a transcript formatting assistant. Convert the raw transcript you \
are given into structured JSON with exactly this shape and no other keys:

{
  \"title\": \"Document title\",
  \"paragraphs\": [
    {
      \"text\": \"Full paragraph text\",
      \"runs\": [
        { \"text\": \"span of the paragraph\", \"bold\": false, \"italic\": false }
      ]
    }
  ]
}

Rules:
- The concatenation of a paragraph's run texts must equal its \"text\" field \
exactly, character for character.
- A capitalized speaker name followed by a colon (Dr. Billy Wilson:) is a \
bold run.
- Scripture references (1 John 2:18, 2 Timothy 3:1-5) are bold runs.
- Text in quotation marks (show names, song titles, quoted speech) is an \
italic run.
- Lines beginning with \u{266a} are music cues: preserve them verbatim as a \
single italic run.
- Paragraphs that need no emphasis may use an empty \"runs\" array.
- Use the title of the episode or sermon as \"title\"; if none is apparent, \
use an empty string.

Return only the JSON document, with no commentary.";

/// A [`Classifier`] backed by the Anthropic Messages API.
#[derive(Debug)]
pub struct ClaudeClassifier {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    chunk_delay: Duration,
    max_chunk_bytes: usize,
}

impl ClaudeClassifier {
    /// Build a classifier from application config.
    ///
    /// Fails if no API credential is configured; everything else has
    /// workable defaults.
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                Error::classification("no API credential configured (set ANTHROPIC_API_KEY)")
            })?;

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| Error::classification(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            endpoint: ANTHROPIC_ENDPOINT.to_string(),
            api_key,
            model: config.model.clone(),
            chunk_delay: Duration::from_secs(config.chunk_delay_secs),
            max_chunk_bytes: DEFAULT_MAX_CHUNK_BYTES,
        })
    }

    /// Point the classifier at a different endpoint (tests, proxies).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn classify_chunk(
        &self,
        chunk: &str,
        style_context: Option<&str>,
    ) -> Result<TranscriptDocument> {
        let mut user_message = String::new();
        if let Some(context) = style_context {
            user_message.push_str(
                "Here is an excerpt of the reference document whose formatting the output should follow:\n\n",
            );
            user_message.push_str(context);
            user_message.push_str("\n\n");
        }
        user_message.push_str("Format this raw transcript:\n\n");
        user_message.push_str(chunk);

        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE,
            "system": SYSTEM_PROMPT,
            "messages": [{ "role": "user", "content": user_message }],
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    Error::classification("classification request timed out")
                } else {
                    Error::classification(format!("classification request failed: {err}"))
                }
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|err| {
            Error::classification(format!("failed to read classification response: {err}"))
        })?;

        if !status.is_success() {
            return Err(Error::classification(format!(
                "classification capability returned status {status}: {}",
                truncate_diagnostic(&text)
            )));
        }

        let envelope: serde_json::Value = serde_json::from_str(&text).map_err(|err| {
            Error::classification(format!("classification response was not JSON: {err}"))
        })?;
        let content = envelope["content"][0]["text"].as_str().ok_or_else(|| {
            Error::classification("classification response carried no text content")
        })?;

        parse_document(content)
    }
}

#[async_trait]
impl Classifier for ClaudeClassifier {
    async fn classify(
        &self,
        transcript: &str,
        style_context: Option<&str>,
    ) -> Result<TranscriptDocument> {
        let chunks = split_into_chunks(transcript, self.max_chunk_bytes);
        debug!(chunks = chunks.len(), "classifying transcript");

        let mut title = String::new();
        let mut paragraphs = Vec::new();

        for (i, chunk) in chunks.iter().enumerate() {
            if i > 0 && !self.chunk_delay.is_zero() {
                tokio::time::sleep(self.chunk_delay).await;
            }
            let doc = self.classify_chunk(chunk, style_context).await?;
            // The title comes from the first chunk only; later chunks are
            // continuations of the same episode.
            if i == 0 {
                title = doc.title;
            }
            paragraphs.extend(doc.paragraphs);
        }

        Ok(TranscriptDocument { title, paragraphs })
    }
}

/// Parse a model reply into a validated transcript document.
///
/// Models often wrap JSON in markdown fences despite instructions; those are
/// stripped. Anything that then fails to parse as JSON at all is a
/// classification failure, while JSON of the wrong shape is a schema
/// violation — no repair is attempted in either case.
pub(crate) fn parse_document(content: &str) -> Result<TranscriptDocument> {
    let stripped = strip_code_fences(content);

    let value: serde_json::Value = serde_json::from_str(stripped)
        .map_err(|err| Error::classification(format!("capability output was not JSON: {err}")))?;

    let doc: TranscriptDocument = serde_json::from_value(value)
        .map_err(|err| Error::schema(err.to_string()))?;

    doc.validate()?;
    Ok(doc)
}

/// Remove a surrounding markdown code fence, if any.
fn strip_code_fences(s: &str) -> &str {
    let trimmed = s.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") up to the end of the fence line.
    let rest = match rest.find('\n') {
        Some(i) => &rest[i + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
