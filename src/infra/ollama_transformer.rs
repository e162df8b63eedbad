use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::app::ports::SchemaTransformer;
use crate::error::{Result, TelemetryError};

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("code fence pattern is valid")
});

/// Prompt file layout: a single `canonical_prompt` template.
#[derive(Debug, Deserialize)]
struct PromptFile {
    canonical_prompt: String,
}

/// Prompt with `{schema}` and `{input_json}` placeholders. `{{` and `}}` stand
/// for literal braces.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            TelemetryError::Config(format!("Failed to read prompt file '{}': {}", path.display(), e))
        })?;
        let file: PromptFile = toml::from_str(&text)?;
        Ok(Self::new(file.canonical_prompt))
    }

    pub fn render(&self, schema: &Value, input: &Value) -> Result<String> {
        let schema = serde_json::to_string_pretty(schema)?;
        let input = serde_json::to_string_pretty(input)?;

        let mut out = String::with_capacity(self.template.len() + schema.len() + input.len());
        let mut rest = self.template.as_str();
        while let Some(pos) = rest.find(|c: char| c == '{' || c == '}') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            if tail.starts_with("{{") {
                out.push('{');
                rest = &tail[2..];
            } else if tail.starts_with("}}") {
                out.push('}');
                rest = &tail[2..];
            } else if tail.starts_with('{') {
                let end = tail.find('}').ok_or_else(|| {
                    TelemetryError::Config("unterminated placeholder in prompt".to_string())
                })?;
                match &tail[1..end] {
                    "schema" => out.push_str(&schema),
                    "input_json" => out.push_str(&input),
                    other => {
                        return Err(TelemetryError::Config(format!(
                            "unknown prompt placeholder '{{{}}}'",
                            other
                        )))
                    }
                }
                rest = &tail[end + 1..];
            } else {
                out.push('}');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);
        Ok(out)
    }
}

/// Parse a model reply as JSON, tolerating a Markdown code fence around it.
pub fn parse_model_output(text: &str) -> Result<Value> {
    let body = CODE_FENCE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map_or(text.trim(), |m| m.as_str());
    serde_json::from_str(body).map_err(|e| TelemetryError::Transform {
        message: format!("model output is not valid JSON: {}", e),
    })
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    format: &'a str,
    options: GenerateOptions,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Canonical transform backed by a local Ollama model.
pub struct OllamaTransformer {
    client: reqwest::Client,
    base_url: String,
    model: String,
    prompt: PromptTemplate,
}

impl OllamaTransformer {
    pub fn new(base_url: &str, model: &str, prompt: PromptTemplate) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            prompt,
        })
    }
}

#[async_trait]
impl SchemaTransformer for OllamaTransformer {
    async fn transform(&self, schema: &Value, input: &Value) -> Result<Value> {
        let request = GenerateRequest {
            model: &self.model,
            prompt: self.prompt.render(schema, input)?,
            stream: false,
            format: "json",
            options: GenerateOptions { temperature: 0.0 },
        };

        let url = format!("{}/api/generate", self.base_url);
        debug!(model = %self.model, %url, "requesting canonical transform");
        let resp = self.client.post(&url).json(&request).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(TelemetryError::Transform {
                message: format!("model server returned {}: {}", status, body),
            });
        }

        let reply: GenerateResponse = resp.json().await?;
        parse_model_output(&reply.response)
    }
}
