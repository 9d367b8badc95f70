use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::session::{ChatMessage, ChatRole};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Returned verbatim when the API answers without any text.
pub const EMPTY_RESPONSE_PLACEHOLDER: &str = "No response data returned.";

// Lower temperature for more technical/precise responses
const TEMPERATURE: f32 = 0.4;

const SYSTEM_INSTRUCTION: &str = r#"You are an elite bug bounty hunter and senior security researcher.
Your specific mission is to teach the user about Server-Side Request Forgery (SSRF) through advanced, realistic simulations.

Curriculum Focus:
1. Blind SSRF (Time-based, Error-based, Out-of-band interaction)
2. Cloud Metadata Exploitation (AWS IMDSv1/v2, GCP, Azure, Oracle)
3. Filter Bypasses (0.0.0.0, Enclosed Alphanumerics, IPv6, Redirection)
4. DNS Rebinding attacks

Style Guide:
- Tone: Professional, concise, highly technical. No "intro to web" fluff.
- Format: Use Markdown heavily. Use code blocks for all terminal commands, HTTP requests, and payloads.
- Simulation: If the user types a command (e.g., `curl`, `nc`), SIMULATE the output exactly as a Linux terminal would behave in a vulnerable environment.
- Safety: Do not provide scripts for attacking real-world infrastructure. Keep it to the simulated "lab" environment.

When the user starts a module, immediately drop them into a context/scenario (e.g., "You have found a webhook integration endpoint...")."#;

#[derive(Serialize)]
struct GenerateRequest {
    #[serde(rename = "systemInstruction")]
    system_instruction: SystemInstruction,
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct Part {
    text: String,
}

// Response structs default every field so a malformed payload degrades to the
// placeholder instead of a deserialization error.
#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    /// Send one lesson turn. Error-flagged history entries are dropped before
    /// the transcript is replayed; any transport or API failure surfaces as a
    /// single uniform error, with the detail kept in the log.
    pub async fn generate(&self, message: &str, history: &[ChatMessage]) -> Result<String> {
        match self.request(message, history).await {
            Ok(text) => Ok(text),
            Err(e) => {
                tracing::warn!(error = %e, "Gemini API interaction failed");
                Err(anyhow!("failed to generate lesson content"))
            }
        }
    }

    async fn request(&self, message: &str, history: &[ChatMessage]) -> Result<String> {
        let url = format!("{}/{}:generateContent", API_BASE, self.model);

        let request = GenerateRequest {
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: SYSTEM_INSTRUCTION.to_string(),
                }],
            },
            contents: build_contents(message, history),
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
            },
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Gemini API error {}: {}", status, text));
        }

        let body: GenerateResponse = response.json().await?;
        Ok(extract_text(body))
    }
}

/// Map the transcript to the wire shape: error notices filtered out, order
/// preserved, the new message appended as the final user turn.
fn build_contents(message: &str, history: &[ChatMessage]) -> Vec<Content> {
    let mut contents: Vec<Content> = history
        .iter()
        .filter(|msg| !msg.is_error)
        .map(|msg| Content {
            role: match msg.role {
                ChatRole::User => "user",
                ChatRole::Model => "model",
            }
            .to_string(),
            parts: vec![Part {
                text: msg.text.clone(),
            }],
        })
        .collect();

    contents.push(Content {
        role: "user".to_string(),
        parts: vec![Part {
            text: message.to_string(),
        }],
    });

    contents
}

fn extract_text(response: GenerateResponse) -> String {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.is_empty() {
        EMPTY_RESPONSE_PLACEHOLDER.to_string()
    } else {
        text
    }
}
