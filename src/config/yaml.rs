use serde::Deserialize;
use std::path::PathBuf;

/// Root of a relay config file.
///
/// Every section and field may be omitted. Any value set
/// here overrides the corresponding environment variable.
///
/// # Example
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 5050
///   public_host: "relay.example.com"
///   tls:
///     cert_path: "/etc/relay/cert.pem"
///     key_path: "/etc/relay/key.pem"
///
/// openai:
///   api_key: "sk-..."
///   model: "gpt-4o-realtime-preview-2024-10-01"
///
/// assistant:
///   voice: "alloy"
///   instructions: "You are a helpful assistant."
///   temperature: 0.8
///   audio_format: "g711_ulaw"
///   turn_detection: "server_vad"
///   configure_trigger: "delay"
///   configure_delay_ms: 250
///   initial_greeting: "Greet the caller and ask how you can help."
///   connect_greeting: "Please wait while we connect your call."
///   log_event_types:
///     - "error"
///     - "response.done"
///
/// diagnostics:
///   show_timing_math: false
///
/// recording:
///   enabled: true
///   path: "./recordings"
///   s3_bucket: "my-bucket"
///   s3_region: "us-west-2"
///   s3_prefix: "calls/production"
///   s3_endpoint: "https://s3.amazonaws.com"
///   s3_access_key: "access-key"
///   s3_secret_key: "secret-key"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub openai: Option<OpenAIYaml>,
    pub assistant: Option<AssistantYaml>,
    pub diagnostics: Option<DiagnosticsYaml>,
    pub recording: Option<RecordingYaml>,
}

/// `server:` section
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub public_host: Option<String>,
    pub tls: Option<TlsYaml>,
}

/// `server.tls:` section. Both paths must be set together.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

/// OpenAI Realtime connection settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct OpenAIYaml {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub url: Option<String>,
}

/// Assistant session settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AssistantYaml {
    pub voice: Option<String>,
    pub instructions: Option<String>,
    pub temperature: Option<f32>,
    pub audio_format: Option<String>,
    pub turn_detection: Option<String>,
    /// `delay` or `session_created`
    pub configure_trigger: Option<String>,
    pub configure_delay_ms: Option<u64>,
    pub initial_greeting: Option<String>,
    /// Spoken by the telephony provider before the stream connects
    pub connect_greeting: Option<String>,
    pub log_event_types: Option<Vec<String>>,
}

/// Diagnostics settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct DiagnosticsYaml {
    pub show_timing_math: Option<bool>,
}

/// Caller-audio capture settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RecordingYaml {
    pub enabled: Option<bool>,
    pub path: Option<String>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    pub s3_access_key: Option<String>,
    pub s3_secret_key: Option<String>,
    pub s3_prefix: Option<String>,
}

impl YamlConfig {
    /// Read and parse a relay config file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or the YAML is malformed.
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}
