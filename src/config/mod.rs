//! Configuration module for the call relay server
//!
//! Server configuration comes from several sources: .env files, YAML files
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use call_relay::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

mod env;
mod merge;
mod validation;
mod yaml;

use crate::core::realtime::openai::Modality;
use crate::core::realtime::{
    OPENAI_REALTIME_URL, OpenAIRealtimeAudioFormat, OpenAIRealtimeModel, OpenAIRealtimeVoice,
    RealtimeConfig, SessionSettings, TurnDetectionMode,
};
use crate::core::relay::{
    ConfigureTrigger, DEFAULT_LOG_EVENT_TYPES, DEFAULT_SYSTEM_MESSAGE, RelayConfig,
};

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
///
/// Contains everything needed to run the relay:
/// - Server settings (host, port, public host, TLS)
/// - OpenAI Realtime connection settings
/// - Assistant session settings
/// - Diagnostics
/// - Caller-audio capture storage (local directory or S3)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,
    /// Host name used in the stream URL handed to the telephony provider.
    /// Falls back to the request's `Host` header.
    pub public_host: Option<String>,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    // OpenAI Realtime
    pub openai_api_key: Option<String>,
    pub openai_realtime_model: String,
    pub openai_realtime_url: String,

    // Assistant session
    pub voice: String,
    pub system_message: String,
    pub temperature: f32,
    pub audio_format: String,
    pub turn_detection: TurnDetectionMode,
    /// `delay` or `session_created`
    pub configure_trigger: String,
    pub configure_delay_ms: u64,
    /// Prompt that makes the assistant speak first
    pub initial_greeting: Option<String>,
    /// Said by the telephony provider before the stream connects
    pub connect_greeting: Option<String>,
    pub log_event_types: Vec<String>,

    // Diagnostics
    pub show_timing_math: bool,

    // Recording
    pub recording_enabled: bool,
    pub recording_path: PathBuf,
    pub recording_s3_bucket: Option<String>,
    pub recording_s3_region: Option<String>,
    pub recording_s3_endpoint: Option<String>,
    pub recording_s3_access_key: Option<String>,
    pub recording_s3_secret_key: Option<String>,
    /// Optional path prefix for capture objects.
    pub recording_s3_prefix: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5050,
            public_host: None,
            tls: None,
            openai_api_key: None,
            openai_realtime_model: OpenAIRealtimeModel::default().to_string(),
            openai_realtime_url: OPENAI_REALTIME_URL.to_string(),
            voice: "alloy".to_string(),
            system_message: DEFAULT_SYSTEM_MESSAGE.to_string(),
            temperature: 0.8,
            audio_format: "g711_ulaw".to_string(),
            turn_detection: TurnDetectionMode::ServerVad,
            configure_trigger: "delay".to_string(),
            configure_delay_ms: 250,
            initial_greeting: None,
            connect_greeting: None,
            log_event_types: DEFAULT_LOG_EVENT_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            show_timing_math: false,
            recording_enabled: true,
            recording_path: PathBuf::from("./recordings"),
            recording_s3_bucket: None,
            recording_s3_region: None,
            recording_s3_endpoint: None,
            recording_s3_access_key: None,
            recording_s3_secret_key: None,
            recording_s3_prefix: None,
        }
    }
}

/// Implement Drop to zeroize all secret fields when ServerConfig is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.openai_api_key {
            key.zeroize();
        }
        if let Some(ref mut key) = self.recording_s3_access_key {
            key.zeroize();
        }
        if let Some(ref mut secret) = self.recording_s3_secret_key {
            secret.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// The .env file is loaded in main.rs at startup, so its values are
    /// visible here as environment variables.
    ///
    /// # Errors
    /// Returns an error if a variable has an invalid format or validation fails.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = merge::merge_config(None)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the merged configuration.
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        validation::validate_openai_api_key(&self.openai_api_key)?;
        validation::validate_port(self.port)?;
        validation::validate_voice(&self.voice)?;
        validation::validate_audio_format(&self.audio_format)?;
        validation::validate_recording_storage(
            &self.recording_s3_bucket,
            &self.recording_s3_region,
            &self.recording_s3_endpoint,
        )?;
        Ok(())
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// Connection settings for the assistant side.
    pub fn realtime_config(&self) -> RealtimeConfig {
        RealtimeConfig {
            api_key: self.openai_api_key.clone().unwrap_or_default(),
            model: self.openai_realtime_model.clone(),
            url: self.openai_realtime_url.clone(),
            log_event_types: self.log_event_types.clone(),
        }
    }

    /// Per-call relay settings.
    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            session: SessionSettings {
                voice: OpenAIRealtimeVoice::parse(&self.voice)
                    .unwrap_or_default()
                    .to_string(),
                instructions: self.system_message.clone(),
                audio_format: OpenAIRealtimeAudioFormat::parse(&self.audio_format)
                    .unwrap_or_default()
                    .to_string(),
                turn_detection: self.turn_detection,
                modalities: Modality::VOICE_CALL
                    .iter()
                    .map(|m| m.as_str().to_string())
                    .collect(),
                temperature: self.temperature,
            },
            configure_trigger: ConfigureTrigger::from_parts(
                &self.configure_trigger,
                self.configure_delay_ms,
            ),
            initial_greeting: self.initial_greeting.clone(),
            show_timing_math: self.show_timing_math,
        }
    }
}
