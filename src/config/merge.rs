use std::path::PathBuf;

use super::ServerConfig;
use super::env::load_from_env;
use super::validation::validate_tls_paths;
use super::yaml::YamlConfig;
use crate::core::realtime::TurnDetectionMode;

/// Merge environment configuration (base) with optional YAML overrides.
///
/// Every value present in the YAML replaces the environment's value.
pub fn merge_config(yaml: Option<YamlConfig>) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let mut config = load_from_env()?;
    let Some(yaml) = yaml else {
        return Ok(config);
    };

    if let Some(server) = yaml.server {
        if let Some(host) = server.host {
            config.host = host;
        }
        if let Some(port) = server.port {
            config.port = port;
        }
        if server.public_host.is_some() {
            config.public_host = server.public_host;
        }
        if let Some(tls) = server.tls {
            let cert = tls
                .cert_path
                .map(PathBuf::from)
                .or_else(|| config.tls.as_ref().map(|t| t.cert_path.clone()));
            let key = tls
                .key_path
                .map(PathBuf::from)
                .or_else(|| config.tls.as_ref().map(|t| t.key_path.clone()));
            config.tls = validate_tls_paths(cert, key)?;
        }
    }

    if let Some(openai) = yaml.openai {
        if openai.api_key.is_some() {
            config.openai_api_key = openai.api_key;
        }
        if let Some(model) = openai.model {
            config.openai_realtime_model = model;
        }
        if let Some(url) = openai.url {
            config.openai_realtime_url = url;
        }
    }

    if let Some(assistant) = yaml.assistant {
        if let Some(voice) = assistant.voice {
            config.voice = voice;
        }
        if let Some(instructions) = assistant.instructions {
            config.system_message = instructions;
        }
        if let Some(temperature) = assistant.temperature {
            config.temperature = temperature;
        }
        if let Some(format) = assistant.audio_format {
            config.audio_format = format;
        }
        if let Some(mode) = assistant.turn_detection {
            config.turn_detection = TurnDetectionMode::from_str_or_default(&mode);
        }
        if let Some(trigger) = assistant.configure_trigger {
            config.configure_trigger = trigger;
        }
        if let Some(delay) = assistant.configure_delay_ms {
            config.configure_delay_ms = delay;
        }
        if assistant.initial_greeting.is_some() {
            config.initial_greeting = assistant.initial_greeting;
        }
        if assistant.connect_greeting.is_some() {
            config.connect_greeting = assistant.connect_greeting;
        }
        if let Some(types) = assistant.log_event_types {
            config.log_event_types = types;
        }
    }

    if let Some(diagnostics) = yaml.diagnostics
        && let Some(show) = diagnostics.show_timing_math
    {
        config.show_timing_math = show;
    }

    if let Some(recording) = yaml.recording {
        if let Some(enabled) = recording.enabled {
            config.recording_enabled = enabled;
        }
        if let Some(path) = recording.path {
            config.recording_path = PathBuf::from(path);
        }
        if recording.s3_bucket.is_some() {
            config.recording_s3_bucket = recording.s3_bucket;
        }
        if recording.s3_region.is_some() {
            config.recording_s3_region = recording.s3_region;
        }
        if recording.s3_endpoint.is_some() {
            config.recording_s3_endpoint = recording.s3_endpoint;
        }
        if recording.s3_access_key.is_some() {
            config.recording_s3_access_key = recording.s3_access_key;
        }
        if recording.s3_secret_key.is_some() {
            config.recording_s3_secret_key = recording.s3_secret_key;
        }
        if recording.s3_prefix.is_some() {
            config.recording_s3_prefix = recording.s3_prefix;
        }
    }

    Ok(config)
}
