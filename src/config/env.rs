use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use super::ServerConfig;
use super::validation::validate_tls_paths;
use crate::core::realtime::TurnDetectionMode;

/// Read a variable, treating unset and blank the same.
pub(super) fn env_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a variable, failing with a readable message on bad input.
pub(super) fn parse_env<T>(name: &str) -> Result<Option<T>, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_var(name) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("Invalid value for {name}: {raw:?} ({e})").into()),
        None => Ok(None),
    }
}

/// Parse a boolean variable (`true/false`, `1/0`, `yes/no`, `on/off`).
pub(super) fn parse_bool_env(name: &str) -> Result<Option<bool>, Box<dyn std::error::Error>> {
    match env_var(name) {
        Some(raw) => parse_bool(&raw)
            .map(Some)
            .ok_or_else(|| format!("Invalid boolean for {name}: {raw:?}").into()),
        None => Ok(None),
    }
}

pub(super) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Split a comma-separated list, dropping blanks.
pub(super) fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Build a configuration from environment variables over the defaults.
pub fn load_from_env() -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let mut config = ServerConfig::default();

    if let Some(host) = env_var("HOST") {
        config.host = host;
    }
    if let Some(port) = parse_env::<u16>("PORT")? {
        config.port = port;
    }
    config.public_host = env_var("PUBLIC_HOST");
    config.tls = validate_tls_paths(
        env_var("TLS_CERT_PATH").map(PathBuf::from),
        env_var("TLS_KEY_PATH").map(PathBuf::from),
    )?;

    config.openai_api_key = env_var("OPENAI_API_KEY");
    if let Some(model) = env_var("OPENAI_REALTIME_MODEL") {
        config.openai_realtime_model = model;
    }
    if let Some(url) = env_var("OPENAI_REALTIME_URL") {
        config.openai_realtime_url = url;
    }

    if let Some(voice) = env_var("VOICE") {
        config.voice = voice;
    }
    if let Some(message) = env_var("SYSTEM_MESSAGE") {
        config.system_message = message;
    }
    if let Some(temperature) = parse_env::<f32>("TEMPERATURE")? {
        config.temperature = temperature;
    }
    if let Some(format) = env_var("AUDIO_FORMAT") {
        config.audio_format = format;
    }
    if let Some(mode) = env_var("TURN_DETECTION") {
        config.turn_detection = TurnDetectionMode::from_str_or_default(&mode);
    }
    if let Some(trigger) = env_var("CONFIGURE_TRIGGER") {
        config.configure_trigger = trigger;
    }
    if let Some(delay) = parse_env::<u64>("CONFIGURE_DELAY_MS")? {
        config.configure_delay_ms = delay;
    }
    config.initial_greeting = env_var("INITIAL_GREETING");
    config.connect_greeting = env_var("CONNECT_GREETING");
    if let Some(types) = env_var("LOG_EVENT_TYPES") {
        config.log_event_types = parse_list(&types);
    }
    if let Some(show) = parse_bool_env("SHOW_TIMING_MATH")? {
        config.show_timing_math = show;
    }

    if let Some(enabled) = parse_bool_env("RECORDING_ENABLED")? {
        config.recording_enabled = enabled;
    }
    if let Some(path) = env_var("RECORDING_PATH") {
        config.recording_path = PathBuf::from(path);
    }
    config.recording_s3_bucket = env_var("RECORDING_S3_BUCKET");
    config.recording_s3_region = env_var("RECORDING_S3_REGION");
    config.recording_s3_endpoint = env_var("RECORDING_S3_ENDPOINT");
    config.recording_s3_access_key = env_var("RECORDING_S3_ACCESS_KEY");
    config.recording_s3_secret_key = env_var("RECORDING_S3_SECRET_KEY");
    config.recording_s3_prefix = env_var("RECORDING_S3_PREFIX");

    Ok(config)
}
