use std::path::PathBuf;

use tracing::warn;

use super::TlsConfig;
use crate::core::realtime::{OpenAIRealtimeAudioFormat, OpenAIRealtimeVoice};

/// Resolve a TLS certificate/key pair.
///
/// Both paths or neither; a lone certificate or key is an error.
pub fn validate_tls_paths(
    cert_path: Option<PathBuf>,
    key_path: Option<PathBuf>,
) -> Result<Option<TlsConfig>, Box<dyn std::error::Error>> {
    match (cert_path, key_path) {
        (Some(cert_path), Some(key_path)) => Ok(Some(TlsConfig {
            cert_path,
            key_path,
        })),
        (None, None) => Ok(None),
        (Some(_), None) => Err("TLS certificate configured without a private key (TLS_KEY_PATH)".into()),
        (None, Some(_)) => Err("TLS private key configured without a certificate (TLS_CERT_PATH)".into()),
    }
}

/// The assistant connection cannot be opened without a key.
pub fn validate_openai_api_key(api_key: &Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    match api_key {
        Some(key) if !key.trim().is_empty() => Ok(()),
        _ => Err("Missing OpenAI API key. Set OPENAI_API_KEY or openai.api_key".into()),
    }
}

pub fn validate_port(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    if port == 0 {
        return Err("Port must be non-zero".into());
    }
    Ok(())
}

pub fn validate_voice(voice: &str) -> Result<(), Box<dyn std::error::Error>> {
    match OpenAIRealtimeVoice::parse(voice) {
        Some(_) => Ok(()),
        None => Err(format!("Unsupported voice {voice:?}").into()),
    }
}

/// Formats other than u-law are accepted, but telephony audio is relayed
/// untouched, so the assistant would misread it.
pub fn validate_audio_format(format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let parsed = OpenAIRealtimeAudioFormat::parse(format)
        .ok_or_else(|| format!("Unsupported audio format {format:?}"))?;
    if !parsed.is_telephony_native() {
        warn!(
            "Audio format {} does not match telephony u-law; caller audio is not transcoded",
            parsed
        );
    }
    Ok(())
}

/// An S3 bucket needs a region or a custom endpoint to be reachable.
pub fn validate_recording_storage(
    bucket: &Option<String>,
    region: &Option<String>,
    endpoint: &Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    if bucket.is_some() && region.is_none() && endpoint.is_none() {
        return Err(
            "RECORDING_S3_BUCKET requires RECORDING_S3_REGION or RECORDING_S3_ENDPOINT".into(),
        );
    }
    Ok(())
}
