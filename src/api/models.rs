//! Request and payload models for the relay routes.
//!
//! Only the session route has a fixed upstream shape; the completion routes
//! forward arbitrary JSON objects and have no model here.

use serde::{Deserialize, Serialize};

/// Sampling temperature sent with every realtime session request.
pub const SESSION_TEMPERATURE: f64 = 0.6;

/// Voice-activity-detection threshold sent with every realtime session request.
pub const SESSION_VAD_THRESHOLD: f64 = 0.7;

pub const SESSION_VAD_TYPE: &str = "server_vad";

/// Query parameters of `GET /session`. Both are required.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionParams {
    pub model: String,
    pub voice: String,
}

/// Body posted to the realtime sessions endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRequest {
    pub model: String,
    pub voice: String,
    pub temperature: f64,
    pub turn_detection: TurnDetection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnDetection {
    #[serde(rename = "type")]
    pub kind: String,
    pub threshold: f64,
}

impl SessionRequest {
    /// Fixed-shape session payload; only model and voice vary.
    pub fn new(params: SessionParams) -> Self {
        Self {
            model: params.model,
            voice: params.voice,
            temperature: SESSION_TEMPERATURE,
            turn_detection: TurnDetection {
                kind: SESSION_VAD_TYPE.to_string(),
                threshold: SESSION_VAD_THRESHOLD,
            },
        }
    }
}
