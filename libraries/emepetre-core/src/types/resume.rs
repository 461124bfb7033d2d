/// Persisted playback checkpoints
use super::TrackId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Last-known playback position, written on pause and explicit save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeState {
    pub track_id: TrackId,

    /// Position in seconds
    pub position: f64,

    /// Master volume (0.0 - 1.0)
    pub volume: f32,
}

/// One row of the listening history kept by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: Uuid,
    pub track_id: TrackId,
    pub played_at: DateTime<Utc>,

    /// Seconds listened, 0 when recorded at load time
    pub listened_duration: f64,
}

impl HistoryEntry {
    /// Create an entry stamped with the current time
    pub fn now(track_id: TrackId) -> Self {
        Self {
            id: Uuid::new_v4(),
            track_id,
            played_at: Utc::now(),
            listened_duration: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resume_state_round_trips_through_json() {
        let state = ResumeState {
            track_id: TrackId::new("t1"),
            position: 12.5,
            volume: 0.8,
        };
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"trackId\":\"t1\""));
        let back: ResumeState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
