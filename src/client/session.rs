use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Recording attempts within this window of the last marker are
/// suppressed and replaced by a pure read (30 minutes).
pub const REVISIT_WINDOW_MS: i64 = 30 * 60 * 1000;

/// Explicit session state for the visit-decision, persisted as a small
/// JSON file. Loaded before every decision, marked after every
/// successful or attempted recording; nothing reads it as ambient
/// global state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionState {
    pub last_recorded_at: Option<i64>,
}

impl SessionState {
    /// Whether a new visit should be recorded at `now_ms`: true when no
    /// marker exists or the revisit window has elapsed. Bounds
    /// over-counting from reloads within a session; concurrent tabs are
    /// explicitly not coordinated.
    pub fn should_record(&self, now_ms: i64) -> bool {
        match self.last_recorded_at {
            None => true,
            Some(marker) => now_ms - marker > REVISIT_WINDOW_MS,
        }
    }

    pub fn mark(&mut self, now_ms: i64) {
        self.last_recorded_at = Some(now_ms);
    }

    /// A missing or unreadable marker file is a fresh session.
    pub async fn load(path: &Path) -> Self {
        match tokio::fs::read(path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let bytes = serde_json::to_vec(self)?;
        tokio::fs::write(path, bytes)
            .await
            .with_context(|| format!("writing session marker {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_session_records() {
        assert!(SessionState::default().should_record(0));
    }

    #[test]
    fn marker_suppresses_within_window() {
        let mut session = SessionState::default();
        session.mark(1_000);

        assert!(!session.should_record(1_000 + REVISIT_WINDOW_MS));
        assert!(session.should_record(1_001 + REVISIT_WINDOW_MS));
    }
}
