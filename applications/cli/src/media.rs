/// Media session that reports now-playing changes to the log
use emepetre_playback::{MediaHandler, MediaMetadata, MediaSession};

#[derive(Default)]
pub struct LogMediaSession {
    handler: Option<MediaHandler>,
}

impl LogMediaSession {
    pub fn is_bound(&self) -> bool {
        self.handler.is_some()
    }
}

impl MediaSession for LogMediaSession {
    fn bind(&mut self, metadata: &MediaMetadata, handler: MediaHandler) {
        tracing::info!(
            title = %metadata.title,
            artist = %metadata.artist,
            album = metadata.album.as_deref().unwrap_or("-"),
            "now playing"
        );
        self.handler = Some(handler);
    }

    fn unbind(&mut self) {
        tracing::debug!("media session released");
        self.handler = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emepetre_playback::MediaAction;
    use std::sync::Arc;

    #[test]
    fn binds_and_releases() {
        let mut session = LogMediaSession::default();
        let metadata = MediaMetadata {
            title: "Song".to_string(),
            artist: "Band".to_string(),
            album: None,
            artwork: None,
        };

        session.bind(&metadata, Arc::new(|_: MediaAction| {}));
        assert!(session.is_bound());
        session.unbind();
        assert!(!session.is_bound());
    }
}
