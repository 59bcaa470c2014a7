use crate::services::file_service::uri_to_path;
use std::process::{Child, Command, Stdio};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlayerError {
    #[error("Player not found: {program}")]
    NotFound { program: String },
    #[error("Failed to start player: {0}")]
    Io(#[from] std::io::Error),
}

/// Tracks the URI shown in the player modal and the `ffplay` process behind it.
pub struct PlayerService {
    program: String,
    player_uri: Option<String>,
    child: Option<Child>,
    last_error: Option<String>,
}

impl Default for PlayerService {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerService {
    pub fn new() -> Self {
        Self::with_program("ffplay")
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            player_uri: None,
            child: None,
            last_error: None,
        }
    }

    pub fn player_uri(&self) -> Option<&str> {
        self.player_uri.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.player_uri.is_some()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Shows the modal for `uri`. The modal stays up even if the player fails to launch.
    pub fn play(&mut self, uri: &str) -> Result<(), PlayerError> {
        self.stop_process();
        self.player_uri = Some(uri.to_string());
        self.last_error = None;

        let spawned = Command::new(&self.program)
            .args(["-autoexit", "-window_title"])
            .arg(uri)
            .arg(uri_to_path(uri))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        match spawned {
            Ok(child) => {
                tracing::info!("Playing {}", uri);
                self.child = Some(child);
                Ok(())
            }
            Err(e) => {
                let error = if e.kind() == std::io::ErrorKind::NotFound {
                    PlayerError::NotFound {
                        program: self.program.clone(),
                    }
                } else {
                    PlayerError::Io(e)
                };
                self.last_error = Some(error.to_string());
                Err(error)
            }
        }
    }

    pub fn close(&mut self) {
        self.stop_process();
        self.player_uri = None;
        self.last_error = None;
    }

    /// Closes the modal once the player process has exited by itself.
    /// Returns `true` when that happened.
    pub fn poll(&mut self) -> bool {
        let exited = match self.child.as_mut() {
            Some(child) => match child.try_wait() {
                Ok(Some(status)) => {
                    tracing::debug!("Player exited with {}", status);
                    true
                }
                Ok(None) => false,
                Err(e) => {
                    tracing::warn!("Lost track of the player process: {}", e);
                    true
                }
            },
            None => false,
        };

        if exited {
            self.child = None;
            self.close();
        }
        exited
    }

    fn stop_process(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for PlayerService {
    fn drop(&mut self) {
        self.stop_process();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn test_play_sets_uri_even_when_player_is_missing() {
        let mut player = PlayerService::with_program("ffplay-binary-that-does-not-exist");
        assert!(!player.is_open());

        let result = player.play("/tmp/clip.mp4");
        assert!(matches!(result, Err(PlayerError::NotFound { .. })));
        assert_eq!(player.player_uri(), Some("/tmp/clip.mp4"));
        assert!(player.last_error().is_some());

        player.close();
        assert_eq!(player.player_uri(), None);
        assert_eq!(player.last_error(), None);
    }

    #[test]
    fn test_poll_without_process_keeps_modal() {
        let mut player = PlayerService::with_program("ffplay-binary-that-does-not-exist");
        let _ = player.play("/tmp/clip.mp4");
        assert!(!player.poll());
        assert!(player.is_open());
    }

    #[cfg(unix)]
    #[test]
    fn test_poll_closes_after_player_exits() {
        let mut player = PlayerService::with_program("true");
        player.play("/tmp/clip.mp4").unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while !player.poll() {
            assert!(Instant::now() < deadline, "player never exited");
            std::thread::sleep(Duration::from_millis(20));
        }
        assert!(!player.is_open());
    }
}
