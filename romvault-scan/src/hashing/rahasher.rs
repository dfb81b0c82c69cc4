//! RetroAchievements hash helper
//!
//! Invokes `RAHasher <console_id> <path>` and reads the 32-digit hex hash
//! from its output. Any failure yields `None`.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct RaHasher {
    binary: PathBuf,
    timeout: Duration,
}

impl RaHasher {
    pub fn new(binary: PathBuf) -> Self {
        Self {
            binary,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn hash(&self, console_id: u32, file: &Path) -> Option<String> {
        let child = Command::new(&self.binary)
            .arg(console_id.to_string())
            .arg(file)
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!(helper = %self.binary.display(), error = %e, "RAHasher could not be started");
                return None;
            }
            Err(_) => {
                warn!(file = %file.display(), "RAHasher timed out");
                return None;
            }
        };

        if !output.status.success() {
            warn!(
                file = %file.display(),
                status = %output.status,
                "RAHasher exited with failure"
            );
            return None;
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let hash = parse_output(&stdout);
        if hash.is_none() {
            debug!(file = %file.display(), output = %stdout.trim(), "No hash in RAHasher output");
        }
        hash
    }
}

/// Last line holding a 32-digit hex token
fn parse_output(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .rev()
        .flat_map(|line| line.split_whitespace())
        .find(|token| token.len() == 32 && token.chars().all(|c| c.is_ascii_hexdigit()))
        .map(|token| token.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_output() {
        assert_eq!(
            parse_output("0123456789ABCDEF0123456789abcdef\n").as_deref(),
            Some("0123456789abcdef0123456789abcdef")
        );
        assert_eq!(
            parse_output("Loading...\nHash: 0123456789abcdef0123456789abcdef\n").as_deref(),
            Some("0123456789abcdef0123456789abcdef")
        );
        assert_eq!(parse_output("error: unsupported console"), None);
        assert_eq!(parse_output(""), None);
    }

    #[tokio::test]
    async fn test_missing_helper_degrades_to_none() {
        let hasher = RaHasher::new(PathBuf::from("/nonexistent/RAHasher"))
            .with_timeout(Duration::from_secs(1));
        assert_eq!(hasher.hash(5, Path::new("/tmp/game.gba")).await, None);
    }
}
