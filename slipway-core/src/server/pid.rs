use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Record the current process id so service managers can signal it.
pub fn write_pid<P: AsRef<Path>>(path: P) -> Result<()> {
    let pid = std::process::id();
    fs::write(&path, format!("{pid}\n"))
        .with_context(|| format!("failed to write pid file {}", path.as_ref().display()))
}

/// Best-effort removal on shutdown.
pub fn remove_pid<P: AsRef<Path>>(path: P) {
    if let Err(e) = fs::remove_file(&path) {
        tracing::debug!(error = %e, path = %path.as_ref().display(), "pid file not removed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn pid_file_round_trip() {
        // Arrange
        let dir = tempdir().unwrap();
        let path = dir.path().join("slipway.pid");

        // Act
        write_pid(&path).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        remove_pid(&path);

        // Assert
        assert_eq!(written.trim(), std::process::id().to_string());
        assert!(!path.exists());
    }
}
