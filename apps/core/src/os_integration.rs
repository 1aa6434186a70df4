use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("empty path")]
    EmptyPath,
    #[error("path does not exist: {}", .0.display())]
    MissingPath(PathBuf),
    #[error("{action} failed for '{target}': {message}")]
    Failed {
        action: &'static str,
        target: String,
        message: String,
    },
    #[error("clipboard unavailable: {0}")]
    Clipboard(String),
}

/// Desktop side effects the launcher asks for. Window chrome itself lives
/// elsewhere; this only forwards requests.
pub trait OsIntegration {
    fn open_file(&self, path: &str) -> Result<(), ActionError>;
    fn open_file_location(&self, path: &str) -> Result<(), ActionError>;
    fn open_link(&self, url: &str) -> Result<(), ActionError>;
    fn hide_window(&self) -> Result<(), ActionError>;
    fn copy_text(&self, text: &str) -> Result<(), ActionError>;
}

pub fn launch_path(path: &str) -> Result<&Path, ActionError> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(ActionError::EmptyPath);
    }

    let candidate = Path::new(trimmed);
    if !candidate.exists() {
        return Err(ActionError::MissingPath(candidate.to_path_buf()));
    }

    Ok(candidate)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopIntegration;

impl OsIntegration for DesktopIntegration {
    fn open_file(&self, path: &str) -> Result<(), ActionError> {
        let candidate = launch_path(path)?;
        open::that(candidate).map_err(|error| failed("open", path, error))?;
        tracing::info!(path, "opened file");
        Ok(())
    }

    fn open_file_location(&self, path: &str) -> Result<(), ActionError> {
        let candidate = launch_path(path)?;
        reveal(candidate).map_err(|error| failed("reveal", path, error))?;
        tracing::info!(path, "revealed file");
        Ok(())
    }

    fn open_link(&self, url: &str) -> Result<(), ActionError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ActionError::EmptyPath);
        }
        open::that(url).map_err(|error| failed("open link", url, error))?;
        tracing::info!(url, "opened link");
        Ok(())
    }

    fn hide_window(&self) -> Result<(), ActionError> {
        tracing::debug!("hide window requested");
        Ok(())
    }

    fn copy_text(&self, text: &str) -> Result<(), ActionError> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|error| ActionError::Clipboard(error.to_string()))?;
        clipboard
            .set_text(text.to_string())
            .map_err(|error| ActionError::Clipboard(error.to_string()))?;
        tracing::info!(chars = text.chars().count(), "copied text to clipboard");
        Ok(())
    }
}

pub fn default_os_integration() -> Box<dyn OsIntegration> {
    Box::new(DesktopIntegration)
}

fn failed(action: &'static str, target: &str, error: std::io::Error) -> ActionError {
    ActionError::Failed {
        action,
        target: target.to_string(),
        message: error.to_string(),
    }
}

#[cfg(target_os = "windows")]
fn reveal(path: &Path) -> std::io::Result<()> {
    let mut select = std::ffi::OsString::from("/select,");
    select.push(path.as_os_str());
    std::process::Command::new("explorer").arg(select).spawn()?;
    Ok(())
}

#[cfg(target_os = "macos")]
fn reveal(path: &Path) -> std::io::Result<()> {
    std::process::Command::new("open").arg("-R").arg(path).spawn()?;
    Ok(())
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn reveal(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => open::that(parent),
        _ => open::that(path),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OsCall {
    OpenFile(String),
    OpenFileLocation(String),
    OpenLink(String),
    HideWindow,
    CopyText(String),
}

/// Records every request instead of touching the desktop. Clones share the
/// same log, so a test can keep one handle and give another to the engine.
#[derive(Debug, Default, Clone)]
pub struct RecordingIntegration {
    calls: Arc<Mutex<Vec<OsCall>>>,
    failing: Arc<Mutex<Vec<&'static str>>>,
}

impl RecordingIntegration {
    /// Makes every later call of `operation` (`"open_file"`, `"copy_text"`,
    /// ...) fail after being recorded.
    pub fn fail_on(&self, operation: &'static str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.push(operation);
        }
    }

    pub fn calls(&self) -> Vec<OsCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn record(&self, operation: &'static str, call: OsCall) -> Result<(), ActionError> {
        let target = match &call {
            OsCall::OpenFile(value)
            | OsCall::OpenFileLocation(value)
            | OsCall::OpenLink(value)
            | OsCall::CopyText(value) => value.clone(),
            OsCall::HideWindow => String::new(),
        };
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }

        let should_fail = self
            .failing
            .lock()
            .map(|failing| failing.contains(&operation))
            .unwrap_or(false);
        if should_fail {
            return Err(ActionError::Failed {
                action: operation,
                target,
                message: "scripted failure".to_string(),
            });
        }
        Ok(())
    }
}

impl OsIntegration for RecordingIntegration {
    fn open_file(&self, path: &str) -> Result<(), ActionError> {
        self.record("open_file", OsCall::OpenFile(path.to_string()))
    }

    fn open_file_location(&self, path: &str) -> Result<(), ActionError> {
        self.record("open_file_location", OsCall::OpenFileLocation(path.to_string()))
    }

    fn open_link(&self, url: &str) -> Result<(), ActionError> {
        self.record("open_link", OsCall::OpenLink(url.to_string()))
    }

    fn hide_window(&self) -> Result<(), ActionError> {
        self.record("hide_window", OsCall::HideWindow)
    }

    fn copy_text(&self, text: &str) -> Result<(), ActionError> {
        self.record("copy_text", OsCall::CopyText(text.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::{launch_path, ActionError, OsCall, OsIntegration, RecordingIntegration};

    #[test]
    fn rejects_blank_launch_path() {
        assert_eq!(launch_path("   "), Err(ActionError::EmptyPath));
    }

    #[test]
    fn recording_clones_share_the_call_log() {
        let recorder = RecordingIntegration::default();
        let handle = recorder.clone();

        handle.open_link("https://example.com").unwrap();
        handle.hide_window().unwrap();

        assert_eq!(
            recorder.calls(),
            vec![OsCall::OpenLink("https://example.com".into()), OsCall::HideWindow]
        );
    }

    #[test]
    fn scripted_failures_still_record_the_call() {
        let recorder = RecordingIntegration::default();
        recorder.fail_on("copy_text");

        let error = recorder.copy_text("42").unwrap_err();
        assert_eq!(error.to_string(), "copy_text failed for '42': scripted failure");
        assert_eq!(recorder.calls(), vec![OsCall::CopyText("42".into())]);
    }
}
