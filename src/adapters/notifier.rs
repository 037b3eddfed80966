//! Notifier implementations: console, file and (with the `telegram`
//! feature) the Telegram Bot API.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;

use crate::domain::error::PipelineError;
use crate::ports::notifier_port::NotifierPort;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifierKind {
    Console,
    File,
    Telegram,
    None,
}

impl FromStr for NotifierKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "console" | "stdout" => Ok(NotifierKind::Console),
            "file" => Ok(NotifierKind::File),
            "telegram" => Ok(NotifierKind::Telegram),
            "none" | "off" => Ok(NotifierKind::None),
            other => Err(format!(
                "unknown notifier '{}' (expected console, file, telegram or none)",
                other
            )),
        }
    }
}

/// Prints each message to stdout.
pub struct ConsoleNotifier;

impl NotifierPort for ConsoleNotifier {
    fn name(&self) -> &str {
        "console"
    }

    fn send(&self, message: &str) -> Result<(), PipelineError> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{}\n", message)?;
        Ok(())
    }
}

/// Appends each message to a file, separated by a blank line.
pub struct FileNotifier {
    path: PathBuf,
}

impl FileNotifier {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl NotifierPort for FileNotifier {
    fn name(&self) -> &str {
        "file"
    }

    fn send(&self, message: &str) -> Result<(), PipelineError> {
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}\n", message)?;
        Ok(())
    }
}

#[cfg(feature = "telegram")]
pub use telegram::TelegramNotifier;

#[cfg(feature = "telegram")]
mod telegram {
    use std::time::Duration;

    use tracing::debug;

    use crate::domain::error::PipelineError;
    use crate::ports::notifier_port::NotifierPort;

    const API_BASE: &str = "https://api.telegram.org";

    pub struct TelegramNotifier {
        token: String,
        chat_id: String,
        base_url: String,
        client: reqwest::blocking::Client,
    }

    fn failure(reason: impl ToString) -> PipelineError {
        PipelineError::ExternalService {
            service: "telegram".into(),
            attempts: 1,
            reason: reason.to_string(),
        }
    }

    impl TelegramNotifier {
        pub fn new(token: String, chat_id: String) -> Result<Self, PipelineError> {
            Self::with_base_url(token, chat_id, API_BASE.to_string())
        }

        pub fn with_base_url(token: String, chat_id: String, base_url: String) -> Result<Self, PipelineError> {
            let client = reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .map_err(failure)?;
            Ok(Self {
                token,
                chat_id,
                base_url,
                client,
            })
        }
    }

    impl NotifierPort for TelegramNotifier {
        fn name(&self) -> &str {
            "telegram"
        }

        fn send(&self, message: &str) -> Result<(), PipelineError> {
            let url = format!("{}/bot{}/sendMessage", self.base_url, self.token);
            self.client
                .post(&url)
                .json(&serde_json::json!({
                    "chat_id": self.chat_id,
                    "text": message,
                }))
                .send()
                .and_then(|r| r.error_for_status())
                .map_err(|e| failure(e.without_url()))?;
            debug!("sent Telegram message");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn kind_parses() {
        assert_eq!("Console".parse::<NotifierKind>().unwrap(), NotifierKind::Console);
        assert_eq!("file".parse::<NotifierKind>().unwrap(), NotifierKind::File);
        assert_eq!("telegram".parse::<NotifierKind>().unwrap(), NotifierKind::Telegram);
        assert_eq!("none".parse::<NotifierKind>().unwrap(), NotifierKind::None);
        assert!("email".parse::<NotifierKind>().is_err());
    }

    #[test]
    fn file_notifier_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("messages.txt");
        let notifier = FileNotifier::new(path.clone());
        notifier.send("first").unwrap();
        notifier.send("second").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "first\n\nsecond\n\n");
    }

    #[test]
    fn file_notifier_reports_io_errors() {
        let dir = TempDir::new().unwrap();
        let notifier = FileNotifier::new(dir.path().join("missing/messages.txt"));
        assert!(matches!(notifier.send("x"), Err(PipelineError::Io(_))));
    }

    #[test]
    fn console_notifier_succeeds() {
        assert!(ConsoleNotifier.send("hello").is_ok());
    }
}
