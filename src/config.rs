use serde::Deserialize;
use serde_json::Value;
use std::env;
use std::path::Path;
use thiserror::Error;

pub const TOKEN_ENV: &str = "TELEGRAM_TOKEN";
pub const CHAT_ID_ENV: &str = "TELEGRAM_CHAT_ID";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read credentials file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("credentials file {path} is not valid: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("telegram token is missing (set TELEGRAM_TOKEN or telegram.token)")]
    MissingToken,
    #[error("telegram chat id is missing (set TELEGRAM_CHAT_ID or telegram.chat_id)")]
    MissingChatId,
    #[error("telegram token looks malformed")]
    MalformedToken,
    #[error("telegram chat id must be numeric (groups start with '-'), got {0:?}")]
    MalformedChatId(String),
}

/// Telegram transport credentials. Validated for shape only; nothing is
/// checked against the API until the first send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub chat_id: String,
}

#[derive(Deserialize)]
struct CredentialsFile {
    telegram: TelegramSection,
}

#[derive(Deserialize)]
struct TelegramSection {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    chat_id: Option<Value>,
}

impl Credentials {
    /// Loads credentials from the JSON file at `path`, letting
    /// `TELEGRAM_TOKEN` / `TELEGRAM_CHAT_ID` override its fields. The file may
    /// be absent when both variables are set.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let env_token = env::var(TOKEN_ENV).ok().filter(|v| !v.trim().is_empty());
        let env_chat = env::var(CHAT_ID_ENV).ok().filter(|v| !v.trim().is_empty());

        let (file_token, file_chat) = if env_token.is_some() && env_chat.is_some() && !path.exists() {
            (None, None)
        } else {
            Self::read_file(path)?
        };

        Self::resolve(env_token.or(file_token), env_chat.or(file_chat))
    }

    fn read_file(path: &Path) -> Result<(Option<String>, Option<String>), ConfigError> {
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        let file: CredentialsFile = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })?;

        // chat ids are often written as bare JSON numbers
        let chat_id = file.telegram.chat_id.and_then(|v| match v {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });
        Ok((file.telegram.token, chat_id))
    }

    pub fn resolve(token: Option<String>, chat_id: Option<String>) -> Result<Self, ConfigError> {
        let token = token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingToken)?;
        let chat_id = chat_id
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(ConfigError::MissingChatId)?;

        let creds = Self { token, chat_id };
        creds.validate()?;
        Ok(creds)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.len() < 10 || !self.token.contains(':') {
            return Err(ConfigError::MalformedToken);
        }
        let digits = self.chat_id.strip_prefix('-').unwrap_or(&self.chat_id);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(ConfigError::MalformedChatId(self.chat_id.clone()));
        }
        Ok(())
    }
}
