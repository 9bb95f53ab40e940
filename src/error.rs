//! Error types for provider operations
//!
//! Every provider surfaces the same [`ProviderError`] so callers can tell
//! transport failures, remote API errors, authentication problems and
//! unsupported operations apart without knowing which backend they talk to.

use std::fmt;

/// Result type alias for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Coarse classification of a [`ProviderError`], looking through any
/// operation context that was added on the way up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Api,
    Auth,
    NotImplemented,
    Parse,
    InvalidInput,
    Config,
}

/// Errors that can occur while talking to a monitoring backend
#[derive(Debug)]
pub enum ProviderError {
    /// HTTP/UDP level failure (connection refused, timeout, DNS, non-2xx status)
    Transport(String),

    /// The remote system answered with a structured error
    Api {
        system: &'static str,
        code: i64,
        message: String,
        data: String,
    },

    /// Session could not be established or was rejected
    Auth(String),

    /// The backend does not support this operation
    NotImplemented {
        provider: &'static str,
        operation: &'static str,
    },

    /// The remote system answered with an unexpected shape
    Parse(String),

    /// The caller passed something the backend cannot work with
    InvalidInput(String),

    /// The provider configuration is unusable
    Config(String),

    /// Another error, wrapped with the operation that produced it
    Context {
        context: String,
        source: Box<ProviderError>,
    },
}

impl ProviderError {
    pub fn not_implemented(provider: &'static str, operation: &'static str) -> Self {
        ProviderError::NotImplemented {
            provider,
            operation,
        }
    }

    /// Kind of the innermost error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProviderError::Transport(_) => ErrorKind::Transport,
            ProviderError::Api { .. } => ErrorKind::Api,
            ProviderError::Auth(_) => ErrorKind::Auth,
            ProviderError::NotImplemented { .. } => ErrorKind::NotImplemented,
            ProviderError::Parse(_) => ErrorKind::Parse,
            ProviderError::InvalidInput(_) => ErrorKind::InvalidInput,
            ProviderError::Config(_) => ErrorKind::Config,
            ProviderError::Context { source, .. } => source.kind(),
        }
    }

    /// The innermost error, with all operation context stripped.
    pub fn root(&self) -> &ProviderError {
        match self {
            ProviderError::Context { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_not_implemented(&self) -> bool {
        self.kind() == ErrorKind::NotImplemented
    }

    /// `data` field of the innermost API error, if there is one.
    pub fn api_data(&self) -> Option<&str> {
        match self.root() {
            ProviderError::Api { data, .. } => Some(data),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Transport(msg) => write!(f, "transport error: {}", msg),
            ProviderError::Api {
                system,
                message,
                data,
                ..
            } => write!(f, "{} API error: {} - {}", system, message, data),
            ProviderError::Auth(msg) => write!(f, "authentication failed: {}", msg),
            ProviderError::NotImplemented {
                provider,
                operation,
            } => write!(f, "{}: {} not implemented yet", provider, operation),
            ProviderError::Parse(msg) => write!(f, "unexpected response: {}", msg),
            ProviderError::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
            ProviderError::Config(msg) => write!(f, "invalid provider configuration: {}", msg),
            ProviderError::Context { context, source } => write!(f, "{}: {}", context, source),
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProviderError::Context { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::Parse(err.to_string())
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Parse(err.to_string())
    }
}

impl From<async_snmp::Error> for ProviderError {
    fn from(err: async_snmp::Error) -> Self {
        ProviderError::Transport(format!("SNMP: {}", err))
    }
}

impl From<Box<async_snmp::Error>> for ProviderError {
    fn from(err: Box<async_snmp::Error>) -> Self {
        ProviderError::from(*err)
    }
}

/// Adds operation context to provider results, e.g. `"failed to create host"`.
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> ProviderResult<T>;
}

impl<T> ResultExt<T> for ProviderResult<T> {
    fn context(self, context: impl Into<String>) -> ProviderResult<T> {
        self.map_err(|source| ProviderError::Context {
            context: context.into(),
            source: Box::new(source),
        })
    }
}
