//! Error types for the dispatch core.

/// Result type alias used throughout the dispatch core.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure modes of the request-dispatch pipeline.
///
/// Every variant here corresponds to one of the error classes in the dispatch
/// design: the core never lets these escape as a transport failure to its
/// caller, it always maps them to a structured envelope at the HTTP boundary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The project is configured with `mode = disabled`.
    #[error("project disabled: {message}")]
    Disabled {
        /// Human-readable detail.
        message: String,
    },

    /// Invalid project mode, or a proxy/forwarder mode with no target configured.
    #[error("dispatch error: {message}")]
    Dispatch {
        /// Human-readable detail.
        message: String,
    },

    /// A request carrying a loop-detection header reached the forwarder.
    #[error("proxy loop detected: {message}")]
    LoopDetected {
        /// Human-readable detail.
        message: String,
    },

    /// The upstream target URL, request, or response could not be built/read.
    #[error("proxy error: {message}")]
    Proxy {
        /// Human-readable detail.
        message: String,
    },

    /// Configuration could not be parsed or loaded.
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable detail.
        message: String,
    },

    /// Underlying I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Underlying JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Underlying HTTP client failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Underlying URL parse failure.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Catch-all for conditions that don't warrant a dedicated variant.
    #[error("error: {0}")]
    Generic(String),
}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Self::Generic(message)
    }
}

impl Error {
    /// Build a [`Error::Disabled`].
    pub fn disabled<S: Into<String>>(message: S) -> Self {
        Self::Disabled { message: message.into() }
    }

    /// Build a [`Error::Dispatch`].
    pub fn dispatch<S: Into<String>>(message: S) -> Self {
        Self::Dispatch { message: message.into() }
    }

    /// Build a [`Error::LoopDetected`].
    pub fn loop_detected<S: Into<String>>(message: S) -> Self {
        Self::LoopDetected { message: message.into() }
    }

    /// Build a [`Error::Proxy`].
    pub fn proxy<S: Into<String>>(message: S) -> Self {
        Self::Proxy { message: message.into() }
    }

    /// Build a [`Error::Config`].
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into() }
    }

    /// Build a [`Error::Generic`].
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }
}
