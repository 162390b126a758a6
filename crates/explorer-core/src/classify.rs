// # Error Classification
//
// Maps any failure into a closed set of user-facing kinds, each with a fixed
// localized message and a retryable flag.
//
// ## Precedence
//
// 1. Validation failures are classified by field, regardless of connectivity
// 2. Offline detection wins over everything else
// 3. HTTP status codes (400, 403, 429, 5xx, other)
// 4. Timeouts
// 5. Everything else falls back to NETWORK_ERROR

use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

use crate::config::Locale;
use crate::error::{Error, TransportError};

/// User-facing error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NetworkOffline,
    BadRequest,
    ApiKeyInvalid,
    RateLimit,
    ServerError,
    HttpError,
    Timeout,
    NetworkError,
    ValidationDate,
    ValidationSol,
    ValidationPhotoCount,
    ValidationGeneric,
}

impl ErrorKind {
    /// Stable error code (e.g. "RATE_LIMIT")
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::NetworkOffline => "NETWORK_OFFLINE",
            ErrorKind::BadRequest => "BAD_REQUEST",
            ErrorKind::ApiKeyInvalid => "API_KEY_INVALID",
            ErrorKind::RateLimit => "RATE_LIMIT",
            ErrorKind::ServerError => "SERVER_ERROR",
            ErrorKind::HttpError => "HTTP_ERROR",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::NetworkError => "NETWORK_ERROR",
            ErrorKind::ValidationDate => "VALIDATION_DATE",
            ErrorKind::ValidationSol => "VALIDATION_SOL",
            ErrorKind::ValidationPhotoCount => "VALIDATION_PHOTO_COUNT",
            ErrorKind::ValidationGeneric => "VALIDATION_GENERIC",
        }
    }

    /// Whether re-issuing the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::RateLimit
                | ErrorKind::ServerError
                | ErrorKind::HttpError
                | ErrorKind::Timeout
                | ErrorKind::NetworkError
        )
    }

    /// Whether this is a client-side validation failure
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ErrorKind::ValidationDate
                | ErrorKind::ValidationSol
                | ErrorKind::ValidationPhotoCount
                | ErrorKind::ValidationGeneric
        )
    }

    /// Kinds worth retrying automatically: throttling, server faults, timeouts
    pub fn is_transient(&self) -> bool {
        matches!(self, ErrorKind::RateLimit | ErrorKind::ServerError | ErrorKind::Timeout)
    }

    /// Fixed message for kinds whose text does not depend on the failure
    fn fixed_message(&self, locale: Locale) -> Option<&'static str> {
        let (en, pt) = match self {
            ErrorKind::NetworkOffline => (
                "You are offline. Check your internet connection.",
                "Você está offline. Verifique sua conexão com a internet.",
            ),
            ErrorKind::BadRequest => (
                "Invalid request parameters.",
                "Parâmetros inválidos na requisição.",
            ),
            ErrorKind::ApiKeyInvalid => (
                "Invalid API key. Check the configuration.",
                "Chave da API inválida. Verifique a configuração.",
            ),
            ErrorKind::RateLimit => (
                "Too many requests. Wait a few seconds before trying again.",
                "Muitas requisições. Aguarde alguns segundos antes de tentar novamente.",
            ),
            ErrorKind::ServerError => (
                "NASA server error. Try again in a few minutes.",
                "Erro no servidor da NASA. Tente novamente em alguns minutos.",
            ),
            ErrorKind::Timeout => (
                "The request took too long to respond. Try again.",
                "A requisição demorou muito para responder. Tente novamente.",
            ),
            ErrorKind::NetworkError => (
                "Connection error. Check your internet and try again.",
                "Erro de conexão. Verifique sua internet e tente novamente.",
            ),
            ErrorKind::ValidationDate => (
                "Invalid date. Choose a date between 06/16/1995 and today.",
                "Data inválida. Selecione uma data entre 16/06/1995 e hoje.",
            ),
            ErrorKind::ValidationSol => (
                "Invalid sol. Enter a value between 1 and 4000.",
                "Sol inválido. Digite um valor entre 1 e 4000.",
            ),
            ErrorKind::ValidationPhotoCount => (
                "Invalid photo count. Enter a value between 1 and 50.",
                "Número de fotos inválido. Digite um valor entre 1 e 50.",
            ),
            ErrorKind::HttpError | ErrorKind::ValidationGeneric => return None,
        };
        Some(match locale {
            Locale::En => en,
            Locale::PtBr => pt,
        })
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// A failure mapped to a user-facing category
///
/// Transient: constructed per failed operation and never persisted.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("{message}")]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
    /// Diagnostic details (status, url, value, ...)
    pub context: BTreeMap<String, Value>,
}

impl ClassifiedError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: kind.is_retryable(),
            context: BTreeMap::new(),
        }
    }

    fn with_context(mut self, key: &str, value: Value) -> Self {
        self.context.insert(key.to_string(), value);
        self
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Log the error with its code, retryable flag and context
    pub fn log(&self, operation: &str) {
        let context = self.context_json();
        tracing::warn!(
            operation,
            code = self.code(),
            retryable = self.retryable,
            context = %context,
            "{}",
            self.message
        );
    }

    /// Context rendered as a JSON object
    pub fn context_json(&self) -> Value {
        Value::Object(self.context.clone().into_iter().collect())
    }
}

/// Source of the "are we online" signal
///
/// Offline detection takes precedence over every other classification.
pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Connectivity probe for hosts without an offline signal
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeOnline;

impl Connectivity for AssumeOnline {
    fn is_online(&self) -> bool {
        true
    }
}

/// Connectivity flag toggled by the host application
#[derive(Debug)]
pub struct ManualConnectivity {
    online: AtomicBool,
}

impl ManualConnectivity {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

impl Default for ManualConnectivity {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Connectivity for ManualConnectivity {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

/// Maps failures into [`ClassifiedError`]s
#[derive(Clone)]
pub struct ErrorClassifier {
    locale: Locale,
    connectivity: Arc<dyn Connectivity>,
}

impl std::fmt::Debug for ErrorClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorClassifier")
            .field("locale", &self.locale)
            .field("online", &self.connectivity.is_online())
            .finish()
    }
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new(Locale::default())
    }
}

impl ErrorClassifier {
    /// Create a classifier that assumes the host is online
    pub fn new(locale: Locale) -> Self {
        Self {
            locale,
            connectivity: Arc::new(AssumeOnline),
        }
    }

    /// Use a custom connectivity probe
    pub fn with_connectivity(mut self, connectivity: Arc<dyn Connectivity>) -> Self {
        self.connectivity = connectivity;
        self
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Classify any explorer error
    pub fn classify(&self, error: &Error) -> ClassifiedError {
        if let Error::Validation { field, value } = error {
            return self.validation(field, value);
        }

        if !self.connectivity.is_online() {
            return self.fixed(ErrorKind::NetworkOffline);
        }

        match error {
            Error::Transport(transport) => self.classify_transport(transport),
            other => self
                .fixed(ErrorKind::NetworkError)
                .with_context("original_error", json!(other.to_string())),
        }
    }

    fn classify_transport(&self, error: &TransportError) -> ClassifiedError {
        match error {
            TransportError::Status {
                status,
                reason,
                url,
            } => {
                let classified = match *status {
                    400 => self.fixed(ErrorKind::BadRequest),
                    403 => self.fixed(ErrorKind::ApiKeyInvalid),
                    429 => self.fixed(ErrorKind::RateLimit),
                    500..=599 => self.fixed(ErrorKind::ServerError),
                    _ => {
                        let message = match self.locale {
                            Locale::En => format!("HTTP error {}: {}", status, reason),
                            Locale::PtBr => format!("Erro HTTP {}: {}", status, reason),
                        };
                        ClassifiedError::new(ErrorKind::HttpError, message)
                    }
                };
                classified
                    .with_context("status", json!(status))
                    .with_context("url", json!(url))
            }
            TransportError::Timeout { timeout_secs } => self
                .fixed(ErrorKind::Timeout)
                .with_context("timeout_secs", json!(timeout_secs)),
            TransportError::Connect(message)
            | TransportError::Decode(message)
            | TransportError::Request(message) => self
                .fixed(ErrorKind::NetworkError)
                .with_context("original_error", json!(message)),
        }
    }

    /// Classify a validation failure by field name
    pub fn validation(&self, field: &str, value: impl std::fmt::Display) -> ClassifiedError {
        let value = value.to_string();
        let kind = match field {
            "date" => ErrorKind::ValidationDate,
            "sol" => ErrorKind::ValidationSol,
            "photo_count" => ErrorKind::ValidationPhotoCount,
            _ => {
                let message = match self.locale {
                    Locale::En => format!("Invalid value for {}: {}", field, value),
                    Locale::PtBr => format!("Valor inválido para {}: {}", field, value),
                };
                return ClassifiedError::new(ErrorKind::ValidationGeneric, message)
                    .with_context("field", json!(field))
                    .with_context("value", json!(value));
            }
        };
        self.fixed(kind).with_context("value", json!(value))
    }

    fn fixed(&self, kind: ErrorKind) -> ClassifiedError {
        let message = kind.fixed_message(self.locale).unwrap_or(kind.code());
        ClassifiedError::new(kind, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> Error {
        Error::http_status(code, "", "https://api.nasa.gov/planetary/apod")
    }

    #[test]
    fn rate_limit_is_retryable() {
        let classified = ErrorClassifier::default().classify(&status(429));
        assert_eq!(classified.kind, ErrorKind::RateLimit);
        assert!(classified.retryable);
        assert_eq!(classified.context["status"], json!(429));
    }

    #[test]
    fn forbidden_is_invalid_api_key() {
        let classified = ErrorClassifier::default().classify(&status(403));
        assert_eq!(classified.code(), "API_KEY_INVALID");
        assert!(!classified.retryable);
    }

    #[test]
    fn status_mapping() {
        let classifier = ErrorClassifier::default();
        assert_eq!(classifier.classify(&status(400)).kind, ErrorKind::BadRequest);
        assert!(!classifier.classify(&status(400)).retryable);
        for code in [500, 502, 503, 504] {
            assert_eq!(classifier.classify(&status(code)).kind, ErrorKind::ServerError);
        }

        let not_found = classifier.classify(&Error::http_status(404, "Not Found", "/x"));
        assert_eq!(not_found.kind, ErrorKind::HttpError);
        assert!(not_found.retryable);
        assert_eq!(not_found.message, "HTTP error 404: Not Found");
    }

    #[test]
    fn timeout_and_fallback() {
        let classifier = ErrorClassifier::default();
        let timeout = classifier.classify(&TransportError::Timeout { timeout_secs: Some(30) }.into());
        assert_eq!(timeout.kind, ErrorKind::Timeout);
        assert!(timeout.retryable);
        assert_eq!(timeout.context["timeout_secs"], json!(30));

        let refused = classifier.classify(&TransportError::Connect("refused".into()).into());
        assert_eq!(refused.kind, ErrorKind::NetworkError);
        assert_eq!(refused.context["original_error"], json!("refused"));

        let other = classifier.classify(&Error::other("boom"));
        assert_eq!(other.kind, ErrorKind::NetworkError);
        assert!(other.retryable);
    }

    #[test]
    fn offline_takes_precedence() {
        let connectivity = Arc::new(ManualConnectivity::new(false));
        let classifier = ErrorClassifier::default().with_connectivity(connectivity.clone());

        for error in [status(429), status(500), TransportError::Timeout { timeout_secs: None }.into()] {
            let classified = classifier.classify(&error);
            assert_eq!(classified.kind, ErrorKind::NetworkOffline);
            assert!(!classified.retryable);
        }

        connectivity.set_online(true);
        assert_eq!(classifier.classify(&status(429)).kind, ErrorKind::RateLimit);
    }

    #[test]
    fn validation_by_field() {
        let classifier = ErrorClassifier::default();
        assert_eq!(classifier.validation("date", "1990-01-01").kind, ErrorKind::ValidationDate);
        assert_eq!(classifier.validation("sol", 5000).kind, ErrorKind::ValidationSol);
        assert_eq!(classifier.validation("photo_count", 51).kind, ErrorKind::ValidationPhotoCount);

        let generic = classifier.validation("camera", "XYZ");
        assert_eq!(generic.kind, ErrorKind::ValidationGeneric);
        assert_eq!(generic.message, "Invalid value for camera: XYZ");
        assert!(!generic.retryable);

        let from_error = classifier.classify(&Error::validation("sol", 0));
        assert_eq!(from_error.kind, ErrorKind::ValidationSol);
        assert_eq!(from_error.context["value"], json!("0"));
    }

    #[test]
    fn portuguese_messages() {
        let classifier = ErrorClassifier::new(Locale::PtBr);
        assert_eq!(
            classifier.classify(&status(403)).message,
            "Chave da API inválida. Verifique a configuração."
        );
        assert_eq!(
            classifier.classify(&Error::http_status(418, "I'm a teapot", "/x")).message,
            "Erro HTTP 418: I'm a teapot"
        );
    }

    #[test]
    fn log_renders_context() {
        let classified = ErrorClassifier::default().classify(&status(429));
        assert_eq!(
            classified.context_json(),
            json!({"status": 429, "url": "https://api.nasa.gov/planetary/apod"})
        );
        classified.log("apod");

        let rejected = ErrorClassifier::default().validation("sol", 0);
        rejected.log("marsRoverPhotos");
        assert_eq!(rejected.context_json(), json!({"value": "0"}));
    }

    #[test]
    fn codes_serialize_screaming_snake() {
        assert_eq!(serde_json::to_value(ErrorKind::ValidationPhotoCount).unwrap(), json!("VALIDATION_PHOTO_COUNT"));
        for kind in [ErrorKind::RateLimit, ErrorKind::ApiKeyInvalid, ErrorKind::NetworkOffline] {
            assert_eq!(serde_json::to_value(kind).unwrap(), json!(kind.code()));
        }
    }
}
