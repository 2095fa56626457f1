use crate::http::TransportError;

/// Failure of an authenticated CRM call
#[derive(Debug, thiserror::Error)]
pub enum CrmError {
    /// Credentials rejected, token refresh refused, or a 401 survived a
    /// refresh. Fatal to the run.
    #[error("authentication failed: {0}")]
    Auth(String),
    /// Any other non-2xx answer
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },
    /// A 2xx answer whose body is not the expected structure
    #[error("invalid response data: {0}")]
    Data(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl CrmError {
    /// Whether this error must stop the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}
