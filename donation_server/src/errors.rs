use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use donation_engine::ReconciliationError;
use log::error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Invalid request. {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Payment signature verification failed")]
    InvalidPaymentSignature,
    #[error("No webhook signature was provided")]
    MissingWebhookSignature,
    #[error("Invalid webhook signature")]
    InvalidWebhookSignature,
    #[error("{0}")]
    OrderMismatch(String),
    #[error("{0}")]
    InvalidReferralCode(String),
    #[error("{0}")]
    DonationNotSuccessful(String),
    #[error("The payment gateway could not complete the request. {0}")]
    GatewayError(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidPaymentSignature => StatusCode::BAD_REQUEST,
            Self::MissingWebhookSignature => StatusCode::BAD_REQUEST,
            Self::InvalidWebhookSignature => StatusCode::UNAUTHORIZED,
            Self::OrderMismatch(_) => StatusCode::BAD_REQUEST,
            Self::InvalidReferralCode(_) => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::DonationNotSuccessful(_) => StatusCode::CONFLICT,
            Self::GatewayError(_) => StatusCode::BAD_GATEWAY,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<ReconciliationError> for ServerError {
    fn from(e: ReconciliationError) -> Self {
        match e {
            ReconciliationError::InvalidRequest(s) => Self::InvalidRequestBody(s),
            ReconciliationError::InvalidSignature => Self::InvalidPaymentSignature,
            ReconciliationError::MissingWebhookSignature => Self::MissingWebhookSignature,
            ReconciliationError::InvalidWebhookSignature => Self::InvalidWebhookSignature,
            ReconciliationError::DonationNotFound(_) => Self::NoRecordFound(e.to_string()),
            ReconciliationError::ProgramNotFound(_) => Self::NoRecordFound(e.to_string()),
            ReconciliationError::OrderMismatch { .. } => Self::OrderMismatch(e.to_string()),
            ReconciliationError::DonationNotSuccessful { .. } => Self::DonationNotSuccessful(e.to_string()),
            ReconciliationError::InvalidReferralCode(_) => Self::InvalidReferralCode(e.to_string()),
            ReconciliationError::GatewayError(e) => {
                error!("💻️ Payment gateway error. {e}");
                Self::GatewayError(e.to_string())
            },
            ReconciliationError::DatabaseError(s) => {
                error!("💻️ Database error. {s}");
                Self::BackendError(s)
            },
        }
    }
}
