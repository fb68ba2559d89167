//! Error types for the SOAP server.
//!
//! Two disjoint families: [`SoapFault`] is a caller-input problem that is
//! answered with a SOAP Fault inside a normal envelope, [`ServerError`] is a
//! routing or transport problem answered with a plain-text HTTP error.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fault codes for service-facing faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaultCode {
    /// The Body carried no operation element
    OperationNotSpecified,
    /// A required input was not present in the request
    MissingRequiredInput,
    /// An input could not be cast to its declared type
    InvalidInputType,
    /// The requested operation is not registered on the service
    OperationNotFound,
    /// Raised by the operation itself (usually one of its declared faults)
    OperationFault,
}

impl FaultCode {
    /// Get the string code for this fault.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OperationNotSpecified => "OPERATION_NOT_SPECIFIED",
            Self::MissingRequiredInput => "MISSING_REQUIRED_INPUT",
            Self::InvalidInputType => "INVALID_INPUT_TYPE",
            Self::OperationNotFound => "OPERATION_NOT_FOUND",
            Self::OperationFault => "OPERATION_FAULT",
        }
    }

    /// Element name used in the fault `detail` when no fault name is given.
    pub fn detail_name(&self) -> &'static str {
        match self {
            Self::OperationNotSpecified => "OperationNotSpecified",
            Self::MissingRequiredInput => "MissingRequiredInput",
            Self::InvalidInputType => "InvalidInputType",
            Self::OperationNotFound => "OperationNotFound",
            Self::OperationFault => "OperationFault",
        }
    }
}

/// A service fault, reported to the caller as a SOAP Fault element.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("[{}] {message}", code.as_str())]
pub struct SoapFault {
    /// Fault code
    pub code: FaultCode,
    /// Human-readable fault string
    pub message: String,
    /// Declared fault name rendered into `detail` (if any)
    pub fault_name: Option<String>,
}

impl SoapFault {
    /// Create a fault with a built-in code.
    pub fn new(code: FaultCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            fault_name: None,
        }
    }

    /// Create a fault raised by an operation under one of its declared fault names.
    pub fn declared(fault_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: FaultCode::OperationFault,
            message: message.into(),
            fault_name: Some(fault_name.into()),
        }
    }

    pub fn operation_not_specified() -> Self {
        Self::new(FaultCode::OperationNotSpecified, "Operation not specified")
    }

    pub fn operation_not_found(operation: &str) -> Self {
        Self::new(
            FaultCode::OperationNotFound,
            format!("Operation [{}] not found", operation),
        )
    }

    pub fn missing_required_input(input: &str) -> Self {
        Self::new(
            FaultCode::MissingRequiredInput,
            format!("Missing required input [{}]", input),
        )
    }

    pub fn invalid_input_type(path: &str, found: &str, expected: &str) -> Self {
        Self::new(
            FaultCode::InvalidInputType,
            format!("Invalid input [{}] type {}, expected {}", path, found, expected),
        )
    }

    /// Name of the element placed inside the fault `detail`.
    pub fn detail_name(&self) -> &str {
        self.fault_name
            .as_deref()
            .unwrap_or_else(|| self.code.detail_name())
    }
}

/// Server-facing errors, reported as plain-text HTTP errors.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Path [{0}] not found")]
    FileNotFound(String),

    #[error("Service [{0}] not found")]
    ServiceNotFound(String),

    #[error("No query string supplied")]
    MissingRequest,

    #[error("Unsupported query [{0}]")]
    UnsupportedQuery(String),

    #[error("Could not determine envelope/body format: {0}")]
    MalformedEnvelope(String),

    #[error("XML parsing error: {0}")]
    XmlParse(String),

    #[error("Request body size {size} exceeds maximum {max}")]
    BodyTooLarge { size: usize, max: usize },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Get the string type for this error.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FileNotFound(_) => "FILE_NOT_FOUND",
            Self::ServiceNotFound(_) => "SERVICE_NOT_FOUND",
            Self::MissingRequest => "MISSING_REQUEST",
            Self::UnsupportedQuery(_) => "UNSUPPORTED_QUERY",
            Self::MalformedEnvelope(_) => "MALFORMED_ENVELOPE",
            Self::XmlParse(_) => "XML_PARSE",
            Self::BodyTooLarge { .. } => "BODY_TOO_LARGE",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// HTTP status used when reporting this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::FileNotFound(_) | Self::ServiceNotFound(_) => 404,
            Self::BodyTooLarge { .. } => 413,
            _ => 500,
        }
    }
}

/// Outcome of a failed dispatch: either a SOAP fault or a server error.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Service(#[from] SoapFault),

    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Render a SOAP 1.1 style Fault element at the given indent level.
pub fn soap_fault_fragment(fault: &SoapFault, indent_level: usize) -> String {
    let indent = "\t".repeat(indent_level);
    let detail = xml_escape(fault.detail_name());

    format!(
        "{indent}<soap:Fault>\n\
         {indent}\t<soap:faultcode>{code}</soap:faultcode>\n\
         {indent}\t<soap:faultstring>{message}</soap:faultstring>\n\
         {indent}\t<detail>\n\
         {indent}\t\t<{detail}></{detail}>\n\
         {indent}\t</detail>\n\
         {indent}</soap:Fault>\n",
        code = fault.code.as_str(),
        message = xml_escape(&fault.message),
    )
}

pub(crate) fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
