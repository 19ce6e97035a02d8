use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("capacity exceeded: at most {limit} {what} allowed")]
    CapacityExceeded { what: &'static str, limit: usize },
    #[error("duplicate entry: {0}")]
    Duplicate(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("external fetch failed: {0}")]
    ExternalFetch(String),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("forbidden: {message}")]
    Forbidden { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The command could not be processed. Check the arguments and try again."
            }
            Self::Forbidden { .. } => "You or the bot lack the permissions needed for this action.",
            Self::ServiceUnavailable { .. } => {
                "The data source is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    /// Detail that is safe to echo back to the invoking user.
    pub fn detail(&self) -> &str {
        match self {
            Self::BadRequest { message, .. } | Self::Forbidden { message, .. } => message,
            Self::ServiceUnavailable { .. } | Self::Internal { .. } => self.user_message(),
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::Forbidden { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Forbidden { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(error) => {
                let message = match error {
                    DomainError::InvalidArgument(message) | DomainError::Duplicate(message) => {
                        message
                    }
                    capacity @ DomainError::CapacityExceeded { .. } => capacity.to_string(),
                };
                Self::BadRequest { message, correlation_id }
            }
            ApplicationError::NotFound(message) => Self::BadRequest { message, correlation_id },
            ApplicationError::PermissionDenied(message) => {
                Self::Forbidden { message, correlation_id }
            }
            ApplicationError::Persistence(message) | ApplicationError::ExternalFetch(message) => {
                Self::ServiceUnavailable { message, correlation_id }
            }
            ApplicationError::Configuration(message) => Self::Internal { message, correlation_id },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ApplicationError, DomainError, InterfaceError};

    #[test]
    fn domain_error_maps_to_bad_request_interface_error() {
        let interface =
            ApplicationError::from(DomainError::InvalidArgument("level must be >= 0".to_owned()))
                .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest {
                ref correlation_id,
                ..
            } if correlation_id == "req-1"
        ));
        assert_eq!(interface.detail(), "level must be >= 0");
    }

    #[test]
    fn capacity_error_keeps_limit_in_detail() {
        let interface = ApplicationError::from(DomainError::CapacityExceeded {
            what: "watchlist entries",
            limit: 10,
        })
        .into_interface("req-2");

        assert_eq!(interface.detail(), "capacity exceeded: at most 10 watchlist entries allowed");
    }

    #[test]
    fn permission_denied_maps_to_forbidden() {
        let interface = ApplicationError::PermissionDenied("target outranks moderator".to_owned())
            .into_interface("req-3");

        assert!(matches!(interface, InterfaceError::Forbidden { .. }));
        assert_eq!(interface.correlation_id(), "req-3");
    }

    #[test]
    fn fetch_and_persistence_errors_hide_internal_detail() {
        let interface = ApplicationError::ExternalFetch("connect timeout to 10.0.0.1".to_owned())
            .into_interface("req-4");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(
            interface.detail(),
            "The data source is temporarily unavailable. Please retry shortly."
        );

        let interface =
            ApplicationError::Persistence("database is locked".to_owned()).into_interface("req-5");
        assert!(!interface.detail().contains("locked"));
    }

    #[test]
    fn configuration_error_maps_to_internal() {
        let interface =
            ApplicationError::Configuration("missing bot token".to_owned()).into_interface("req-6");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }
}
