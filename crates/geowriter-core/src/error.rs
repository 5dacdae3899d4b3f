//! Error types for export operations.
//!
//! Every failure the writer can report maps onto one [`ErrorKind`]. The
//! [`WriterError`] variants carry the human-readable message that callers show
//! to users; driver diagnostics are embedded in that message.

use std::fmt;

use thiserror::Error;

/// Category of an export failure.
///
/// [`ErrorKind::None`] describes a session that is ready to accept features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No error
    None,
    /// The source layer is missing or invalid
    InvalidLayer,
    /// The requested output driver does not exist
    DriverNotFound,
    /// The output dataset could not be created
    CreateDataSource,
    /// The output layer could not be created
    CreateLayer,
    /// A field type has no equivalent in the output format
    AttributeTypeUnsupported,
    /// An output field could not be created or located
    AttributeCreationFailed,
    /// One or more features could not be written
    FeatureWriteFailed,
    /// A coordinate transform failed
    Projection,
}

impl ErrorKind {
    /// Returns the name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorKind::None => "NoError",
            ErrorKind::InvalidLayer => "ErrInvalidLayer",
            ErrorKind::DriverNotFound => "ErrDriverNotFound",
            ErrorKind::CreateDataSource => "ErrCreateDataSource",
            ErrorKind::CreateLayer => "ErrCreateLayer",
            ErrorKind::AttributeTypeUnsupported => "ErrAttributeTypeUnsupported",
            ErrorKind::AttributeCreationFailed => "ErrAttributeCreationFailed",
            ErrorKind::FeatureWriteFailed => "ErrFeatureWriteFailed",
            ErrorKind::Projection => "ErrProjection",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for export operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WriterError {
    /// The source layer is missing or invalid
    #[error("{message}")]
    InvalidLayer {
        /// Description of the problem
        message: String,
    },

    /// The requested output driver does not exist
    #[error("{message}")]
    DriverNotFound {
        /// Description including the driver diagnostic
        message: String,
    },

    /// The output dataset could not be created
    #[error("{message}")]
    CreateDataSource {
        /// Description including the driver diagnostic
        message: String,
    },

    /// The output layer could not be created
    #[error("{message}")]
    CreateLayer {
        /// Description including the driver diagnostic
        message: String,
    },

    /// A field type has no equivalent in the output format
    #[error("{message}")]
    AttributeTypeUnsupported {
        /// Description naming the field
        message: String,
    },

    /// An output field could not be created or located
    #[error("{message}")]
    AttributeCreationFailed {
        /// Description naming the field
        message: String,
    },

    /// One or more features could not be written
    #[error("{message}")]
    FeatureWriteFailed {
        /// Accumulated per-feature diagnostics
        message: String,
    },

    /// A coordinate transform failed
    #[error("{message}")]
    Projection {
        /// Description naming the feature
        message: String,
    },
}

/// Type alias for Results using `WriterError`.
pub type Result<T> = std::result::Result<T, WriterError>;

impl WriterError {
    /// Builds an error of `kind` carrying `message`.
    ///
    /// Returns `None` for [`ErrorKind::None`].
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Option<Self> {
        let message = message.into();
        let error = match kind {
            ErrorKind::None => return None,
            ErrorKind::InvalidLayer => Self::InvalidLayer { message },
            ErrorKind::DriverNotFound => Self::DriverNotFound { message },
            ErrorKind::CreateDataSource => Self::CreateDataSource { message },
            ErrorKind::CreateLayer => Self::CreateLayer { message },
            ErrorKind::AttributeTypeUnsupported => Self::AttributeTypeUnsupported { message },
            ErrorKind::AttributeCreationFailed => Self::AttributeCreationFailed { message },
            ErrorKind::FeatureWriteFailed => Self::FeatureWriteFailed { message },
            ErrorKind::Projection => Self::Projection { message },
        };
        Some(error)
    }

    /// Category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidLayer { .. } => ErrorKind::InvalidLayer,
            Self::DriverNotFound { .. } => ErrorKind::DriverNotFound,
            Self::CreateDataSource { .. } => ErrorKind::CreateDataSource,
            Self::CreateLayer { .. } => ErrorKind::CreateLayer,
            Self::AttributeTypeUnsupported { .. } => ErrorKind::AttributeTypeUnsupported,
            Self::AttributeCreationFailed { .. } => ErrorKind::AttributeCreationFailed,
            Self::FeatureWriteFailed { .. } => ErrorKind::FeatureWriteFailed,
            Self::Projection { .. } => ErrorKind::Projection,
        }
    }

    /// The carried message.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidLayer { message }
            | Self::DriverNotFound { message }
            | Self::CreateDataSource { message }
            | Self::CreateLayer { message }
            | Self::AttributeTypeUnsupported { message }
            | Self::AttributeCreationFailed { message }
            | Self::FeatureWriteFailed { message }
            | Self::Projection { message } => message,
        }
    }

    /// Get a user-friendly error message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::FeatureWriteFailed { message } => {
                format!("Export finished with errors.\n{}", message.trim_start())
            },
            Self::Projection { message } => format!("Reprojection failed: {message}"),
            _ => self.to_string(),
        }
    }

    /// Get recovery suggestions if available.
    #[must_use]
    pub fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::DriverNotFound { .. } => {
                Some("Run 'geowriter drivers' to see all known formats.".to_string())
            },
            Self::CreateDataSource { .. } => Some(
                "Check that the output directory exists, is writable and is not the source file."
                    .to_string(),
            ),
            Self::AttributeTypeUnsupported { .. } => Some(
                "Exclude the field or convert it with a field value converter.".to_string(),
            ),
            Self::Projection { .. } => {
                Some("Check that the destination CRS covers the layer extent.".to_string())
            },
            _ => None,
        }
    }
}
