use crate::query::QueryError;

/// Errors that can occur in the data layer.
#[derive(Debug)]
pub enum DataError {
    /// The repository's entity declaration is malformed, or no manager is
    /// registered for it.
    Configuration(String),
    /// The engine rejected a query (unknown field, bad identifier arity, ...).
    Query(QueryError),
    /// A dynamic finder was called that the engine does not recognise.
    MethodNotSupported { entity: String, method: String },
    /// A result row could not be hydrated into the entity.
    Mapping(String),
    /// Driver failure.
    Database(Box<dyn std::error::Error + Send + Sync>),
}

impl DataError {
    /// Construct a `Database` variant from any error type.
    ///
    /// Used by engine crates (e.g. `repowire-data-sqlx`) to wrap
    /// driver-specific errors.
    pub fn database(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        DataError::Database(Box::new(err))
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        DataError::Configuration(msg.into())
    }

    pub fn method_not_supported(entity: &str, method: &str) -> Self {
        DataError::MethodNotSupported {
            entity: entity.to_string(),
            method: method.to_string(),
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, DataError::Configuration(_))
    }
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::Configuration(msg) => write!(f, "Repository configuration error: {msg}"),
            DataError::Query(err) => write!(f, "Query error: {err}"),
            DataError::MethodNotSupported { entity, method } => {
                write!(f, "Method '{method}' is not supported by the repository of '{entity}'")
            }
            DataError::Mapping(msg) => write!(f, "Mapping error: {msg}"),
            DataError::Database(err) => write!(f, "Database error: {err}"),
        }
    }
}

impl std::error::Error for DataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DataError::Query(err) => Some(err),
            DataError::Database(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<QueryError> for DataError {
    fn from(err: QueryError) -> Self {
        DataError::Query(err)
    }
}
