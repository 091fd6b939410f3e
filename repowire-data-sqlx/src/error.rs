use repowire_data::DataError;

/// Extension trait for converting `sqlx::Error` into `DataError`.
///
/// Due to Rust's orphan rules, we can't implement `From<sqlx::Error> for DataError`
/// in this crate. Use `.into_data_error()` instead.
pub trait SqlxErrorExt {
    fn into_data_error(self) -> DataError;
}

impl SqlxErrorExt for sqlx::Error {
    fn into_data_error(self) -> DataError {
        match &self {
            sqlx::Error::ColumnNotFound(column) => {
                DataError::Mapping(format!("column '{column}' is missing from the result row"))
            }
            sqlx::Error::ColumnIndexOutOfBounds { .. }
            | sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::Decode(_) => DataError::Mapping(self.to_string()),
            _ => DataError::database(self),
        }
    }
}

/// Convenience alias for data-layer results using `DataError`.
pub type SqlxResult<T> = Result<T, DataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_failures_are_mapping_errors() {
        let err = sqlx::Error::ColumnNotFound("name".into()).into_data_error();
        assert!(matches!(err, DataError::Mapping(msg) if msg.contains("name")));
    }

    #[test]
    fn driver_failures_keep_their_source() {
        let err = sqlx::Error::PoolTimedOut.into_data_error();
        assert!(matches!(err, DataError::Database(_)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
