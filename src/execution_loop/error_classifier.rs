//! Error Classifier
//!
//! Tags engine failures with a coarse class for logs and the attempt trace.
//! The class never changes what the repair loop does.

use crate::error::ExecutionError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// SQL error classification taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SqlErrorClass {
    ColumnNotFound,
    TableNotFound,
    TypeMismatch,
    Syntax,
    Other,
}

impl fmt::Display for SqlErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlErrorClass::ColumnNotFound => write!(f, "ColumnNotFound"),
            SqlErrorClass::TableNotFound => write!(f, "TableNotFound"),
            SqlErrorClass::TypeMismatch => write!(f, "TypeMismatch"),
            SqlErrorClass::Syntax => write!(f, "Syntax"),
            SqlErrorClass::Other => write!(f, "Other"),
        }
    }
}

#[derive(Debug, Default)]
pub struct ErrorClassifier;

impl ErrorClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, error: &ExecutionError) -> SqlErrorClass {
        let msg = error.message.to_lowercase();
        let missing = msg.contains("not found")
            || msg.contains("does not exist")
            || msg.contains("unknown")
            || msg.contains("no such");

        if msg.contains("column") && missing {
            return SqlErrorClass::ColumnNotFound;
        }

        if (msg.contains("table") || msg.contains("relation")) && missing {
            return SqlErrorClass::TableNotFound;
        }

        if msg.contains("cannot compare")
            || msg.contains("cannot cast")
            || msg.contains("conversion")
            || msg.contains("dtype")
            || msg.contains("type mismatch")
            || msg.contains("mismatched types")
        {
            return SqlErrorClass::TypeMismatch;
        }

        if msg.contains("syntax") || msg.contains("parse") || msg.contains("expected") {
            return SqlErrorClass::Syntax;
        }

        SqlErrorClass::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(msg: &str) -> SqlErrorClass {
        ErrorClassifier::new().classify(&ExecutionError::new(msg))
    }

    #[test]
    fn test_classify_column_not_found() {
        assert_eq!(classify("column 'Order Date' not found"), SqlErrorClass::ColumnNotFound);
    }

    #[test]
    fn test_classify_table_not_found() {
        assert_eq!(
            classify("sql error: relation 'nosuchtable' was not found"),
            SqlErrorClass::TableNotFound
        );
    }

    #[test]
    fn test_classify_type_mismatch() {
        assert_eq!(classify("cannot compare string with numeric type (i64)"), SqlErrorClass::TypeMismatch);
    }

    #[test]
    fn test_classify_syntax() {
        assert_eq!(classify("sql parser error: Expected an expression, found: FROM"), SqlErrorClass::Syntax);
    }

    #[test]
    fn test_classify_other() {
        assert_eq!(classify("out of memory"), SqlErrorClass::Other);
    }
}
