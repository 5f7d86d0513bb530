//! Storage type tokens and referential actions.
//!
//! Both are opaque to the definition engine: they are parsed from definition
//! files, copied between fields, and handed to the registry unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Storage type of a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DataType {
    /// 32-bit integer.
    Integer,
    /// 64-bit integer.
    BigInt,
    /// Single precision floating point.
    Float,
    /// Double precision floating point.
    Double,
    /// Fixed-precision decimal.
    Decimal {
        /// Total number of digits.
        precision: u8,
        /// Number of digits after the decimal point.
        scale: u8,
    },
    /// Variable length string with an optional maximum length.
    String(Option<u32>),
    /// Unbounded text.
    Text,
    /// Boolean value.
    Boolean,
    /// Calendar date without a time component.
    Date,
    /// Date and time.
    Timestamp,
    /// UUID (128-bit identifier).
    Uuid,
    /// JSON document.
    Json,
    /// Binary data.
    Bytes,
    /// Any token the engine does not know about, passed through verbatim.
    Custom(String),
}

/// Error produced when a type or action token cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid token '{token}': {reason}")]
pub struct TokenParseError {
    /// The offending token.
    pub token: String,
    /// What was wrong with it.
    pub reason: String,
}

impl DataType {
    /// Create a string type with a maximum length.
    pub fn string(len: u32) -> Self {
        DataType::String(Some(len))
    }
}

impl Default for DataType {
    fn default() -> Self {
        DataType::Integer
    }
}

impl FromStr for DataType {
    type Err = TokenParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        let err = |reason: &str| TokenParseError {
            token: token.to_string(),
            reason: reason.to_string(),
        };

        let (name, args) = match token.find('(') {
            Some(open) => {
                let close = token
                    .rfind(')')
                    .filter(|close| *close > open)
                    .ok_or_else(|| err("unbalanced parentheses"))?;
                if close != token.len() - 1 {
                    return Err(err("trailing characters after arguments"));
                }
                let args: Vec<&str> = token[open + 1..close].split(',').map(str::trim).collect();
                (token[..open].trim(), Some(args))
            }
            None => (token, None),
        };

        if name.is_empty() {
            return Err(err("empty type name"));
        }

        let numeric_arg = |arg: &str| -> Result<u32, TokenParseError> {
            arg.parse::<u32>()
                .map_err(|_| err("arguments must be unsigned integers"))
        };

        let ty = match (name.to_ascii_uppercase().as_str(), args.as_deref()) {
            ("INTEGER" | "INT", None) => DataType::Integer,
            ("BIGINT", None) => DataType::BigInt,
            ("FLOAT" | "REAL", None) => DataType::Float,
            ("DOUBLE", None) => DataType::Double,
            ("DECIMAL" | "NUMERIC", None) => DataType::Decimal {
                precision: 10,
                scale: 0,
            },
            ("DECIMAL" | "NUMERIC", Some([precision])) => DataType::Decimal {
                precision: numeric_arg(precision)?.try_into().map_err(|_| err("precision too large"))?,
                scale: 0,
            },
            ("DECIMAL" | "NUMERIC", Some([precision, scale])) => DataType::Decimal {
                precision: numeric_arg(precision)?.try_into().map_err(|_| err("precision too large"))?,
                scale: numeric_arg(scale)?.try_into().map_err(|_| err("scale too large"))?,
            },
            ("STRING" | "VARCHAR", None) => DataType::String(None),
            ("STRING" | "VARCHAR", Some([len])) => DataType::String(Some(numeric_arg(len)?)),
            ("TEXT", None) => DataType::Text,
            ("BOOLEAN" | "BOOL", None) => DataType::Boolean,
            ("DATEONLY", None) => DataType::Date,
            ("DATE" | "DATETIME" | "TIMESTAMP", None) => DataType::Timestamp,
            ("UUID", None) => DataType::Uuid,
            ("JSON" | "JSONB", None) => DataType::Json,
            ("BLOB" | "BYTES", None) => DataType::Bytes,
            (
                "INTEGER" | "INT" | "BIGINT" | "FLOAT" | "REAL" | "DOUBLE" | "DECIMAL" | "NUMERIC"
                | "STRING" | "VARCHAR" | "TEXT" | "BOOLEAN" | "BOOL" | "DATEONLY" | "DATE"
                | "DATETIME" | "TIMESTAMP" | "UUID" | "JSON" | "JSONB" | "BLOB" | "BYTES",
                Some(_),
            ) => return Err(err("unexpected number of arguments")),
            _ => DataType::Custom(token.to_string()),
        };

        Ok(ty)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Integer => f.write_str("INTEGER"),
            DataType::BigInt => f.write_str("BIGINT"),
            DataType::Float => f.write_str("FLOAT"),
            DataType::Double => f.write_str("DOUBLE"),
            DataType::Decimal { precision, scale } => write!(f, "DECIMAL({},{})", precision, scale),
            DataType::String(Some(len)) => write!(f, "STRING({})", len),
            DataType::String(None) => f.write_str("STRING"),
            DataType::Text => f.write_str("TEXT"),
            DataType::Boolean => f.write_str("BOOLEAN"),
            DataType::Date => f.write_str("DATEONLY"),
            DataType::Timestamp => f.write_str("DATE"),
            DataType::Uuid => f.write_str("UUID"),
            DataType::Json => f.write_str("JSON"),
            DataType::Bytes => f.write_str("BLOB"),
            DataType::Custom(token) => f.write_str(token),
        }
    }
}

impl TryFrom<String> for DataType {
    type Error = TokenParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DataType> for String {
    fn from(value: DataType) -> Self {
        value.to_string()
    }
}

/// What happens to referencing rows when the referenced row changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ReferentialAction {
    /// Propagate the change.
    Cascade,
    /// Prevent the change if referencing rows exist.
    Restrict,
    /// Set the foreign key to null.
    SetNull,
    /// Set the foreign key to its default value.
    SetDefault,
    /// Defer to the store's default check.
    NoAction,
}

impl FromStr for ReferentialAction {
    type Err = TokenParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "CASCADE" => Ok(ReferentialAction::Cascade),
            "RESTRICT" => Ok(ReferentialAction::Restrict),
            "SET NULL" => Ok(ReferentialAction::SetNull),
            "SET DEFAULT" => Ok(ReferentialAction::SetDefault),
            "NO ACTION" => Ok(ReferentialAction::NoAction),
            _ => Err(TokenParseError {
                token: s.to_string(),
                reason: "expected CASCADE, RESTRICT, SET NULL, SET DEFAULT or NO ACTION".into(),
            }),
        }
    }
}

impl fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
            ReferentialAction::NoAction => "NO ACTION",
        })
    }
}

impl TryFrom<String> for ReferentialAction {
    type Error = TokenParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ReferentialAction> for String {
    fn from(value: ReferentialAction) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_tokens() {
        assert_eq!("INTEGER".parse::<DataType>().unwrap(), DataType::Integer);
        assert_eq!("integer".parse::<DataType>().unwrap(), DataType::Integer);
        assert_eq!("STRING".parse::<DataType>().unwrap(), DataType::String(None));
        assert_eq!("uuid".parse::<DataType>().unwrap(), DataType::Uuid);
        assert_eq!("DATE".parse::<DataType>().unwrap(), DataType::Timestamp);
    }

    #[test]
    fn test_parse_tokens_with_arguments() {
        assert_eq!("STRING(50)".parse::<DataType>().unwrap(), DataType::string(50));
        assert_eq!(
            "decimal(10, 2)".parse::<DataType>().unwrap(),
            DataType::Decimal {
                precision: 10,
                scale: 2
            }
        );
    }

    #[test]
    fn test_parse_rejects_malformed_arguments() {
        assert!("STRING(abc)".parse::<DataType>().is_err());
        assert!("STRING(10".parse::<DataType>().is_err());
        assert!("INTEGER(4)".parse::<DataType>().is_err());
        assert!("".parse::<DataType>().is_err());
    }

    #[test]
    fn test_unknown_token_is_custom() {
        assert_eq!(
            "GEOMETRY".parse::<DataType>().unwrap(),
            DataType::Custom("GEOMETRY".into())
        );
        assert_eq!(
            "ENUM('a','b')".parse::<DataType>().unwrap(),
            DataType::Custom("ENUM('a','b')".into())
        );
    }

    #[test]
    fn test_display_is_parseable() {
        for ty in [
            DataType::Integer,
            DataType::string(10),
            DataType::Decimal {
                precision: 8,
                scale: 3,
            },
            DataType::Date,
            DataType::Timestamp,
        ] {
            assert_eq!(ty.to_string().parse::<DataType>().unwrap(), ty);
        }
    }

    #[test]
    fn test_referential_action_tokens() {
        assert_eq!(
            "cascade".parse::<ReferentialAction>().unwrap(),
            ReferentialAction::Cascade
        );
        assert_eq!(
            "SET_NULL".parse::<ReferentialAction>().unwrap(),
            ReferentialAction::SetNull
        );
        assert_eq!(
            "no action".parse::<ReferentialAction>().unwrap(),
            ReferentialAction::NoAction
        );
        assert!("explode".parse::<ReferentialAction>().is_err());
        assert_eq!(ReferentialAction::SetDefault.to_string(), "SET DEFAULT");
    }
}
