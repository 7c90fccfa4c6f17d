//! Request line parsing.

use crate::protocol::encoding::{self, EncodingError};

/// A decoded peer request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Fetch a cached item by name.
    Get { filename: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("empty request line")]
    Empty,

    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("expected exactly one argument to '{0}'")]
    BadArguments(&'static str),

    #[error("bad filename: {0}")]
    Filename(#[from] EncodingError),

    #[error("malformed response header '{0}'")]
    BadHeader(String),
}

impl Request {
    /// Parse one request line (terminator already removed).
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let mut parts = line.split(' ');
        let verb = parts.next().unwrap_or_default();
        if verb.is_empty() {
            return Err(ProtocolError::Empty);
        }

        match verb {
            "get" => {
                let encoded = parts.next().ok_or(ProtocolError::BadArguments("get"))?;
                if parts.next().is_some() {
                    return Err(ProtocolError::BadArguments("get"));
                }
                let filename = encoding::decode(encoded)?;
                Ok(Request::Get { filename })
            }
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }

    /// Render the request line sent by a client (without newline).
    pub fn to_line(&self) -> String {
        match self {
            Request::Get { filename } => format!("get {}", encoding::encode(filename)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_get() {
        assert_eq!(
            Request::parse("get task%201%2Foutput").unwrap(),
            Request::Get {
                filename: "task 1/output".into()
            }
        );
    }

    #[test]
    fn rejects_other_forms() {
        assert_eq!(Request::parse(""), Err(ProtocolError::Empty));
        assert_eq!(
            Request::parse("put x"),
            Err(ProtocolError::UnknownCommand("put".into()))
        );
        assert_eq!(Request::parse("get"), Err(ProtocolError::BadArguments("get")));
        assert_eq!(Request::parse("get a b"), Err(ProtocolError::BadArguments("get")));
        assert_eq!(Request::parse("get "), Err(ProtocolError::Filename(EncodingError::Empty)));
        assert!(matches!(
            Request::parse("get x%g1"),
            Err(ProtocolError::Filename(EncodingError::MalformedEscape(1)))
        ));
    }

    #[test]
    fn client_line_parses_back() {
        let request = Request::Get {
            filename: "dir with space".into(),
        };
        assert_eq!(Request::parse(&request.to_line()).unwrap(), request);
    }
}
