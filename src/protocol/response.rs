//! Response headers announcing how an artifact is sent.
//!
//! ```text
//! file <encoded-name> <length> <octal-mode>\n  followed by <length> bytes
//! dir <encoded-name>\n                       followed by directory records
//!
//! chunk <length>\n  followed by <length> bytes of tar stream
//! end\n             archive complete; absent if the server failed
//! ```

use crate::protocol::encoding;
use crate::protocol::request::ProtocolError;

/// Header line preceding the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseHeader {
    File { name: String, length: u64, mode: u32 },
    Directory { name: String },
}

impl ResponseHeader {
    pub fn to_line(&self) -> String {
        match self {
            ResponseHeader::File { name, length, mode } => {
                format!("file {} {} {:o}", encoding::encode(name), length, mode & 0o7777)
            }
            ResponseHeader::Directory { name } => format!("dir {}", encoding::encode(name)),
        }
    }

    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let bad = || ProtocolError::BadHeader(line.to_string());
        let fields: Vec<&str> = line.split(' ').collect();

        match fields.as_slice() {
            ["file", name, length, mode] => Ok(ResponseHeader::File {
                name: encoding::decode(name)?,
                length: length.parse().map_err(|_| bad())?,
                mode: u32::from_str_radix(mode, 8).map_err(|_| bad())?,
            }),
            ["dir", name] => Ok(ResponseHeader::Directory {
                name: encoding::decode(name)?,
            }),
            _ => Err(bad()),
        }
    }
}

/// Largest tar chunk a peer may announce in one record.
pub const DIR_CHUNK_MAX: u64 = 4 * 1024 * 1024;

/// One framing line inside a directory transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryRecord {
    Chunk(u64),
    End,
}

impl DirectoryRecord {
    pub fn to_line(&self) -> String {
        match self {
            DirectoryRecord::Chunk(length) => format!("chunk {}", length),
            DirectoryRecord::End => "end".to_string(),
        }
    }

    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let bad = || ProtocolError::BadHeader(line.to_string());
        match line.split(' ').collect::<Vec<_>>().as_slice() {
            ["end"] => Ok(DirectoryRecord::End),
            ["chunk", length] => {
                let length: u64 = length.parse().map_err(|_| bad())?;
                if length == 0 || length > DIR_CHUNK_MAX {
                    return Err(bad());
                }
                Ok(DirectoryRecord::Chunk(length))
            }
            _ => Err(bad()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_header_format() {
        let header = ResponseHeader::File {
            name: "a b".into(),
            length: 42,
            mode: 0o100644,
        };
        assert_eq!(header.to_line(), "file a%20b 42 644");
        assert_eq!(
            ResponseHeader::parse("file a%20b 42 644").unwrap(),
            ResponseHeader::File {
                name: "a b".into(),
                length: 42,
                mode: 0o644
            }
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(ResponseHeader::parse("file x notanumber 644").is_err());
        assert!(ResponseHeader::parse("file x 1 999").is_err());
        assert!(ResponseHeader::parse("missing x 2").is_err());
        assert_eq!(
            ResponseHeader::parse("dir results").unwrap(),
            ResponseHeader::Directory {
                name: "results".into()
            }
        );
    }

    #[test]
    fn directory_records() {
        assert_eq!(DirectoryRecord::Chunk(512).to_line(), "chunk 512");
        assert_eq!(DirectoryRecord::parse("chunk 512").unwrap(), DirectoryRecord::Chunk(512));
        assert_eq!(DirectoryRecord::parse("end").unwrap(), DirectoryRecord::End);
        assert!(DirectoryRecord::parse("chunk 0").is_err());
        assert!(DirectoryRecord::parse("chunk -1").is_err());
        assert!(DirectoryRecord::parse(&format!("chunk {}", DIR_CHUNK_MAX + 1)).is_err());
        assert!(DirectoryRecord::parse("end now").is_err());
    }
}
