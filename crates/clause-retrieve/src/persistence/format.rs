//! On-disk header for persisted retrieval indexes.
//!
//! Both the dense store and the BM25 index are written as a small fixed
//! header followed by a postcard-encoded body. The header lets `load`
//! refuse a file that was produced by an incompatible embedding model or
//! format revision before it wastes time decoding the body.

use crate::persistence::error::{PersistenceError, PersistenceResult};

/// Magic bytes identifying a clause-retrieve index file.
pub const MAGIC_BYTES: [u8; 4] = *b"CLRV";

/// Current on-disk format revision. Bumped on breaking layout changes.
pub const FORMAT_VERSION: u32 = 1;

/// Fixed-size header written at the start of every persisted index file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexHeader {
    pub magic: [u8; 4],
    pub format_version: u32,
    /// Embedding dimension for dense indexes; 0 for the sparse index.
    pub embedding_dim: u32,
    /// Number of documents the body encodes.
    pub doc_count: u32,
}

impl IndexHeader {
    pub const SIZE: usize = 16;

    pub fn new(embedding_dim: u32, doc_count: u32) -> Self {
        Self {
            magic: MAGIC_BYTES,
            format_version: FORMAT_VERSION,
            embedding_dim,
            doc_count,
        }
    }

    pub fn validate(&self) -> PersistenceResult<()> {
        if self.magic != MAGIC_BYTES {
            return Err(PersistenceError::Format {
                message: "invalid index magic bytes".to_string(),
                expected: Some(format!("{:?}", MAGIC_BYTES)),
                actual: Some(format!("{:?}", self.magic)),
            });
        }
        if self.format_version != FORMAT_VERSION {
            return Err(PersistenceError::Format {
                message: "index format version mismatch".to_string(),
                expected: Some(FORMAT_VERSION.to_string()),
                actual: Some(self.format_version.to_string()),
            });
        }
        Ok(())
    }

    pub fn write<W: std::io::Write>(&self, writer: &mut W) -> PersistenceResult<()> {
        use byteorder::{LittleEndian, WriteBytesExt};
        writer.write_all(&self.magic)?;
        writer.write_u32::<LittleEndian>(self.format_version)?;
        writer.write_u32::<LittleEndian>(self.embedding_dim)?;
        writer.write_u32::<LittleEndian>(self.doc_count)?;
        Ok(())
    }

    pub fn read<R: std::io::Read>(reader: &mut R) -> PersistenceResult<Self> {
        use byteorder::{LittleEndian, ReadBytesExt};
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        let format_version = reader.read_u32::<LittleEndian>()?;
        let embedding_dim = reader.read_u32::<LittleEndian>()?;
        let doc_count = reader.read_u32::<LittleEndian>()?;
        let header = Self {
            magic,
            format_version,
            embedding_dim,
            doc_count,
        };
        header.validate()?;
        Ok(header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrip() {
        let header = IndexHeader::new(768, 1200);
        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();
        assert_eq!(buf.len(), IndexHeader::SIZE);

        let mut reader = std::io::Cursor::new(&buf);
        let read_back = IndexHeader::read(&mut reader).unwrap();
        assert_eq!(read_back, header);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut buf = vec![0u8; IndexHeader::SIZE];
        buf[0] = b'X';
        let mut reader = std::io::Cursor::new(&buf);
        assert!(IndexHeader::read(&mut reader).is_err());
    }
}
