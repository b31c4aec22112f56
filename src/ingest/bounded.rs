//! Size-capped reading of a whole document.

use std::io::Read;

use super::IngestError;

/// Read every byte from `reader`, failing once the document reaches `cap` bytes.
///
/// A document is never truncated: one that fills the cap exactly is rejected too,
/// since the reader cannot tell it apart from a longer one.
pub fn read_bounded<R: Read>(reader: R, cap: usize) -> Result<Vec<u8>, IngestError> {
    let limit = u64::try_from(cap).unwrap_or(u64::MAX);
    let mut buffer = Vec::new();
    reader.take(limit).read_to_end(&mut buffer)?;
    check_size(buffer.len(), cap)?;
    Ok(buffer)
}

/// Reject a document of `len` bytes under a cap of `cap`.
pub fn check_size(len: usize, cap: usize) -> Result<(), IngestError> {
    if len >= cap {
        return Err(IngestError::TooLarge { limit: cap });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_small_document_is_read_whole() {
        let bytes = read_bounded(Cursor::new(b"<dsn/>".to_vec()), 16).unwrap();
        assert_eq!(bytes, b"<dsn/>");
    }

    #[test]
    fn test_document_at_cap_is_rejected() {
        let err = read_bounded(Cursor::new(vec![b'x'; 16]), 16).unwrap_err();
        assert!(matches!(err, IngestError::TooLarge { limit: 16 }));
    }

    #[test]
    fn test_document_over_cap_is_rejected() {
        let err = read_bounded(Cursor::new(vec![b'x'; 100]), 16).unwrap_err();
        assert!(matches!(err, IngestError::TooLarge { limit: 16 }));
    }

    #[test]
    fn test_one_below_cap_is_accepted() {
        assert_eq!(read_bounded(Cursor::new(vec![b'x'; 15]), 16).unwrap().len(), 15);
    }
}
