//! Growable receive buffer.
//!
//! Bytes are appended at the back and handed out exactly once from the
//! front through a `consumed` index. The consumed prefix is compacted away
//! before the buffer grows, so unconsumed bytes are never overwritten and
//! memory stays proportional to what is still pending.

use std::collections::TryReserveError;

use thiserror::Error;
use tracing::trace;

/// Failure to make room for incoming bytes
#[derive(Debug, Error)]
pub enum BufferError {
    #[error("receive buffer could not grow by {additional} bytes: {source}")]
    Allocation {
        additional: usize,
        #[source]
        source: TryReserveError,
    },

    #[error("receive buffer limit of {limit} bytes exceeded ({requested} bytes pending)")]
    LimitExceeded { limit: usize, requested: usize },
}

#[derive(Debug, Clone, Default)]
pub struct ReceiveBuffer {
    bytes: Vec<u8>,
    consumed: usize,
    limit: Option<usize>,
}

impl ReceiveBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer that refuses to hold more than `limit` unconsumed bytes
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// Append bytes behind everything still pending
    ///
    /// On error nothing is appended and pending bytes are untouched.
    pub fn append(&mut self, input: &[u8]) -> Result<(), BufferError> {
        if input.is_empty() {
            return Ok(());
        }

        let requested = self.pending_len() + input.len();
        if let Some(limit) = self.limit {
            if requested > limit {
                return Err(BufferError::LimitExceeded { limit, requested });
            }
        }

        self.compact();
        self.bytes
            .try_reserve(input.len())
            .map_err(|source| BufferError::Allocation {
                additional: input.len(),
                source,
            })?;
        self.bytes.extend_from_slice(input);
        Ok(())
    }

    /// Next unconsumed byte, if any; each byte is returned once
    pub fn next_octet(&mut self) -> Option<u8> {
        let byte = self.bytes.get(self.consumed).copied()?;
        self.consumed += 1;
        Some(byte)
    }

    pub fn pending(&self) -> &[u8] {
        &self.bytes[self.consumed..]
    }

    pub fn pending_len(&self) -> usize {
        self.bytes.len() - self.consumed
    }

    pub fn is_empty(&self) -> bool {
        self.pending_len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }

    /// Drop the consumed prefix, moving pending bytes to the front
    pub fn compact(&mut self) {
        if self.consumed == 0 {
            return;
        }
        trace!(consumed = self.consumed, pending = self.pending_len(), "compacting receive buffer");
        self.bytes.drain(..self.consumed);
        self.consumed = 0;
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
        self.consumed = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_are_delivered_once_in_order() {
        let mut buffer = ReceiveBuffer::new();
        buffer.append(b"abc").unwrap();
        assert_eq!(buffer.next_octet(), Some(b'a'));
        assert_eq!(buffer.pending(), b"bc");

        buffer.append(b"de").unwrap();
        let rest: Vec<u8> = std::iter::from_fn(|| buffer.next_octet()).collect();
        assert_eq!(rest, b"bcde");
        assert_eq!(buffer.next_octet(), None);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_growth_never_overwrites_pending_bytes() {
        let mut buffer = ReceiveBuffer::new();
        let first: Vec<u8> = (0..=255).collect();
        buffer.append(&first).unwrap();
        for _ in 0..100 {
            buffer.next_octet();
        }

        let second = vec![7u8; 4096];
        buffer.append(&second).unwrap();

        let mut expected: Vec<u8> = (100..=255).collect();
        expected.extend_from_slice(&second);
        assert_eq!(buffer.pending(), expected.as_slice());
    }

    #[test]
    fn test_compaction_reclaims_consumed_prefix() {
        let mut buffer = ReceiveBuffer::new();
        buffer.append(&[1, 2, 3, 4]).unwrap();
        buffer.next_octet();
        buffer.next_octet();

        buffer.compact();
        assert_eq!(buffer.pending(), &[3, 4]);
        assert_eq!(buffer.next_octet(), Some(3));
    }

    #[test]
    fn test_limit_rejects_without_losing_data() {
        let mut buffer = ReceiveBuffer::with_limit(4);
        buffer.append(&[1, 2, 3]).unwrap();

        let err = buffer.append(&[4, 5]).unwrap_err();
        assert!(matches!(
            err,
            BufferError::LimitExceeded {
                limit: 4,
                requested: 5
            }
        ));
        assert_eq!(buffer.pending(), &[1, 2, 3]);

        // Consuming makes room again
        buffer.next_octet();
        buffer.append(&[4, 5]).unwrap();
        assert_eq!(buffer.pending(), &[2, 3, 4, 5]);
    }

    #[test]
    fn test_limit_error_message() {
        let err = BufferError::LimitExceeded {
            limit: 8,
            requested: 9,
        };
        assert_eq!(
            err.to_string(),
            "receive buffer limit of 8 bytes exceeded (9 bytes pending)"
        );
    }
}
