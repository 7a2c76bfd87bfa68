//! ArrayBuffer backing store
//!
//! The buffer owns the liveness flag of every view over it. Detachment can
//! happen at any time, including from inside a user callback while a typed
//! array operation is running, so views must re-check on every access.

use parking_lot::RwLock;

/// Raw, detachable byte storage
#[derive(Debug)]
pub struct JsArrayBuffer {
    /// The underlying byte data. None if detached.
    data: RwLock<Option<Vec<u8>>>,
}

impl JsArrayBuffer {
    /// Create a zero-filled buffer of `byte_length` bytes
    pub fn new(byte_length: usize) -> Self {
        Self {
            data: RwLock::new(Some(vec![0; byte_length])),
        }
    }

    /// Check if the buffer is detached
    pub fn is_detached(&self) -> bool {
        self.data.read().is_none()
    }

    /// Detach the buffer, dropping its storage
    pub fn detach(&self) {
        let previous = self.data.write().take();
        tracing::debug!(
            freed_bytes = previous.as_ref().map_or(0, Vec::len),
            "array buffer detached"
        );
    }

    /// Get the byte length (0 if detached)
    pub fn byte_length(&self) -> usize {
        self.data.read().as_ref().map_or(0, |d| d.len())
    }

    /// Write bytes from a slice
    pub fn write_bytes(&self, offset: usize, src: &[u8]) -> bool {
        let mut guard = self.data.write();
        if let Some(data) = guard.as_mut() {
            if offset + src.len() <= data.len() {
                data[offset..offset + src.len()].copy_from_slice(src);
                return true;
            }
        }
        false
    }

    /// Copy a range of bytes into a fresh vector
    pub fn copy_range(&self, offset: usize, len: usize) -> Option<Vec<u8>> {
        let guard = self.data.read();
        let data = guard.as_ref()?;
        data.get(offset..offset.checked_add(len)?).map(<[u8]>::to_vec)
    }

    /// Shared access to the data. Returns None if detached.
    pub fn with_data<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&[u8]) -> R,
    {
        let guard = self.data.read();
        guard.as_deref().map(f)
    }

    /// Exclusive access to the data. Returns None if detached.
    pub fn with_data_mut<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut [u8]) -> R,
    {
        let mut guard = self.data.write();
        guard.as_deref_mut().map(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_array_buffer() {
        let ab = JsArrayBuffer::new(16);
        assert_eq!(ab.byte_length(), 16);
        assert!(!ab.is_detached());
        assert_eq!(ab.with_data(|d| d.iter().all(|b| *b == 0)), Some(true));
    }

    #[test]
    fn test_detach() {
        let ab = JsArrayBuffer::new(3);
        assert!(!ab.is_detached());
        ab.detach();
        assert!(ab.is_detached());
        assert_eq!(ab.byte_length(), 0);
        assert_eq!(ab.copy_range(0, 1), None);
        assert!(ab.with_data(|d| d.len()).is_none());
        // Detaching twice is a no-op
        ab.detach();
        assert!(ab.is_detached());
    }

    #[test]
    fn test_read_write_bytes() {
        let ab = JsArrayBuffer::new(8);
        assert!(ab.write_bytes(2, &[1, 2, 3, 4]));
        assert!(!ab.write_bytes(6, &[1, 2, 3]));

        assert_eq!(ab.copy_range(2, 4), Some(vec![1, 2, 3, 4]));
        assert_eq!(ab.copy_range(3, 2), Some(vec![2, 3]));
        assert_eq!(ab.copy_range(7, 2), None);
    }

    #[test]
    fn test_write_after_detach_fails() {
        let ab = JsArrayBuffer::new(4);
        ab.detach();
        assert!(!ab.write_bytes(0, &[1]));
        assert!(ab.with_data_mut(|d| d[0] = 1).is_none());
    }
}
