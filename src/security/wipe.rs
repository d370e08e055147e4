//! Zeroing of confidential buffers.
//!
//! Plain `buf.fill(0)` on memory that is about to go out of scope can be
//! optimized away as a dead store, so every byte is written with
//! `write_volatile` followed by a compiler fence.

use std::sync::atomic::{compiler_fence, Ordering};

/// Overwrite every byte of `buf` with zero.
pub fn wipe_bytes(buf: &mut [u8]) {
    for byte in buf.iter_mut() {
        // SAFETY: `byte` is a valid, aligned, exclusive reference into `buf`.
        unsafe {
            std::ptr::write_volatile(byte, 0);
        }
    }
    compiler_fence(Ordering::SeqCst);
}

/// Returns true when every byte of `buf` is zero.
pub fn is_wiped(buf: &[u8]) -> bool {
    buf.iter().all(|b| *b == 0)
}

/// Scoped guard over a caller-owned buffer.
///
/// The buffer is zeroed exactly once: either by an explicit [`wipe`]
/// call or, failing that, when the guard is dropped (early return, panic
/// unwinding, or a cancelled future).
///
/// [`wipe`]: BufferGuard::wipe
pub struct BufferGuard<'a> {
    buf: &'a mut [u8],
    wiped: bool,
}

impl<'a> BufferGuard<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, wiped: false }
    }

    /// Read access to the still-live bytes. Empty once wiped.
    pub fn bytes(&self) -> &[u8] {
        if self.wiped {
            &[]
        } else {
            &*self.buf
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Zero the buffer. Idempotent: returns false when already wiped.
    pub fn wipe(&mut self) -> bool {
        if self.wiped {
            return false;
        }
        wipe_bytes(self.buf);
        self.wiped = true;
        true
    }

    pub fn is_wiped(&self) -> bool {
        self.wiped
    }
}

impl Drop for BufferGuard<'_> {
    fn drop(&mut self) {
        self.wipe();
    }
}

/// Owned working copy of confidential bytes, zeroed on drop.
///
/// Used for the copy handed to the attested processor and for encoded
/// request bodies.
pub struct WipeOnDrop(Vec<u8>);

impl WipeOnDrop {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn copy_of(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl Drop for WipeOnDrop {
    fn drop(&mut self) {
        // Wipe the full capacity, not just len, in case the Vec was
        // truncated after holding secret bytes.
        let capacity = self.0.capacity();
        self.0.resize(capacity, 0);
        wipe_bytes(&mut self.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_wipe_bytes() {
        let mut buf = b"patient cohort export".to_vec();
        wipe_bytes(&mut buf);
        assert!(is_wiped(&buf));
        assert_eq!(buf.len(), 21);
    }

    #[test]
    fn test_guard_wipes_once() {
        let mut buf = vec![7u8; 16];
        {
            let mut guard = BufferGuard::new(&mut buf);
            assert_eq!(guard.bytes(), &[7u8; 16]);
            assert!(guard.wipe());
            assert!(!guard.wipe());
            assert!(guard.bytes().is_empty());
            assert_eq!(guard.len(), 16);
        }
        assert!(is_wiped(&buf));
    }

    #[test]
    fn test_guard_wipes_on_drop() {
        let mut buf = vec![0xAB; 32];
        {
            let _guard = BufferGuard::new(&mut buf);
        }
        assert!(is_wiped(&buf));
    }

    #[test]
    fn test_guard_wipes_on_panic() {
        let mut buf = vec![0x5A; 8];
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = BufferGuard::new(&mut buf);
            panic!("stage blew up");
        }));
        assert!(result.is_err());
        assert!(is_wiped(&buf));
    }

    proptest! {
        #[test]
        fn prop_guard_always_zeroes(mut data in proptest::collection::vec(any::<u8>(), 0..512)) {
            {
                let guard = BufferGuard::new(&mut data);
                prop_assert_eq!(guard.is_wiped(), false);
            }
            prop_assert!(is_wiped(&data));
        }
    }
}
