//! Client-side frame masking (RFC 6455 §5.3). Every byte sent to the server
//! must be masked; nothing received from the server may be.

use rand::RngCore;

pub type MaskKey = [u8; 4];

/// Draw a fresh mask key from the OS CSPRNG. Called once per outbound frame —
/// reusing a key across frames is a protocol violation in spirit even though
/// RFC 6455 only requires unpredictability, not uniqueness.
pub fn generate_key() -> MaskKey {
    let mut key = [0u8; 4];
    rand::rngs::OsRng.fill_bytes(&mut key);
    key
}

/// XOR `data` in place against `key`, cycling the key every 4 bytes. This
/// operation is its own inverse: applying it twice with the same key and
/// starting offset restores the original bytes.
pub fn apply(key: &MaskKey, data: &mut [u8]) {
    apply_at(key, data, 0);
}

/// Same as [`apply`] but starting the key cycle at a global byte offset, so a
/// payload split across multiple `write` calls (the scatter-send case) can be
/// masked as if it were one contiguous buffer.
pub fn apply_at(key: &MaskKey, data: &mut [u8], start_offset: usize) {
    for (i, byte) in data.iter_mut().enumerate() {
        *byte ^= key[(start_offset + i) % 4];
    }
}
