/// Compute the BLAKE3 hash of a byte slice, returning the hex-encoded digest.
#[must_use]
pub fn blake3_bytes(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// Incremental digest over a sequence of string fields.
///
/// Fields are NUL-separated so `["ab", "c"]` and `["a", "bc"]` hash differently.
#[derive(Debug, Default)]
pub struct Fingerprint {
    hasher: blake3::Hasher,
}

impl Fingerprint {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one field.
    pub fn field(&mut self, value: &str) -> &mut Self {
        self.hasher.update(value.as_bytes());
        self.hasher.update(&[0]);
        self
    }

    /// Hex-encoded digest of everything fed so far.
    #[must_use]
    pub fn finish(&self) -> String {
        self.hasher.finalize().to_hex().to_string()
    }
}
