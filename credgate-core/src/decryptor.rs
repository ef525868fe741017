use crate::errors::Result;

/// Contract for the collaborator that opens the sealed credentials blob.
///
/// The engine never touches cipher internals; it only requires that a
/// malformed envelope is rejected before any decrypt attempt and that a
/// wrong secret surfaces as [`crate::Error::Decryption`] without side
/// effects.
pub trait Decryptor: Send + Sync {
    /// Structural envelope check, detectable without decrypting.
    fn validate(&self, blob: &[u8]) -> Result<()>;

    /// Decrypt the blob with a key derived from the caller-supplied secret.
    fn open(&self, secret: &str, blob: &[u8]) -> Result<Vec<u8>>;
}
