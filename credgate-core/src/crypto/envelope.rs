use crate::decryptor::Decryptor;
use crate::errors::{Error, Result};
use hkdf::Hkdf;
use rand::RngCore;
use ring::aead;
use sha2::Sha256;

const MAGIC: &[u8; 4] = b"CGSE";
const VERSION: u8 = 1;
const SALT_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const HEADER_LEN: usize = MAGIC.len() + 1 + SALT_LEN + NONCE_LEN;
const HKDF_INFO: &[u8] = b"credgate.store.v1";

/// Default [`Decryptor`] for the sealed credentials blob.
///
/// Envelope layout: `magic | version | hkdf-salt | nonce | ciphertext+tag`.
/// The content key is derived from the unsealing secret with HKDF-SHA256
/// over the per-blob salt; the payload is sealed with AES-256-GCM. The
/// version byte exists so the format can rotate without breaking readers.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvelopeDecryptor;

impl EnvelopeDecryptor {
    pub fn new() -> Self {
        Self
    }

    /// Produce a sealed blob from plaintext. Used by tooling that prepares
    /// credentials files and by tests.
    pub fn seal(&self, secret: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut salt = [0u8; SALT_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        let mut rng = rand::rng();
        rng.fill_bytes(&mut salt);
        rng.fill_bytes(&mut nonce);

        let key = derive_key(secret, &salt)?;
        let key = aead::UnboundKey::new(&aead::AES_256_GCM, &key)
            .map_err(|_| Error::Decryption("invalid content key".into()))?;
        let key = aead::LessSafeKey::new(key);

        let mut in_out = plaintext.to_vec();
        in_out.reserve(TAG_LEN);
        key.seal_in_place_append_tag(
            aead::Nonce::assume_unique_for_key(nonce),
            aead::Aad::empty(),
            &mut in_out,
        )
        .map_err(|_| Error::Decryption("seal failed".into()))?;

        let mut out = Vec::with_capacity(HEADER_LEN + in_out.len());
        out.extend_from_slice(MAGIC);
        out.push(VERSION);
        out.extend_from_slice(&salt);
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&in_out);
        Ok(out)
    }
}

impl Decryptor for EnvelopeDecryptor {
    fn validate(&self, blob: &[u8]) -> Result<()> {
        if blob.len() < HEADER_LEN + TAG_LEN {
            return Err(Error::Format("envelope too short".into()));
        }
        if &blob[..MAGIC.len()] != MAGIC {
            return Err(Error::Format("bad envelope magic".into()));
        }
        let version = blob[MAGIC.len()];
        if version != VERSION {
            return Err(Error::Format(format!(
                "unsupported envelope version {version}"
            )));
        }
        Ok(())
    }

    fn open(&self, secret: &str, blob: &[u8]) -> Result<Vec<u8>> {
        self.validate(blob)?;

        let salt = &blob[MAGIC.len() + 1..MAGIC.len() + 1 + SALT_LEN];
        let nonce = &blob[MAGIC.len() + 1 + SALT_LEN..HEADER_LEN];
        let ciphertext = &blob[HEADER_LEN..];

        let key = derive_key(secret, salt)?;
        let key = aead::UnboundKey::new(&aead::AES_256_GCM, &key)
            .map_err(|_| Error::Decryption("invalid content key".into()))?;
        let key = aead::LessSafeKey::new(key);

        let mut buffer = ciphertext.to_vec();
        let plaintext = key
            .open_in_place(
                aead::Nonce::try_assume_unique_for_key(nonce)
                    .map_err(|_| Error::Format("invalid nonce length".into()))?,
                aead::Aad::empty(),
                &mut buffer,
            )
            .map_err(|_| Error::Decryption("message authentication failed".into()))?;

        Ok(plaintext.to_vec())
    }
}

fn derive_key(secret: &str, salt: &[u8]) -> Result<[u8; 32]> {
    let hkdf = Hkdf::<Sha256>::new(Some(salt), secret.as_bytes());
    let mut okm = [0u8; 32];
    hkdf.expand(HKDF_INFO, &mut okm)
        .map_err(|_| Error::Decryption("failed to derive content key".into()))?;
    Ok(okm)
}
