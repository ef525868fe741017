use crate::decryptor::Decryptor;
use crate::errors::{Error, Result};
use crate::types::ProfileEntry;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tokio::sync::watch;
use tracing::{debug, warn};

type ReadySlot = Option<Result<()>>;

/// Unseal lifecycle of the credentials store.
///
/// Transitions only `Sealed -> Unsealed`, exactly once meaningfully;
/// further successful unseals are no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsealState {
    Sealed,
    Unsealed,
}

struct StoreInner {
    blob: Option<Vec<u8>>,
    profiles: HashMap<String, ProfileEntry>,
    state: UnsealState,
}

/// Owns the encrypted credentials blob and, once unsealed, the decrypted
/// per-account profiles.
///
/// A single exclusive lock guards the blob, the profile map, and the state
/// so no reader ever observes a half-populated mapping. The one-time
/// decrypt runs under that lock; it is a bounded, single operation and the
/// only external call the store makes while locked.
pub struct SealedCredentialStore {
    decryptor: Box<dyn Decryptor>,
    inner: Mutex<StoreInner>,
    ready_tx: watch::Sender<ReadySlot>,
}

impl SealedCredentialStore {
    pub fn new(decryptor: Box<dyn Decryptor>) -> Self {
        let (ready_tx, _) = watch::channel(None);
        Self {
            decryptor,
            inner: Mutex::new(StoreInner {
                blob: None,
                profiles: HashMap::new(),
                state: UnsealState::Sealed,
            }),
            ready_tx,
        }
    }

    /// Read the blob into memory and check its envelope structure.
    ///
    /// The store stays sealed; profiles are untouched. Re-loading is an
    /// explicit operation, never implicit.
    pub fn load(&self, path: &Path) -> Result<()> {
        let blob = std::fs::read(path)
            .map_err(|err| Error::Io(format!("{}: {err}", path.display())))?;
        self.load_bytes(blob)
    }

    /// Same as [`load`](Self::load) for a blob already in memory.
    pub fn load_bytes(&self, blob: Vec<u8>) -> Result<()> {
        self.decryptor.validate(&blob)?;
        let mut inner = self.inner.lock().unwrap();
        debug!(bytes = blob.len(), "credentials blob loaded");
        inner.blob = Some(blob);
        Ok(())
    }

    /// Attempt to decrypt the blob with `secret`.
    ///
    /// Success atomically replaces the profile map, latches the readiness
    /// signal, and returns `true`; once unsealed, further calls return
    /// `true` without touching anything. Failure leaves state and profiles
    /// completely unchanged and a different secret may be retried.
    pub fn unseal(&self, secret: &str) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        if inner.state == UnsealState::Unsealed {
            return Ok(true);
        }

        let blob = inner
            .blob
            .as_ref()
            .ok_or_else(|| Error::NotReady("credentials blob not loaded".into()))?;

        let plaintext = match self.decryptor.open(secret, blob) {
            Ok(plaintext) => plaintext,
            Err(err) => {
                warn!(error = %err, "unseal attempt failed");
                return Err(err);
            }
        };

        let profiles: HashMap<String, ProfileEntry> = serde_json::from_slice(&plaintext)
            .map_err(|err| Error::Format(format!("decrypted profile map: {err}")))?;

        debug!(accounts = profiles.len(), "credentials store unsealed");
        inner.profiles = profiles;
        inner.state = UnsealState::Unsealed;
        drop(inner);

        self.publish(Ok(()));
        Ok(true)
    }

    /// One-shot readiness signal. Every watcher observes the same terminal
    /// value; waiting never busy-polls.
    pub fn ready(&self) -> ReadyWatcher {
        ReadyWatcher {
            rx: self.ready_tx.subscribe(),
        }
    }

    /// Record a permanent failure for waiters that will never see an
    /// unseal. A no-op once the slot is filled.
    pub fn fail(&self, err: Error) {
        self.publish(Err(err));
    }

    pub fn state(&self) -> UnsealState {
        self.inner.lock().unwrap().state
    }

    pub fn is_unsealed(&self) -> bool {
        self.state() == UnsealState::Unsealed
    }

    /// Resolve an account to its stored profile.
    pub fn profile_for(&self, account: &str) -> Result<ProfileEntry> {
        let inner = self.inner.lock().unwrap();
        if inner.state == UnsealState::Sealed {
            return Err(Error::NotReady("credentials store is sealed".into()));
        }
        inner
            .profiles
            .get(account)
            .cloned()
            .ok_or_else(|| Error::UnknownAccount(account.to_string()))
    }

    // Publishing after the slot is filled is a no-op; success and failure
    // race, first writer wins.
    fn publish(&self, outcome: Result<()>) {
        self.ready_tx.send_if_modified(|slot| {
            if slot.is_none() {
                *slot = Some(outcome);
                true
            } else {
                false
            }
        });
    }
}

/// Handle on the store's one-shot readiness signal.
pub struct ReadyWatcher {
    rx: watch::Receiver<ReadySlot>,
}

impl ReadyWatcher {
    /// Wait for the terminal readiness value.
    pub async fn wait(mut self) -> Result<()> {
        loop {
            let current = self.rx.borrow_and_update().clone();
            if let Some(outcome) = current {
                return outcome;
            }
            if self.rx.changed().await.is_err() {
                return Err(Error::NotReady("store dropped before unsealing".into()));
            }
        }
    }

    /// Non-blocking view of the slot.
    pub fn peek(&self) -> Option<Result<()>> {
        self.rx.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::envelope::EnvelopeDecryptor;

    fn profiles_json() -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "dev": {
                "access_key_id": "AKIADEV",
                "secret_access_key": "devsecret",
                "region": "us-east-1"
            },
            "prod": {
                "access_key_id": "AKIAPROD",
                "secret_access_key": "prodsecret",
                "region": "eu-west-1"
            }
        }))
        .unwrap()
    }

    fn loaded_store(secret: &str) -> SealedCredentialStore {
        let cipher = EnvelopeDecryptor::new();
        let blob = cipher.seal(secret, &profiles_json()).unwrap();
        let store = SealedCredentialStore::new(Box::new(cipher));
        store.load_bytes(blob).unwrap();
        store
    }

    #[test]
    fn load_rejects_malformed_blob() {
        let store = SealedCredentialStore::new(Box::new(EnvelopeDecryptor::new()));
        let err = store.load_bytes(b"not an envelope".to_vec()).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
        assert_eq!(store.state(), UnsealState::Sealed);
    }

    #[test]
    fn unseal_before_load_is_not_ready() {
        let store = SealedCredentialStore::new(Box::new(EnvelopeDecryptor::new()));
        let err = store.unseal("secret").unwrap_err();
        assert!(matches!(err, Error::NotReady(_)));
    }

    #[test]
    fn wrong_secret_leaves_store_sealed_and_retryable() {
        let store = loaded_store("correct");

        let err = store.unseal("wrong").unwrap_err();
        assert!(matches!(err, Error::Decryption(_)));
        assert_eq!(store.state(), UnsealState::Sealed);
        assert!(matches!(
            store.profile_for("dev"),
            Err(Error::NotReady(_))
        ));

        // A subsequent attempt with the right secret still succeeds.
        assert!(store.unseal("correct").unwrap());
        assert_eq!(store.state(), UnsealState::Unsealed);
    }

    #[test]
    fn unseal_is_idempotent() {
        let store = loaded_store("s3cret");
        assert!(store.unseal("s3cret").unwrap());
        // Second call is a no-op even with a different secret.
        assert!(store.unseal("anything").unwrap());
        assert_eq!(store.state(), UnsealState::Unsealed);
    }

    #[test]
    fn profile_resolution_after_unseal() {
        let store = loaded_store("s3cret");
        store.unseal("s3cret").unwrap();

        let dev = store.profile_for("dev").unwrap();
        assert_eq!(dev.access_key_id, "AKIADEV");
        assert!(matches!(
            store.profile_for("staging"),
            Err(Error::UnknownAccount(_))
        ));
    }

    #[test]
    fn garbage_plaintext_is_a_format_error() {
        let cipher = EnvelopeDecryptor::new();
        let blob = cipher.seal("s", b"not json").unwrap();
        let store = SealedCredentialStore::new(Box::new(cipher));
        store.load_bytes(blob).unwrap();

        let err = store.unseal("s").unwrap_err();
        assert!(matches!(err, Error::Format(_)));
        assert_eq!(store.state(), UnsealState::Sealed);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn readiness_latches_exactly_once() {
        let store = loaded_store("s3cret");
        let early = store.ready();
        assert!(early.peek().is_none());

        store.unseal("s3cret").unwrap();
        early.wait().await.unwrap();

        // Late watchers observe the same terminal value; a later failure
        // publication is a no-op.
        store.fail(Error::NotReady("too late".into()));
        store.ready().wait().await.unwrap();
    }

    #[tokio::test(flavor = "current_thread")]
    async fn permanent_failure_reaches_waiters() {
        let store = loaded_store("s3cret");
        store.fail(Error::NotReady("operator gave up".into()));

        let err = store.ready().wait().await.unwrap_err();
        assert!(matches!(err, Error::NotReady(_)));
    }
}
