//! SAML artifact map.
//!
//! Parks serialized protocol messages behind opaque artifact strings so the
//! artifact binding can hand out a reference and redeem it later. Entries
//! carry an absolute expiration time and are evicted the first time a read
//! observes them expired; no background timer is involved.
//!
//! `get` followed by `remove` is not atomic. Two concurrent redemptions of the
//! same live artifact can both succeed.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use saml_storage::StorageService;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::codec::{MessageCodec, XmlMessageCodec};
use crate::config::BindingConfig;
use crate::error::{DeserializationError, SamlError, SamlResult};
use crate::types::SamlMessage;

/// Default storage partition for artifacts.
pub const DEFAULT_ARTIFACT_PARTITION: &str = "artifact";

/// Lifetime applied by [`SamlArtifactMap::store`] unless configured.
pub const DEFAULT_ARTIFACT_LIFETIME: Duration = Duration::from_secs(60);

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current UTC time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Creates a clock stopped at `start`.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let delta = chrono::Duration::from_std(by).unwrap_or(chrono::Duration::MAX);
        let mut now = self.now.lock();
        *now = now.checked_add_signed(delta).unwrap_or(DateTime::<Utc>::MAX_UTC);
    }

    /// Sets the clock to an absolute time.
    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// A stored artifact entry.
///
/// All fields are fixed at construction; the message is kept in its wire
/// form and only parsed on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMapEntry {
    artifact: String,
    issuer_id: String,
    relying_party_id: String,
    serialized_message: String,
    expiration_time: DateTime<Utc>,
}

impl ArtifactMapEntry {
    /// Creates an entry.
    #[must_use]
    pub fn new(
        artifact: impl Into<String>,
        issuer_id: impl Into<String>,
        relying_party_id: impl Into<String>,
        serialized_message: impl Into<String>,
        expiration_time: DateTime<Utc>,
    ) -> Self {
        Self {
            artifact: artifact.into(),
            issuer_id: issuer_id.into(),
            relying_party_id: relying_party_id.into(),
            serialized_message: serialized_message.into(),
            expiration_time,
        }
    }

    /// The artifact this entry is stored under.
    #[must_use]
    pub fn artifact(&self) -> &str {
        &self.artifact
    }

    /// The entity that created the entry.
    #[must_use]
    pub fn issuer_id(&self) -> &str {
        &self.issuer_id
    }

    /// The entity entitled to redeem it.
    #[must_use]
    pub fn relying_party_id(&self) -> &str {
        &self.relying_party_id
    }

    /// The message in wire form.
    #[must_use]
    pub fn serialized_message(&self) -> &str {
        &self.serialized_message
    }

    /// When the entry stops being redeemable.
    #[must_use]
    pub const fn expiration_time(&self) -> DateTime<Utc> {
        self.expiration_time
    }

    /// Returns true if the entry is expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiration_time
    }

    /// Returns true if the entry is expired now.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Artifact map over a [`StorageService`].
#[derive(Clone)]
pub struct SamlArtifactMap {
    storage: Arc<dyn StorageService<ArtifactMapEntry>>,
    codec: Arc<dyn MessageCodec>,
    partition: String,
    default_lifetime: Duration,
    clock: Arc<dyn Clock>,
}

impl SamlArtifactMap {
    /// Creates a map over `storage` using the XML codec, the default
    /// partition and the system clock.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageService<ArtifactMapEntry>>) -> Self {
        Self {
            storage,
            codec: Arc::new(XmlMessageCodec::with_defaults()),
            partition: DEFAULT_ARTIFACT_PARTITION.to_string(),
            default_lifetime: DEFAULT_ARTIFACT_LIFETIME,
            clock: Arc::new(SystemClock),
        }
    }

    /// Creates a map using the configured partition and artifact lifetime.
    #[must_use]
    pub fn from_config(
        storage: Arc<dyn StorageService<ArtifactMapEntry>>,
        config: &BindingConfig,
    ) -> Self {
        Self::new(storage)
            .with_partition(config.artifact_partition.clone())
            .with_default_lifetime(config.artifact_lifetime())
    }

    /// Uses another storage partition.
    #[must_use]
    pub fn with_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = partition.into();
        self
    }

    /// Sets the lifetime used by [`Self::store`].
    #[must_use]
    pub const fn with_default_lifetime(mut self, lifetime: Duration) -> Self {
        self.default_lifetime = lifetime;
        self
    }

    /// Uses another message codec.
    #[must_use]
    pub fn with_codec(mut self, codec: Arc<dyn MessageCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Uses another clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The storage partition in use.
    #[must_use]
    pub fn partition(&self) -> &str {
        &self.partition
    }

    /// Checks whether an entry is stored under `artifact`.
    ///
    /// Expiry is not checked; use [`Self::get`] for liveness.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Storage`] if the backend fails.
    pub fn contains(&self, artifact: &str) -> SamlResult<bool> {
        Ok(self.storage.contains(&self.partition, artifact)?)
    }

    /// Serializes `message` and stores it under `artifact` for `lifetime`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Serialization`] if the message cannot be
    /// serialized (nothing is stored) and [`SamlError::Storage`] if the
    /// backend fails.
    pub fn put(
        &self,
        artifact: &str,
        relying_party_id: &str,
        issuer_id: &str,
        message: &dyn SamlMessage,
        lifetime: Duration,
    ) -> SamlResult<()> {
        let serialized_message = self.codec.serialize(message)?;

        let lifetime = chrono::Duration::from_std(lifetime).map_err(|_| {
            SamlError::Configuration(format!("artifact lifetime out of range: {lifetime:?}"))
        })?;
        let expiration_time = self
            .clock
            .now()
            .checked_add_signed(lifetime)
            .ok_or_else(|| SamlError::Configuration("artifact expiry overflows".to_string()))?;

        let entry = ArtifactMapEntry::new(
            artifact,
            issuer_id,
            relying_party_id,
            serialized_message,
            expiration_time,
        );
        self.storage.put(&self.partition, artifact, entry)?;

        debug!(
            partition = %self.partition,
            relying_party = relying_party_id,
            message = message.element_name(),
            expires = %expiration_time,
            "Stored artifact"
        );
        Ok(())
    }

    /// Like [`Self::put`] with the map's default lifetime.
    ///
    /// # Errors
    ///
    /// See [`Self::put`].
    pub fn store(
        &self,
        artifact: &str,
        relying_party_id: &str,
        issuer_id: &str,
        message: &dyn SamlMessage,
    ) -> SamlResult<()> {
        self.put(artifact, relying_party_id, issuer_id, message, self.default_lifetime)
    }

    /// Fetches the live entry for `artifact`.
    ///
    /// An expired entry is removed and reported as absent.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Storage`] if the backend fails.
    pub fn get(&self, artifact: &str) -> SamlResult<Option<ArtifactMapEntry>> {
        let Some(entry) = self.storage.get(&self.partition, artifact)? else {
            return Ok(None);
        };

        if entry.is_expired_at(self.clock.now()) {
            debug!(partition = %self.partition, "Artifact expired; removing");
            self.remove(artifact)?;
            return Ok(None);
        }

        Ok(Some(entry))
    }

    /// Removes the entry for `artifact`. Removing an absent artifact is not
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Storage`] if the backend fails.
    pub fn remove(&self, artifact: &str) -> SamlResult<()> {
        if self.storage.remove(&self.partition, artifact)?.is_some() {
            debug!(partition = %self.partition, "Removed artifact");
        }
        Ok(())
    }

    /// Parses the entry's stored message.
    ///
    /// A failure is logged at warning level and returned to the caller, who
    /// will usually treat it like a missing artifact.
    ///
    /// # Errors
    ///
    /// Returns the [`DeserializationError`] from the codec.
    pub fn message(
        &self,
        entry: &ArtifactMapEntry,
    ) -> Result<Box<dyn SamlMessage>, DeserializationError> {
        self.codec
            .deserialize(entry.serialized_message())
            .inspect_err(|e| {
                warn!(
                    issuer = entry.issuer_id(),
                    relying_party = entry.relying_party_id(),
                    error = %e,
                    "Unable to parse stored artifact message"
                );
            })
    }

    /// Removes every expired entry in the partition, returning how many
    /// were removed.
    ///
    /// Reads stay correct without this; it only bounds storage growth.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Storage`] if the backend fails.
    pub fn sweep_expired(&self) -> SamlResult<usize> {
        let now = self.clock.now();
        let mut removed = 0;

        for key in self.storage.keys(&self.partition)? {
            let expired = self
                .storage
                .get(&self.partition, &key)?
                .is_some_and(|entry| entry.is_expired_at(now));
            if expired && self.storage.remove(&self.partition, &key)?.is_some() {
                removed += 1;
            }
        }

        debug!(partition = %self.partition, removed, "Swept expired artifacts");
        Ok(removed)
    }
}

impl std::fmt::Debug for SamlArtifactMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamlArtifactMap")
            .field("partition", &self.partition)
            .field("default_lifetime", &self.default_lifetime)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use saml_storage::InMemoryStorageService;

    use super::*;
    use crate::types::Response;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn map_with_clock() -> (SamlArtifactMap, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start()));
        let storage = Arc::new(InMemoryStorageService::<ArtifactMapEntry>::new());
        let map = SamlArtifactMap::new(storage).with_clock(clock.clone());
        (map, clock)
    }

    #[test]
    fn entry_expiry_is_inclusive() {
        let entry = ArtifactMapEntry::new("a", "idp", "sp", "<x/>", start());
        assert!(!entry.is_expired_at(start() - chrono::Duration::milliseconds(1)));
        assert!(entry.is_expired_at(start()));
    }

    #[test]
    fn put_records_expiration() {
        let (map, _clock) = map_with_clock();
        let response = Response::success("https://idp.example.com");

        map.put(
            "AAQ1",
            "https://sp.example.com",
            "https://idp.example.com",
            &response,
            Duration::from_secs(60),
        )
        .unwrap();

        let entry = map.get("AAQ1").unwrap().unwrap();
        assert_eq!(entry.expiration_time(), start() + chrono::Duration::seconds(60));
        assert_eq!(entry.relying_party_id(), "https://sp.example.com");
        assert_eq!(entry.issuer_id(), "https://idp.example.com");
    }

    #[test]
    fn expired_entry_is_evicted_on_read() {
        let (map, clock) = map_with_clock();
        let response = Response::success("https://idp.example.com");
        map.put("AAQ2", "sp", "idp", &response, Duration::from_secs(30)).unwrap();

        clock.advance(Duration::from_secs(30));
        assert!(map.contains("AAQ2").unwrap());
        assert!(map.get("AAQ2").unwrap().is_none());
        assert!(!map.contains("AAQ2").unwrap());
    }

    #[test]
    fn custom_partition_is_isolated() {
        let storage = Arc::new(InMemoryStorageService::<ArtifactMapEntry>::new());
        let a = SamlArtifactMap::new(storage.clone());
        let b = SamlArtifactMap::new(storage).with_partition("other");
        let response = Response::success("https://idp.example.com");

        a.put("AAQ3", "sp", "idp", &response, Duration::from_secs(60)).unwrap();
        assert!(a.contains("AAQ3").unwrap());
        assert!(!b.contains("AAQ3").unwrap());
        assert_eq!(b.partition(), "other");
    }

    #[test]
    fn from_config_uses_partition_and_lifetime() {
        let clock = Arc::new(ManualClock::new(start()));
        let storage = Arc::new(InMemoryStorageService::<ArtifactMapEntry>::new());
        let config = BindingConfig {
            artifact_partition: "artifacts-eu".to_string(),
            artifact_lifetime_secs: 120,
            ..BindingConfig::default()
        };
        let map = SamlArtifactMap::from_config(storage.clone(), &config).with_clock(clock.clone());
        assert_eq!(map.partition(), "artifacts-eu");

        let response = Response::success("https://idp.example.com");
        map.store("AAQ5", "sp", "idp", &response).unwrap();

        let entry = map.get("AAQ5").unwrap().unwrap();
        assert_eq!(entry.expiration_time(), start() + chrono::Duration::seconds(120));
        assert!(storage.contains("artifacts-eu", "AAQ5").unwrap());
        assert!(!storage.contains(DEFAULT_ARTIFACT_PARTITION, "AAQ5").unwrap());

        clock.advance(Duration::from_secs(120));
        assert!(map.get("AAQ5").unwrap().is_none());
    }

    #[test]
    fn store_defaults_to_one_minute() {
        let (map, _clock) = map_with_clock();
        let response = Response::success("https://idp.example.com");
        map.store("AAQ6", "sp", "idp", &response).unwrap();

        let entry = map.get("AAQ6").unwrap().unwrap();
        assert_eq!(entry.expiration_time(), start() + chrono::Duration::seconds(60));
    }

    #[test]
    fn corrupt_entry_yields_error() {
        let storage = Arc::new(InMemoryStorageService::<ArtifactMapEntry>::new());
        let map = SamlArtifactMap::new(storage.clone());
        let entry = ArtifactMapEntry::new(
            "AAQ4",
            "idp",
            "sp",
            "<samlp:Response",
            Utc::now() + chrono::Duration::seconds(60),
        );
        storage.put(DEFAULT_ARTIFACT_PARTITION, "AAQ4", entry).unwrap();

        let entry = map.get("AAQ4").unwrap().unwrap();
        assert!(matches!(
            map.message(&entry),
            Err(DeserializationError::Malformed(_))
        ));
    }

    #[test]
    fn entry_serde_roundtrip() {
        let entry = ArtifactMapEntry::new("AAQ5", "idp", "sp", "<x/>", start());
        let json = serde_json::to_string(&entry).unwrap();
        let back: ArtifactMapEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
