//! Artifact map behaviour over the in-memory storage backend.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use saml_binding::artifact::{ArtifactMapEntry, ManualClock, SamlArtifactMap};
use saml_binding::{LogoutRequest, Response};
use saml_storage::{InMemoryStorageService, StorageService};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn setup() -> (SamlArtifactMap, Arc<ManualClock>, Arc<InMemoryStorageService<ArtifactMapEntry>>) {
    init_tracing();
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    ));
    let storage = Arc::new(InMemoryStorageService::<ArtifactMapEntry>::new());
    let map = SamlArtifactMap::new(storage.clone()).with_clock(clock.clone());
    (map, clock, storage)
}

#[test]
fn put_then_get_before_expiry() -> anyhow::Result<()> {
    let (map, clock, _) = setup();
    let response = Response::success("https://idp.example.com")
        .with_id("_art1")
        .in_response_to("_req1");

    map.put(
        "AAQAAMFbLinlXaCM",
        "https://sp.example.com",
        "https://idp.example.com",
        &response,
        Duration::from_secs(60),
    )?;

    clock.advance(Duration::from_secs(59));
    let entry = map
        .get("AAQAAMFbLinlXaCM")?
        .ok_or_else(|| anyhow::anyhow!("entry missing before expiry"))?;
    assert_eq!(entry.artifact(), "AAQAAMFbLinlXaCM");

    let message = map.message(&entry)?;
    assert_eq!(message.element_name(), "Response");
    assert_eq!(message.id(), "_art1");
    assert_eq!(message.issuer(), "https://idp.example.com");
    Ok(())
}

#[test]
fn get_at_expiration_instant_is_absent() -> anyhow::Result<()> {
    let (map, clock, _) = setup();
    let request = LogoutRequest::new("https://sp.example.com", "alice");

    map.put("AAQ-exp", "sp", "idp", &request, Duration::from_secs(60))?;
    clock.advance(Duration::from_secs(60));

    assert!(map.get("AAQ-exp")?.is_none());
    assert!(!map.contains("AAQ-exp")?);
    Ok(())
}

#[test]
fn remove_is_idempotent() -> anyhow::Result<()> {
    let (map, _, _) = setup();
    let response = Response::success("https://idp.example.com");

    map.put("AAQ-rm", "sp", "idp", &response, Duration::from_secs(60))?;
    map.remove("AAQ-rm")?;
    map.remove("AAQ-rm")?;
    map.remove("never-stored")?;

    assert!(map.get("AAQ-rm")?.is_none());
    Ok(())
}

#[test]
fn corrupt_entry_reports_deserialization_error() -> anyhow::Result<()> {
    let (map, _, storage) = setup();
    let entry = ArtifactMapEntry::new(
        "AAQ-bad",
        "idp",
        "sp",
        "<samlp:Response",
        Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
    );
    storage.put(map.partition(), "AAQ-bad", entry)?;

    let entry = map
        .get("AAQ-bad")?
        .ok_or_else(|| anyhow::anyhow!("entry missing"))?;
    assert!(map.message(&entry).is_err());
    Ok(())
}

#[test]
fn sweep_removes_only_expired_entries() -> anyhow::Result<()> {
    let (map, clock, _) = setup();
    let response = Response::success("https://idp.example.com");

    map.put("short", "sp", "idp", &response, Duration::from_secs(10))?;
    map.put("long", "sp", "idp", &response, Duration::from_secs(600))?;
    clock.advance(Duration::from_secs(30));

    assert_eq!(map.sweep_expired()?, 1);
    assert!(!map.contains("short")?);
    assert!(map.contains("long")?);
    Ok(())
}

#[test]
fn concurrent_puts_and_gets() -> anyhow::Result<()> {
    let (map, _, _) = setup();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let map = map.clone();
            std::thread::spawn(move || -> anyhow::Result<()> {
                let artifact = format!("AAQ-{i}");
                let response = Response::success("https://idp.example.com");
                map.put(&artifact, "sp", "idp", &response, Duration::from_secs(60))?;
                anyhow::ensure!(map.get(&artifact)?.is_some(), "lost {artifact}");
                Ok(())
            })
        })
        .collect();

    for handle in handles {
        handle
            .join()
            .map_err(|_| anyhow::anyhow!("worker panicked"))??;
    }
    Ok(())
}
