//! Property-based tests for ledger invariants
//!
//! These tests use proptest to verify:
//! - Register on an absent ID succeeds, a second register fails and changes nothing
//! - Update is visible to the next authenticate
//! - Delete makes the ID absent again
//! - Enumeration returns one entry per live record, in key order
//! - Canonical encoding is stable and round-trips

use device_ledger::{canonical, Config, DeviceRecord, Error, Ledger};
use proptest::prelude::*;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Strategy for generating device IDs
fn device_id_strategy() -> impl Strategy<Value = String> {
    "[A-Z][A-Za-z0-9_-]{0,11}"
}

/// Strategy for generating statuses (never `Inactive`)
fn active_status_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Active".to_string()),
        Just("Admin".to_string()),
        "[a-z]{1,8}",
    ]
}

/// Strategy for arbitrary records, including null fields and docType
fn record_strategy() -> impl Strategy<Value = DeviceRecord> {
    (
        proptest::option::of(".{0,16}"),
        proptest::option::of(".{0,16}"),
        proptest::option::of("[a-z]{1,8}"),
    )
        .prop_map(|(id, status, doc_type)| DeviceRecord {
            id,
            status,
            doc_type,
        })
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

async fn create_test_ledger() -> Ledger {
    Ledger::open(Config::in_memory()).await.unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: first register wins, second leaves the record unchanged
    #[test]
    fn prop_register_then_duplicate(
        id in device_id_strategy(),
        first in active_status_strategy(),
        second in active_status_strategy(),
    ) {
        runtime().block_on(async {
            let ledger = create_test_ledger().await;

            prop_assert!(!ledger.device_exists(&id).await.unwrap());
            let encoded = ledger.register_device(&id, &first).await.unwrap();
            prop_assert!(ledger.device_exists(&id).await.unwrap());

            let err = ledger.register_device(&id, &second).await.unwrap_err();
            prop_assert!(matches!(err, Error::AlreadyExists(_)));
            prop_assert_eq!(ledger.authenticate_device(&id).await.unwrap(), encoded);

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: authenticate after update sees the new status
    #[test]
    fn prop_update_visible(
        id in device_id_strategy(),
        before in active_status_strategy(),
        after in active_status_strategy(),
    ) {
        runtime().block_on(async {
            let ledger = create_test_ledger().await;

            ledger.register_device(&id, &before).await.unwrap();
            ledger.update_device(&id, &after).await.unwrap();

            let stored = ledger.authenticate_device(&id).await.unwrap();
            let record = DeviceRecord::from_slice(stored.as_bytes()).unwrap();
            prop_assert_eq!(record.status.as_deref(), Some(after.as_str()));

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: delete makes the ID absent and authenticate fails NotFound
    #[test]
    fn prop_delete_removes(id in device_id_strategy(), status in active_status_strategy()) {
        runtime().block_on(async {
            let ledger = create_test_ledger().await;

            ledger.register_device(&id, &status).await.unwrap();
            ledger.delete_device(&id).await.unwrap();

            prop_assert!(!ledger.device_exists(&id).await.unwrap());
            let err = ledger.authenticate_device(&id).await.unwrap_err();
            prop_assert!(matches!(err, Error::NotFound(_)));

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: N registrations (plus placeholder) enumerate as N + 1 entries
    #[test]
    fn prop_list_all_matches_last_writes(
        writes in prop::collection::vec((device_id_strategy(), active_status_strategy()), 1..20)
    ) {
        runtime().block_on(async {
            let ledger = create_test_ledger().await;
            ledger.init_ledger().await.unwrap();

            let mut expected = BTreeMap::new();
            for (id, status) in &writes {
                if expected.contains_key(id) {
                    ledger.update_device(id, status).await.unwrap();
                } else {
                    ledger.register_device(id, status).await.unwrap();
                }
                expected.insert(id.clone(), status.clone());
            }

            let listed = ledger.list_all_devices().await.unwrap();
            prop_assert_eq!(listed.len(), expected.len() + 1);

            // Placeholder sorts first under the empty key
            prop_assert_eq!(&listed[0]["docType"], &Value::from("device"));
            for (value, (id, status)) in listed[1..].iter().zip(expected.iter()) {
                prop_assert_eq!(&value["ID"], &Value::from(id.as_str()));
                prop_assert_eq!(&value["Status"], &Value::from(status.as_str()));
            }

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: canonical encoding round-trips
    #[test]
    fn prop_canonical_round_trip(record in record_strategy()) {
        let bytes = record.to_canonical_bytes().unwrap();
        let decoded = DeviceRecord::from_slice(&bytes).unwrap();
        prop_assert_eq!(decoded, record);
    }

    /// Property: insertion order does not affect encoded bytes
    #[test]
    fn prop_canonical_order_independent(
        fields in prop::collection::btree_map("[A-Za-z]{1,6}", ".{0,8}", 0..8)
    ) {
        let mut forward = Map::new();
        for (k, v) in fields.iter() {
            forward.insert(k.clone(), Value::from(v.as_str()));
        }
        let mut reverse = Map::new();
        for (k, v) in fields.iter().rev() {
            reverse.insert(k.clone(), Value::from(v.as_str()));
        }

        let a = canonical::to_canonical_vec(&Value::Object(forward)).unwrap();
        let b = canonical::to_canonical_vec(&Value::Object(reverse)).unwrap();
        prop_assert_eq!(a, b);
    }
}
