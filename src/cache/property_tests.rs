//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check store, rotation and image sizing behavior.

use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;

use crate::cache::{CacheStore, RotationCursor};
use crate::config::{CropSpec, ImageLimits};
use crate::pipeline::transform::{crop_rect, fit_within};

// == Strategies ==
/// Generates valid source ids
fn source_id_strategy() -> impl Strategy<Value = String> {
    "[A-Z]{2}_[A-Za-z0-9]{1,12}".prop_map(|s| s)
}

fn fraction_strategy() -> impl Strategy<Value = f64> {
    0.0f64..=1.0
}

#[derive(Debug, Clone)]
enum StoreOp {
    Put { id: String, size: usize },
    Get { id: String },
    Exhausted,
}

fn store_op_strategy() -> impl Strategy<Value = StoreOp> {
    prop_oneof![
        (source_id_strategy(), 1usize..2048).prop_map(|(id, size)| StoreOp::Put { id, size }),
        source_id_strategy().prop_map(|id| StoreOp::Get { id }),
        Just(StoreOp::Exhausted),
    ]
}

fn edition() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

/// A buffer whose every byte encodes its own length, so a mixed or
/// truncated buffer is detectable.
fn stamped(size: usize) -> Bytes {
    Bytes::from(vec![(size % 251) as u8; size])
}

fn is_intact(png: &Bytes) -> bool {
    let stamp = (png.len() % 251) as u8;
    png.iter().all(|b| *b == stamp)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // The store behaves like a map where the last put per id wins.
    #[test]
    fn prop_last_put_wins(ops in prop::collection::vec(store_op_strategy(), 1..60)) {
        let mut store = CacheStore::new();
        let mut model: HashMap<String, usize> = HashMap::new();
        let mut updates = 0u64;
        let mut exhausted = 0u64;

        for op in ops {
            match op {
                StoreOp::Put { id, size } => {
                    store.put(&id, stamped(size), edition(), Utc::now()).unwrap();
                    model.insert(id, size);
                    updates += 1;
                }
                StoreOp::Get { id } => {
                    match (store.get(&id), model.get(&id)) {
                        (Ok(png), Some(size)) => {
                            prop_assert_eq!(png.len(), *size);
                        }
                        (Err(_), None) => {}
                        (got, want) => {
                            prop_assert!(false, "store {:?} vs model {:?}", got.map(|b| b.len()), want);
                        }
                    }
                }
                StoreOp::Exhausted => {
                    store.record_exhausted();
                    exhausted += 1;
                }
            }
        }

        let stats = store.stats();
        prop_assert_eq!(stats.updates, updates);
        prop_assert_eq!(stats.exhausted, exhausted);
        prop_assert_eq!(stats.total_entries, model.len());
    }

    // Serves walk the configured order and wrap around.
    #[test]
    fn prop_rotation_is_round_robin(
        ids in prop::collection::hash_set(source_id_strategy(), 1..8),
        serves in 0usize..100,
    ) {
        let ids: Vec<String> = ids.into_iter().collect();
        let cursor = RotationCursor::new(ids.clone());

        for n in 0..serves {
            prop_assert_eq!(cursor.advance(), Some(ids[n % ids.len()].as_str()));
        }
        prop_assert_eq!(cursor.position(), serves % ids.len());
    }

    // Without a crop, output is round(W*ratio) x round(H*ratio) and fits the limits.
    #[test]
    fn prop_fit_within_limits(
        width in 1u32..5000,
        height in 1u32..5000,
        max_width in 1u32..3000,
        max_height in 1u32..3000,
    ) {
        let limits = ImageLimits { dpi: 72, max_width, max_height };
        let (w, h) = fit_within(width, height, &limits);

        let ratio = (max_width as f64 / width as f64).min(max_height as f64 / height as f64);
        prop_assert_eq!(w, ((width as f64 * ratio).round() as u32).max(1));
        prop_assert_eq!(h, ((height as f64 * ratio).round() as u32).max(1));
        prop_assert!(w <= max_width.max(1) + 1);
        prop_assert!(h <= max_height.max(1) + 1);
    }

    // Any crop, however inverted, yields a non-empty rectangle inside the image.
    #[test]
    fn prop_crop_rect_stays_inside(
        width in 1u32..4000,
        height in 1u32..4000,
        left in fraction_strategy(),
        right in fraction_strategy(),
        top in fraction_strategy(),
        bottom in fraction_strategy(),
    ) {
        let crop = CropSpec { left, right, top, bottom };
        let (x, y, w, h) = crop_rect(width, height, &crop);

        prop_assert!(w >= 1 && h >= 1);
        prop_assert!(x + w <= width);
        prop_assert!(y + h <= height);
    }
}

// == Concurrent Access ==

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    // Readers racing a writer only ever see complete buffers.
    #[test]
    fn prop_concurrent_readers_never_see_torn_entries(
        sizes in prop::collection::vec(1usize..65_536, 5..30),
        readers in 2usize..8,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();

        rt.block_on(async {
            let store = Arc::new(RwLock::new(CacheStore::new()));

            let writer = {
                let store = Arc::clone(&store);
                let sizes = sizes.clone();
                tokio::spawn(async move {
                    for size in sizes {
                        store.write().await.put("NY_NYT", stamped(size), edition(), Utc::now()).unwrap();
                        tokio::task::yield_now().await;
                    }
                })
            };

            let mut handles = Vec::new();
            for _ in 0..readers {
                let store = Arc::clone(&store);
                handles.push(tokio::spawn(async move {
                    let mut seen = Vec::new();
                    for _ in 0..50 {
                        if let Ok(png) = store.read().await.get("NY_NYT") {
                            seen.push(png);
                        }
                        tokio::task::yield_now().await;
                    }
                    seen
                }));
            }

            writer.await.expect("writer should not panic");
            for handle in handles {
                for png in handle.await.expect("reader should not panic") {
                    prop_assert!(sizes.contains(&png.len()), "unexpected length {}", png.len());
                    prop_assert!(is_intact(&png), "torn buffer of length {}", png.len());
                }
            }

            Ok(())
        })?;
    }
}

// == Additional Unit Tests for Edge Cases ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamped_buffers_detect_mixing() {
        let mut mixed = stamped(10).to_vec();
        mixed.extend_from_slice(&stamped(20));
        assert!(!is_intact(&Bytes::from(mixed)));
        assert!(is_intact(&stamped(300)));
    }

    #[test]
    fn test_documented_crop_example() {
        let crop = CropSpec { left: 0.1, right: 0.1, top: 0.0, bottom: 0.0 };
        let (_, _, w, h) = crop_rect(1000, 800, &crop);
        assert_eq!((w, h), (800, 800));
    }
}
