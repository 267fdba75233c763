use anyhow::Result;
use futures_util::TryStreamExt;
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use tessel_map::{ChunkingConfig, Entry, Kind, OrderedMap, Value};
use tessel_storage::{Blake3Hash, CborEncoder, MemoryStorageBackend, Storage};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen_test::wasm_bindgen_test;
#[cfg(target_arch = "wasm32")]
wasm_bindgen_test::wasm_bindgen_test_configure!(run_in_dedicated_worker);

type TestStorage = Storage<CborEncoder, MemoryStorageBackend<Blake3Hash, Vec<u8>>>;

fn make_storage() -> TestStorage {
    Storage {
        encoder: CborEncoder,
        backend: MemoryStorageBackend::default(),
    }
}

fn string(value: &str) -> String {
    value.to_string()
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
#[cfg_attr(not(target_arch = "wasm32"), tokio::test)]
async fn basic_set_get_remove_and_diff() -> Result<()> {
    let m0 = OrderedMap::from_entries(
        [(1u64, string("a")), (5, string("b")), (9, string("c"))],
        make_storage(),
    )
    .await?;
    let m1 = m0.set(5, string("B")).await?;

    let diff = m1.diff(&m0).await?;
    assert!(diff.added.is_empty());
    assert!(diff.removed.is_empty());
    assert_eq!(diff.modified, vec![5]);

    let m2 = m1.remove(&1).await?;
    assert!(!m2.has(&1).await?);
    assert_eq!(m2.size(), 2);
    assert_eq!(
        m2.entries().await?,
        vec![Entry::new(5, string("B")), Entry::new(9, string("c"))]
    );

    // Earlier versions are untouched
    assert_eq!(m0.get(&5).await?, Some(string("b")));
    assert!(m1.has(&1).await?);
    Ok(())
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
#[cfg_attr(not(target_arch = "wasm32"), tokio::test)]
async fn alternate_insertion_order_results_in_same_hash() -> Result<()> {
    let storage = make_storage();
    let mut keys: Vec<u32> = (0..1500).collect();
    keys.shuffle(&mut StdRng::seed_from_u64(7));

    let mut map = OrderedMap::new(storage.clone()).await?;
    for key in keys.iter() {
        map = map.set(*key, key * 3).await?;
    }

    let expected =
        OrderedMap::from_entries((0u32..1500).map(|key| (key, key * 3)), storage).await?;

    assert_eq!(map.hash(), expected.hash());
    assert_eq!(map.size(), 1500);
    Ok(())
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
#[cfg_attr(not(target_arch = "wasm32"), tokio::test)]
async fn removals_match_a_map_built_without_the_removed_keys() -> Result<()> {
    let storage = make_storage();
    let config = ChunkingConfig::with_average(3);
    let mut rng = StdRng::seed_from_u64(11);

    let mut map =
        OrderedMap::from_entries_with_config((0u32..600).map(|key| (key, key)), storage.clone(), config)
            .await?;

    let mut removed: Vec<u32> = (0..600).collect();
    removed.shuffle(&mut rng);
    removed.truncate(400);

    for key in removed.iter() {
        map = map.remove(key).await?;
    }

    let expected = OrderedMap::from_entries_with_config(
        (0u32..600)
            .filter(|key| !removed.contains(key))
            .map(|key| (key, key)),
        storage,
        config,
    )
    .await?;

    assert_eq!(map.hash(), expected.hash());
    assert_eq!(map.size(), 200);
    for key in removed.iter().take(20) {
        assert!(!map.has(key).await?);
    }
    Ok(())
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
#[cfg_attr(not(target_arch = "wasm32"), tokio::test)]
async fn removing_every_key_yields_the_empty_map() -> Result<()> {
    let storage = make_storage();
    let config = ChunkingConfig::with_average(2);
    let empty = OrderedMap::<u32, u32, _>::with_config(storage.clone(), config).await?;
    let mut map =
        OrderedMap::from_entries_with_config((0u32..300).map(|key| (key, key)), storage, config)
            .await?;

    for key in (0..300).rev() {
        map = map.remove(&key).await?;
    }

    assert!(map.is_empty());
    assert_eq!(map.hash(), empty.hash());
    assert_eq!(map.first().await?, None);
    Ok(())
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
#[cfg_attr(not(target_arch = "wasm32"), tokio::test)]
async fn traversal_is_ordered_and_matches_size() -> Result<()> {
    let mut keys: Vec<i64> = (0..2000).map(|key| key * 7 - 3000).collect();
    keys.shuffle(&mut StdRng::seed_from_u64(3));

    let map = OrderedMap::from_entries(keys.iter().map(|key| (*key, string("v"))), make_storage())
        .await?;
    let entries = map.entries().await?;

    assert_eq!(entries.len() as u64, map.size());
    assert!(entries.windows(2).all(|pair| pair[0].key < pair[1].key));
    assert_eq!(map.first().await?.map(|entry| entry.key), Some(-3000));
    assert_eq!(map.last().await?.map(|entry| entry.key), Some(1999 * 7 - 3000));
    Ok(())
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
#[cfg_attr(not(target_arch = "wasm32"), tokio::test)]
async fn setting_an_equal_value_returns_the_same_map() -> Result<()> {
    let map = OrderedMap::from_entries((0u32..500).map(|key| (key, key)), make_storage()).await?;

    let unchanged = map.set(250, 250).await?;
    assert!(Arc::ptr_eq(map.root(), unchanged.root()));

    let unchanged = map.remove(&10_000).await?;
    assert!(Arc::ptr_eq(map.root(), unchanged.root()));

    let changed = map.set(250, 0).await?;
    assert_ne!(map.hash(), changed.hash());
    assert_eq!(changed.get(&250).await?, Some(0));
    assert_eq!(changed.size(), 500);
    Ok(())
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
#[cfg_attr(not(target_arch = "wasm32"), tokio::test)]
async fn round_trips_through_storage() -> Result<()> {
    let storage = make_storage();
    let map = OrderedMap::from_entries(
        (0u32..1000).map(|key| (format!("key-{key:04}"), key)),
        storage.clone(),
    )
    .await?;

    let loaded = OrderedMap::<String, u32, _>::load(map.hash(), storage).await?;

    assert_eq!(loaded.size(), 1000);
    assert_eq!(loaded.get(&string("key-0421")).await?, Some(421));
    assert_eq!(loaded.get(&string("key-1421")).await?, None);

    let edited = loaded.set(string("key-0421a"), 7).await?;
    assert_eq!(edited.size(), 1001);
    assert_eq!(
        edited.hash(),
        map.set(string("key-0421a"), 7).await?.hash()
    );
    Ok(())
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
#[cfg_attr(not(target_arch = "wasm32"), tokio::test)]
async fn streams_restart_from_a_key() -> Result<()> {
    let map =
        OrderedMap::from_entries((0u32..300).map(|key| (key * 2, key)), make_storage()).await?;

    let tail: Vec<u32> = map
        .stream_from(&551)
        .map_ok(|entry| entry.key)
        .try_collect()
        .await?;
    assert_eq!(tail, (276u32..300).map(|key| key * 2).collect::<Vec<_>>());

    let beyond: Vec<Entry<u32, u32>> = map.stream_from(&1000).try_collect().await?;
    assert!(beyond.is_empty());

    let again: Vec<Entry<u32, u32>> = map.stream().try_collect().await?;
    assert_eq!(again.len(), 300);
    Ok(())
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
#[cfg_attr(not(target_arch = "wasm32"), tokio::test)]
async fn for_each_visits_every_entry_in_order() -> Result<()> {
    let map =
        OrderedMap::from_entries((0u32..400).map(|key| (key, key + 1)), make_storage()).await?;
    let visited = Arc::new(Mutex::new(Vec::new()));

    map.for_each(|value, key| {
        // Invocation order is what is recorded; completion order is free
        visited.lock().unwrap().push((key, value));
        async { Ok::<(), std::convert::Infallible>(()) }
    })
    .await?;

    let visited = visited.lock().unwrap().clone();
    assert_eq!(visited, (0u32..400).map(|key| (key, key + 1)).collect::<Vec<_>>());
    Ok(())
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
#[cfg_attr(not(target_arch = "wasm32"), tokio::test)]
async fn for_each_waits_for_every_callback_to_complete() -> Result<()> {
    let map =
        OrderedMap::from_entries((0u32..200).map(|key| (key, key)), make_storage()).await?;
    let completed = Arc::new(AtomicUsize::new(0));

    map.for_each(|value, _| {
        let completed = completed.clone();
        async move {
            // Suspend a different number of times so completions interleave
            for _ in 0..(value % 4) + 1 {
                tokio::task::yield_now().await;
            }
            completed.fetch_add(1, Ordering::SeqCst);
            Ok::<(), std::convert::Infallible>(())
        }
    })
    .await?;

    assert_eq!(completed.load(Ordering::SeqCst), 200);
    Ok(())
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
#[cfg_attr(not(target_arch = "wasm32"), tokio::test)]
async fn infers_the_kinds_of_heterogeneous_entries() -> Result<()> {
    let map = OrderedMap::from_entries(
        [
            (Value::from(1i64), Value::from("one")),
            (Value::from("two"), Value::from(2i64)),
            (Value::from(false), Value::from("three")),
        ],
        make_storage(),
    )
    .await?;

    let map_type = map.map_type().await?;
    assert_eq!(
        map_type.keys.into_iter().collect::<Vec<_>>(),
        vec![Kind::Bool, Kind::Integer, Kind::String]
    );
    assert_eq!(
        map_type.values.into_iter().collect::<Vec<_>>(),
        vec![Kind::Integer, Kind::String]
    );
    assert_eq!(
        map.first().await?.map(|entry| entry.key),
        Some(Value::Bool(false))
    );
    Ok(())
}
