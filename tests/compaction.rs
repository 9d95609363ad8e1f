use stowage::datafile::MIN_FILE_SIZE;
use stowage::{Store, StoreOptions, StringCodec};
use tempfile::tempdir;

#[test]
fn compact_preserves_ids_and_values_and_never_grows_the_file() -> stowage::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("store.daf");
    let mut store = Store::open(StoreOptions::new(&path), StringCodec)?;

    let mut kept = Vec::new();
    for i in 0..20 {
        let id = store.store(&format!("value-{i}"))?;
        if i % 2 == 0 {
            kept.push(id);
        } else {
            store.delete(id)?;
        }
    }

    let before = store.file_len()?;
    let ids_before = store.ids();
    store.compact()?;

    assert!(store.file_len()? <= before);
    assert_eq!(store.ids(), ids_before);
    for (i, id) in kept.iter().enumerate() {
        assert_eq!(store.get(*id)?, format!("value-{}", i * 2));
    }
    store.close()
}

#[test]
fn update_to_a_larger_value_then_delete_and_compact_reclaims_everything(
) -> stowage::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("store.daf");
    let mut store = Store::open(StoreOptions::new(&path), StringCodec)?;

    let id = store.store(&"A".repeat(10))?;
    store.update(id, &"B".repeat(1000))?;
    assert_eq!(store.get(id)?, "B".repeat(1000));

    store.delete(id)?;
    store.compact()?;
    assert_eq!(store.file_len()?, MIN_FILE_SIZE);
    store.close()
}

#[test]
fn deleting_everything_and_compacting_shrinks_to_the_minimum() -> stowage::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("store.daf");
    let mut store = Store::open(StoreOptions::new(&path), StringCodec)?;

    // 101 items force a second index block
    let ids: Vec<u64> = (0..101)
        .map(|i| store.store(&format!("{i}")))
        .collect::<stowage::Result<_>>()?;
    assert!(store.file_len()? > MIN_FILE_SIZE);

    for id in ids {
        store.delete(id)?;
    }
    store.compact()?;
    assert_eq!(store.file_len()?, MIN_FILE_SIZE);
    store.close()
}

#[test]
fn compact_on_a_fresh_store_changes_nothing() -> stowage::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("store.daf");
    let mut store = Store::open(StoreOptions::new(&path), StringCodec)?;

    let before = store.file_len()?;
    store.compact()?;
    assert_eq!(store.file_len()?, before);
    store.close()
}

#[test]
fn compacted_store_reopens_and_keeps_working() -> stowage::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("store.daf");

    {
        let mut store = Store::open(StoreOptions::new(&path), StringCodec)?;
        let gone = store.store(&"X".repeat(600))?;
        let kept = store.store(&"keep".to_string())?;
        store.delete(gone)?;
        store.compact()?;
        assert_eq!(store.get(kept)?, "keep");
        store.close()?;
    }

    let mut store = Store::open(StoreOptions::new(&path), StringCodec)?;
    assert_eq!(store.ids(), vec![501]);
    assert_eq!(store.get(501)?, "keep");
    assert_eq!(store.store(&"more".to_string())?, 502);
    store.close()
}

#[test]
fn repeated_compaction_is_stable() -> stowage::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("store.daf");
    let mut store = Store::open(StoreOptions::new(&path), StringCodec)?;

    for i in 0..10 {
        store.store(&format!("v{i}"))?;
    }
    store.compact()?;
    let after_first = store.file_len()?;
    store.compact()?;
    assert_eq!(store.file_len()?, after_first);
    assert_eq!(store.len(), 10);
    store.close()
}
