use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stowage::{Store, StoreOptions, StringCodec};
use tempfile::tempdir;

const SEED: u64 = 42;
const ITERATIONS: usize = 600;

fn random_string(rng: &mut StdRng) -> String {
    let len = rng.gen_range(5..15);
    (0..len)
        .map(|_| rng.gen_range(b'a'..=b'z') as char)
        .collect()
}

fn verify_against_model(
    store: &mut Store<StringCodec>,
    model: &HashMap<u64, String>,
) -> stowage::Result<()> {
    assert_eq!(store.len(), model.len());
    for (id, expected) in model {
        assert!(store.contains(*id));
        assert_eq!(&store.get(*id)?, expected);
    }
    for id in store.ids() {
        assert!(model.contains_key(&id));
    }
    Ok(())
}

#[test]
fn mixed_random_operations_with_reopens_preserve_contents() -> stowage::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("stress.daf");
    let mut rng = StdRng::seed_from_u64(SEED);

    let mut store = Store::open(StoreOptions::new(&path), StringCodec)?;
    let mut model: HashMap<u64, String> = HashMap::new();
    let mut ids: Vec<u64> = Vec::new();

    for _ in 0..ITERATIONS {
        match rng.gen_range(0..5) {
            // create
            0 | 1 => {
                let value = random_string(&mut rng);
                let id = store.store(&value)?;
                assert!(model.insert(id, value.clone()).is_none());
                ids.push(id);
                assert_eq!(store.get(id)?, value);
            }
            // delete
            2 => {
                if ids.is_empty() {
                    continue;
                }
                let pick = rng.gen_range(0..ids.len());
                let id = ids.swap_remove(pick);
                store.delete(id)?;
                model.remove(&id);
                assert!(!store.contains(id));
            }
            // update
            3 => {
                if ids.is_empty() {
                    continue;
                }
                let id = ids[rng.gen_range(0..ids.len())];
                let value = random_string(&mut rng);
                store.update(id, &value)?;
                model.insert(id, value.clone());
                assert_eq!(store.get(id)?, value);
            }
            // reopen, occasionally compacting first
            _ => {
                if rng.gen_bool(0.5) {
                    store.compact()?;
                }
                store.close()?;
                store = Store::open(StoreOptions::new(&path), StringCodec)?;
                verify_against_model(&mut store, &model)?;
            }
        }
    }

    verify_against_model(&mut store, &model)?;
    store.compact()?;
    verify_against_model(&mut store, &model)?;
    store.close()
}
