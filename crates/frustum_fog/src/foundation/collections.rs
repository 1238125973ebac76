//! Specialized collection types

pub use slotmap::{SlotMap, DefaultKey, Key, KeyData};

/// Handle-based map using slot map for stable references
pub type HandleMap<T> = SlotMap<DefaultKey, T>;

/// Handle type for stable references
pub type Handle = DefaultKey;

/// Pack a slot map key into the opaque id carried by GPU handles
pub fn handle_to_id(handle: Handle) -> u64 {
    handle.data().as_ffi()
}

/// Recover a slot map key from an opaque id
///
/// Ids that were never produced by [`handle_to_id`] yield a key that simply
/// fails lookups.
pub fn id_to_handle(id: u64) -> Handle {
    KeyData::from_ffi(id).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_id_round_trip_and_stale_lookup() {
        let mut map: HandleMap<&str> = HandleMap::new();
        let handle = map.insert("shadow");
        let id = handle_to_id(handle);
        assert_eq!(map.get(id_to_handle(id)), Some(&"shadow"));

        map.remove(handle);
        let replacement = map.insert("cookie");
        // The generation changed, so the old id no longer resolves
        assert!(map.get(id_to_handle(id)).is_none());
        assert_ne!(handle_to_id(replacement), id);
    }
}
