use crate::utils::cache::Store;

/// Session key holding the comma-joined names of toggled-off segments.
pub const TOGGLE_KEY: &str = "toggle_cache";

/// Three days.
pub const TOGGLE_TTL_MINUTES: i64 = 3 * 24 * 60;

/// Names of the segments currently toggled off.
pub fn toggled(store: &Store) -> Vec<String> {
    store
        .get(TOGGLE_KEY)
        .map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

pub fn is_toggled(store: &Store, name: &str) -> bool {
    toggled(store).iter().any(|toggle| toggle == name)
}

/// Flip a segment. Returns `true` when the segment is now toggled off.
pub fn toggle(store: &Store, segment: &str) -> bool {
    let mut toggles = toggled(store);
    let disabled = match toggles.iter().position(|toggle| toggle == segment) {
        Some(index) => {
            toggles.remove(index);
            false
        }
        None => {
            toggles.push(segment.to_string());
            true
        }
    };

    store.set(TOGGLE_KEY, &toggles.join(","), TOGGLE_TTL_MINUTES);
    disabled
}
