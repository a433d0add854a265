use std::collections::HashMap;

use super::navigate;
use super::registry::{Registry, TitleId};
use crate::db::Storage;

// Durable current-page tracking. The in-memory page is where the reader is
// right now; the persisted page is where they will resume. The two diverge
// for reset-on-entry titles (never persisted) and for secret-page excursions
// (persisted value stays capped at the official total).
pub(crate) struct ProgressStore {
    pages: HashMap<TitleId, u32>,
}

impl ProgressStore {
    pub(crate) fn load(registry: &Registry, storage: &Storage) -> Self {
        let mut pages = HashMap::new();
        for id in TitleId::ALL {
            let descriptor = registry.descriptor(id);
            let page = if descriptor.resets_on_entry {
                1
            } else {
                match storage.get(descriptor.storage_key) {
                    Ok(saved) => saved
                        .and_then(|raw| raw.trim().parse::<u32>().ok())
                        // Resume points never land on a secret page, so the
                        // clamp uses the official total.
                        .map_or(1, |page| page.clamp(1, registry.total_pages(id))),
                    Err(err) => {
                        eprintln!("Warning: failed to load progress for {}: {err}", id.slug());
                        1
                    }
                }
            };
            pages.insert(id, page);
        }
        Self { pages }
    }

    pub(crate) fn current(&self, id: TitleId) -> u32 {
        self.pages.get(&id).copied().unwrap_or(1)
    }

    // Entering a reset-on-entry title always starts over at page 1 without
    // touching the persisted value.
    pub(crate) fn enter(&mut self, registry: &Registry, id: TitleId) -> u32 {
        if registry.descriptor(id).resets_on_entry {
            self.pages.insert(id, 1);
        }
        self.current(id)
    }

    pub(crate) fn navigate(
        &mut self,
        registry: &Registry,
        storage: &Storage,
        id: TitleId,
        requested: i64,
    ) -> u32 {
        let committed = navigate::clamp(registry, id, requested);
        self.pages.insert(id, committed);

        let descriptor = registry.descriptor(id);
        if !descriptor.resets_on_entry {
            let durable = committed.min(registry.total_pages(id));
            if let Err(err) = storage.set(descriptor.storage_key, &durable.to_string()) {
                eprintln!("Warning: failed to save progress for {}: {err}", id.slug());
            }
        }
        committed
    }
}
