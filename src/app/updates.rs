use std::collections::HashMap;

use serde_json::{Value, json};

use super::registry::{Registry, TitleId};
use crate::db::Storage;
use crate::http;

const UPDATE_STATES_KEY: &str = "dmfa-update-states";
pub(crate) const CHECK_INTERVAL_MS: i64 = 1000 * 60 * 5;

const INDEX_URL: &str = "https://missmab.com/index.php";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UpdateState {
    pub(crate) latest_checked_page: u32,
    pub(crate) last_check_time: i64,
    pub(crate) has_new_pages: bool,
    pub(crate) highest_read_page: u32,
    pub(crate) new_indicator_acknowledged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct UpdateCheck {
    pub(crate) has_update: bool,
    pub(crate) new_total: u32,
}

// Narrow seam for the remote index probe: an integer on success, an inert
// error otherwise. The production implementation scrapes the site index.
pub(crate) trait IndexProbe {
    fn latest_page(&self) -> Result<u32, String>;
}

pub(crate) struct SiteIndexProbe;

impl IndexProbe for SiteIndexProbe {
    fn latest_page(&self) -> Result<u32, String> {
        let body = http::get_text_with_retries(
            INDEX_URL,
            http::CONNECT_TIMEOUT,
            http::READ_TIMEOUT,
            http::PROBE_ATTEMPTS,
            http::RETRY_DELAY,
        )?;
        extract_latest_page(&body).ok_or_else(|| "no page token found in index".to_string())
    }
}

// The site index embeds the newest page as its image, named Vol<page>.png.
// The highest such token wins; older inline references may also appear.
pub(crate) fn extract_latest_page(html: &str) -> Option<u32> {
    let pattern = regex::Regex::new(r"(?i)Vol(\d+)\.png").ok()?;
    pattern
        .captures_iter(html)
        .filter_map(|caps| caps.get(1)?.as_str().parse::<u32>().ok())
        .max()
}

pub(crate) struct UpdateTracker {
    states: HashMap<TitleId, UpdateState>,
}

impl UpdateTracker {
    pub(crate) fn load(storage: &Storage) -> Self {
        let mut states = default_states();

        let raw = match storage.get(UPDATE_STATES_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self { states },
            Err(err) => {
                eprintln!("Warning: failed to load update states: {err}");
                return Self { states };
            }
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(parsed) => {
                for (id, state) in states.iter_mut() {
                    if let Some(entry) = parsed.get(id.slug())
                        && let Some(loaded) = parse_state(entry)
                    {
                        *state = loaded;
                    }
                }
            }
            Err(err) => {
                eprintln!("Warning: ignoring malformed update states: {err}");
            }
        }

        Self { states }
    }

    pub(crate) fn state(&self, id: TitleId) -> Option<&UpdateState> {
        self.states.get(&id)
    }

    // Drives the "New!" marker in the title overview without a fresh probe.
    pub(crate) fn has_unseen_update(&self, id: TitleId) -> bool {
        self.states
            .get(&id)
            .is_some_and(|state| state.has_new_pages && !state.new_indicator_acknowledged)
    }

    // At most one probe per title per cooldown interval; every call inside
    // the window answers from the cached state. A failed probe also answers
    // from cache and leaves persisted state untouched.
    pub(crate) fn check_for_updates(
        &mut self,
        storage: &Storage,
        registry: &Registry,
        id: TitleId,
        probe: &dyn IndexProbe,
        now_ms: i64,
    ) -> UpdateCheck {
        if !registry.descriptor(id).update_tracked {
            return UpdateCheck {
                has_update: false,
                new_total: registry.total_pages(id),
            };
        }

        let state = self.states.get(&id).cloned().unwrap_or_else(|| default_state(id));
        if now_ms - state.last_check_time < CHECK_INTERVAL_MS {
            return cached_result(&state);
        }

        let latest_page = match probe.latest_page() {
            Ok(latest_page) => latest_page,
            Err(err) => {
                eprintln!("Warning: could not check for updates: {err}");
                return cached_result(&state);
            }
        };

        let has_actual_new_pages = latest_page > state.highest_read_page;
        // A frontier past the previously checked page re-arms the indicator
        // even if the reader dismissed an earlier one.
        let should_reset_acknowledgment = latest_page > state.latest_checked_page;

        let updated = UpdateState {
            latest_checked_page: latest_page,
            last_check_time: now_ms,
            has_new_pages: has_actual_new_pages,
            highest_read_page: state.highest_read_page,
            new_indicator_acknowledged: if should_reset_acknowledgment {
                false
            } else {
                state.new_indicator_acknowledged
            },
        };
        let result = UpdateCheck {
            has_update: has_actual_new_pages && !updated.new_indicator_acknowledged,
            new_total: latest_page,
        };
        self.states.insert(id, updated);
        self.persist(storage);
        result
    }

    // Records that the reader reached `page`. Catching up to the detected
    // frontier clears the new-pages flag on its own, independent of any
    // indicator dismissal.
    pub(crate) fn mark_read(&mut self, storage: &Storage, id: TitleId, page: u32) {
        let Some(state) = self.states.get_mut(&id) else {
            return;
        };
        if page >= state.highest_read_page {
            state.highest_read_page = page;
            state.has_new_pages = page < state.latest_checked_page;
            self.persist(storage);
        }
    }

    pub(crate) fn acknowledge(&mut self, storage: &Storage, id: TitleId) {
        let Some(state) = self.states.get_mut(&id) else {
            return;
        };
        state.new_indicator_acknowledged = true;
        self.persist(storage);
    }

    fn persist(&self, storage: &Storage) {
        let mut map = serde_json::Map::new();
        for (id, state) in &self.states {
            map.insert(
                id.slug().to_string(),
                json!({
                    "latestCheckedPage": state.latest_checked_page,
                    "lastCheckTime": state.last_check_time,
                    "hasNewPages": state.has_new_pages,
                    "highestReadPage": state.highest_read_page,
                    "newIndicatorAcknowledged": state.new_indicator_acknowledged,
                }),
            );
        }
        let serialized = Value::Object(map).to_string();
        if let Err(err) = storage.set(UPDATE_STATES_KEY, &serialized) {
            eprintln!("Warning: failed to save update states: {err}");
        }
    }
}

fn cached_result(state: &UpdateState) -> UpdateCheck {
    UpdateCheck {
        has_update: state.has_new_pages && !state.new_indicator_acknowledged,
        new_total: state.latest_checked_page,
    }
}

fn parse_state(entry: &Value) -> Option<UpdateState> {
    Some(UpdateState {
        latest_checked_page: u32::try_from(entry.get("latestCheckedPage")?.as_u64()?).ok()?,
        last_check_time: entry.get("lastCheckTime")?.as_i64()?,
        has_new_pages: entry.get("hasNewPages")?.as_bool()?,
        highest_read_page: u32::try_from(entry.get("highestReadPage")?.as_u64()?).ok()?,
        new_indicator_acknowledged: entry
            .get("newIndicatorAcknowledged")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    })
}

// Known archive sizes at the time tracking shipped; the first real probe
// overwrites the flagship's entry.
fn default_state(id: TitleId) -> UpdateState {
    let latest_checked_page = match id {
        TitleId::Dmfa => 2162,
        TitleId::Abel => 217,
        TitleId::Matilda => 0,
        TitleId::CubiMindAbilities => 7,
        TitleId::FurraaeFashionLaws => 6,
        TitleId::HybridGenetics => 4,
        TitleId::CubiClanLeaders => 4,
        TitleId::PerfectDate => 18,
        TitleId::TakingPride => 8,
        TitleId::BorkedWrist => 24,
        TitleId::UncanonChristmas => 6,
        TitleId::WryMain => 136,
        TitleId::WryStuff => 4,
        TitleId::WryNp => 18,
        TitleId::WrySketches => 33,
        TitleId::BonusComics | TitleId::WallpaperWars => 0,
    };
    UpdateState {
        latest_checked_page,
        last_check_time: 0,
        has_new_pages: false,
        highest_read_page: 0,
        new_indicator_acknowledged: false,
    }
}

fn default_states() -> HashMap<TitleId, UpdateState> {
    TitleId::ALL
        .into_iter()
        .filter(|id| super::registry::descriptor(*id).update_tracked)
        .map(|id| (id, default_state(id)))
        .collect()
}
