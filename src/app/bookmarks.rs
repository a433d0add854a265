use chrono::Utc;
use serde_json::{Value, json};

use super::registry::TitleId;
use crate::db::Storage;

const BOOKMARKS_KEY: &str = "dmfa-reader-bookmarks";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Bookmark {
    pub(crate) comic: TitleId,
    pub(crate) page: u32,
    pub(crate) note: String,
    // Creation time in epoch milliseconds; never changed by edits.
    pub(crate) timestamp: i64,
}

pub(crate) struct BookmarkStore {
    bookmarks: Vec<Bookmark>,
}

impl BookmarkStore {
    // Reads the persisted collection, upgrading legacy records in place:
    // entries written before multi-title support carry no comic id (they are
    // flagship bookmarks) and no creation timestamp. Malformed entries and
    // unknown titles are dropped rather than failing the load.
    pub(crate) fn load(storage: &Storage) -> Self {
        let raw = match storage.get(BOOKMARKS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self { bookmarks: Vec::new() },
            Err(err) => {
                eprintln!("Warning: failed to load bookmarks: {err}");
                return Self { bookmarks: Vec::new() };
            }
        };

        let load_time = now_millis();
        let parsed: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                eprintln!("Warning: ignoring malformed bookmark data: {err}");
                return Self { bookmarks: Vec::new() };
            }
        };

        let mut bookmarks = Vec::new();
        let mut upgraded = false;
        if let Some(entries) = parsed.as_array() {
            for entry in entries {
                if let Some((bookmark, was_upgraded)) = parse_bookmark(entry, load_time) {
                    upgraded |= was_upgraded;
                    bookmarks.push(bookmark);
                }
            }
        }

        let mut store = Self { bookmarks };
        store.sort();
        // Upgraded records are written back immediately so the assigned
        // creation timestamp sticks instead of drifting on every load.
        if upgraded {
            store.persist(storage);
        }
        store
    }

    pub(crate) fn list(&self) -> &[Bookmark] {
        &self.bookmarks
    }

    pub(crate) fn find(&self, comic: TitleId, page: u32) -> Option<&Bookmark> {
        self.bookmarks
            .iter()
            .find(|b| b.comic == comic && b.page == page)
    }

    // Idempotent: a second bookmark on the same (comic, page) is a no-op.
    // Returns whether a bookmark was created.
    pub(crate) fn add(&mut self, storage: &Storage, comic: TitleId, page: u32) -> bool {
        if self.find(comic, page).is_some() {
            return false;
        }
        self.bookmarks.push(Bookmark {
            comic,
            page,
            note: String::new(),
            timestamp: now_millis(),
        });
        self.sort();
        self.persist(storage);
        true
    }

    pub(crate) fn edit_note(
        &mut self,
        storage: &Storage,
        comic: TitleId,
        page: u32,
        note: &str,
    ) -> bool {
        let Some(bookmark) = self
            .bookmarks
            .iter_mut()
            .find(|b| b.comic == comic && b.page == page)
        else {
            return false;
        };
        bookmark.note = note.to_string();
        self.persist(storage);
        true
    }

    // The confirmation gate lives at the CLI boundary; removal here is
    // unconditional. No-op when absent.
    pub(crate) fn remove(&mut self, storage: &Storage, comic: TitleId, page: u32) -> bool {
        let before = self.bookmarks.len();
        self.bookmarks
            .retain(|b| !(b.comic == comic && b.page == page));
        if self.bookmarks.len() == before {
            return false;
        }
        self.persist(storage);
        true
    }

    fn sort(&mut self) {
        self.bookmarks
            .sort_by(|a, b| (a.comic.slug(), a.page).cmp(&(b.comic.slug(), b.page)));
    }

    fn persist(&self, storage: &Storage) {
        let entries: Vec<Value> = self
            .bookmarks
            .iter()
            .map(|b| {
                json!({
                    "comic": b.comic.slug(),
                    "page": b.page,
                    "note": b.note,
                    "timestamp": b.timestamp,
                })
            })
            .collect();
        let serialized = Value::Array(entries).to_string();
        if let Err(err) = storage.set(BOOKMARKS_KEY, &serialized) {
            eprintln!("Warning: failed to save bookmarks: {err}");
        }
    }
}

// The boolean reports whether the entry needed upgrading, so the caller
// knows to write the collection back.
fn parse_bookmark(entry: &Value, load_time: i64) -> Option<(Bookmark, bool)> {
    let page = u32::try_from(entry.get("page")?.as_u64()?).ok()?;
    let (comic, missing_comic) = match entry.get("comic").and_then(Value::as_str) {
        Some(slug) => (TitleId::parse(slug)?, false),
        // Legacy record from before multi-title bookmarks.
        None => (TitleId::Dmfa, true),
    };
    let note = entry
        .get("note")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let (timestamp, missing_timestamp) = match entry.get("timestamp").and_then(Value::as_i64) {
        Some(timestamp) => (timestamp, false),
        None => (load_time, true),
    };
    Some((
        Bookmark {
            comic,
            page,
            note,
            timestamp,
        },
        missing_comic || missing_timestamp,
    ))
}

pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
