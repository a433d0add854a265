use std::cell::Cell;
use std::time::Duration;

use super::App;
use super::bookmarks::BookmarkStore;
use super::navigate::{chapter_neighbors, clamp};
use super::progress::ProgressStore;
use super::registry::{DEFAULT_DMFA_PAGES, Registry, TitleId, descriptor};
use super::updates::{CHECK_INTERVAL_MS, IndexProbe, UpdateTracker, extract_latest_page};
use crate::cli::BookmarkCommand;
use crate::db::Storage;

fn test_storage() -> Storage {
    Storage::open_in_memory().expect("in-memory storage")
}

struct FakeProbe {
    result: Result<u32, String>,
    calls: Cell<usize>,
}

impl FakeProbe {
    fn returning(page: u32) -> Self {
        Self {
            result: Ok(page),
            calls: Cell::new(0),
        }
    }

    fn failing() -> Self {
        Self {
            result: Err("probe offline".to_string()),
            calls: Cell::new(0),
        }
    }
}

impl IndexProbe for FakeProbe {
    fn latest_page(&self) -> Result<u32, String> {
        self.calls.set(self.calls.get() + 1);
        self.result.clone()
    }
}

#[test]
fn title_parse_accepts_slug_spellings() {
    assert_eq!(TitleId::parse("dmfa"), Some(TitleId::Dmfa));
    assert_eq!(TitleId::parse("hybridGenetics"), Some(TitleId::HybridGenetics));
    assert_eq!(TitleId::parse("hybrid-genetics"), Some(TitleId::HybridGenetics));
    assert_eq!(TitleId::parse("WRYNP"), Some(TitleId::WryNp));
    assert_eq!(TitleId::parse("no-such-title"), None);
}

#[test]
fn chapter_tables_are_ordered_and_non_overlapping() {
    for id in TitleId::ALL {
        let chapters = descriptor(id).chapters;
        for chapter in chapters {
            assert!(
                chapter.start_page >= 1 && chapter.start_page <= chapter.end_page,
                "{}: bad range in {}",
                id.slug(),
                chapter.title
            );
        }
        for pair in chapters.windows(2) {
            assert!(
                pair[0].end_page < pair[1].start_page,
                "{}: {} overlaps {}",
                id.slug(),
                pair[0].title,
                pair[1].title
            );
        }
    }
}

#[test]
fn effective_max_page_includes_the_secret_page() {
    let registry = Registry::with_defaults();
    assert_eq!(registry.effective_max_page(TitleId::HybridGenetics), 15);
    assert_eq!(registry.effective_max_page(TitleId::Abel), 217);
}

#[test]
fn clamp_bounds_requests_and_is_idempotent() {
    let registry = Registry::with_defaults();
    assert_eq!(clamp(&registry, TitleId::Abel, 500), 217);
    assert_eq!(clamp(&registry, TitleId::Abel, 0), 1);
    assert_eq!(clamp(&registry, TitleId::Abel, -40), 1);
    assert_eq!(clamp(&registry, TitleId::HybridGenetics, 15), 15);
    for requested in [-3_i64, 0, 1, 14, 15, 99] {
        let once = clamp(&registry, TitleId::HybridGenetics, requested);
        let twice = clamp(&registry, TitleId::HybridGenetics, i64::from(once));
        assert_eq!(once, twice);
    }
}

#[test]
fn chapter_neighbors_walk_the_ordered_table() {
    let registry = Registry::with_defaults();
    let chapters = registry.chapters(TitleId::Dmfa);

    let first = chapter_neighbors(&chapters, 3);
    assert_eq!(first.prev, None);
    assert_eq!(first.next, Some(7));

    let middle = chapter_neighbors(&chapters, 100);
    assert_eq!(middle.prev, Some(64));
    assert_eq!(middle.next, Some(104));

    let last = chapter_neighbors(&chapters, 2000);
    assert_eq!(last.prev, Some(1866));
    assert_eq!(last.next, None);
}

#[test]
fn chapter_neighbors_outside_every_chapter_are_empty() {
    let registry = Registry::with_defaults();
    let chapters = registry.chapters(TitleId::Dmfa);
    // Page 194 falls in the gap between chapters 10 and 11.
    let gap = chapter_neighbors(&chapters, 194);
    assert_eq!(gap.prev, None);
    assert_eq!(gap.next, None);
}

#[test]
fn dynamic_chapter_table_stretches_to_the_discovered_total() {
    let storage = test_storage();
    let mut registry = Registry::load(&storage);
    registry.record_discovered_page(&storage, TitleId::Dmfa, 2170);

    assert_eq!(registry.total_pages(TitleId::Dmfa), 2170);
    let chapters = registry.chapters(TitleId::Dmfa);
    assert_eq!(chapters.last().map(|ch| ch.end_page), Some(2170));

    // Survives a reload through storage.
    let reloaded = Registry::load(&storage);
    assert_eq!(reloaded.total_pages(TitleId::Dmfa), 2170);
}

#[test]
fn discovered_page_count_never_shrinks() {
    let storage = test_storage();
    let mut registry = Registry::load(&storage);
    registry.record_discovered_page(&storage, TitleId::Dmfa, 2100);
    assert_eq!(registry.total_pages(TitleId::Dmfa), DEFAULT_DMFA_PAGES);

    // Non-dynamic titles ignore discovery reports entirely.
    registry.record_discovered_page(&storage, TitleId::Abel, 999);
    assert_eq!(registry.total_pages(TitleId::Abel), 217);
}

#[test]
fn navigate_clamps_and_persists_for_serial_titles() {
    let storage = test_storage();
    let registry = Registry::load(&storage);
    let mut progress = ProgressStore::load(&registry, &storage);

    let committed = progress.navigate(&registry, &storage, TitleId::Abel, 500);
    assert_eq!(committed, 217);

    let reloaded = ProgressStore::load(&registry, &storage);
    assert_eq!(reloaded.current(TitleId::Abel), 217);
}

#[test]
fn navigate_below_range_commits_page_one() {
    let storage = test_storage();
    let registry = Registry::load(&storage);
    let mut progress = ProgressStore::load(&registry, &storage);

    assert_eq!(progress.navigate(&registry, &storage, TitleId::Matilda, -5), 1);
    let reloaded = ProgressStore::load(&registry, &storage);
    assert_eq!(reloaded.current(TitleId::Matilda), 1);
}

#[test]
fn secret_page_excursion_is_navigable_but_never_persisted() {
    let storage = test_storage();
    let registry = Registry::load(&storage);
    let mut progress = ProgressStore::load(&registry, &storage);

    let committed = progress.navigate(&registry, &storage, TitleId::HybridGenetics, 15);
    assert_eq!(committed, 15);
    assert_eq!(progress.current(TitleId::HybridGenetics), 15);

    // Reset-on-entry titles keep no durable resume point at all.
    let saved = storage
        .get(descriptor(TitleId::HybridGenetics).storage_key)
        .expect("storage read");
    assert_eq!(saved, None);
}

#[test]
fn reset_on_entry_titles_always_reopen_at_page_one() {
    let storage = test_storage();
    let registry = Registry::load(&storage);
    let mut progress = ProgressStore::load(&registry, &storage);

    progress.navigate(&registry, &storage, TitleId::CubiClanLeaders, 12);
    assert_eq!(progress.current(TitleId::CubiClanLeaders), 12);
    assert_eq!(progress.enter(&registry, TitleId::CubiClanLeaders), 1);

    // A serial title resumes where it left off instead.
    progress.navigate(&registry, &storage, TitleId::Abel, 80);
    assert_eq!(progress.enter(&registry, TitleId::Abel), 80);
}

#[test]
fn progress_load_degrades_malformed_values_to_defaults() {
    let storage = test_storage();
    let registry = Registry::load(&storage);
    storage
        .set(descriptor(TitleId::Abel).storage_key, "not-a-number")
        .expect("storage write");
    storage
        .set(descriptor(TitleId::Matilda).storage_key, "90000")
        .expect("storage write");

    let progress = ProgressStore::load(&registry, &storage);
    assert_eq!(progress.current(TitleId::Abel), 1);
    // Out-of-range persisted values clamp to the official total.
    assert_eq!(progress.current(TitleId::Matilda), 73);
}

#[test]
fn duplicate_bookmarks_are_ignored() {
    let storage = test_storage();
    let mut bookmarks = BookmarkStore::load(&storage);

    assert!(bookmarks.add(&storage, TitleId::Dmfa, 50));
    assert!(!bookmarks.add(&storage, TitleId::Dmfa, 50));
    assert_eq!(bookmarks.list().len(), 1);
}

#[test]
fn bookmarks_stay_sorted_by_title_then_page() {
    let storage = test_storage();
    let mut bookmarks = BookmarkStore::load(&storage);

    bookmarks.add(&storage, TitleId::Dmfa, 900);
    bookmarks.add(&storage, TitleId::Abel, 12);
    bookmarks.add(&storage, TitleId::Dmfa, 3);
    bookmarks.add(&storage, TitleId::Matilda, 7);

    let order: Vec<(&str, u32)> = bookmarks
        .list()
        .iter()
        .map(|b| (b.comic.slug(), b.page))
        .collect();
    assert_eq!(
        order,
        vec![("abel", 12), ("dmfa", 3), ("dmfa", 900), ("matilda", 7)]
    );
}

#[test]
fn bookmark_edits_replace_the_note_but_not_the_timestamp() {
    let storage = test_storage();
    let mut bookmarks = BookmarkStore::load(&storage);
    bookmarks.add(&storage, TitleId::Abel, 40);
    let created = bookmarks.find(TitleId::Abel, 40).expect("bookmark").timestamp;

    assert!(bookmarks.edit_note(&storage, TitleId::Abel, 40, "the reveal"));
    let edited = bookmarks.find(TitleId::Abel, 40).expect("bookmark");
    assert_eq!(edited.note, "the reveal");
    assert_eq!(edited.timestamp, created);

    // Editing or removing a missing bookmark is a silent no-op.
    assert!(!bookmarks.edit_note(&storage, TitleId::Abel, 41, "nothing here"));
    assert!(!bookmarks.remove(&storage, TitleId::Abel, 41));
}

#[test]
fn bookmark_removal_deletes_the_single_match() {
    let storage = test_storage();
    let mut bookmarks = BookmarkStore::load(&storage);
    bookmarks.add(&storage, TitleId::Dmfa, 5);
    bookmarks.add(&storage, TitleId::Dmfa, 6);

    assert!(bookmarks.remove(&storage, TitleId::Dmfa, 5));
    assert_eq!(bookmarks.list().len(), 1);
    assert!(bookmarks.find(TitleId::Dmfa, 5).is_none());
}

#[test]
fn bookmarks_round_trip_through_storage() {
    let storage = test_storage();
    let mut bookmarks = BookmarkStore::load(&storage);
    bookmarks.add(&storage, TitleId::Matilda, 21);
    bookmarks.edit_note(&storage, TitleId::Matilda, 21, "tea time");

    let reloaded = BookmarkStore::load(&storage);
    let bookmark = reloaded.find(TitleId::Matilda, 21).expect("bookmark");
    assert_eq!(bookmark.note, "tea time");
}

#[test]
fn legacy_bookmarks_gain_a_title_and_timestamp_on_load() {
    let storage = test_storage();
    storage
        .set(
            "dmfa-reader-bookmarks",
            r#"[{"page":120,"note":"old save"},{"comic":"abel","page":9,"note":"","timestamp":1700000000000}]"#,
        )
        .expect("storage write");

    let bookmarks = BookmarkStore::load(&storage);
    assert_eq!(bookmarks.list().len(), 2);

    let migrated = bookmarks.find(TitleId::Dmfa, 120).expect("migrated bookmark");
    assert_eq!(migrated.note, "old save");
    assert!(migrated.timestamp > 0);

    let untouched = bookmarks.find(TitleId::Abel, 9).expect("modern bookmark");
    assert_eq!(untouched.timestamp, 1_700_000_000_000);
}

#[test]
fn legacy_migration_writes_back_once_and_keeps_the_timestamp() {
    let storage = test_storage();
    storage
        .set("dmfa-reader-bookmarks", r#"[{"page":120,"note":"old save"}]"#)
        .expect("storage write");

    let first = BookmarkStore::load(&storage);
    let assigned = first.find(TitleId::Dmfa, 120).expect("bookmark").timestamp;

    // The upgraded record lands back in storage on the load itself.
    let raw = storage
        .get("dmfa-reader-bookmarks")
        .expect("storage read")
        .expect("migrated collection persisted");
    assert!(raw.contains("\"comic\""), "unexpected stored form: {raw}");
    assert!(raw.contains("\"timestamp\""), "unexpected stored form: {raw}");

    std::thread::sleep(Duration::from_millis(5));
    let second = BookmarkStore::load(&storage);
    let reloaded = second.find(TitleId::Dmfa, 120).expect("bookmark").timestamp;
    assert_eq!(reloaded, assigned);
}

#[test]
fn bookmark_add_rejects_pages_outside_the_archive() {
    let storage = test_storage();
    let mut app = App::load(&storage);

    app.run_bookmark(BookmarkCommand::Add {
        title: "abel".to_string(),
        page: 99999,
    })
    .expect("command runs");
    app.run_bookmark(BookmarkCommand::Add {
        title: "abel".to_string(),
        page: 0,
    })
    .expect("command runs");
    assert!(app.bookmarks.list().is_empty());

    app.run_bookmark(BookmarkCommand::Add {
        title: "abel".to_string(),
        page: 217,
    })
    .expect("command runs");
    assert_eq!(app.bookmarks.list().len(), 1);
}

#[test]
fn malformed_bookmark_data_degrades_to_an_empty_collection() {
    let storage = test_storage();
    storage
        .set("dmfa-reader-bookmarks", "{not json")
        .expect("storage write");
    let bookmarks = BookmarkStore::load(&storage);
    assert!(bookmarks.list().is_empty());
}

#[test]
fn update_check_discovers_new_pages_and_rearms_the_indicator() {
    let storage = test_storage();
    let registry = Registry::load(&storage);
    let mut tracker = UpdateTracker::load(&storage);

    // Reader is fully caught up and has dismissed an earlier indicator.
    tracker.mark_read(&storage, TitleId::Dmfa, 2162);
    tracker.acknowledge(&storage, TitleId::Dmfa);

    let probe = FakeProbe::returning(2165);
    let result =
        tracker.check_for_updates(&storage, &registry, TitleId::Dmfa, &probe, CHECK_INTERVAL_MS);

    assert!(result.has_update);
    assert_eq!(result.new_total, 2165);
    let state = tracker.state(TitleId::Dmfa).expect("tracked state");
    assert!(state.has_new_pages);
    assert!(!state.new_indicator_acknowledged);
}

#[test]
fn update_check_within_cooldown_answers_from_cache() {
    let storage = test_storage();
    let registry = Registry::load(&storage);
    let mut tracker = UpdateTracker::load(&storage);

    let probe = FakeProbe::returning(2165);
    let first =
        tracker.check_for_updates(&storage, &registry, TitleId::Dmfa, &probe, CHECK_INTERVAL_MS);
    let second = tracker.check_for_updates(
        &storage,
        &registry,
        TitleId::Dmfa,
        &probe,
        CHECK_INTERVAL_MS + 1000,
    );

    assert_eq!(probe.calls.get(), 1);
    assert_eq!(first, second);
}

#[test]
fn update_check_probes_again_after_the_cooldown() {
    let storage = test_storage();
    let registry = Registry::load(&storage);
    let mut tracker = UpdateTracker::load(&storage);

    let probe = FakeProbe::returning(2165);
    tracker.check_for_updates(&storage, &registry, TitleId::Dmfa, &probe, CHECK_INTERVAL_MS);
    tracker.check_for_updates(
        &storage,
        &registry,
        TitleId::Dmfa,
        &probe,
        CHECK_INTERVAL_MS * 2,
    );
    assert_eq!(probe.calls.get(), 2);
}

#[test]
fn failed_probe_keeps_the_cached_state() {
    let storage = test_storage();
    let registry = Registry::load(&storage);
    let mut tracker = UpdateTracker::load(&storage);

    let discovery = FakeProbe::returning(2165);
    let first = tracker.check_for_updates(
        &storage,
        &registry,
        TitleId::Dmfa,
        &discovery,
        CHECK_INTERVAL_MS,
    );
    assert!(first.has_update);

    let offline = FakeProbe::failing();
    let second = tracker.check_for_updates(
        &storage,
        &registry,
        TitleId::Dmfa,
        &offline,
        CHECK_INTERVAL_MS * 3,
    );
    assert_eq!(offline.calls.get(), 1);
    assert_eq!(first, second);

    // Cached state survives a reload untouched by the failure.
    let reloaded = UpdateTracker::load(&storage);
    assert_eq!(
        reloaded.state(TitleId::Dmfa).map(|s| s.latest_checked_page),
        Some(2165)
    );
}

#[test]
fn closed_archives_are_excluded_from_update_checks() {
    let storage = test_storage();
    let registry = Registry::load(&storage);
    let mut tracker = UpdateTracker::load(&storage);

    let probe = FakeProbe::returning(9999);
    let result = tracker.check_for_updates(
        &storage,
        &registry,
        TitleId::BonusComics,
        &probe,
        CHECK_INTERVAL_MS,
    );

    assert!(!result.has_update);
    assert_eq!(result.new_total, 58);
    assert_eq!(probe.calls.get(), 0);
    assert!(tracker.state(TitleId::BonusComics).is_none());

    // Acknowledge and mark-read are no-ops for excluded titles.
    tracker.acknowledge(&storage, TitleId::WallpaperWars);
    tracker.mark_read(&storage, TitleId::WallpaperWars, 100);
    assert!(tracker.state(TitleId::WallpaperWars).is_none());
}

#[test]
fn catching_up_clears_the_new_pages_flag() {
    let storage = test_storage();
    let registry = Registry::load(&storage);
    let mut tracker = UpdateTracker::load(&storage);

    let probe = FakeProbe::returning(2165);
    tracker.check_for_updates(&storage, &registry, TitleId::Dmfa, &probe, CHECK_INTERVAL_MS);
    assert!(tracker.state(TitleId::Dmfa).expect("state").has_new_pages);

    tracker.mark_read(&storage, TitleId::Dmfa, 2165);
    let state = tracker.state(TitleId::Dmfa).expect("state");
    assert!(!state.has_new_pages);
    assert_eq!(state.highest_read_page, 2165);
}

#[test]
fn mark_read_ignores_regressions_behind_the_frontier() {
    let storage = test_storage();
    let mut tracker = UpdateTracker::load(&storage);

    tracker.mark_read(&storage, TitleId::Dmfa, 2000);
    tracker.mark_read(&storage, TitleId::Dmfa, 150);
    assert_eq!(
        tracker.state(TitleId::Dmfa).map(|s| s.highest_read_page),
        Some(2000)
    );
}

#[test]
fn acknowledgment_silences_a_standing_update_until_new_pages_land() {
    let storage = test_storage();
    let registry = Registry::load(&storage);
    let mut tracker = UpdateTracker::load(&storage);

    let probe = FakeProbe::returning(2165);
    let before =
        tracker.check_for_updates(&storage, &registry, TitleId::Dmfa, &probe, CHECK_INTERVAL_MS);
    assert!(before.has_update);

    tracker.acknowledge(&storage, TitleId::Dmfa);
    let same_frontier = FakeProbe::returning(2165);
    let after = tracker.check_for_updates(
        &storage,
        &registry,
        TitleId::Dmfa,
        &same_frontier,
        CHECK_INTERVAL_MS * 3,
    );
    // Still unread pages, but the indicator stays dismissed.
    assert!(!after.has_update);

    let grown = FakeProbe::returning(2166);
    let rearmed = tracker.check_for_updates(
        &storage,
        &registry,
        TitleId::Dmfa,
        &grown,
        CHECK_INTERVAL_MS * 5,
    );
    assert!(rearmed.has_update);
}

#[test]
fn unseen_updates_surface_without_a_fresh_probe() {
    let storage = test_storage();
    let registry = Registry::load(&storage);
    let mut tracker = UpdateTracker::load(&storage);
    assert!(!tracker.has_unseen_update(TitleId::Dmfa));

    let probe = FakeProbe::returning(2165);
    tracker.check_for_updates(&storage, &registry, TitleId::Dmfa, &probe, CHECK_INTERVAL_MS);
    assert!(tracker.has_unseen_update(TitleId::Dmfa));
    assert!(!tracker.has_unseen_update(TitleId::BonusComics));

    // The marker survives a reload with no further probing.
    let reloaded = UpdateTracker::load(&storage);
    assert!(reloaded.has_unseen_update(TitleId::Dmfa));

    tracker.acknowledge(&storage, TitleId::Dmfa);
    assert!(!tracker.has_unseen_update(TitleId::Dmfa));
}

#[test]
fn update_states_round_trip_through_storage() {
    let storage = test_storage();
    let registry = Registry::load(&storage);
    let mut tracker = UpdateTracker::load(&storage);

    let probe = FakeProbe::returning(230);
    tracker.check_for_updates(&storage, &registry, TitleId::Abel, &probe, CHECK_INTERVAL_MS);
    tracker.acknowledge(&storage, TitleId::Abel);

    let reloaded = UpdateTracker::load(&storage);
    let state = reloaded.state(TitleId::Abel).expect("persisted state");
    assert_eq!(state.latest_checked_page, 230);
    assert_eq!(state.last_check_time, CHECK_INTERVAL_MS);
    assert!(state.new_indicator_acknowledged);
}

#[test]
fn malformed_update_states_fall_back_to_known_archive_sizes() {
    let storage = test_storage();
    storage
        .set("dmfa-update-states", "[1, 2, 3]")
        .expect("storage write");

    let tracker = UpdateTracker::load(&storage);
    assert_eq!(
        tracker.state(TitleId::Dmfa).map(|s| s.latest_checked_page),
        Some(2162)
    );
    assert_eq!(
        tracker.state(TitleId::Abel).map(|s| s.latest_checked_page),
        Some(217)
    );
}

#[test]
fn index_scrape_picks_the_highest_page_token() {
    let html = concat!(
        "<html><body><img src=\"Comics/Vol2163.png\">",
        "<a href=\"Comics/Vol2160.png\">prev</a>",
        "<img src=\"banner.gif\"></body></html>"
    );
    assert_eq!(extract_latest_page(html), Some(2163));
    assert_eq!(extract_latest_page("<html>no tokens here</html>"), None);
}
