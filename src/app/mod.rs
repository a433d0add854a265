mod bookmarks;
mod files;
mod navigate;
mod progress;
mod registry;
mod updates;

#[cfg(test)]
mod tests;

use std::io::{self, BufRead, Write};

use anyhow::{Result, anyhow};
use chrono::{DateTime, Local};

use crate::cli::{BookmarkCommand, Cli, Command};
use crate::db::Storage;
use crate::http;
use crate::paths::storage_file_path;

use self::bookmarks::{BookmarkStore, now_millis};
use self::progress::ProgressStore;
use self::registry::{Registry, TitleId};
use self::updates::{SiteIndexProbe, UpdateTracker};

pub fn run(cli: Cli) -> Result<()> {
    let storage = open_storage()?;
    let mut app = App::load(&storage);

    match cli.command {
        Some(Command::Titles) | None => app.run_titles(),
        Some(Command::Open { title }) => app.run_open(&title)?,
        Some(Command::Goto { title, page }) => app.run_goto(&title, page)?,
        Some(Command::Next { title }) => app.run_step(&title, 1)?,
        Some(Command::Prev { title }) => app.run_step(&title, -1)?,
        Some(Command::Chapters { title }) => app.run_chapters(&title)?,
        Some(Command::Check { title }) => app.run_check(&title)?,
        Some(Command::Ack { title }) => app.run_ack(&title)?,
        Some(Command::Commentary { title, page }) => app.run_commentary(&title, page)?,
        Some(Command::Bookmark(command)) => app.run_bookmark(command)?,
    }

    Ok(())
}

fn open_storage() -> Result<Storage> {
    let path = storage_file_path()?;
    let storage = Storage::open(&path)?;
    storage.migrate()?;
    Ok(storage)
}

// Application root: owns the registry and the three stores and passes them
// by reference wherever they are needed.
struct App<'a> {
    storage: &'a Storage,
    registry: Registry,
    progress: ProgressStore,
    bookmarks: BookmarkStore,
    updates: UpdateTracker,
}

impl<'a> App<'a> {
    fn load(storage: &'a Storage) -> Self {
        let registry = Registry::load(storage);
        let progress = ProgressStore::load(&registry, storage);
        let bookmarks = BookmarkStore::load(storage);
        let updates = UpdateTracker::load(storage);
        Self {
            storage,
            registry,
            progress,
            bookmarks,
            updates,
        }
    }

    fn run_titles(&self) {
        println!(
            "{:<20} {:<45} {:>6} {:>7} {}",
            "TITLE", "NAME", "PAGE", "TOTAL", "NEW"
        );
        for id in TitleId::ALL {
            let descriptor = self.registry.descriptor(id);
            let marker = if self.updates.has_unseen_update(id) {
                "New!"
            } else {
                ""
            };
            println!(
                "{:<20} {:<45} {:>6} {:>7} {marker}",
                id.slug(),
                truncate(descriptor.title, 45),
                self.progress.current(id),
                self.registry.total_pages(id)
            );
        }
    }

    fn run_open(&mut self, title: &str) -> Result<()> {
        let id = parse_title(title)?;
        let page = self.progress.enter(&self.registry, id);
        self.updates.mark_read(self.storage, id, page);
        self.print_position(id, page);
        Ok(())
    }

    fn run_goto(&mut self, title: &str, requested: i64) -> Result<()> {
        let id = parse_title(title)?;
        self.run_goto_by_id(id, requested)
    }

    fn run_step(&mut self, title: &str, delta: i64) -> Result<()> {
        let id = parse_title(title)?;
        let requested = i64::from(self.progress.current(id)) + delta;
        self.run_goto_by_id(id, requested)
    }

    fn run_goto_by_id(&mut self, id: TitleId, requested: i64) -> Result<()> {
        self.discover_pages_if_needed(id, requested);
        let page = self
            .progress
            .navigate(&self.registry, self.storage, id, requested);
        self.updates.mark_read(self.storage, id, page);
        self.print_position(id, page);
        Ok(())
    }

    // A request past the flagship's last known page triggers an existence
    // probe; a confirmed page raises the stored total so the clamp lets the
    // navigation through.
    fn discover_pages_if_needed(&mut self, id: TitleId, requested: i64) {
        if !self.registry.descriptor(id).dynamic_page_count {
            return;
        }
        let known_total = self.registry.total_pages(id);
        if requested <= i64::from(known_total) {
            return;
        }
        let Ok(candidate) = u32::try_from(requested) else {
            return;
        };
        let Some(url) = files::page_image_url(id, candidate) else {
            return;
        };
        match http::head_exists_with_retries(
            &url,
            http::CONNECT_TIMEOUT,
            http::READ_TIMEOUT,
            http::PROBE_ATTEMPTS,
            http::RETRY_DELAY,
        ) {
            Ok(true) => {
                println!("Found new page {candidate}.");
                self.registry
                    .record_discovered_page(self.storage, id, candidate);
            }
            Ok(false) => {}
            Err(err) => eprintln!("Warning: could not probe for page {candidate}: {err}"),
        }
    }

    fn print_position(&self, id: TitleId, page: u32) {
        let descriptor = self.registry.descriptor(id);
        let total = self.registry.total_pages(id);
        if page > total {
            println!("{} - secret page {page}", descriptor.title);
        } else {
            println!("{} - page {page} of {total}", descriptor.title);
        }
        let chapters = self.registry.chapters(id);
        if let Some(chapter) = navigate::chapter_containing(&chapters, page) {
            println!("  {}", chapter.title);
        }
        if let Some(url) = files::page_image_url(id, page) {
            println!("  {url}");
        }
    }

    fn run_chapters(&self, title: &str) -> Result<()> {
        let id = parse_title(title)?;
        let chapters = self.registry.chapters(id);
        if chapters.is_empty() {
            println!("{} has no chapter table.", self.registry.descriptor(id).title);
            return Ok(());
        }

        let current = self.progress.current(id);
        for chapter in &chapters {
            let marker = if chapter.start_page <= current && current <= chapter.end_page {
                "*"
            } else {
                " "
            };
            println!(
                "{marker} {:<60} {:>5}-{}",
                truncate(chapter.title, 60),
                chapter.start_page,
                chapter.end_page
            );
        }

        let neighbors = navigate::chapter_neighbors(&chapters, current);
        match neighbors.prev {
            Some(page) => println!("Previous chapter starts at page {page}."),
            None => println!("No previous chapter."),
        }
        match neighbors.next {
            Some(page) => println!("Next chapter starts at page {page}."),
            None => println!("No next chapter."),
        }
        Ok(())
    }

    fn run_check(&mut self, title: &str) -> Result<()> {
        let id = parse_title(title)?;
        let descriptor = self.registry.descriptor(id);
        if !descriptor.update_tracked {
            println!("{} is a closed archive; update checks are skipped.", descriptor.title);
            return Ok(());
        }

        let result = self.updates.check_for_updates(
            self.storage,
            &self.registry,
            id,
            &SiteIndexProbe,
            now_millis(),
        );
        self.registry
            .record_discovered_page(self.storage, id, result.new_total);

        if result.has_update {
            println!(
                "{}: new pages available, latest page is {}.",
                descriptor.title, result.new_total
            );
            println!("Run `comictrack ack {}` to dismiss the indicator.", id.slug());
        } else {
            println!(
                "{}: no unread updates, latest known page is {}.",
                descriptor.title, result.new_total
            );
        }
        Ok(())
    }

    fn run_ack(&mut self, title: &str) -> Result<()> {
        let id = parse_title(title)?;
        self.updates.acknowledge(self.storage, id);
        println!("Dismissed the new-pages indicator for {}.", self.registry.descriptor(id).title);
        Ok(())
    }

    fn run_commentary(&self, title: &str, page: u32) -> Result<()> {
        let id = parse_title(title)?;
        let Some(url) = files::commentary_url(id, page) else {
            println!(
                "{} has no commentary pages.",
                self.registry.descriptor(id).title
            );
            return Ok(());
        };

        match http::get_text_with_retries(
            &url,
            http::CONNECT_TIMEOUT,
            http::READ_TIMEOUT,
            http::PROBE_ATTEMPTS,
            http::RETRY_DELAY,
        ) {
            Ok(body) => match files::extract_commentary(&body, page) {
                Some(text) => println!("{text}"),
                None => println!("No commentary found for page {page}."),
            },
            Err(err) => println!("Could not fetch commentary: {err}"),
        }
        Ok(())
    }

    fn run_bookmark(&mut self, command: BookmarkCommand) -> Result<()> {
        match command {
            BookmarkCommand::Add { title, page } => {
                let id = parse_title(&title)?;
                let max = self.registry.effective_max_page(id);
                if page < 1 || page > max {
                    println!(
                        "{} has pages 1-{max}; nothing to bookmark at page {page}.",
                        self.registry.descriptor(id).title
                    );
                } else if self.bookmarks.add(self.storage, id, page) {
                    println!("Bookmarked {} page {page}.", self.registry.descriptor(id).title);
                } else {
                    println!("That page is already bookmarked.");
                }
            }
            BookmarkCommand::Note { title, page, note } => {
                let id = parse_title(&title)?;
                if self.bookmarks.edit_note(self.storage, id, page, &note) {
                    println!("Updated note for {} page {page}.", self.registry.descriptor(id).title);
                } else {
                    println!("No bookmark at {} page {page}.", id.slug());
                }
            }
            BookmarkCommand::Rm { title, page, yes } => {
                let id = parse_title(&title)?;
                if self.bookmarks.find(id, page).is_none() {
                    println!("No bookmark at {} page {page}.", id.slug());
                    return Ok(());
                }
                if !yes && !confirm_deletion(id, page)? {
                    println!("Kept the bookmark.");
                    return Ok(());
                }
                self.bookmarks.remove(self.storage, id, page);
                println!("Deleted bookmark for {} page {page}.", self.registry.descriptor(id).title);
            }
            BookmarkCommand::List => self.run_bookmark_list(),
        }
        Ok(())
    }

    fn run_bookmark_list(&self) {
        let bookmarks = self.bookmarks.list();
        if bookmarks.is_empty() {
            println!("No bookmarks yet. Run `comictrack bookmark add <title> <page>` first.");
            return;
        }

        println!("{:<20} {:>6} {:<20} {}", "TITLE", "PAGE", "CREATED", "NOTE");
        for bookmark in bookmarks {
            println!(
                "{:<20} {:>6} {:<20} {}",
                bookmark.comic.slug(),
                bookmark.page,
                format_timestamp_display(bookmark.timestamp),
                truncate(&bookmark.note, 40)
            );
        }
    }
}

fn confirm_deletion(id: TitleId, page: u32) -> Result<bool> {
    print!("Delete the bookmark for {} page {page}? [y/N] ", id.slug());
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn parse_title(raw: &str) -> Result<TitleId> {
    TitleId::parse(raw).ok_or_else(|| {
        let known = TitleId::ALL
            .into_iter()
            .map(TitleId::slug)
            .collect::<Vec<_>>()
            .join(", ");
        anyhow!("unknown title '{raw}' (known titles: {known})")
    })
}

fn format_timestamp_display(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| millis.to_string())
}

fn truncate(s: &str, max: usize) -> String {
    let mut out = s.to_string();
    if out.chars().count() > max {
        out = out.chars().take(max.saturating_sub(3)).collect::<String>() + "...";
    }
    out
}
