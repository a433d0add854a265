use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "comictrack",
    version,
    about = "Read the DMFA webcomic archives with tracked progress, bookmarks, and update checks"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List every title with its current page and total
    Titles,
    /// Open a title at its resume page (bonus titles always start at page 1)
    Open { title: String },
    /// Jump to a page in a title (out-of-range pages are clamped)
    Goto { title: String, page: i64 },
    /// Advance one page
    Next { title: String },
    /// Go back one page
    Prev { title: String },
    /// Show a title's chapter table and the neighbors of the current page
    Chapters { title: String },
    /// Check the remote site for newly published pages
    Check { title: String },
    /// Dismiss a title's new-pages indicator
    Ack { title: String },
    /// Fetch the artist commentary for a page
    Commentary { title: String, page: u32 },
    /// Manage bookmarks
    #[command(subcommand)]
    Bookmark(BookmarkCommand),
}

#[derive(Debug, Subcommand)]
pub enum BookmarkCommand {
    /// Bookmark a page (duplicate bookmarks are ignored)
    Add { title: String, page: u32 },
    /// Replace the note on an existing bookmark
    Note { title: String, page: u32, note: String },
    /// Delete a bookmark
    Rm {
        title: String,
        page: u32,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// List all bookmarks
    List,
}
