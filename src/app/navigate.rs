use super::registry::{Chapter, Registry, TitleId};

// Pure navigation layer shared by the progress store and direct jumps.
// Requests outside the navigable range are clamped, never rejected.
pub(crate) fn clamp(registry: &Registry, id: TitleId, requested: i64) -> u32 {
    let max = i64::from(registry.effective_max_page(id));
    requested.clamp(1, max) as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ChapterNeighbors {
    pub(crate) prev: Option<u32>,
    pub(crate) next: Option<u32>,
}

// Start pages of the chapters adjacent to the one containing `current_page`.
// A page outside every chapter (gaps between chapters, the secret page) has
// no neighbors.
pub(crate) fn chapter_neighbors(chapters: &[Chapter], current_page: u32) -> ChapterNeighbors {
    let Some(index) = chapters
        .iter()
        .position(|ch| ch.start_page <= current_page && current_page <= ch.end_page)
    else {
        return ChapterNeighbors {
            prev: None,
            next: None,
        };
    };

    ChapterNeighbors {
        prev: index
            .checked_sub(1)
            .map(|prev| chapters[prev].start_page),
        next: chapters.get(index + 1).map(|ch| ch.start_page),
    }
}

pub(crate) fn chapter_containing(chapters: &[Chapter], page: u32) -> Option<&Chapter> {
    chapters
        .iter()
        .find(|ch| ch.start_page <= page && page <= ch.end_page)
}
