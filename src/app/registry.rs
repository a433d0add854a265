use crate::db::Storage;

pub(crate) const DEFAULT_DMFA_PAGES: u32 = 2162;
pub(crate) const DMFA_TOTAL_PAGES_KEY: &str = "dmfa-total-pages";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum TitleId {
    Dmfa,
    Abel,
    Matilda,
    CubiMindAbilities,
    FurraaeFashionLaws,
    HybridGenetics,
    CubiClanLeaders,
    PerfectDate,
    TakingPride,
    BorkedWrist,
    UncanonChristmas,
    BonusComics,
    WallpaperWars,
    WryMain,
    WryStuff,
    WryNp,
    WrySketches,
}

impl TitleId {
    pub(crate) const ALL: [TitleId; 17] = [
        TitleId::Dmfa,
        TitleId::Abel,
        TitleId::Matilda,
        TitleId::CubiMindAbilities,
        TitleId::FurraaeFashionLaws,
        TitleId::HybridGenetics,
        TitleId::CubiClanLeaders,
        TitleId::PerfectDate,
        TitleId::TakingPride,
        TitleId::BorkedWrist,
        TitleId::UncanonChristmas,
        TitleId::BonusComics,
        TitleId::WallpaperWars,
        TitleId::WryMain,
        TitleId::WryStuff,
        TitleId::WryNp,
        TitleId::WrySketches,
    ];

    // Stable identifier used in persisted data and on the command line. These
    // match the keys the original web reader stored, so an imported state file
    // round-trips without translation.
    pub(crate) fn slug(self) -> &'static str {
        match self {
            TitleId::Dmfa => "dmfa",
            TitleId::Abel => "abel",
            TitleId::Matilda => "matilda",
            TitleId::CubiMindAbilities => "cubiMindAbilities",
            TitleId::FurraaeFashionLaws => "furraaeFashionLaws",
            TitleId::HybridGenetics => "hybridGenetics",
            TitleId::CubiClanLeaders => "cubiClanLeaders",
            TitleId::PerfectDate => "perfectDate",
            TitleId::TakingPride => "takingPride",
            TitleId::BorkedWrist => "borkedWrist",
            TitleId::UncanonChristmas => "uncanonChristmas",
            TitleId::BonusComics => "bonusComics",
            TitleId::WallpaperWars => "wallpaperWars",
            TitleId::WryMain => "wryMain",
            TitleId::WryStuff => "wryStuff",
            TitleId::WryNp => "wryNP",
            TitleId::WrySketches => "wrySketches",
        }
    }

    pub(crate) fn parse(raw: &str) -> Option<TitleId> {
        let wanted = normalize_title_key(raw);
        TitleId::ALL
            .into_iter()
            .find(|id| normalize_title_key(id.slug()) == wanted)
    }
}

fn normalize_title_key(raw: &str) -> String {
    raw.chars()
        .filter(|ch| ch.is_ascii_alphanumeric())
        .map(|ch| ch.to_ascii_lowercase())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Chapter {
    pub(crate) title: &'static str,
    pub(crate) start_page: u32,
    pub(crate) end_page: u32,
}

#[derive(Debug)]
pub(crate) struct TitleDescriptor {
    pub(crate) title: &'static str,
    pub(crate) total_pages: u32,
    pub(crate) chapters: &'static [Chapter],
    pub(crate) image_base_url: &'static str,
    pub(crate) storage_key: &'static str,
    pub(crate) secret_page: Option<u32>,
    pub(crate) dynamic_page_count: bool,
    pub(crate) resets_on_entry: bool,
    pub(crate) update_tracked: bool,
    pub(crate) commentary_enabled: bool,
}

const COMICS_BASE_URL: &str = "https://missmab.com/Comics/";
const DEMO_BASE_URL: &str = "https://missmab.com/Demo/Images/";
const WRY_BASE_URL: &str = "https://missmab.xepher.net/WRY/";

const DMFA_CHAPTERS: &[Chapter] = &[
    Chapter { title: "Chapter 1: Introduction", start_page: 1, end_page: 6 },
    Chapter { title: "Chapter 2: The Poke-craze", start_page: 7, end_page: 17 },
    Chapter { title: "Chapter 3: Prelude", start_page: 18, end_page: 31 },
    Chapter { title: "Chapter 4: Beach!", start_page: 32, end_page: 51 },
    Chapter { title: "Chapter 5: Merlitz and the Human", start_page: 52, end_page: 63 },
    Chapter { title: "Chapter 6: Twinks!", start_page: 64, end_page: 91 },
    Chapter { title: "Chapter 7: A Cow Named Lorenda", start_page: 92, end_page: 103 },
    Chapter { title: "Chapter 8: Home Again", start_page: 104, end_page: 115 },
    Chapter { title: "Chapter 9: Daniel Ti-Fiona, Warrior for Hire?", start_page: 116, end_page: 171 },
    Chapter { title: "Chapter 10: What Makes a Comic Great", start_page: 172, end_page: 193 },
    Chapter { title: "Chapter 11: Guys Night Out... With Wildy?", start_page: 195, end_page: 239 },
    Chapter { title: "Chapter 12: Patches", start_page: 240, end_page: 272 },
    Chapter { title: "Chapter 13: The Shortest Story-Arch Ever!", start_page: 273, end_page: 273 },
    Chapter { title: "Chapter 14: A Recipe of Disasters", start_page: 274, end_page: 321 },
    Chapter { title: "Chapter 15: Disarray, Dischord, and Bubblegum", start_page: 322, end_page: 376 },
    Chapter { title: "Chapter 16: Just Wingin' It", start_page: 377, end_page: 429 },
    Chapter { title: "Chapter 17: 'Cause Every Comic Needs a Non-Cannon Spy Spoof", start_page: 430, end_page: 480 },
    Chapter { title: "Chapter 18: Unwilling and Abel at Cubi Academy", start_page: 481, end_page: 608 },
    Chapter { title: "Chapter 19: Life is Wonderful.", start_page: 609, end_page: 675 },
    Chapter { title: "Chapter 20: Get me to the Church.", start_page: 676, end_page: 755 },
    Chapter { title: "Chapter 21: Light Lunch.", start_page: 756, end_page: 777 },
    Chapter { title: "Chapter 22: All hail Queen Mab.", start_page: 778, end_page: 847 },
    Chapter { title: "Chapter 23: Continuity is for the weak!", start_page: 848, end_page: 857 },
    Chapter { title: "Chapter 24: The Return of Dark Pegasus?", start_page: 858, end_page: 1024 },
    Chapter { title: "Chapter 25: Fae", start_page: 1025, end_page: 1035 },
    Chapter { title: "Chapter 26: Painting the town Red", start_page: 1036, end_page: 1117 },
    Chapter { title: "Chapter 27: Randomosity", start_page: 1118, end_page: 1200 },
    Chapter { title: "Chapter 28: Back to Basics", start_page: 1201, end_page: 1283 },
    Chapter { title: "Chapter 29: Girls Day In", start_page: 1284, end_page: 1310 },
    Chapter { title: "Chapter 30: And Then Everything Went Wrong", start_page: 1311, end_page: 1383 },
    Chapter { title: "Chapter 31: Friends in High Places", start_page: 1384, end_page: 1503 },
    Chapter { title: "Chapter 32: The Fun In Dysfunction", start_page: 1504, end_page: 1551 },
    Chapter { title: "Chapter 33: No Take-Backs", start_page: 1552, end_page: 1571 },
    Chapter { title: "Chapter 34: Letter Home", start_page: 1572, end_page: 1610 },
    Chapter { title: "Chapter 35: Before the Fall", start_page: 1611, end_page: 1691 },
    Chapter { title: "Chapter 36: The Art of PR", start_page: 1692, end_page: 1718 },
    Chapter { title: "Chapter 37: Clubbing", start_page: 1719, end_page: 1789 },
    Chapter { title: "Chapter 38: Party Time", start_page: 1790, end_page: 1865 },
    Chapter { title: "Chapter 39: Go Biggs or Go Home", start_page: 1866, end_page: 1896 },
    Chapter { title: "Chapter 40: Fly Me to the Moon", start_page: 1897, end_page: DEFAULT_DMFA_PAGES },
];

const ABEL_CHAPTERS: &[Chapter] = &[
    Chapter { title: "Part 1", start_page: 1, end_page: 111 },
    Chapter { title: "Part 2", start_page: 112, end_page: 217 },
];

const MATILDA_CHAPTERS: &[Chapter] =
    &[Chapter { title: "Matilda", start_page: 1, end_page: 73 }];

const CUBI_MIND_ABILITIES_CHAPTERS: &[Chapter] =
    &[Chapter { title: "Cubi Mind Abilities", start_page: 1, end_page: 5 }];

const FURRAAE_FASHION_LAWS_CHAPTERS: &[Chapter] =
    &[Chapter { title: "Furrae Fashion Laws", start_page: 1, end_page: 4 }];

const HYBRID_GENETICS_CHAPTERS: &[Chapter] =
    &[Chapter { title: "Hybrid Genetics", start_page: 1, end_page: 14 }];

const CUBI_CLAN_LEADERS_CHAPTERS: &[Chapter] =
    &[Chapter { title: "Cubi Clan Leaders", start_page: 1, end_page: 15 }];

const BONUS_COMICS_CHAPTERS: &[Chapter] = &[
    Chapter { title: "Valentine's Day Comics", start_page: 1, end_page: 6 },
    Chapter { title: "April Fools Comics", start_page: 7, end_page: 10 },
    Chapter { title: "Guest Comics", start_page: 11, end_page: 40 },
    Chapter { title: "Bonus Materials", start_page: 41, end_page: 58 },
];

const WALLPAPER_WARS_CHAPTERS: &[Chapter] = &[
    Chapter { title: "Wedding VS. Shonen", start_page: 1, end_page: 3 },
    Chapter { title: "Cosplay VS. DDR", start_page: 4, end_page: 14 },
    Chapter { title: "Pirates VS. Ninjas", start_page: 15, end_page: 28 },
    Chapter { title: "Alien Dice VS. DMFA", start_page: 29, end_page: 53 },
    Chapter { title: "Alien Dice VS. DMFA: The Alien Dice Meters", start_page: 54, end_page: 73 },
    Chapter { title: "Abel VS. Regina", start_page: 74, end_page: 88 },
    Chapter { title: "SAIA Librarian VS. Fa'lina's Dance No.", start_page: 89, end_page: 96 },
    Chapter { title: "Wildy VS. Jyrras", start_page: 97, end_page: 107 },
    Chapter { title: "Tag Team Battle", start_page: 108, end_page: 120 },
];

const WRY_MAIN_CHAPTERS: &[Chapter] =
    &[Chapter { title: "WRY - Main Collection", start_page: 1, end_page: 136 }];

const WRY_STUFF_CHAPTERS: &[Chapter] =
    &[Chapter { title: "WRY - Stuff", start_page: 1, end_page: 4 }];

const WRY_NP_CHAPTERS: &[Chapter] =
    &[Chapter { title: "WRY - NP", start_page: 1, end_page: 18 }];

const WRY_SKETCHES_CHAPTERS: &[Chapter] =
    &[Chapter { title: "WRY - Sketches", start_page: 1, end_page: 33 }];

pub(crate) fn descriptor(id: TitleId) -> &'static TitleDescriptor {
    match id {
        TitleId::Dmfa => &TitleDescriptor {
            title: "Dan and Mab's Furry Adventures",
            total_pages: DEFAULT_DMFA_PAGES,
            chapters: DMFA_CHAPTERS,
            image_base_url: COMICS_BASE_URL,
            storage_key: "dmfa-reader-progress",
            secret_page: None,
            dynamic_page_count: true,
            resets_on_entry: false,
            update_tracked: true,
            commentary_enabled: true,
        },
        TitleId::Abel => &TitleDescriptor {
            title: "Abel's Story",
            total_pages: 217,
            chapters: ABEL_CHAPTERS,
            image_base_url: COMICS_BASE_URL,
            storage_key: "dmfa-abel-reader-progress",
            secret_page: None,
            dynamic_page_count: false,
            resets_on_entry: false,
            update_tracked: true,
            commentary_enabled: false,
        },
        TitleId::Matilda => &TitleDescriptor {
            title: "Matilda",
            total_pages: 73,
            chapters: MATILDA_CHAPTERS,
            image_base_url: COMICS_BASE_URL,
            storage_key: "dmfa-matilda-reader-progress",
            secret_page: None,
            dynamic_page_count: false,
            resets_on_entry: false,
            update_tracked: true,
            commentary_enabled: false,
        },
        TitleId::CubiMindAbilities => &TitleDescriptor {
            title: "Cubi Mind Abilities",
            total_pages: 5,
            chapters: CUBI_MIND_ABILITIES_CHAPTERS,
            image_base_url: DEMO_BASE_URL,
            storage_key: "dmfa-cubi-mind-abilities-progress",
            secret_page: None,
            dynamic_page_count: false,
            resets_on_entry: true,
            update_tracked: true,
            commentary_enabled: false,
        },
        TitleId::FurraaeFashionLaws => &TitleDescriptor {
            title: "Furrae Fashion Laws",
            total_pages: 4,
            chapters: FURRAAE_FASHION_LAWS_CHAPTERS,
            image_base_url: DEMO_BASE_URL,
            storage_key: "dmfa-furrae-fashion-laws-progress",
            secret_page: None,
            dynamic_page_count: false,
            resets_on_entry: true,
            update_tracked: true,
            commentary_enabled: false,
        },
        TitleId::HybridGenetics => &TitleDescriptor {
            title: "Hybrid Genetics",
            total_pages: 14,
            chapters: HYBRID_GENETICS_CHAPTERS,
            image_base_url: DEMO_BASE_URL,
            storage_key: "dmfa-hybrid-genetics-progress",
            // One undocumented easter-egg page past the official archive.
            secret_page: Some(15),
            dynamic_page_count: false,
            resets_on_entry: true,
            update_tracked: true,
            commentary_enabled: false,
        },
        TitleId::CubiClanLeaders => &TitleDescriptor {
            title: "Cubi Clan Leaders",
            total_pages: 15,
            chapters: CUBI_CLAN_LEADERS_CHAPTERS,
            image_base_url: DEMO_BASE_URL,
            storage_key: "dmfa-cubi-clan-leaders-progress",
            secret_page: None,
            dynamic_page_count: false,
            resets_on_entry: true,
            update_tracked: true,
            commentary_enabled: false,
        },
        TitleId::PerfectDate => &TitleDescriptor {
            title: "Perfect Date",
            total_pages: 18,
            chapters: &[],
            image_base_url: COMICS_BASE_URL,
            storage_key: "perfect-date-progress",
            secret_page: None,
            dynamic_page_count: false,
            resets_on_entry: true,
            update_tracked: true,
            commentary_enabled: false,
        },
        TitleId::TakingPride => &TitleDescriptor {
            title: "Taking Pride",
            total_pages: 8,
            chapters: &[],
            image_base_url: COMICS_BASE_URL,
            storage_key: "taking-pride-progress",
            secret_page: None,
            dynamic_page_count: false,
            resets_on_entry: true,
            update_tracked: true,
            commentary_enabled: false,
        },
        TitleId::BorkedWrist => &TitleDescriptor {
            title: "Borked Wrist Sketchapalooza",
            total_pages: 24,
            chapters: &[],
            image_base_url: COMICS_BASE_URL,
            storage_key: "borked-wrist-progress",
            secret_page: None,
            dynamic_page_count: false,
            resets_on_entry: true,
            update_tracked: true,
            commentary_enabled: false,
        },
        TitleId::UncanonChristmas => &TitleDescriptor {
            title: "Have yourself an un-canon little Christmas",
            total_pages: 6,
            chapters: &[],
            image_base_url: COMICS_BASE_URL,
            storage_key: "uncanon-christmas-progress",
            secret_page: None,
            dynamic_page_count: false,
            resets_on_entry: true,
            update_tracked: true,
            commentary_enabled: false,
        },
        TitleId::BonusComics => &TitleDescriptor {
            title: "Bonus Comics",
            total_pages: 58,
            chapters: BONUS_COMICS_CHAPTERS,
            image_base_url: "https://missmab.com/Bonus/",
            storage_key: "bonus-comics-progress",
            secret_page: None,
            dynamic_page_count: false,
            resets_on_entry: true,
            update_tracked: false,
            commentary_enabled: false,
        },
        TitleId::WallpaperWars => &TitleDescriptor {
            title: "Wallpaper Wars",
            total_pages: 120,
            chapters: WALLPAPER_WARS_CHAPTERS,
            image_base_url: "https://missmab.com/WW/",
            storage_key: "wallpaper-wars-progress",
            secret_page: None,
            dynamic_page_count: false,
            resets_on_entry: true,
            update_tracked: false,
            commentary_enabled: false,
        },
        TitleId::WryMain => &TitleDescriptor {
            title: "WRY - Main Collection",
            total_pages: 136,
            chapters: WRY_MAIN_CHAPTERS,
            image_base_url: WRY_BASE_URL,
            storage_key: "wry-main-progress",
            secret_page: None,
            dynamic_page_count: false,
            resets_on_entry: true,
            update_tracked: true,
            commentary_enabled: false,
        },
        TitleId::WryStuff => &TitleDescriptor {
            title: "WRY - Stuff",
            total_pages: 4,
            chapters: WRY_STUFF_CHAPTERS,
            image_base_url: "https://missmab.xepher.net/WRY/Stuff/",
            storage_key: "wry-stuff-progress",
            secret_page: None,
            dynamic_page_count: false,
            resets_on_entry: true,
            update_tracked: true,
            commentary_enabled: false,
        },
        TitleId::WryNp => &TitleDescriptor {
            title: "WRY - NP",
            total_pages: 18,
            chapters: WRY_NP_CHAPTERS,
            image_base_url: "https://missmab.xepher.net/WRY/NP/",
            storage_key: "wry-np-progress",
            secret_page: None,
            dynamic_page_count: false,
            resets_on_entry: true,
            update_tracked: true,
            commentary_enabled: false,
        },
        TitleId::WrySketches => &TitleDescriptor {
            title: "WRY - Sketches",
            total_pages: 33,
            chapters: WRY_SKETCHES_CHAPTERS,
            image_base_url: "https://missmab.xepher.net/WRY/Sketches/",
            storage_key: "wry-sketches-progress",
            secret_page: None,
            dynamic_page_count: false,
            resets_on_entry: true,
            update_tracked: true,
            commentary_enabled: false,
        },
    }
}

// Owned by the application root and passed by reference to the stores. The
// only mutable piece is the flagship title's dynamically discovered page
// count; everything else is the constant table above.
pub(crate) struct Registry {
    dmfa_total_pages: u32,
}

impl Registry {
    pub(crate) fn load(storage: &Storage) -> Self {
        let stored = match storage.get(DMFA_TOTAL_PAGES_KEY) {
            Ok(value) => value,
            Err(err) => {
                eprintln!("Warning: failed to read stored page count: {err}");
                None
            }
        };
        let dmfa_total_pages = stored
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .map_or(DEFAULT_DMFA_PAGES, |total| total.max(DEFAULT_DMFA_PAGES));
        Self { dmfa_total_pages }
    }

    #[cfg(test)]
    pub(crate) fn with_defaults() -> Self {
        Self {
            dmfa_total_pages: DEFAULT_DMFA_PAGES,
        }
    }

    pub(crate) fn descriptor(&self, id: TitleId) -> &'static TitleDescriptor {
        descriptor(id)
    }

    pub(crate) fn total_pages(&self, id: TitleId) -> u32 {
        if id == TitleId::Dmfa {
            self.dmfa_total_pages
        } else {
            descriptor(id).total_pages
        }
    }

    pub(crate) fn effective_max_page(&self, id: TitleId) -> u32 {
        descriptor(id)
            .secret_page
            .unwrap_or_else(|| self.total_pages(id))
    }

    // Chapter table with the growing title's open-ended last chapter
    // stretched to the current total.
    pub(crate) fn chapters(&self, id: TitleId) -> Vec<Chapter> {
        let mut chapters = descriptor(id).chapters.to_vec();
        if descriptor(id).dynamic_page_count
            && let Some(last) = chapters.last_mut()
        {
            last.end_page = self.total_pages(id);
        }
        chapters
    }

    // Raises the known page count after a successful existence probe. The
    // count never shrinks; a stale persisted value below the default is
    // ignored at load instead.
    pub(crate) fn record_discovered_page(&mut self, storage: &Storage, id: TitleId, page: u32) {
        if !descriptor(id).dynamic_page_count || page <= self.dmfa_total_pages {
            return;
        }
        self.dmfa_total_pages = page;
        if let Err(err) = storage.set(DMFA_TOTAL_PAGES_KEY, &page.to_string()) {
            eprintln!("Warning: failed to persist discovered page count: {err}");
        }
    }
}
