use serde::{Deserialize, Serialize};
use std::fmt;

/// Keepalive probe sent by the liveness monitor
pub const PING_REQUEST: &str = "webserver/pingRequest";

/// Top-level tag of the update envelope
pub const UPDATES_TAG: &str = "updates";

/// Suffix of update envelope children (`volumeUpdated`, `presetsUpdated`, ...)
pub const UPDATED_SUFFIX: &str = "Updated";

/// Device state domains the speaker reports
///
/// The declaration order is the order in which handlers run when one
/// message carries several categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Info,
    NowPlaying,
    Volume,
    Bass,
    BassCapabilities,
    Presets,
    Sources,
    Zone,
    TrackInfo,
}

impl Category {
    /// Every category, in dispatch order
    pub const ALL: [Category; 9] = [
        Category::Info,
        Category::NowPlaying,
        Category::Volume,
        Category::Bass,
        Category::BassCapabilities,
        Category::Presets,
        Category::Sources,
        Category::Zone,
        Category::TrackInfo,
    ];

    /// Root tag of documents carrying this category
    pub fn tag(self) -> &'static str {
        match self {
            Category::Info => "info",
            Category::NowPlaying => "nowPlaying",
            Category::Volume => "volume",
            Category::Bass => "bass",
            Category::BassCapabilities => "bassCapabilities",
            Category::Presets => "presets",
            Category::Sources => "sources",
            Category::Zone => "zone",
            Category::TrackInfo => "trackInfo",
        }
    }

    /// Token written to the socket to ask for this category
    pub fn request_token(self) -> &'static str {
        match self {
            Category::Info => "info",
            Category::NowPlaying => "now_playing",
            Category::Volume => "volume",
            Category::Bass => "bass",
            Category::BassCapabilities => "bassCapabilities",
            Category::Presets => "presets",
            Category::Sources => "sources",
            Category::Zone => "getZone",
            Category::TrackInfo => "trackInfo",
        }
    }

    /// Look up a category by its root tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "info" => Some(Category::Info),
            "nowPlaying" => Some(Category::NowPlaying),
            "volume" => Some(Category::Volume),
            "bass" => Some(Category::Bass),
            "bassCapabilities" => Some(Category::BassCapabilities),
            "presets" => Some(Category::Presets),
            "sources" => Some(Category::Sources),
            "zone" => Some(Category::Zone),
            "trackInfo" => Some(Category::TrackInfo),
            _ => None,
        }
    }

    /// Look up a category by the name of its update envelope child
    pub fn from_update_tag(tag: &str) -> Option<Self> {
        tag.strip_suffix(UPDATED_SUFFIX).and_then(Self::from_tag)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
