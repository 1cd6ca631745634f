use crate::error::{Result, SoundTouchError};
use crate::protocol::Category;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Network locator of a speaker (host name or IP address)
pub type DeviceAddress = String;

/// Lifecycle state of a [`DeviceSession`](crate::DeviceSession)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Created, never connected
    Unconnected,
    /// Transport is being opened
    Connecting,
    /// Transport open and traffic flowing
    Live,
    /// Transport open but a keepalive probe went unanswered
    Degraded,
    /// Terminal; create a new session to reconnect
    Closed,
}

impl SessionState {
    /// Whether the session currently owns a transport
    pub fn is_connected(self) -> bool {
        matches!(self, SessionState::Live | SessionState::Degraded)
    }
}

/// Last-known value of every category
///
/// Each slot is replaced wholesale when a new document for its category
/// arrives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    pub info: Option<Value>,
    pub now_playing: Option<Value>,
    pub volume: Option<Value>,
    pub bass: Option<Value>,
    pub bass_capabilities: Option<Value>,
    pub presets: Option<Value>,
    pub sources: Option<Value>,
    pub zone: Option<Value>,
    pub track_info: Option<Value>,
}

impl DeviceState {
    pub fn get(&self, category: Category) -> Option<&Value> {
        self.slot(category).as_ref()
    }

    pub(crate) fn set(&mut self, category: Category, value: Value) {
        *self.slot_mut(category) = Some(value);
    }

    fn slot(&self, category: Category) -> &Option<Value> {
        match category {
            Category::Info => &self.info,
            Category::NowPlaying => &self.now_playing,
            Category::Volume => &self.volume,
            Category::Bass => &self.bass,
            Category::BassCapabilities => &self.bass_capabilities,
            Category::Presets => &self.presets,
            Category::Sources => &self.sources,
            Category::Zone => &self.zone,
            Category::TrackInfo => &self.track_info,
        }
    }

    fn slot_mut(&mut self, category: Category) -> &mut Option<Value> {
        match category {
            Category::Info => &mut self.info,
            Category::NowPlaying => &mut self.now_playing,
            Category::Volume => &mut self.volume,
            Category::Bass => &mut self.bass,
            Category::BassCapabilities => &mut self.bass_capabilities,
            Category::Presets => &mut self.presets,
            Category::Sources => &mut self.sources,
            Category::Zone => &mut self.zone,
            Category::TrackInfo => &mut self.track_info,
        }
    }
}

/// Device identity from the `info` category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_id: Option<String>,
    pub name: String,
    /// Product name, e.g. "SoundTouch 10"
    pub device_type: Option<String>,
    pub marge_account_uuid: Option<String>,
}

impl DeviceInfo {
    pub fn from_value(value: &Value) -> Result<Self> {
        let name = str_field(value, "name")
            .ok_or_else(|| SoundTouchError::InvalidResponse("Missing device name".to_string()))?;

        Ok(Self {
            device_id: str_field(value, "deviceID"),
            name,
            device_type: str_field(value, "type"),
            marge_account_uuid: str_field(value, "margeAccountUUID"),
        })
    }
}

/// Volume from the `volume` category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    /// Level the speaker is moving towards (0-100)
    pub target: u8,
    /// Level the speaker is at (0-100)
    pub actual: u8,
    pub muted: bool,
}

impl Volume {
    pub fn from_value(value: &Value) -> Result<Self> {
        let actual = level_field(value, "actualvolume")?;
        let target = match value.get("targetvolume") {
            Some(_) => level_field(value, "targetvolume")?,
            None => actual,
        };
        let muted = str_field(value, "muteenabled").as_deref() == Some("true");

        Ok(Self { target, actual, muted })
    }
}

/// Bass level from the `bass` category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bass {
    pub target: i32,
    pub actual: i32,
}

impl Bass {
    pub fn from_value(value: &Value) -> Result<Self> {
        let actual = int_field(value, "actualbass")?;
        let target = match value.get("targetbass") {
            Some(_) => int_field(value, "targetbass")?,
            None => actual,
        };

        Ok(Self { target, actual })
    }
}

/// What the speaker is playing, from the `nowPlaying` category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NowPlaying {
    pub source: String,
    pub track: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub station_name: Option<String>,
    /// `PLAY_STATE`, `PAUSE_STATE`, `STOP_STATE` or `BUFFERING_STATE`
    pub play_status: Option<String>,
}

impl NowPlaying {
    pub fn from_value(value: &Value) -> Result<Self> {
        let source = str_field(value, "source")
            .ok_or_else(|| SoundTouchError::InvalidResponse("Missing now playing source".to_string()))?;

        Ok(Self {
            source,
            track: str_field(value, "track"),
            artist: str_field(value, "artist"),
            album: str_field(value, "album"),
            station_name: str_field(value, "stationName"),
            play_status: str_field(value, "playStatus"),
        })
    }

    /// Whether the speaker is in standby
    pub fn is_standby(&self) -> bool {
        self.source == "STANDBY"
    }
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

// Decoded documents carry numbers as text, accept both
fn int_field(value: &Value, key: &str) -> Result<i32> {
    let field = value
        .get(key)
        .ok_or_else(|| SoundTouchError::InvalidResponse(format!("Missing {}", key)))?;

    let parsed = match field {
        Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<i32>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| SoundTouchError::InvalidResponse(format!("Invalid {}: {}", key, field)))
}

fn level_field(value: &Value, key: &str) -> Result<u8> {
    let level = int_field(value, key)?;
    u8::try_from(level)
        .ok()
        .filter(|l| *l <= 100)
        .ok_or_else(|| SoundTouchError::InvalidResponse(format!("{} out of range: {}", key, level)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::decode;
    use serde_json::json;

    #[test]
    fn test_device_state_slots_are_independent() {
        let mut state = DeviceState::default();
        state.set(Category::Volume, json!({ "actual": 30 }));
        state.set(Category::Volume, json!({ "actual": 40 }));

        assert_eq!(state.get(Category::Volume), Some(&json!({ "actual": 40 })));
        for category in Category::ALL.into_iter().filter(|c| *c != Category::Volume) {
            assert_eq!(state.get(category), None);
        }
    }

    #[test]
    fn test_volume_from_decoded_document() {
        let doc = decode(
            br#"<volume deviceID="X"><targetvolume>32</targetvolume><actualvolume>30</actualvolume><muteenabled>false</muteenabled></volume>"#,
        )
        .unwrap();

        let volume = Volume::from_value(&doc["volume"]).unwrap();
        assert_eq!(volume, Volume { target: 32, actual: 30, muted: false });
    }

    #[test]
    fn test_volume_rejects_out_of_range() {
        let result = Volume::from_value(&json!({ "actualvolume": "140" }));
        assert!(matches!(result, Err(SoundTouchError::InvalidResponse(_))));
    }

    #[test]
    fn test_bass_accepts_negative_levels() {
        let bass = Bass::from_value(&json!({ "targetbass": "-3", "actualbass": -2 })).unwrap();
        assert_eq!(bass, Bass { target: -3, actual: -2 });
    }

    #[test]
    fn test_device_info_requires_name() {
        let info = DeviceInfo::from_value(&json!({ "deviceID": "A1", "name": "Kitchen", "type": "SoundTouch 20" })).unwrap();
        assert_eq!(info.name, "Kitchen");
        assert_eq!(info.device_type.as_deref(), Some("SoundTouch 20"));

        assert!(DeviceInfo::from_value(&json!({ "deviceID": "A1" })).is_err());
    }

    #[test]
    fn test_now_playing_standby() {
        let playing = NowPlaying::from_value(&json!({ "source": "STANDBY", "deviceID": "X" })).unwrap();
        assert!(playing.is_standby());
        assert_eq!(playing.track, None);
    }
}
