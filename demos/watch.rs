//! Connect to a speaker and print everything it reports.
//!
//! ```text
//! RUST_LOG=soundtouch=debug cargo run --example watch -- 192.168.1.40
//! ```

use soundtouch::{DeviceInfo, DeviceSession, NowPlaying, SessionEvent, Volume};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let address = std::env::args()
        .nth(1)
        .ok_or("usage: watch <speaker address>")?;

    let session = DeviceSession::new(address);
    let mut events = session.subscribe();
    session.connect().await?;

    let state = session.update_all().await?;
    if let Some(info) = &state.info {
        let info = DeviceInfo::from_value(info)?;
        println!("Connected to {} ({})", info.name, info.device_type.unwrap_or_default());
    }

    loop {
        match events.recv().await? {
            SessionEvent::Volume(value) => match Volume::from_value(&value) {
                Ok(volume) => println!("Volume: {} (muted: {})", volume.actual, volume.muted),
                Err(e) => println!("Volume: {} ({})", value, e),
            },
            SessionEvent::NowPlaying(value) => match NowPlaying::from_value(&value) {
                Ok(playing) if playing.is_standby() => println!("Standby"),
                Ok(playing) => println!(
                    "Playing: {} - {} [{}]",
                    playing.artist.unwrap_or_default(),
                    playing.track.unwrap_or_default(),
                    playing.source
                ),
                Err(e) => println!("Now playing: {} ({})", value, e),
            },
            SessionEvent::Closed => {
                println!("Connection closed");
                break;
            }
            SessionEvent::Error(cause) => println!("Error: {}", cause),
            other => {
                if let Some((category, value)) = other.category_value() {
                    println!("{}: {}", category, value);
                }
            }
        }
    }

    Ok(())
}
