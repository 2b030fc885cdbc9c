//! Building a session from configuration alone

mod common;

use std::collections::HashMap;
use std::net::UdpSocket;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use avatar_overlay::assets::{rom_digest, Triangle};
use avatar_overlay::net::protocol::SETTINGS_MESSAGE_LEN;
use avatar_overlay::util::math::Vec3;
use avatar_overlay::{Config, HostSystems, Session};

use common::{FakeEngine, FakeHost, FakeRenderer, NullAudio};

fn scratch_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("avatar-overlay-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn systems() -> HostSystems {
    let events = Arc::new(Mutex::new(Vec::new()));
    HostSystems {
        engine: Arc::new(FakeEngine::new(events.clone())),
        host: FakeHost::new(),
        renderer: Arc::new(FakeRenderer::new(events)),
        audio: Arc::new(NullAudio),
    }
}

fn config(vars: &[(&str, String)]) -> Config {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    Config::from_lookup(|name| vars.get(name).cloned()).unwrap()
}

#[tokio::test]
async fn test_configured_session_loads_files_and_reaches_peers() {
    let dir = scratch_dir();
    let rom = vec![7u8; 64];
    let rom_path = dir.join("rom.z64");
    std::fs::write(&rom_path, &rom).unwrap();
    let arena: Vec<Triangle> = vec![[
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(100.0, 0.0, 0.0),
        Vec3::new(0.0, 100.0, 0.0),
    ]];
    let arena_path = dir.join("arena.json");
    std::fs::write(&arena_path, serde_json::to_string(&arena).unwrap()).unwrap();

    let peer = UdpSocket::bind("127.0.0.1:0").unwrap();
    peer.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

    let config = config(&[
        ("AVATAR_LOG_LEVEL", "debug".to_string()),
        ("AVATAR_BIND_ADDR", "127.0.0.1:0".to_string()),
        ("AVATAR_PEERS", peer.local_addr().unwrap().to_string()),
        ("AVATAR_ROM_PATH", rom_path.display().to_string()),
        ("AVATAR_ROM_SHA256", rom_digest(&rom)),
        ("AVATAR_ARENA_FILE", arena_path.display().to_string()),
    ]);

    let session = Session::from_config(config, systems(), tokio::runtime::Handle::current())
        .await
        .expect("session built from configuration");
    session.start().unwrap().join().unwrap();
    assert!(session.assets_ready());

    session.activate(true);
    assert!(session.invite_to_join());
    let mut buf = [0u8; 512];
    let (len, _) = peer.recv_from(&mut buf).expect("settings datagram");
    assert_eq!(len, SETTINGS_MESSAGE_LEN);
    assert_eq!(i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]), -1);

    std::fs::remove_dir_all(dir).ok();
}

#[tokio::test]
async fn test_rom_digest_mismatch_keeps_assets_unready() {
    let dir = scratch_dir();
    let rom_path = dir.join("rom.z64");
    std::fs::write(&rom_path, [1u8; 32]).unwrap();

    let config = config(&[
        ("AVATAR_BIND_ADDR", "127.0.0.1:0".to_string()),
        ("AVATAR_ROM_PATH", rom_path.display().to_string()),
        ("AVATAR_ROM_SHA256", rom_digest(b"some other image")),
    ]);

    let session = Session::from_config(config, systems(), tokio::runtime::Handle::current())
        .await
        .unwrap();
    session.start().unwrap().join().unwrap();
    assert!(!session.assets_ready());
    assert!(session.on_render().is_none());

    std::fs::remove_dir_all(dir).ok();
}

#[tokio::test]
async fn test_occupied_bind_address_is_an_error() {
    let taken = UdpSocket::bind("127.0.0.1:0").unwrap();
    let config = config(&[("AVATAR_BIND_ADDR", taken.local_addr().unwrap().to_string())]);

    let result = Session::from_config(config, systems(), tokio::runtime::Handle::current()).await;
    assert!(result.is_err());
}
