use super::peer::PeerSnapshot;
use anyhow::Context;
use std::path::Path;

/// Reads the restored-peer snapshot (spec §7: "a plain list of {ip, port,
/// version}"). Missing file is not an error, it just means a cold start
/// with no prior history.
pub fn load_snapshot(path: &Path) -> anyhow::Result<Vec<PeerSnapshot>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("reading peer snapshot at {}", path.display()))?;
    let peers: Vec<PeerSnapshot> = serde_json::from_str(&data)
        .with_context(|| format!("parsing peer snapshot at {}", path.display()))?;
    Ok(peers)
}

/// Writes the current active peer set out as a snapshot, replacing
/// whatever was there before.
pub fn save_snapshot(path: &Path, peers: &[PeerSnapshot]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
    }
    let data = serde_json::to_string_pretty(peers).context("serializing peer snapshot")?;
    std::fs::write(path, data).with_context(|| format!("writing peer snapshot to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;

    #[test]
    fn round_trips_through_a_temp_file() {
        let dir = std::env::temp_dir().join(format!("relay-node-snapshot-test-{}", std::process::id()));
        let path = dir.join("peers.json");
        let peers = vec![PeerSnapshot {
            ip: "1.2.3.4".parse::<IpAddr>().unwrap(),
            port: 4001,
            version: "1.0.0".into(),
        }];
        save_snapshot(&path, &peers).unwrap();
        let loaded = load_snapshot(&path).unwrap();
        assert_eq!(loaded, peers);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let path = Path::new("/nonexistent/relay-node-snapshot.json");
        let loaded = load_snapshot(path).unwrap();
        assert!(loaded.is_empty());
    }
}
