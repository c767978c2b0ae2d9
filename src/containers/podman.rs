// src/containers/podman.rs

use super::ImageInfo;
use crate::error::{Error, Result};
use serde::Deserialize;

pub(super) const IMAGES_ARGS: &[&str] = &["images", "--format", "json"];

#[derive(Deserialize)]
struct PodmanImage {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Names", default)]
    names: Vec<String>,
}

pub(super) fn parse_images(output: &str) -> Result<Vec<ImageInfo>> {
    if output.trim().is_empty() {
        return Ok(Vec::new());
    }
    let images: Vec<PodmanImage> = serde_json::from_str(output)
        .map_err(|e| Error::ContainerError(format!("Malformed podman image listing: {}", e)))?;
    Ok(images
        .into_iter()
        .map(|img| ImageInfo {
            id: img.id,
            names: img.names,
        })
        .collect())
}

/// Highest subordinate ID, the last column of `/etc/subuid` or `/etc/subgid`
pub fn subid_max(content: &str) -> Result<u32> {
    content
        .lines()
        .rfind(|l| !l.trim().is_empty())
        .and_then(|l| l.rsplit(':').next())
        .and_then(|n| n.trim().parse().ok())
        .ok_or_else(|| Error::ContainerError("Can't determine subordinate ID range".to_string()))
}

/// Map the user to itself inside the container and root to the first
/// subordinate ID, so files written to bind mounts keep the user's ownership
pub fn id_map_args(uid: u32, uid_max: u32, gid_max: u32) -> Vec<String> {
    let maps = |flag: &str, max: u32| {
        [
            format!("0:1:{}", uid),
            format!("{}:0:1", uid),
            format!("{}:{}:{}", uid + 1, uid + 1, max.saturating_sub(uid)),
        ]
        .into_iter()
        .flat_map(move |m| [flag.to_string(), m])
        .collect::<Vec<_>>()
    };

    let mut args = maps("--uidmap", uid_max);
    args.extend(maps("--gidmap", gid_max));
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_map_args() {
        assert_eq!(
            id_map_args(100, 6000, 6000),
            [
                "--uidmap", "0:1:100", "--uidmap", "100:0:1", "--uidmap", "101:101:5900",
                "--gidmap", "0:1:100", "--gidmap", "100:0:1", "--gidmap", "101:101:5900",
            ]
        );
    }

    #[test]
    fn test_subid_max() {
        assert_eq!(subid_max("_:_:6000").unwrap(), 6000);
        assert_eq!(subid_max("alice:100000:65536\nbob:165536:65536\n\n").unwrap(), 65536);
        assert!(subid_max("").is_err());
    }

    #[test]
    fn test_parse_images() {
        let out = concat!(
            r#"[{"Id":"3f57d9401f8d","Names":["localhost/ci-fedora-41:latest"]},"#,
            r#"{"Id":"bd0c"}]"#,
        );
        let images = parse_images(out).unwrap();
        assert!(images[0].matches("ci-fedora-41", "latest"));
        assert!(images[1].names.is_empty());
        assert!(parse_images("  \n").unwrap().is_empty());
    }
}
