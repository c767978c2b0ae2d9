// src/containers/docker.rs

use super::ImageInfo;
use crate::error::{Error, Result};
use serde::Deserialize;

/// Docker prints one JSON object per image and line with this format
pub(super) const IMAGES_ARGS: &[&str] = &["images", "--format", "{{json .}}"];

#[derive(Deserialize)]
struct DockerImage {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Repository", default)]
    repository: String,
    #[serde(rename = "Tag", default = "latest")]
    tag: String,
}

fn latest() -> String {
    "latest".to_string()
}

pub(super) fn parse_images(output: &str) -> Result<Vec<ImageInfo>> {
    output
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|line| {
            let img: DockerImage = serde_json::from_str(line).map_err(|e| {
                Error::ContainerError(format!("Malformed docker image listing: {}", e))
            })?;
            Ok(ImageInfo {
                id: img.id,
                names: vec![format!("{}:{}", img.repository, img.tag)],
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_images() {
        let out = concat!(
            "{\"ID\":\"a1b2c3\",\"Repository\":\"ci-debian-12\",",
            "\"Tag\":\"latest\",\"Size\":\"1GB\"}\n",
            "\n",
            "{\"ID\":\"d4e5f6\",\"Repository\":\"alpine\"}\n",
        );
        let images = parse_images(out).unwrap();
        assert_eq!(images.len(), 2);
        assert!(images[0].matches("ci-debian-12", "latest"));
        assert_eq!(images[1].names, ["alpine:latest"]);

        assert!(parse_images("not json").is_err());
        assert!(parse_images("").unwrap().is_empty());
    }
}
