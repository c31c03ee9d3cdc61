// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Handles server lists and the flat source/target image list.

use nonempty::NonEmpty;
use serde::Deserialize;

use super::HostHandle;
use crate::images::ImagePairing;
use crate::types::ImageTag;

pub fn deserialize_servers_option<'de, D>(
    deserializer: D,
) -> Result<Option<NonEmpty<HostHandle>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<Vec<ServerEntry>> = Option::deserialize(deserializer)?;
    let Some(values) = opt else {
        return Ok(None);
    };

    let servers = values
        .into_iter()
        .map(ServerEntry::into_host)
        .collect::<Result<Vec<_>, _>>()
        .map_err(serde::de::Error::custom)?;

    for (i, server) in servers.iter().enumerate() {
        if servers[..i].contains(server) {
            return Err(serde::de::Error::custom(format!(
                "duplicate server: {server}"
            )));
        }
    }

    NonEmpty::from_vec(servers)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom("at least one server is required"))
}

/// Images are configured as a flat list read two at a time:
/// `[source, target, source, target, ...]`.
pub fn deserialize_images_option<'de, D>(
    deserializer: D,
) -> Result<Option<Vec<ImagePairing>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<Vec<String>> = Option::deserialize(deserializer)?;
    let Some(flat) = opt else {
        return Ok(None);
    };

    if flat.len() % 2 != 0 {
        return Err(serde::de::Error::custom(format!(
            "images must list source/target pairs, got {} entries",
            flat.len()
        )));
    }

    flat.chunks_exact(2)
        .map(|pair| {
            let source = ImageTag::parse(&pair[0]).map_err(serde::de::Error::custom)?;
            let target = ImageTag::parse(&pair[1]).map_err(serde::de::Error::custom)?;
            Ok(ImagePairing::new(source, target))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ServerEntry {
    Simple(String),
    Detailed(HostHandle),
}

impl ServerEntry {
    fn into_host(self) -> Result<HostHandle, String> {
        match self {
            ServerEntry::Simple(s) => HostHandle::parse(&s),
            ServerEntry::Detailed(h) if h.host.trim().is_empty() => {
                Err("hostname cannot be empty".to_string())
            }
            ServerEntry::Detailed(h) => Ok(h),
        }
    }
}
