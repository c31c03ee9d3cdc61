// ABOUTME: Container CLI selection and command construction.
// ABOUTME: Builds the docker/podman invocations used by image sync.

use serde::Deserialize;
use std::fmt;

use crate::exec::quote;
use crate::types::ImageTag;

/// The container CLI used for image work, locally and on the servers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeType {
    #[default]
    Docker,
    Podman,
}

impl fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary())
    }
}

impl RuntimeType {
    pub fn binary(&self) -> &'static str {
        match self {
            RuntimeType::Docker => "docker",
            RuntimeType::Podman => "podman",
        }
    }

    pub fn pull(&self, image: &ImageTag) -> String {
        format!("{} pull {}", self.binary(), quote(image.as_str()))
    }

    pub fn tag(&self, source: &ImageTag, target: &ImageTag) -> String {
        format!(
            "{} tag {} {}",
            self.binary(),
            quote(source.as_str()),
            quote(target.as_str())
        )
    }

    pub fn save(&self, image: &ImageTag, archive: &str) -> String {
        format!(
            "{} save -o {} {}",
            self.binary(),
            quote(archive),
            quote(image.as_str())
        )
    }

    pub fn remove(&self, image: &ImageTag) -> String {
        format!("{} rmi {}", self.binary(), quote(image.as_str()))
    }

    pub fn load(&self, archive: &str) -> String {
        format!("{} load -i {}", self.binary(), quote(archive))
    }

    /// Prints the image id, or nothing when the image is absent. Under
    /// docker's containerd store the id is the manifest index digest.
    /// Never exits non-zero.
    pub fn inspect_id(&self, image: &ImageTag) -> String {
        format!(
            "{} image inspect --format {} {} 2>/dev/null || true",
            self.binary(),
            quote("{{.Id}}"),
            quote(image.as_str())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(s: &str) -> ImageTag {
        ImageTag::parse(s).unwrap()
    }

    #[test]
    fn docker_commands() {
        let rt = RuntimeType::Docker;
        assert_eq!(rt.pull(&tag("nginx:1.25")), "docker pull nginx:1.25");
        assert_eq!(
            rt.tag(&tag("nginx:1.25"), &tag("app/nginx:prod")),
            "docker tag nginx:1.25 app/nginx:prod"
        );
        assert_eq!(
            rt.save(&tag("app/nginx:prod"), "/tmp/x/image-0.tar"),
            "docker save -o /tmp/x/image-0.tar app/nginx:prod"
        );
        assert_eq!(rt.load("/srv/tmp/image-0.tar"), "docker load -i /srv/tmp/image-0.tar");
        assert!(rt.inspect_id(&tag("app:1")).ends_with("app:1 2>/dev/null || true"));
    }

    #[test]
    fn podman_uses_its_binary() {
        assert_eq!(RuntimeType::Podman.remove(&tag("app:1")), "podman rmi app:1");
        assert_eq!(RuntimeType::Podman.to_string(), "podman");
    }
}
