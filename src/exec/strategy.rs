// ABOUTME: Host iteration strategy for per-host operations.
// ABOUTME: Sequential by default; bounded concurrency keeps result order.

use serde::Deserialize;
use std::num::NonZeroUsize;

/// How a per-host operation walks the configured servers.
///
/// Written in YAML as `sequential` or as a `concurrent: N` map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "IterationRepr")]
pub enum HostIteration {
    /// Declared order, one host finishing before the next starts.
    #[default]
    Sequential,
    /// Up to `n` hosts at once. Results are still reported in declared
    /// order and the first failure aborts the operation.
    Concurrent(NonZeroUsize),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IterationRepr {
    Name(String),
    Limit(ConcurrencyLimit),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ConcurrencyLimit {
    concurrent: NonZeroUsize,
}

impl TryFrom<IterationRepr> for HostIteration {
    type Error = String;

    fn try_from(repr: IterationRepr) -> Result<Self, Self::Error> {
        match repr {
            IterationRepr::Name(name) if name == "sequential" => Ok(HostIteration::Sequential),
            IterationRepr::Name(other) => Err(format!(
                "unknown host iteration '{other}', expected 'sequential' or 'concurrent: N'"
            )),
            IterationRepr::Limit(limit) => Ok(HostIteration::Concurrent(limit.concurrent)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_from_yaml() {
        let seq: HostIteration = serde_yaml::from_str("sequential").unwrap();
        assert_eq!(seq, HostIteration::Sequential);

        let conc: HostIteration = serde_yaml::from_str("concurrent: 4").unwrap();
        assert_eq!(conc, HostIteration::Concurrent(NonZeroUsize::new(4).unwrap()));

        let flow: HostIteration = serde_yaml::from_str("{ concurrent: 2 }").unwrap();
        assert_eq!(flow, HostIteration::Concurrent(NonZeroUsize::new(2).unwrap()));
    }

    #[test]
    fn rejects_zero_and_unknown_forms() {
        assert!(serde_yaml::from_str::<HostIteration>("concurrent: 0").is_err());
        assert!(serde_yaml::from_str::<HostIteration>("parallel").is_err());
        assert!(serde_yaml::from_str::<HostIteration>("concurrent: 2\nextra: 1").is_err());
    }
}
