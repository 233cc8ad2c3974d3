// src/generation/metadata.rs
//! Metadata replication onto synthesized members
//!
//! Replication is best-effort: an entry whose construction arguments cannot
//! be rebuilt is dropped and reported to the hook. Only `Strict` policy or a
//! mandatory entry turns that into a synthesis failure.

use crate::generation::hook::GenerationHook;
use crate::generation::request::{GenerationOptions, MetadataPolicy};
use crate::model::MetadataEntry;
use crate::utils::errors::{ProxyError, Result};
use tracing::{trace, warn};

/// Rebuilds a metadata entry for a synthesized member
///
/// Runs under the generation cache's synthesis lock; must not generate proxies.
pub trait MetadataReplicator: Send + Sync {
    fn replicate(&self, entry: &MetadataEntry) -> std::result::Result<MetadataEntry, String>;

    /// Identity used in the cache key; `None` keys on the instance
    fn identity(&self) -> Option<String> {
        None
    }
}

/// Rebuilds entries from their recorded arguments
#[derive(Debug, Clone, Copy, Default)]
pub struct ArgumentReplicator;

impl MetadataReplicator for ArgumentReplicator {
    fn replicate(&self, entry: &MetadataEntry) -> std::result::Result<MetadataEntry, String> {
        match entry.irreproducible_arg() {
            Some(arg) => Err(format!("argument {} cannot be reconstructed", arg)),
            None => Ok(entry.clone()),
        }
    }

    fn identity(&self) -> Option<String> {
        Some("ArgumentReplicator".to_string())
    }
}

/// Replicate `source` metadata for `owner` under the configured policy
pub(crate) fn replicate_all(
    owner: &str,
    source: &[MetadataEntry],
    options: &GenerationOptions,
    hook: &dyn GenerationHook,
) -> Result<Vec<MetadataEntry>> {
    let mut replicated = Vec::with_capacity(source.len());

    for entry in source {
        if options.metadata_to_avoid.contains(&entry.name) {
            trace!("Not replicating {} on {}: on the avoid list", entry.name, owner);
            continue;
        }
        if options.metadata_policy == MetadataPolicy::Skip && !entry.mandatory {
            continue;
        }

        match options.replicator.replicate(entry) {
            Ok(copy) => replicated.push(copy),
            Err(reason) => {
                if entry.mandatory || options.metadata_policy == MetadataPolicy::Strict {
                    return Err(ProxyError::IrreplicableMetadata {
                        member: owner.to_string(),
                        metadata: entry.to_string(),
                        reason,
                    });
                }
                warn!("Dropping metadata {} from {}: {}", entry, owner, reason);
                hook.metadata_not_replicated(owner, entry, &reason);
            }
        }
    }

    Ok(replicated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::hook::AllMembersHook;
    use crate::model::MetadataArg;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingHook {
        dropped: Mutex<Vec<String>>,
    }

    impl GenerationHook for RecordingHook {
        fn metadata_not_replicated(&self, owner: &str, entry: &MetadataEntry, _reason: &str) {
            self.dropped.lock().push(format!("{}:{}", owner, entry.name));
        }
    }

    fn sample() -> Vec<MetadataEntry> {
        vec![
            MetadataEntry::new("Cached").arg(30i64),
            MetadataEntry::new("Seeded").arg(MetadataArg::Computed("now()".to_string())),
            MetadataEntry::new("Traced"),
        ]
    }

    #[test]
    fn test_best_effort_drops_and_reports() {
        let hook = RecordingHook::default();
        let options = GenerationOptions::default();

        let copied = replicate_all("IStore.Get", &sample(), &options, &hook).unwrap();
        let names: Vec<&str> = copied.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Cached", "Traced"]);
        assert_eq!(*hook.dropped.lock(), vec!["IStore.Get:Seeded".to_string()]);
    }

    #[test]
    fn test_strict_policy_fails() {
        let options = GenerationOptions::default().with_metadata_policy(MetadataPolicy::Strict);
        let result = replicate_all("IStore.Get", &sample(), &options, &AllMembersHook);
        assert!(matches!(result, Err(ProxyError::IrreplicableMetadata { .. })));
    }

    #[test]
    fn test_mandatory_entry_always_fails() {
        let entries = vec![MetadataEntry::new("Key")
            .arg(MetadataArg::Computed("guid()".to_string()))
            .mandatory()];
        let result = replicate_all("IStore.Get", &entries, &GenerationOptions::default(), &AllMembersHook);
        assert!(matches!(result, Err(ProxyError::IrreplicableMetadata { .. })));
    }

    #[test]
    fn test_skip_policy_and_avoid_list() {
        let mut entries = sample();
        entries.push(MetadataEntry::new("Required").mandatory());

        let options = GenerationOptions::default().with_metadata_policy(MetadataPolicy::Skip);
        let copied = replicate_all("M", &entries, &options, &AllMembersHook).unwrap();
        assert_eq!(copied.len(), 1);
        assert_eq!(copied[0].name, "Required");

        let options = GenerationOptions::default().avoid_metadata("Cached");
        let copied = replicate_all("M", &entries, &options, &AllMembersHook).unwrap();
        assert!(copied.iter().all(|e| e.name != "Cached"));
    }
}
