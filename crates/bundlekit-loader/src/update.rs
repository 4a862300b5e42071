//! Catalog update classification.
//!
//! The evaluator only classifies. Whether a classified update is committed
//! is decided by an injected [`UpdatePolicy`].

use bundlekit_core::Catalog;

/// How an incoming catalog relates to the active one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateCondition {
    /// Same version; nothing to do.
    AlreadyUpdated,
    /// Changed, but no changed package is resident.
    NoUsingAssetsChanged,
    /// At least one changed package is resident.
    UsingAssetsAreChanged,
}

/// Result of [`classify_update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateClassification {
    /// Identity of both catalogs.
    pub identity: String,
    /// Active version.
    pub current_version: String,
    /// Incoming version.
    pub incoming_version: String,
    /// Overall classification.
    pub condition: UpdateCondition,
    /// Packages in both catalogs whose checksum differs.
    pub changed: Vec<String>,
    /// The subset of `changed` that is resident.
    pub changed_in_use: Vec<String>,
}

/// Compare `incoming` against `current`.
///
/// Only packages present in both catalogs are inspected. Packages that are
/// new cannot be resident yet; packages that were removed are not flagged
/// even when resident.
pub fn classify_update(
    current: &Catalog,
    incoming: &Catalog,
    is_resident: impl Fn(&str) -> bool,
) -> UpdateClassification {
    let mut classification = UpdateClassification {
        identity: incoming.identity().to_string(),
        current_version: current.version().to_string(),
        incoming_version: incoming.version().to_string(),
        condition: UpdateCondition::AlreadyUpdated,
        changed: Vec::new(),
        changed_in_use: Vec::new(),
    };
    if current.version() == incoming.version() {
        return classification;
    }

    for entry in incoming.packages() {
        let Some(previous) = current.package(&entry.name) else {
            continue;
        };
        if previous.checksum == entry.checksum {
            continue;
        }
        classification.changed.push(entry.name.clone());
        if is_resident(&entry.name) {
            classification.changed_in_use.push(entry.name.clone());
        }
    }

    classification.condition = if classification.changed_in_use.is_empty() {
        UpdateCondition::NoUsingAssetsChanged
    } else {
        UpdateCondition::UsingAssetsAreChanged
    };
    classification
}

/// Decides whether a classified update replaces the active catalog.
pub trait UpdatePolicy: Send + Sync {
    /// `true` to commit.
    fn should_commit(&self, classification: &UpdateClassification) -> bool;
}

impl<F> UpdatePolicy for F
where
    F: Fn(&UpdateClassification) -> bool + Send + Sync,
{
    fn should_commit(&self, classification: &UpdateClassification) -> bool {
        self(classification)
    }
}

/// Commits every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommitAll;

impl UpdatePolicy for CommitAll {
    fn should_commit(&self, _classification: &UpdateClassification) -> bool {
        true
    }
}

/// Commits only updates that leave resident content untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommitUnlessInUse;

impl UpdatePolicy for CommitUnlessInUse {
    fn should_commit(&self, classification: &UpdateClassification) -> bool {
        classification.condition != UpdateCondition::UsingAssetsAreChanged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bundlekit_core::PackageEntry;

    fn catalog(version: &str, packages: &[(&str, &str)]) -> Catalog {
        Catalog::new(
            "main",
            version,
            packages
                .iter()
                .map(|(name, checksum)| PackageEntry::new(*name, *checksum))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_same_version_is_already_updated() {
        let c = catalog("1.0.0", &[("p", "c1")]);
        let result = classify_update(&c, &c, |_| true);
        assert_eq!(result.condition, UpdateCondition::AlreadyUpdated);
        assert!(result.changed.is_empty());
    }

    #[test]
    fn test_changed_but_not_resident() {
        let old = catalog("1.0.0", &[("p", "c1"), ("q", "d1")]);
        let new = catalog("1.0.1", &[("p", "c2"), ("q", "d1"), ("fresh", "e1")]);
        let result = classify_update(&old, &new, |_| false);
        assert_eq!(result.condition, UpdateCondition::NoUsingAssetsChanged);
        assert_eq!(result.changed, vec!["p"]);
    }

    #[test]
    fn test_changed_and_resident() {
        let old = catalog("1.0.0", &[("p", "c1"), ("q", "d1")]);
        let new = catalog("1.0.1", &[("p", "c2"), ("q", "d2")]);
        let result = classify_update(&old, &new, |name| name == "q");
        assert_eq!(result.condition, UpdateCondition::UsingAssetsAreChanged);
        assert_eq!(result.changed_in_use, vec!["q"]);
    }

    #[test]
    fn test_removed_resident_package_is_not_flagged() {
        let old = catalog("1.0.0", &[("p", "c1"), ("gone", "g1")]);
        let new = catalog("1.0.1", &[("p", "c1")]);
        let result = classify_update(&old, &new, |_| true);
        assert_eq!(result.condition, UpdateCondition::NoUsingAssetsChanged);
    }

    #[test]
    fn test_policies() {
        let old = catalog("1", &[("p", "a")]);
        let new = catalog("2", &[("p", "b")]);
        let in_use = classify_update(&old, &new, |_| true);

        assert!(CommitAll.should_commit(&in_use));
        assert!(!CommitUnlessInUse.should_commit(&in_use));
        let never = |_: &UpdateClassification| false;
        assert!(!never.should_commit(&in_use));
    }
}
