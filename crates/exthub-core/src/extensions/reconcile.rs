//! Catalog reconciliation
//!
//! Pure functions that turn the remote catalog, the installed map and the
//! debug packages into the views the service exposes.

use std::collections::HashSet;

use tracing::debug;

use super::types::{Author, ExtensionRecord, FeatureMap, InstalledMap};

/// Merge the three extension sources into one list keyed by name.
///
/// Order: remote-only entries, then installed entries, then debug entries.
/// Installed entries replace same-named remote ones (keeping the remote
/// `i18n`). A debug entry replaces a same-named remote or earlier debug
/// entry, but never an installed one.
pub fn merge_catalog(
    remote: Vec<ExtensionRecord>,
    installed: &[ExtensionRecord],
    debug: Vec<ExtensionRecord>,
) -> Vec<ExtensionRecord> {
    let installed_names: HashSet<&str> = installed.iter().map(|m| m.name.as_str()).collect();

    let mut seen = HashSet::new();
    let mut merged: Vec<ExtensionRecord> = Vec::with_capacity(remote.len() + installed.len());
    for entry in &remote {
        if installed_names.contains(entry.name.as_str()) || !seen.insert(entry.name.clone()) {
            continue;
        }
        merged.push(entry.clone());
    }

    for module in installed {
        let mut module = module.clone();
        if let Some(entry) = remote.iter().find(|it| it.name == module.name) {
            module.i18n = entry.i18n.clone();
        }
        module.installed = true;
        merged.push(module);
    }

    for entry in debug {
        if installed_names.contains(entry.name.as_str()) {
            debug!("merge_catalog: '{}' is installed, skipping debug copy", entry.name);
            continue;
        }
        merged.retain(|it| it.name != entry.name);
        merged.push(entry);
    }

    merged
}

/// Collapse a structured author to its name
pub fn normalize(mut record: ExtensionRecord) -> ExtensionRecord {
    let collapsed = match &record.author {
        Some(Author::Person { name, .. }) => Some(name.clone().unwrap_or_default()),
        _ => None,
    };
    if let Some(name) = collapsed {
        record.author = Some(Author::Name(name));
    }
    record
}

pub fn is_enabled(name: &str, disabled: &[String]) -> bool {
    !disabled.iter().any(|n| n == name)
}

/// Stamp `enable` on every installed record
pub fn derive_enabled(installed: &mut InstalledMap, disabled: &[String]) {
    for record in installed.values_mut() {
        record.enable = is_enabled(&record.name, disabled);
    }
}

/// Keys of the installed map that belong in the installed list
pub fn extension_ids(installed: &InstalledMap, ignore_list: &[String]) -> Vec<String> {
    installed
        .keys()
        .filter(|key| !key.is_empty())
        .filter(|key| !ignore_list.contains(key))
        .cloned()
        .collect()
}

pub fn compute_installed_list(
    installed: &InstalledMap,
    ignore_list: &[String],
) -> Vec<ExtensionRecord> {
    let ids = extension_ids(installed, ignore_list);
    installed
        .values()
        .filter(|record| ids.contains(&record.name))
        .cloned()
        .collect()
}

/// Group the `feature_key` payloads of `records` by extension name
pub fn features_from_records<'a>(
    feature_key: &str,
    records: impl IntoIterator<Item = &'a ExtensionRecord>,
) -> FeatureMap {
    records
        .into_iter()
        .filter_map(|record| {
            record
                .feature(feature_key)
                .map(|payload| (record.name.clone(), payload.clone()))
        })
        .collect()
}

/// Drop disabled extensions from a feature index
pub fn valid_by_feature(features: FeatureMap, disabled: &[String]) -> FeatureMap {
    features
        .into_iter()
        .filter(|(name, _)| is_enabled(name, disabled))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(name: &str) -> ExtensionRecord {
        ExtensionRecord::named(name)
    }

    fn names(records: &[ExtensionRecord]) -> Vec<&str> {
        records.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_merge_installed_after_remote() {
        let merged = merge_catalog(vec![record("a"), record("b")], &[record("a")], vec![]);
        assert_eq!(names(&merged), vec!["b", "a"]);
        assert!(!merged[0].installed);
        assert!(merged[1].installed);
    }

    #[test]
    fn test_merge_carries_remote_i18n() {
        let mut remote = record("a");
        remote.i18n = vec![crate::extensions::types::I18nPackage {
            locale: "zh-Hans".to_string(),
            package: [("title".to_string(), "导出".to_string())].into(),
        }];
        let mut local = record("a");
        local.version = "1.0.0".to_string();

        let merged = merge_catalog(vec![remote.clone()], &[local], vec![]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].version, "1.0.0");
        assert_eq!(merged[0].i18n, remote.i18n);
    }

    #[test]
    fn test_merge_never_duplicates_names() {
        let mut debug_b = record("b");
        debug_b.is_debug = true;
        let mut debug_c1 = record("c");
        debug_c1.version = "1".to_string();
        let mut debug_c2 = record("c");
        debug_c2.version = "2".to_string();

        let merged = merge_catalog(
            vec![record("a"), record("b"), record("a")],
            &[record("a")],
            vec![debug_b, record("a"), debug_c1, debug_c2],
        );

        assert_eq!(names(&merged), vec!["a", "b", "c"]);
        let unique: HashSet<&str> = merged.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(unique.len(), merged.len());
        // The installed copy of "a" wins over the debug one
        assert!(merged[0].installed);
        assert!(merged[1].is_debug);
        assert_eq!(merged[2].version, "2");
    }

    #[test]
    fn test_normalize_author() {
        let mut r = record("a");
        r.author = Some(Author::Person {
            name: None,
            email: Some("x@y.z".to_string()),
            url: None,
        });
        assert_eq!(normalize(r).author, Some(Author::Name(String::new())));

        let mut r = record("a");
        r.author = Some(Author::Name("kept".to_string()));
        assert_eq!(normalize(r).author, Some(Author::Name("kept".to_string())));

        assert_eq!(normalize(record("a")).author, None);
    }

    #[test]
    fn test_derive_enabled() {
        let mut map = InstalledMap::new();
        map.insert("a".to_string(), record("a"));
        map.insert("b".to_string(), record("b"));

        derive_enabled(&mut map, &["a".to_string()]);
        assert!(!map["a"].enable);
        assert!(map["b"].enable);
    }

    #[test]
    fn test_installed_list_skips_ignored_and_empty() {
        let mut map = InstalledMap::new();
        map.insert("default".to_string(), record("default"));
        map.insert(String::new(), record(""));
        map.insert("a".to_string(), record("a"));

        let list = compute_installed_list(&map, &["default".to_string()]);
        assert_eq!(names(&list), vec!["a"]);
    }

    #[test]
    fn test_valid_by_feature() {
        let mut a = record("a");
        a.features.insert("sidebarView".to_string(), json!({"title": "A"}));
        let mut b = record("b");
        b.features.insert("sidebarView".to_string(), json!({"title": "B"}));
        let c = record("c");

        let features = features_from_records("sidebarView", [&a, &b, &c]);
        assert_eq!(features.len(), 2);

        let valid = valid_by_feature(features, &["b".to_string()]);
        assert_eq!(valid.keys().collect::<Vec<_>>(), vec!["a"]);
    }
}
