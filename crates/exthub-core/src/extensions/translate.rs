//! Record translation
//!
//! Packages ship `%key%` placeholders in their title, description and
//! feature payloads, plus an `i18n` table per locale.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::BTreeMap;

use super::types::ExtensionRecord;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%([A-Za-z0-9_.\-]+)%").expect("valid placeholder regex"));

/// Strings for `locale`, falling back to its language subtag (`zh` for `zh-Hans`)
fn strings_for<'a>(record: &'a ExtensionRecord, locale: &str) -> Option<&'a BTreeMap<String, String>> {
    let exact = record
        .i18n
        .iter()
        .find(|pkg| pkg.locale.eq_ignore_ascii_case(locale));
    if let Some(pkg) = exact {
        return Some(&pkg.package);
    }

    let language = locale.split(['-', '_']).next().unwrap_or(locale);
    record
        .i18n
        .iter()
        .find(|pkg| {
            pkg.locale
                .split(['-', '_'])
                .next()
                .is_some_and(|l| l.eq_ignore_ascii_case(language))
        })
        .map(|pkg| &pkg.package)
}

fn substitute(text: &str, strings: &BTreeMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(text, |caps: &Captures| match strings.get(&caps[1]) {
            Some(translated) => translated.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

fn translate_value(value: &mut Value, strings: &BTreeMap<String, String>) {
    match value {
        Value::String(s) => {
            if s.contains('%') {
                *s = substitute(s, strings);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(|v| translate_value(v, strings)),
        Value::Object(map) => map.values_mut().for_each(|v| translate_value(v, strings)),
        _ => {}
    }
}

/// Replace placeholders using the record's own `i18n` table.
/// Records without strings for `locale` come back unchanged.
pub fn translate_module(mut record: ExtensionRecord, locale: &str) -> ExtensionRecord {
    let Some(strings) = strings_for(&record, locale).cloned() else {
        return record;
    };

    if let Some(title) = record.title.as_mut() {
        *title = substitute(title, &strings);
    }
    if let Some(description) = record.description.as_mut() {
        *description = substitute(description, &strings);
    }
    for payload in record.features.values_mut() {
        translate_value(payload, &strings);
    }
    record
}
