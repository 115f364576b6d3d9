//! Terminal output

use anyhow::Result;
use serde::Serialize;

use exthub_core::extensions::ExtensionRecord;

pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn status(record: &ExtensionRecord) -> &'static str {
    match (record.installed, record.enable, record.is_debug) {
        (_, _, true) => "debug",
        (true, true, _) => "enabled",
        (true, false, _) => "disabled",
        (false, _, _) => "-",
    }
}

fn table(records: &[ExtensionRecord]) -> String {
    let name_width = records
        .iter()
        .map(|r| r.name.len())
        .max()
        .unwrap_or(0)
        .max("NAME".len());
    let version_width = records
        .iter()
        .map(|r| r.version.len())
        .max()
        .unwrap_or(0)
        .max("VERSION".len());

    let mut out = format!(
        "{:<name_width$}  {:<version_width$}  {:<8}  TITLE\n",
        "NAME", "VERSION", "STATUS"
    );
    for record in records {
        out.push_str(&format!(
            "{:<name_width$}  {:<version_width$}  {:<8}  {}\n",
            record.name,
            record.version,
            status(record),
            record.title.as_deref().unwrap_or("")
        ));
    }
    out
}

pub fn records(records: &[ExtensionRecord], as_json: bool) -> Result<()> {
    if as_json {
        return json(records);
    }
    if records.is_empty() {
        println!("No extensions.");
        return Ok(());
    }
    print!("{}", table(records));
    Ok(())
}
