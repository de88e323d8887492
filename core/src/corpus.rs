use crate::CorpusEntry;
use anyhow::{anyhow, bail, Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Default knowledge base served when no corpus file is configured.
pub fn builtin_corpus() -> Vec<CorpusEntry> {
    vec![
        CorpusEntry::new("wheat", "Wheat needs cool weather and well-drained soil. Irrigation should be minimal after flowering."),
        CorpusEntry::new("rice", "Rice requires standing water in fields. It grows best in clay soil with high moisture."),
        CorpusEntry::new("sugarcane", "Sugarcane requires a tropical climate with high rainfall. Needs fertile soil and periodic irrigation."),
        CorpusEntry::new("tomato", "Tomatoes grow best in well-drained loamy soil with good sunlight. Avoid waterlogging."),
        CorpusEntry::new("fertilizer", "Use NPK fertilizers based on soil test. Avoid overuse to prevent soil damage."),
    ]
}

/// Whether `path` has an extension [`load_corpus`] understands.
pub fn is_corpus_file(path: &Path) -> bool {
    matches!(path.extension().and_then(|s| s.to_str()), Some("csv" | "json" | "jsonl"))
}

/// Load corpus entries from a `.csv`, `.json` or `.jsonl` file, in file order.
pub fn load_corpus(path: &Path) -> Result<Vec<CorpusEntry>> {
    let entries = match path.extension().and_then(|s| s.to_str()) {
        Some("csv") => load_csv(path),
        Some("json") => load_json(path),
        Some("jsonl") => load_jsonl(path),
        _ => Err(anyhow!("unsupported corpus format")),
    }
    .with_context(|| format!("loading corpus {}", path.display()))?;
    tracing::debug!(path = %path.display(), entries = entries.len(), "loaded corpus file");
    Ok(entries)
}

fn load_csv(path: &Path) -> Result<Vec<CorpusEntry>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?;
    let has = |names: &[&str]| headers.iter().any(|h| names.contains(&h.trim()));
    if !has(&["key", "topic"]) || !has(&["text", "content"]) {
        bail!("CSV header needs a key (or topic) and a text (or content) column");
    }
    let mut entries = Vec::new();
    for (i, record) in reader.deserialize::<CorpusEntry>().enumerate() {
        // header is line 1
        let line = i + 2;
        let entry = record.with_context(|| format!("line {line}"))?;
        check(&entry, line)?;
        entries.push(entry);
    }
    Ok(entries)
}

fn load_json(path: &Path) -> Result<Vec<CorpusEntry>> {
    let reader = BufReader::new(File::open(path)?);
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    match json {
        serde_json::Value::Array(arr) => {
            let mut entries = Vec::with_capacity(arr.len());
            for (i, v) in arr.into_iter().enumerate() {
                let entry: CorpusEntry = serde_json::from_value(v).with_context(|| format!("item {i}"))?;
                check(&entry, i)?;
                entries.push(entry);
            }
            Ok(entries)
        }
        serde_json::Value::Object(map) if is_single_entry(&map) => {
            let entry: CorpusEntry = serde_json::from_value(serde_json::Value::Object(map))?;
            check(&entry, 0)?;
            Ok(vec![entry])
        }
        serde_json::Value::Object(map) => {
            // topic -> answer table
            let mut entries = Vec::with_capacity(map.len());
            for (key, value) in map {
                let text = value
                    .as_str()
                    .ok_or_else(|| anyhow!("value for {key:?} is not a string"))?
                    .to_string();
                let entry = CorpusEntry { key, text };
                check(&entry, entries.len())?;
                entries.push(entry);
            }
            Ok(entries)
        }
        _ => bail!("expected a JSON array or object"),
    }
}

fn load_jsonl(path: &Path) -> Result<Vec<CorpusEntry>> {
    let reader = BufReader::new(File::open(path)?);
    let mut entries = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let entry: CorpusEntry = serde_json::from_str(&line).with_context(|| format!("line {}", i + 1))?;
        check(&entry, i + 1)?;
        entries.push(entry);
    }
    Ok(entries)
}

fn is_single_entry(map: &serde_json::Map<String, serde_json::Value>) -> bool {
    let has = |a: &str, b: &str| map.get(a).or_else(|| map.get(b)).map_or(false, |v| v.is_string());
    has("key", "topic") && has("text", "content")
}

fn check(entry: &CorpusEntry, at: usize) -> Result<()> {
    if entry.key.trim().is_empty() {
        bail!("entry {at}: empty key");
    }
    if entry.text.trim().is_empty() {
        bail!("entry {at}: empty text for key {:?}", entry.key);
    }
    Ok(())
}
