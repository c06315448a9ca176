use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

pub fn now_utc_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn utc_compact_string(ts: DateTime<Utc>) -> String {
    ts.format("%Y%m%dT%H%M%SZ").to_string()
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))
}

pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .with_context(|| format!("failed to open file for hashing: {}", path.display()))?;

    let mut hasher = Sha256::new();
    let mut buf = [0_u8; 8192];

    loop {
        let count = file
            .read(&mut buf)
            .with_context(|| format!("failed to read file for hashing: {}", path.display()))?;
        if count == 0 {
            break;
        }
        hasher.update(&buf[..count]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

pub fn json_pretty_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut data = serde_json::to_vec_pretty(value).context("failed to serialize json")?;
    data.push(b'\n');
    Ok(data)
}

pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let data = json_pretty_bytes(value)
        .with_context(|| format!("failed to serialize json: {}", path.display()))?;
    write_bytes(path, &data)
}

/// Writes `value` only when its serialized form differs from what is on
/// disk. Returns whether the file was (re)written.
pub fn write_json_if_changed<T: Serialize>(path: &Path, value: &T) -> Result<bool> {
    let data = json_pretty_bytes(value)
        .with_context(|| format!("failed to serialize json: {}", path.display()))?;
    write_bytes_if_changed(path, &data)
}

pub fn write_bytes_if_changed(path: &Path, data: &[u8]) -> Result<bool> {
    if path.exists() {
        let existing =
            fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        if existing == data {
            return Ok(false);
        }
    }

    write_bytes(path, data)?;
    Ok(true)
}

fn write_bytes(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    let mut file =
        File::create(path).with_context(|| format!("failed to create file: {}", path.display()))?;
    file.write_all(data)
        .with_context(|| format!("failed to write file: {}", path.display()))?;

    Ok(())
}

pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<&str>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_json_if_changed_skips_identical_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("doc.json");
        let value = serde_json::json!({ "act_id": "X", "sections": [] });

        assert!(write_json_if_changed(&path, &value).unwrap());
        let first = fs::read(&path).unwrap();
        assert!(!write_json_if_changed(&path, &value).unwrap());
        assert_eq!(fs::read(&path).unwrap(), first);
        assert!(first.ends_with(b"\n"));

        let changed = serde_json::json!({ "act_id": "Y", "sections": [] });
        assert!(write_json_if_changed(&path, &changed).unwrap());
    }

    #[test]
    fn collapse_whitespace_joins_runs() {
        assert_eq!(collapse_whitespace("  a \n\t b  c "), "a b c");
    }
}
