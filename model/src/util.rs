use crate::error::{self, Result};
use rand::Rng;
use serde_json::{Map, Value};
use snafu::OptionExt;

const RANDOM_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// A random string of 8 lowercase letters and digits, usable in object and file names.
pub fn random_string() -> String {
    let mut rng = rand::thread_rng();
    (0..8)
        .map(|_| RANDOM_CHARS[rng.gen_range(0..RANDOM_CHARS.len())] as char)
        .collect()
}

/// Convert a list of maps printed by `oc get -o=jsonpath`, e.g.
/// `[map[effect:NoSchedule key:node-role.kubernetes.io/master operator:Exists]]`, into a JSON
/// array of objects with string values.
pub fn jsonpath_maps_to_json(content: &str) -> String {
    let content = content.trim();
    let content = content.strip_prefix('[').unwrap_or(content);
    let content = content.strip_suffix(']').unwrap_or(content);
    let items: Vec<Value> = content
        .split("map")
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            let item = item.strip_prefix('[').unwrap_or(item);
            let item = item.strip_suffix(']').unwrap_or(item);
            let object: Map<String, Value> = item
                .split_whitespace()
                .filter_map(|pair| pair.split_once(':'))
                .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
                .collect();
            Value::Object(object)
        })
        .collect();
    Value::Array(items).to_string()
}

/// The next minor version after `version`, with the patch level reset: `1.18.3` becomes `1.19.0`.
pub fn bump_minor_version(version: &str) -> Result<String> {
    let mut parts = version.trim_start_matches('v').split('.');
    let (major, minor) = parts
        .next()
        .zip(parts.next())
        .context(error::InvalidVersionSnafu { version })?;
    let minor: u64 = minor
        .parse()
        .ok()
        .context(error::InvalidVersionSnafu { version })?;
    Ok(format!("{}.{}.0", major, minor + 1))
}
