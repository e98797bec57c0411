use std::collections::BTreeMap;

use tracing::warn;

/// Key/value tags. Ordered so that serialized metadata is stable.
pub type Tags = BTreeMap<String, String>;

/// Parses `key1=value1,key2=value2`. Values may contain `=`; entries without
/// a key are skipped.
pub fn parse_tags(raw: &str) -> Tags {
    let mut tags = Tags::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        match entry.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                tags.insert(key.trim().to_string(), value.trim().to_string());
            }
            _ => warn!("Ignoring malformed tag entry: {entry:?}"),
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags() {
        let tags = parse_tags("task=tags, team = cats,empty=");
        assert_eq!(tags.len(), 3);
        assert_eq!(tags["task"], "tags");
        assert_eq!(tags["team"], "cats");
        assert_eq!(tags["empty"], "");
    }

    #[test]
    fn test_value_may_contain_separator() {
        let tags = parse_tags("query=a=b");
        assert_eq!(tags["query"], "a=b");
    }

    #[test]
    fn test_malformed_entries_skipped() {
        let tags = parse_tags("novalue,=orphan,,ok=1");
        assert_eq!(tags.len(), 1);
        assert_eq!(tags["ok"], "1");
    }
}
