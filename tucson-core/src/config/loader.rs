use std::path::Path;

use serde_yaml::{Mapping, Value};

use super::ConfigError;

/// Prefix shared by every environment override.
pub const ENV_PREFIX: &str = "TUCSON_";

#[derive(Clone, Copy)]
enum Kind {
    Text,
    Flag,
}

/// Scalar keys that can be overridden from the environment.
const ENV_KEYS: &[(&str, Kind)] = &[
    ("listen", Kind::Text),
    ("default-origin", Kind::Text),
    ("signing-key", Kind::Text),
    ("oidc.issuer", Kind::Text),
    ("oidc.client-id", Kind::Text),
    ("oidc.client-secret", Kind::Text),
    ("oidc.redirect-url", Kind::Text),
    ("logging.debug", Kind::Flag),
    ("logging.pretty", Kind::Flag),
];

/// Environment variable name for a dotted config key.
///
/// `oidc.client-id` <-> `TUCSON_OIDC_CLIENT_ID`
pub fn env_key(key: &str) -> String {
    let mut name = String::with_capacity(ENV_PREFIX.len() + key.len());
    name.push_str(ENV_PREFIX);
    for c in key.chars() {
        match c {
            '.' | '-' => name.push('_'),
            c => name.push(c.to_ascii_uppercase()),
        }
    }
    name
}

pub(crate) fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))
}

/// Parse a YAML document. An empty document is an empty mapping.
pub(crate) fn parse_yaml(content: &str) -> Result<Value, ConfigError> {
    let value: Value =
        serde_yaml::from_str(content).map_err(|e| ConfigError::Load(e.to_string()))?;
    match value {
        Value::Null => Ok(Value::Mapping(Mapping::new())),
        Value::Mapping(_) => Ok(value),
        _ => Err(ConfigError::Load(
            "top-level config must be a mapping".to_string(),
        )),
    }
}

/// Overlay known `TUCSON_*` variables onto the YAML tree.
pub(crate) fn apply_env<I>(tree: &mut Value, env: I) -> Result<(), ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let vars: Vec<(String, String)> = env
        .into_iter()
        .filter(|(name, _)| name.starts_with(ENV_PREFIX))
        .collect();
    if vars.is_empty() {
        return Ok(());
    }

    for (key, kind) in ENV_KEYS {
        let name = env_key(key);
        let Some((_, raw)) = vars.iter().find(|(n, _)| *n == name) else {
            continue;
        };
        let value = match kind {
            Kind::Text => Value::String(raw.clone()),
            Kind::Flag => Value::Bool(parse_flag(key, raw)?),
        };
        set_path(tree, key, value);
    }
    Ok(())
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            key,
            reason: format!("expected a boolean, got '{other}'"),
        }),
    }
}

fn set_path(tree: &mut Value, dotted: &str, value: Value) {
    let mut node = tree;
    let mut parts = dotted.split('.').peekable();
    while let Some(part) = parts.next() {
        if !node.is_mapping() {
            *node = Value::Mapping(Mapping::new());
        }
        let Value::Mapping(map) = node else {
            return;
        };
        let key = Value::String(part.to_string());
        if parts.peek().is_none() {
            map.insert(key, value);
            return;
        }
        node = map.entry(key).or_insert(Value::Null);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn env_key_replaces_separators() {
        assert_eq!(env_key("listen"), "TUCSON_LISTEN");
        assert_eq!(env_key("default-origin"), "TUCSON_DEFAULT_ORIGIN");
        assert_eq!(env_key("oidc.client-secret"), "TUCSON_OIDC_CLIENT_SECRET");
    }

    #[test]
    fn empty_document_is_empty_mapping() {
        let tree = parse_yaml("").unwrap();
        assert!(tree.as_mapping().unwrap().is_empty());
    }

    #[test]
    fn scalar_document_is_rejected() {
        assert!(matches!(parse_yaml("42"), Err(ConfigError::Load(_))));
    }

    #[test]
    fn env_creates_nested_sections() {
        let mut tree = parse_yaml("oidc:\n").unwrap();
        apply_env(
            &mut tree,
            vars(&[
                ("TUCSON_OIDC_ISSUER", "https://idp.example"),
                ("TUCSON_LOGGING_DEBUG", "true"),
            ]),
        )
        .unwrap();

        assert_eq!(tree["oidc"]["issuer"].as_str(), Some("https://idp.example"));
        assert_eq!(tree["logging"]["debug"].as_bool(), Some(true));
    }

    #[test]
    fn numeric_looking_values_stay_strings() {
        let mut tree = parse_yaml("").unwrap();
        apply_env(&mut tree, vars(&[("TUCSON_SIGNING_KEY", "12345")])).unwrap();
        assert_eq!(tree["signing-key"].as_str(), Some("12345"));
    }

    #[test]
    fn unrelated_variables_are_ignored() {
        let mut tree = parse_yaml("listen: 127.0.0.1:1\n").unwrap();
        apply_env(&mut tree, vars(&[("HOME", "/root"), ("TUCSON_UNKNOWN", "x")])).unwrap();
        assert_eq!(tree["listen"].as_str(), Some("127.0.0.1:1"));
        assert!(tree.get("unknown").is_none());
    }

    #[test]
    fn bad_flag_is_an_error() {
        let mut tree = parse_yaml("").unwrap();
        let err = apply_env(&mut tree, vars(&[("TUCSON_LOGGING_PRETTY", "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "logging.pretty", .. }));
    }
}
