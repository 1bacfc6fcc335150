//! Extraction of credentials and server settings from a `knife.rb` file.
//!
//! `knife.rb` is Ruby, but the handful of settings knifeboot needs are always
//! written one per line in one of two shapes:
//!
//! ```ruby
//! node_name                "ops"
//! client_key               "#{current_dir}/ops.pem"
//! chef_server_url          "https://chef.example.com/organizations/acme"
//! knife[:openstack_auth_url] = "https://keystone.example.com:5000/v3/auth/tokens"
//! ```
//!
//! so a line-oriented scrape is enough. Lines that match no marker are
//! ignored, and malformed lines that do match a marker are skipped.

use std::collections::HashMap;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use url::Url;

use crate::error::KnifebootError;

/// Keys that must be present (and non-empty) for a bootstrap run.
pub const REQUIRED_KEYS: &[&str] = &[
    "openstackauthurl",
    "openstackusername",
    "openstackpassword",
    "openstackdomainname",
    "openstackprojectname",
    "nodename",
    "clientkey",
    "chefserverurl",
];

/// Keys whose values are never logged.
const SECRET_KEYS: &[&str] = &["openstackpassword"];

const OPENSTACK_MARKER: &str = "openstack";
const NODE_NAME_MARKER: &str = "node_name";
const CLIENT_KEY_MARKER: &str = "client_key";
const CHEF_SERVER_URL_MARKER: &str = "chef_server_url";

/// Ruby expression knife.rb uses for its own directory.
const CURRENT_DIR: &str = "#{current_dir}";

/// Flat mapping of normalized setting names to values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialSet {
    settings: HashMap<String, String>,
    /// Set when `client_key` was written as `#{current_dir}/...`.
    client_key_in_config_dir: bool,
}

impl CredentialSet {
    /// Returns the value for `key`, if it was present in the file.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str)
    }

    /// Returns the value for `key`, or an empty string when absent.
    ///
    /// Only meaningful after [`validate`](Self::validate) has succeeded.
    pub fn value(&self, key: &str) -> &str {
        self.get(key).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    /// Inserts a setting, replacing any earlier value for the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.settings.insert(key.into(), value.into());
    }

    /// Records `client_key`, remembering whether it was relative to `#{current_dir}`.
    fn insert_client_key(&mut self, raw: String) {
        let value = match raw.strip_prefix(CURRENT_DIR) {
            Some(rest) => {
                self.client_key_in_config_dir = true;
                rest.to_string()
            }
            None => {
                self.client_key_in_config_dir = false;
                raw
            }
        };
        self.insert("clientkey", value);
    }

    /// Checks that every required key is present and that the URLs parse.
    ///
    /// Missing keys are reported together, sorted by name.
    pub fn validate(&self) -> Result<(), KnifebootError> {
        let mut missing: Vec<String> = REQUIRED_KEYS
            .iter()
            .filter(|key| self.get(key).is_none_or(str::is_empty))
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            missing.sort();
            return Err(KnifebootError::MissingSettings(missing));
        }

        for key in ["openstackauthurl", "chefserverurl"] {
            Url::parse(self.value(key)).map_err(|e| {
                KnifebootError::Validation(format!(
                    "{} is not a valid URL ({:?}): {}",
                    key,
                    self.value(key),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Keystone endpoint with the `auth/tokens` suffix removed.
    ///
    /// knife-openstack wants the full token URL while the openstack client
    /// wants the identity base URL.
    pub fn identity_endpoint(&self) -> String {
        self.value("openstackauthurl").replacen("auth/tokens", "", 1)
    }

    /// Path to the Chef client key.
    ///
    /// `#{current_dir}/name.pem` and relative values resolve against
    /// `config_dir`, the directory holding `knife.rb`. Absolute values are
    /// returned unchanged.
    pub fn client_key_path(&self, config_dir: &Utf8Path) -> Utf8PathBuf {
        let value = self.value("clientkey");
        if self.client_key_in_config_dir {
            config_dir.join(value.trim_start_matches('/'))
        } else {
            config_dir.join(value)
        }
    }

    /// Sorted `(key, value)` pairs with secret values masked, for logging.
    pub fn redacted(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .settings
            .iter()
            .map(|(k, v)| {
                let shown = if SECRET_KEYS.contains(&k.as_str()) {
                    "********".to_string()
                } else {
                    v.clone()
                };
                (k.clone(), shown)
            })
            .collect();
        pairs.sort();
        pairs
    }
}

/// Removes one pair of matching outer quotes, keeping everything inside.
fn unquote(value: &str) -> &str {
    let value = value.trim();
    ['"', '\'']
        .into_iter()
        .find_map(|quote| value.strip_prefix(quote)?.strip_suffix(quote))
        .unwrap_or(value)
}

fn strip_all(text: &str, patterns: &[&str]) -> String {
    patterns
        .iter()
        .fold(text.to_string(), |acc, pattern| acc.replace(pattern, ""))
}

/// `knife[:openstack_username] = "alice"` → `("openstackusername", "alice")`
fn parse_openstack_line(line: &str) -> Option<(String, String)> {
    let (raw_key, raw_value) = line.split_once('=')?;
    let key = strip_all(raw_key, &["]", "knife[:", "_", "=", "\"", "'"])
        .trim()
        .to_string();
    let value = unquote(raw_value).to_string();
    Some((key, value))
}

/// `node_name "ops"` → `("nodename", "ops")`
///
/// Underscores are only stripped from the key so that URLs and file names
/// keep theirs.
fn parse_word_line(line: &str) -> Option<(String, String)> {
    let mut words = line.split_whitespace();
    let key = strip_all(words.next()?, &["\"", "'", "_"]).trim().to_string();
    let value = unquote(words.next()?).to_string();
    Some((key, value))
}

fn parse_line(line: &str) -> Option<(String, String)> {
    if line.trim_start().starts_with('#') {
        return None;
    }
    if line.contains(OPENSTACK_MARKER) {
        parse_openstack_line(line)
    } else if line.contains(NODE_NAME_MARKER)
        || line.contains(CHEF_SERVER_URL_MARKER)
        || line.contains(CLIENT_KEY_MARKER)
    {
        parse_word_line(line)
    } else {
        None
    }
}

/// Extracts settings from the text of a `knife.rb` file.
///
/// Later occurrences of a key overwrite earlier ones.
pub fn parse_str(text: &str) -> CredentialSet {
    let mut credentials = CredentialSet::default();
    for (number, line) in text.lines().enumerate() {
        match parse_line(line) {
            Some((key, value)) if !key.is_empty() => {
                tracing::trace!(line = number + 1, "found setting: {}", key);
                if key == "clientkey" {
                    credentials.insert_client_key(value);
                } else {
                    credentials.insert(key, value);
                }
            }
            Some(_) => {
                tracing::debug!(line = number + 1, "skipping setting line with empty key");
            }
            None => {}
        }
    }
    credentials
}

/// Reads and parses a `knife.rb` file.
pub fn parse_file(path: &Utf8Path) -> Result<CredentialSet, KnifebootError> {
    let text = fs::read_to_string(path).map_err(|source| KnifebootError::ConfigNotFound {
        path: path.to_string(),
        source,
    })?;
    let credentials = parse_str(&text);
    tracing::debug!("parsed {} setting(s) from {}", credentials.len(), path);
    Ok(credentials)
}
