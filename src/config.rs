//! Optional YAML settings file.
//!
//! Every field has a default, so running without a settings file behaves
//! exactly like an empty one:
//!
//! ```yaml
//! region: RegionOne
//! network_name: "{project}_network"
//! openstack_command: openstack
//! policy:
//!   bootstrap_version: 12.17.44-1
//!   run_list: role[common]
//!   ssh_user: ubuntu
//! ```

use std::fs::File;
use std::io::BufReader;

use camino::Utf8Path;
use serde::Deserialize;

use crate::error::KnifebootError;
use crate::provision::ProvisionPolicy;

/// Placeholder replaced by the OpenStack project name in `network_name`.
pub const PROJECT_PLACEHOLDER: &str = "{project}";

/// Settings file looked up in the working directory when `--config` is not given.
pub const DEFAULT_SETTINGS_FILE: &str = "knifeboot.yml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Region passed to the openstack client
    pub region: String,
    /// Template for the name of the project's network
    pub network_name: String,
    /// openstack client executable
    pub openstack_command: String,
    pub policy: ProvisionPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            region: "RegionOne".to_string(),
            network_name: format!("{}_network", PROJECT_PLACEHOLDER),
            openstack_command: "openstack".to_string(),
            policy: ProvisionPolicy::default(),
        }
    }
}

impl Settings {
    /// Network name for `project`, e.g. `acme_network`.
    pub fn network_name_for(&self, project: &str) -> String {
        self.network_name.replace(PROJECT_PLACEHOLDER, project)
    }

    pub fn validate(&self) -> Result<(), KnifebootError> {
        let required = [
            ("region", &self.region),
            ("network_name", &self.network_name),
            ("openstack_command", &self.openstack_command),
            ("policy.knife_command", &self.policy.knife_command),
            ("policy.bootstrap_version", &self.policy.bootstrap_version),
            ("policy.run_list", &self.policy.run_list),
            ("policy.ssh_user", &self.policy.ssh_user),
            ("policy.security_group", &self.policy.security_group),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(KnifebootError::Validation(format!("{} must not be empty", name)));
            }
        }
        if !self.network_name.contains(PROJECT_PLACEHOLDER) {
            return Err(KnifebootError::Validation(format!(
                "network_name '{}' must contain {}",
                self.network_name, PROJECT_PLACEHOLDER
            )));
        }
        Ok(())
    }
}

/// Loads settings from a YAML file.
pub fn load_settings(path: &Utf8Path) -> Result<Settings, KnifebootError> {
    let file = File::open(path)
        .map_err(|e| KnifebootError::io(format!("failed to load settings: {}", path), e))?;
    let reader = BufReader::new(file);
    serde_yaml::from_reader(reader)
        .map_err(|e| KnifebootError::Config(format!("failed to parse {}: {}", path, e)))
}

/// Loads `path` if given, else `knifeboot.yml` if it exists, else defaults.
pub fn resolve_settings(path: Option<&Utf8Path>) -> Result<Settings, KnifebootError> {
    let settings = match path {
        Some(path) => load_settings(path)?,
        None if Utf8Path::new(DEFAULT_SETTINGS_FILE).is_file() => {
            load_settings(Utf8Path::new(DEFAULT_SETTINGS_FILE))?
        }
        None => Settings::default(),
    };
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provision::BootstrapProtocol;

    #[test]
    fn test_default_network_name() {
        let settings = Settings::default();
        assert_eq!(settings.network_name_for("acme"), "acme_network");
        settings.validate().unwrap();
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let settings: Settings = serde_yaml::from_str(
            "network_name: \"net-{project}\"\npolicy:\n  ssh_user: centos\n  bootstrap_protocol: winrm\n",
        )
        .unwrap();
        assert_eq!(settings.network_name_for("acme"), "net-acme");
        assert_eq!(settings.policy.ssh_user, "centos");
        assert_eq!(settings.policy.bootstrap_protocol, BootstrapProtocol::Winrm);
        assert_eq!(settings.policy.run_list, "role[common]");
        assert_eq!(settings.region, "RegionOne");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<Settings, _> = serde_yaml::from_str("regoin: RegionTwo\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_template_without_placeholder_rejected() {
        let settings = Settings {
            network_name: "shared".to_string(),
            ..Default::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("must contain {project}"));
    }

    #[test]
    fn test_empty_policy_field_rejected() {
        let mut settings = Settings::default();
        settings.policy.ssh_user = " ".to_string();
        assert!(matches!(settings.validate(), Err(KnifebootError::Validation(_))));
    }
}
