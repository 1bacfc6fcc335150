//! Assembly of the `knife openstack server create` command.

use std::fmt;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::executor::{CommandSpec, format_command_line};

/// Builder for assembling command arguments.
#[derive(Debug, Default)]
pub struct CommandArgsBuilder {
    args: Vec<String>,
}

impl CommandArgsBuilder {
    pub fn new() -> Self {
        Self { args: Vec::new() }
    }

    /// Append raw arguments.
    pub fn push_args<I, S>(&mut self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
    }

    /// Append a flag with no value.
    pub fn push_flag(&mut self, flag: &str) {
        self.args.push(flag.to_string());
    }

    /// Append a flag and its value as two arguments. Empty values are kept.
    pub fn push_flag_value(&mut self, flag: &str, value: impl fmt::Display) {
        self.args.push(flag.to_string());
        self.args.push(value.to_string());
    }

    pub fn into_args(self) -> Vec<String> {
        self.args
    }
}

/// Protocol knife uses to reach the new server for bootstrapping.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BootstrapProtocol {
    #[default]
    Ssh,
    Winrm,
}

/// Fixed settings applied to every server this tool creates.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProvisionPolicy {
    /// knife executable
    pub knife_command: String,
    pub bootstrap_protocol: BootstrapProtocol,
    /// chef-client version installed on the node
    pub bootstrap_version: String,
    pub run_list: String,
    /// Login user on the image
    pub ssh_user: String,
    pub sudo: bool,
    pub security_group: String,
}

impl Default for ProvisionPolicy {
    fn default() -> Self {
        Self {
            knife_command: "knife".to_string(),
            bootstrap_protocol: BootstrapProtocol::Ssh,
            bootstrap_version: "12.17.44-1".to_string(),
            run_list: "role[common]".to_string(),
            ssh_user: "ubuntu".to_string(),
            sudo: true,
            security_group: "default".to_string(),
        }
    }
}

/// Everything chosen during one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionRequest {
    pub project: String,
    pub flavor: String,
    pub hostname: String,
    /// SSH private key knife logs in with
    pub ssh_key: Utf8PathBuf,
    pub network_id: String,
    pub environment: String,
    pub key_pair: String,
    pub image: String,
    pub floating_ip: String,
    pub secrets_file: Utf8PathBuf,
}

impl ProvisionRequest {
    /// Arguments for `knife`, starting at the `openstack` subcommand.
    #[tracing::instrument(skip_all)]
    pub fn build_args(&self, policy: &ProvisionPolicy) -> Vec<String> {
        let mut builder = CommandArgsBuilder::new();
        builder.push_args(["openstack", "server", "create"]);
        builder.push_flag_value("-T", &self.project);
        builder.push_flag_value("--identity-file", &self.ssh_key);
        builder.push_flag_value("-E", &self.environment);
        builder.push_flag_value("--network-ids", &self.network_id);
        builder.push_flag_value("--openstack-ssh-key-id", &self.key_pair);
        builder.push_flag_value("-f", &self.flavor);
        builder.push_flag_value("-N", &self.hostname);
        builder.push_flag_value("--bootstrap-protocol", policy.bootstrap_protocol);
        builder.push_flag_value("--bootstrap-version", &policy.bootstrap_version);
        builder.push_flag_value("--secret-file", &self.secrets_file);
        builder.push_flag_value("-I", &self.image);
        builder.push_flag_value("-r", &policy.run_list);
        builder.push_flag_value("--ssh-user", &policy.ssh_user);
        if policy.sudo {
            builder.push_flag("--sudo");
        }
        builder.push_flag_value("-G", &policy.security_group);
        builder.push_flag_value("-a", &self.floating_ip);
        builder.push_flag("-y");

        let args = builder.into_args();
        tracing::debug!("knife args: {:?}", args);
        args
    }

    pub fn command_spec(&self, policy: &ProvisionPolicy) -> CommandSpec {
        CommandSpec::new(&policy.knife_command, self.build_args(policy))
    }

    /// The full command as one shell-quoted line.
    pub fn command_line(&self, policy: &ProvisionPolicy) -> String {
        format_command_line(&policy.knife_command, &self.build_args(policy))
    }
}
