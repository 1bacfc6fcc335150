//! Required environment variables.

use camino::Utf8PathBuf;

use crate::error::KnifebootError;

pub const KNIFE_PATH: &str = "KNIFE_PATH";
pub const SSH_KEY: &str = "SSH_KEY";
pub const SECRETS_PATH: &str = "SECRETS_PATH";

/// Locations the operator supplies through the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    /// `knife.rb` to read credentials from.
    pub knife_path: Utf8PathBuf,
    /// SSH private key handed to knife as `--identity-file`.
    pub ssh_key: Utf8PathBuf,
    /// Directory searched for `encrypted_data_bag_secret` files.
    pub secrets_path: Utf8PathBuf,
}

fn hint(name: &str) -> String {
    let example = match name {
        KNIFE_PATH => "$HOME/.chef/knife.rb",
        SSH_KEY => "$HOME/.ssh/id_rsa",
        _ => "$HOME/.chef/secrets/",
    };
    format!("export {}='{}'", name, example)
}

fn require<F>(lookup: &F, name: &'static str) -> Result<Utf8PathBuf, KnifebootError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) if !value.is_empty() => Ok(Utf8PathBuf::from(value)),
        _ => Err(KnifebootError::MissingEnvironment {
            name,
            hint: hint(name),
        }),
    }
}

impl Environment {
    /// Reads the variables from the process environment.
    pub fn from_process() -> Result<Self, KnifebootError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the variables through `lookup`, in `KNIFE_PATH`, `SSH_KEY`,
    /// `SECRETS_PATH` order. The first missing one is reported.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, KnifebootError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            knife_path: require(&lookup, KNIFE_PATH)?,
            ssh_key: require(&lookup, SSH_KEY)?,
            secrets_path: require(&lookup, SECRETS_PATH)?,
        })
    }
}
