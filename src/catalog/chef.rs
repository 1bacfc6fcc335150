//! [`EnvironmentCatalog`] over `knife environment list`.

use std::fs;

use camino::Utf8PathBuf;

use super::{EnvironmentCatalog, failure_message};
use crate::error::KnifebootError;
use crate::executor::{CommandExecutor, CommandSpec};

/// How knife reaches the Chef server.
#[derive(Debug, Clone)]
pub struct ChefClientOptions {
    pub knife_command: String,
    pub config_file: Utf8PathBuf,
    pub node_name: String,
    pub client_key: Utf8PathBuf,
    pub server_url: String,
}

impl ChefClientOptions {
    fn list_args(&self) -> Vec<String> {
        vec![
            "environment".to_string(),
            "list".to_string(),
            "-F".to_string(),
            "json".to_string(),
            "--config".to_string(),
            self.config_file.to_string(),
            "--user".to_string(),
            self.node_name.clone(),
            "--key".to_string(),
            self.client_key.to_string(),
            "--server-url".to_string(),
            self.server_url.clone(),
        ]
    }
}

pub struct KnifeEnvironments<'a> {
    executor: &'a dyn CommandExecutor,
    options: ChefClientOptions,
}

impl<'a> KnifeEnvironments<'a> {
    /// Fails if the client key cannot be read, since every request is signed with it.
    pub fn new(
        executor: &'a dyn CommandExecutor,
        options: ChefClientOptions,
    ) -> Result<Self, KnifebootError> {
        fs::File::open(&options.client_key).map_err(|e| {
            KnifebootError::io(format!("failed to read Chef client key: {}", options.client_key), e)
        })?;
        Ok(Self { executor, options })
    }
}

impl EnvironmentCatalog for KnifeEnvironments<'_> {
    fn environments(&self) -> Result<Vec<String>, KnifebootError> {
        let spec = CommandSpec::new(&self.options.knife_command, self.options.list_args());
        let output = self
            .executor
            .capture(&spec)
            .map_err(|e| KnifebootError::listing("environments", format!("{:#}", e)))?;
        if !output.success {
            return Err(KnifebootError::listing(
                "environments",
                failure_message(&output.stderr, output.code),
            ));
        }
        let names: Vec<String> = serde_json::from_str(output.stdout.trim()).map_err(|e| {
            KnifebootError::listing("environments", format!("unexpected output: {}", e))
        })?;
        tracing::debug!("listed {} environments from {}", names.len(), self.options.server_url);
        Ok(names)
    }
}
