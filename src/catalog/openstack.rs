//! [`ComputeCatalog`] over the `openstack` command-line client.
//!
//! Credentials are passed through the standard `OS_*` environment variables
//! and every listing is requested with `-f json`.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::{ComputeCatalog, Flavor, FloatingIp, Image, KeyPair, failure_message};
use crate::error::KnifebootError;
use crate::executor::{CommandExecutor, CommandSpec};
use crate::knife_config::CredentialSet;

/// Keystone v3 credentials for the `openstack` client.
#[derive(Debug, Clone)]
pub struct AuthOptions {
    pub identity_endpoint: String,
    pub username: String,
    pub password: String,
    pub domain_name: String,
    pub project_name: String,
    pub region: String,
}

impl AuthOptions {
    /// Builds options from a validated credential set.
    pub fn from_credentials(credentials: &CredentialSet, region: impl Into<String>) -> Self {
        Self {
            identity_endpoint: credentials.identity_endpoint(),
            username: credentials.value("openstackusername").to_string(),
            password: credentials.value("openstackpassword").to_string(),
            domain_name: credentials.value("openstackdomainname").to_string(),
            project_name: credentials.value("openstackprojectname").to_string(),
            region: region.into(),
        }
    }

    fn env(&self) -> Vec<(&'static str, String)> {
        vec![
            ("OS_AUTH_URL", self.identity_endpoint.clone()),
            ("OS_IDENTITY_API_VERSION", "3".to_string()),
            ("OS_USERNAME", self.username.clone()),
            ("OS_PASSWORD", self.password.clone()),
            ("OS_USER_DOMAIN_NAME", self.domain_name.clone()),
            ("OS_PROJECT_DOMAIN_NAME", self.domain_name.clone()),
            ("OS_PROJECT_NAME", self.project_name.clone()),
            ("OS_REGION_NAME", self.region.clone()),
        ]
    }
}

#[derive(Debug, Deserialize)]
struct ImageRow {
    #[serde(rename = "Name")]
    name: String,
}

#[derive(Debug, Deserialize)]
struct FlavorRow {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "VCPUs")]
    vcpus: u32,
    #[serde(rename = "Disk")]
    disk: u64,
    #[serde(rename = "RAM")]
    ram: u64,
}

#[derive(Debug, Deserialize)]
struct FloatingIpRow {
    #[serde(rename = "Floating IP Address")]
    floating_ip_address: String,
    #[serde(rename = "Fixed IP Address", default)]
    fixed_ip_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KeyPairRow {
    #[serde(rename = "Name")]
    name: String,
}

#[derive(Debug, Deserialize)]
struct NetworkRow {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Name")]
    name: String,
}

/// Parses `-f json` output, treating blank output as an empty list.
fn parse_rows<T: DeserializeOwned>(resource: &str, stdout: &str) -> Result<Vec<T>, KnifebootError> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(stdout)
        .map_err(|e| KnifebootError::listing(resource, format!("unexpected output: {}", e)))
}

/// An authenticated `openstack` client.
pub struct OpenstackCli<'a> {
    executor: &'a dyn CommandExecutor,
    command: String,
    auth: AuthOptions,
}

impl<'a> OpenstackCli<'a> {
    /// Verifies the credentials by issuing a token.
    ///
    /// Fails with `AuthenticationError` if Keystone rejects them, or
    /// `CommandNotFound` if the client is not installed.
    pub fn authenticate(
        executor: &'a dyn CommandExecutor,
        command: impl Into<String>,
        auth: AuthOptions,
    ) -> Result<Self, KnifebootError> {
        let client = Self {
            executor,
            command: command.into(),
            auth,
        };

        let spec = client.spec(&["token", "issue", "-f", "json"]);
        let output = executor.capture(&spec).map_err(|e| match e.downcast::<KnifebootError>() {
            Ok(typed) => typed,
            Err(other) => KnifebootError::AuthenticationError(format!("{:#}", other)),
        })?;
        if !output.success {
            return Err(KnifebootError::AuthenticationError(failure_message(
                &output.stderr,
                output.code,
            )));
        }

        tracing::info!(
            "authenticated to {} as {} (project {})",
            client.auth.identity_endpoint,
            client.auth.username,
            client.auth.project_name
        );
        Ok(client)
    }

    fn spec(&self, args: &[&str]) -> CommandSpec {
        CommandSpec::new(&self.command, args.iter().map(|a| a.to_string()).collect())
            .with_envs(self.auth.env())
    }

    fn list<T: DeserializeOwned>(&self, resource: &str, args: &[&str]) -> Result<Vec<T>, KnifebootError> {
        let spec = self.spec(args);
        let output = self
            .executor
            .capture(&spec)
            .map_err(|e| KnifebootError::listing(resource, format!("{:#}", e)))?;
        if !output.success {
            return Err(KnifebootError::listing(
                resource,
                failure_message(&output.stderr, output.code),
            ));
        }
        let rows = parse_rows(resource, &output.stdout)?;
        tracing::debug!("listed {} {}", rows.len(), resource);
        Ok(rows)
    }
}

impl ComputeCatalog for OpenstackCli<'_> {
    fn images(&self) -> Result<Vec<Image>, KnifebootError> {
        let rows: Vec<ImageRow> = self.list("images", &["image", "list", "-f", "json"])?;
        Ok(rows
            .into_iter()
            .map(|r| Image { name: r.name })
            .collect())
    }

    fn flavors(&self) -> Result<Vec<Flavor>, KnifebootError> {
        let rows: Vec<FlavorRow> = self.list("flavors", &["flavor", "list", "-f", "json"])?;
        Ok(rows
            .into_iter()
            .map(|r| Flavor {
                name: r.name,
                vcpus: r.vcpus,
                disk: r.disk,
                ram: r.ram,
            })
            .collect())
    }

    fn floating_ips(&self) -> Result<Vec<FloatingIp>, KnifebootError> {
        let rows: Vec<FloatingIpRow> =
            self.list("floating IPs", &["floating", "ip", "list", "-f", "json"])?;
        Ok(rows
            .into_iter()
            .map(|r| FloatingIp {
                ip: r.floating_ip_address,
                fixed_ip: r.fixed_ip_address,
            })
            .collect())
    }

    fn key_pairs(&self) -> Result<Vec<KeyPair>, KnifebootError> {
        let rows: Vec<KeyPairRow> = self.list("key pairs", &["keypair", "list", "-f", "json"])?;
        Ok(rows
            .into_iter()
            .map(|r| KeyPair { name: r.name })
            .collect())
    }

    fn network_id(&self, name: &str) -> Result<String, KnifebootError> {
        let rows: Vec<NetworkRow> =
            self.list("networks", &["network", "list", "--name", name, "-f", "json"])?;
        let mut matching: Vec<NetworkRow> = rows.into_iter().filter(|r| r.name == name).collect();
        match matching.len() {
            1 => Ok(matching.remove(0).id),
            0 => Err(KnifebootError::listing(
                "networks",
                format!("no network named {}", name),
            )),
            n => Err(KnifebootError::listing(
                "networks",
                format!("{} networks are named {}", n, name),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_floating_ip_rows() {
        let json = r#"[
            {"ID": "a1", "Floating IP Address": "203.0.113.10", "Fixed IP Address": null, "Port": null},
            {"ID": "b2", "Floating IP Address": "203.0.113.11", "Fixed IP Address": "10.0.0.5", "Port": "p"}
        ]"#;
        let rows: Vec<FloatingIpRow> = parse_rows("floating IPs", json).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].fixed_ip_address, None);
        assert_eq!(rows[1].fixed_ip_address.as_deref(), Some("10.0.0.5"));
    }

    #[test]
    fn test_parse_flavor_rows() {
        let json = r#"[{"ID": "1", "Name": "m1.tiny", "RAM": 512, "Disk": 1, "Ephemeral": 0, "VCPUs": 1, "Is Public": true}]"#;
        let rows: Vec<FlavorRow> = parse_rows("flavors", json).unwrap();
        assert_eq!(rows[0].name, "m1.tiny");
        assert_eq!(rows[0].ram, 512);
    }

    #[test]
    fn test_parse_rows_blank_output() {
        let rows: Vec<ImageRow> = parse_rows("images", "  \n").unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_parse_rows_garbage_is_listing_error() {
        let err = parse_rows::<ImageRow>("images", "not json").unwrap_err();
        assert!(matches!(err, KnifebootError::ResourceListError { ref resource, .. } if resource == "images"));
    }
}
