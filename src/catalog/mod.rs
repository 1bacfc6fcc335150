//! Resource catalogs and the adapters that turn their listings into choices.
//!
//! This module provides:
//! - [`ComputeCatalog`]: the cloud-side listings (images, flavors, floating
//!   IPs, key pairs, networks)
//! - [`EnvironmentCatalog`]: the Chef server's environments
//! - one `choose_*` adapter per resource kind, which shapes a listing into
//!   [`Candidate`]s and hands them to a [`ChoiceResolver`]
//!
//! Implementations over the `openstack` and `knife` command-line tools live
//! in [`openstack`] and [`chef`].

pub mod chef;
pub mod openstack;

use std::fs;
use std::io::{BufRead, Write};

use camino::Utf8Path;
use strum::{Display, EnumIter};

use crate::choice::{Candidate, ChoiceResolver};
use crate::error::KnifebootError;

/// Substring that marks an encrypted data bag secret file.
pub const SECRET_FILE_MARKER: &str = "encrypted_data_bag_secret";

/// The kinds of resource the operator chooses from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum ResourceKind {
    #[strum(serialize = "environments")]
    Environment,
    #[strum(serialize = "images")]
    Image,
    #[strum(serialize = "floating IPs")]
    FloatingIp,
    #[strum(serialize = "flavors")]
    Flavor,
    #[strum(serialize = "key pairs")]
    KeyPair,
    #[strum(serialize = "secrets files")]
    SecretsFile,
}

impl ResourceKind {
    /// Prompt shown after the table.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Environment => "Environment",
            Self::Image => "Image",
            Self::FloatingIp => "IP address",
            Self::Flavor => "Flavor",
            Self::KeyPair => "Key Pair",
            Self::SecretsFile => "SECRETS_FILE",
        }
    }

    /// Column headers, excluding the index column.
    pub fn headers(&self) -> &'static [&'static str] {
        match self {
            Self::Environment => &["environment"],
            Self::Image => &["Image"],
            Self::FloatingIp => &["IP"],
            Self::Flavor => &["Name", "Cores", "Disk", "RAM"],
            Self::KeyPair => &["Key Name"],
            Self::SecretsFile => &["SECRETS FILE"],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flavor {
    pub name: String,
    pub vcpus: u32,
    /// Root disk size in GB.
    pub disk: u64,
    /// Memory in MB.
    pub ram: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloatingIp {
    pub ip: String,
    /// Address of the port this IP is associated with, if any.
    pub fixed_ip: Option<String>,
}

impl FloatingIp {
    /// True when the IP is not associated with any port.
    pub fn is_available(&self) -> bool {
        self.fixed_ip.as_deref().is_none_or(|ip| ip.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub name: String,
}

/// Cloud-side listings, in the order the cloud returns them.
pub trait ComputeCatalog {
    fn images(&self) -> Result<Vec<Image>, KnifebootError>;

    fn flavors(&self) -> Result<Vec<Flavor>, KnifebootError>;

    fn floating_ips(&self) -> Result<Vec<FloatingIp>, KnifebootError>;

    fn key_pairs(&self) -> Result<Vec<KeyPair>, KnifebootError>;

    /// Looks up the ID of the network called exactly `name`.
    ///
    /// Fails with `ResourceListError` if there is no such network or the
    /// name is ambiguous.
    fn network_id(&self, name: &str) -> Result<String, KnifebootError>;
}

/// Chef server environments.
pub trait EnvironmentCatalog {
    fn environments(&self) -> Result<Vec<String>, KnifebootError>;
}

pub fn image_candidates(images: Vec<Image>) -> Vec<Candidate<String>> {
    images
        .into_iter()
        .map(|image| Candidate::named(image.name))
        .collect()
}

pub fn flavor_candidates(flavors: Vec<Flavor>) -> Vec<Candidate<String>> {
    flavors
        .into_iter()
        .map(|f| {
            Candidate::new(
                vec![f.name.clone(), f.vcpus.to_string(), f.disk.to_string(), f.ram.to_string()],
                f.name,
            )
        })
        .collect()
}

/// Only floating IPs that are not yet associated are offered.
pub fn floating_ip_candidates(ips: Vec<FloatingIp>) -> Vec<Candidate<String>> {
    ips.into_iter()
        .filter(FloatingIp::is_available)
        .map(|ip| Candidate::named(ip.ip))
        .collect()
}

pub fn key_pair_candidates(keys: Vec<KeyPair>) -> Vec<Candidate<String>> {
    keys.into_iter()
        .map(|key| Candidate::named(key.name))
        .collect()
}

/// Environments are the one listing that is sorted before numbering.
pub fn environment_candidates(mut names: Vec<String>) -> Vec<Candidate<String>> {
    names.sort();
    names.into_iter().map(Candidate::named).collect()
}

/// Keeps entries whose name contains [`SECRET_FILE_MARKER`], in listing order.
pub fn secret_file_candidates(names: Vec<String>) -> Vec<Candidate<String>> {
    names
        .into_iter()
        .filter(|name| name.contains(SECRET_FILE_MARKER))
        .map(Candidate::named)
        .collect()
}

/// Error text for a failed listing command: its stderr, else its exit status.
pub(crate) fn failure_message(stderr: &str, code: Option<i32>) -> String {
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_string();
    }
    match code {
        Some(code) => format!("exited with status {}", code),
        None => "terminated by signal".to_string(),
    }
}

/// Lists the file names in `dir`, sorted by name.
pub fn list_directory(dir: &Utf8Path) -> Result<Vec<String>, KnifebootError> {
    let entries = fs::read_dir(dir)
        .map_err(|e| KnifebootError::io(format!("failed to read secrets directory: {}", dir), e))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry
            .map_err(|e| KnifebootError::io(format!("failed to read secrets directory: {}", dir), e))?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

fn choose<R, W>(
    resolver: &mut ChoiceResolver<R, W>,
    kind: ResourceKind,
    candidates: Vec<Candidate<String>>,
) -> Result<String, KnifebootError>
where
    R: BufRead,
    W: Write,
{
    tracing::debug!("offering {} {}", candidates.len(), kind);
    resolver.resolve(kind, candidates)
}

pub fn choose_environment<R: BufRead, W: Write>(
    catalog: &dyn EnvironmentCatalog,
    resolver: &mut ChoiceResolver<R, W>,
) -> Result<String, KnifebootError> {
    let candidates = environment_candidates(catalog.environments()?);
    choose(resolver, ResourceKind::Environment, candidates)
}

pub fn choose_image<R: BufRead, W: Write>(
    catalog: &dyn ComputeCatalog,
    resolver: &mut ChoiceResolver<R, W>,
) -> Result<String, KnifebootError> {
    let candidates = image_candidates(catalog.images()?);
    choose(resolver, ResourceKind::Image, candidates)
}

pub fn choose_floating_ip<R: BufRead, W: Write>(
    catalog: &dyn ComputeCatalog,
    resolver: &mut ChoiceResolver<R, W>,
) -> Result<String, KnifebootError> {
    let candidates = floating_ip_candidates(catalog.floating_ips()?);
    choose(resolver, ResourceKind::FloatingIp, candidates)
}

pub fn choose_flavor<R: BufRead, W: Write>(
    catalog: &dyn ComputeCatalog,
    resolver: &mut ChoiceResolver<R, W>,
) -> Result<String, KnifebootError> {
    let candidates = flavor_candidates(catalog.flavors()?);
    choose(resolver, ResourceKind::Flavor, candidates)
}

pub fn choose_key_pair<R: BufRead, W: Write>(
    catalog: &dyn ComputeCatalog,
    resolver: &mut ChoiceResolver<R, W>,
) -> Result<String, KnifebootError> {
    let candidates = key_pair_candidates(catalog.key_pairs()?);
    choose(resolver, ResourceKind::KeyPair, candidates)
}

/// Returns the chosen secrets file name (not the full path).
pub fn choose_secrets_file<R: BufRead, W: Write>(
    secrets_dir: &Utf8Path,
    resolver: &mut ChoiceResolver<R, W>,
) -> Result<String, KnifebootError> {
    let candidates = secret_file_candidates(list_directory(secrets_dir)?);
    choose(resolver, ResourceKind::SecretsFile, candidates)
}

/// Resolves the project's network without prompting.
pub fn resolve_network_id(
    catalog: &dyn ComputeCatalog,
    network_name: &str,
) -> Result<String, KnifebootError> {
    let id = catalog.network_id(network_name)?;
    tracing::debug!("network {} has id {}", network_name, id);
    Ok(id)
}
