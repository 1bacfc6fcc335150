pub mod catalog;
pub mod choice;
pub mod cli;
pub mod config;
pub mod environment;
pub mod error;
pub mod executor;
pub mod knife_config;
pub mod provision;
pub mod table;

pub use error::KnifebootError;

use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use camino::Utf8Path;
use tracing::info;
use tracing_subscriber::{FmtSubscriber, filter::LevelFilter};

use crate::catalog::chef::{ChefClientOptions, KnifeEnvironments};
use crate::catalog::openstack::{AuthOptions, OpenstackCli};
use crate::catalog::{ComputeCatalog, EnvironmentCatalog};
use crate::choice::ChoiceResolver;
use crate::config::Settings;
use crate::environment::Environment;
use crate::executor::CommandExecutor;
use crate::knife_config::CredentialSet;
use crate::provision::ProvisionRequest;

pub fn init_logging(log_level: cli::LogLevel) -> Result<()> {
    let filter = match log_level {
        cli::LogLevel::Trace => LevelFilter::TRACE,
        cli::LogLevel::Debug => LevelFilter::DEBUG,
        cli::LogLevel::Info => LevelFilter::INFO,
        cli::LogLevel::Warn => LevelFilter::WARN,
        cli::LogLevel::Error => LevelFilter::ERROR,
    };

    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_max_level(filter)
            .with_writer(std::io::stderr)
            .finish(),
    )
    .context("failed to set global default tracing subscriber")
}

/// Parses the knife config and checks that every required setting is present.
fn load_credentials(knife_path: &Utf8Path) -> Result<CredentialSet> {
    let credentials = knife_config::parse_file(knife_path)?;
    credentials
        .validate()
        .with_context(|| format!("invalid knife config: {}", knife_path))?;
    Ok(credentials)
}

/// Asks the operator for every value of a [`ProvisionRequest`].
///
/// Prompts come in a fixed order: environment, image, floating IP, flavor,
/// key pair, secrets file, hostname. The network is derived from the project
/// name without asking.
pub fn collect_request<R: BufRead, W: Write>(
    env: &Environment,
    project: &str,
    settings: &Settings,
    compute: &dyn ComputeCatalog,
    environments: &dyn EnvironmentCatalog,
    resolver: &mut ChoiceResolver<R, W>,
) -> Result<ProvisionRequest> {
    let environment = catalog::choose_environment(environments, resolver)?;
    let image = catalog::choose_image(compute, resolver)?;
    let floating_ip = catalog::choose_floating_ip(compute, resolver)?;
    let flavor = catalog::choose_flavor(compute, resolver)?;
    let key_pair = catalog::choose_key_pair(compute, resolver)?;
    let network_id =
        catalog::resolve_network_id(compute, &settings.network_name_for(project))?;
    let secrets_file = catalog::choose_secrets_file(&env.secrets_path, resolver)?;
    let hostname = resolver.prompt_text("hostname")?;

    Ok(ProvisionRequest {
        project: project.to_string(),
        flavor,
        hostname,
        ssh_key: env.ssh_key.clone(),
        network_id,
        environment,
        key_pair,
        image,
        floating_ip,
        secrets_file: env.secrets_path.join(secrets_file),
    })
}

/// Prints the knife command to `out`, then runs it through `executor`.
pub fn provision<W: Write>(
    request: &ProvisionRequest,
    settings: &Settings,
    executor: &dyn CommandExecutor,
    out: &mut W,
) -> Result<()> {
    writeln!(out, "{}", request.command_line(&settings.policy))
        .context("failed to print knife command")?;

    let spec = request.command_spec(&settings.policy);
    let result = executor
        .execute(&spec)
        .with_context(|| format!("failed to execute {}", spec.command))?;

    if !result.success() {
        return Err(KnifebootError::Execution {
            command: spec.command.clone(),
            status: result
                .code()
                .map_or_else(|| "terminated by signal".to_string(), |c| format!("exit status: {}", c)),
        }
        .into());
    }
    Ok(())
}

/// Runs the whole bootstrap workflow against the given streams.
pub fn apply<R: BufRead, W: Write>(
    opts: &cli::ApplyArgs,
    env: &Environment,
    executor: &dyn CommandExecutor,
    mut resolver: ChoiceResolver<R, W>,
) -> Result<ProvisionRequest> {
    let settings = config::resolve_settings(opts.common.config.as_deref())
        .context("failed to load settings")?;
    let credentials = load_credentials(&env.knife_path)?;
    let project = credentials.value("openstackprojectname");

    let compute = OpenstackCli::authenticate(
        executor,
        &settings.openstack_command,
        AuthOptions::from_credentials(&credentials, &settings.region),
    )?;

    let config_dir = env.knife_path.parent().unwrap_or(Utf8Path::new("."));
    let environments = KnifeEnvironments::new(
        executor,
        ChefClientOptions {
            knife_command: settings.policy.knife_command.clone(),
            config_file: env.knife_path.clone(),
            node_name: credentials.value("nodename").to_string(),
            client_key: credentials.client_key_path(config_dir),
            server_url: credentials.value("chefserverurl").to_string(),
        },
    )?;

    let request = collect_request(env, project, &settings, &compute, &environments, &mut resolver)?;
    info!("creating {} in project {}", request.hostname, request.project);

    provision(&request, &settings, executor, resolver.output_mut())?;
    Ok(request)
}

pub fn run_apply(opts: &cli::ApplyArgs, executor: Arc<dyn CommandExecutor>) -> Result<()> {
    let env = Environment::from_process()?;
    let resolver = ChoiceResolver::stdio().with_attempts(usize::from(opts.attempts));
    apply(opts, &env, executor.as_ref(), resolver)?;
    Ok(())
}

/// Checks everything that can be checked without contacting a server.
pub fn validate(opts: &cli::ValidateArgs, env: &Environment) -> Result<()> {
    let settings = config::resolve_settings(opts.common.config.as_deref())
        .context("failed to load settings")?;
    let credentials = load_credentials(&env.knife_path)?;

    if !env.ssh_key.is_file() {
        return Err(KnifebootError::Validation(format!(
            "SSH_KEY does not point to a file: {}",
            env.ssh_key
        ))
        .into());
    }
    let secrets = catalog::secret_file_candidates(catalog::list_directory(&env.secrets_path)?);
    if secrets.is_empty() {
        return Err(KnifebootError::NoCandidates(catalog::ResourceKind::SecretsFile).into());
    }

    for (key, value) in credentials.redacted() {
        info!("{} = {}", key, value);
    }
    info!(
        "validation successful: network {}, {} secrets file(s)",
        settings.network_name_for(credentials.value("openstackprojectname")),
        secrets.len()
    );
    Ok(())
}

pub fn run_validate(opts: &cli::ValidateArgs) -> Result<()> {
    let env = Environment::from_process()?;
    validate(opts, &env)
}
