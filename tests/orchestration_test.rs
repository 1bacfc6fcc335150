mod helpers;

use std::fs;

use anyhow::Result;
use knifeboot::KnifebootError;
use knifeboot::cli::{ApplyArgs, CommonArgs, LogLevel, ValidateArgs};
use knifeboot::config::Settings;
use knifeboot::{apply, collect_request, provision, validate};

fn apply_args(config: Option<camino::Utf8PathBuf>) -> ApplyArgs {
    ApplyArgs {
        common: CommonArgs {
            config,
            log_level: LogLevel::Error,
        },
        dry_run: true,
        attempts: 1,
    }
}

#[test]
fn collect_request_with_single_choices() -> Result<()> {
    let (_dir, root) = helpers::utf8_tempdir();
    let env = helpers::chef_dir(&root, helpers::KNIFE_RB, &["encrypted_data_bag_secret"]);
    let cloud = helpers::FakeCloud::single();
    let chef = helpers::FakeChef(vec!["prod".into()]);
    let mut resolver = helpers::resolver("1\n1\n1\n1\n1\n1\nweb01\n");

    let request =
        collect_request(&env, "acme", &Settings::default(), &cloud, &chef, &mut resolver)?;

    assert_eq!(request.hostname, "web01");
    assert_eq!(request.environment, "prod");
    assert_eq!(request.image, "ubuntu-16.04");
    assert_eq!(request.floating_ip, "203.0.113.10");
    assert_eq!(request.flavor, "m1.small");
    assert_eq!(request.key_pair, "ops");
    assert_eq!(request.network_id, "net-123");
    assert_eq!(request.secrets_file, env.secrets_path.join("encrypted_data_bag_secret"));
    assert_eq!(request.ssh_key, env.ssh_key);

    let out = String::from_utf8(resolver.into_output())?;
    let prompts: Vec<&str> = ["Environment: ", "Image: ", "IP address: ", "Flavor: ", "Key Pair: ", "SECRETS_FILE: ", "hostname: "]
        .into_iter()
        .collect();
    let mut last = 0;
    for prompt in prompts {
        let pos = out[last..]
            .find(prompt)
            .unwrap_or_else(|| panic!("prompt {:?} missing or out of order", prompt));
        last += pos + prompt.len();
    }
    Ok(())
}

#[test]
fn built_command_contains_every_resolved_value() -> Result<()> {
    let (_dir, root) = helpers::utf8_tempdir();
    let env = helpers::chef_dir(&root, helpers::KNIFE_RB, &["encrypted_data_bag_secret"]);
    let settings = Settings::default();
    let mut resolver = helpers::resolver("1\n1\n1\n1\n1\n1\nweb01\n");
    let request = collect_request(
        &env,
        "acme",
        &settings,
        &helpers::FakeCloud::single(),
        &helpers::FakeChef(vec!["prod".into()]),
        &mut resolver,
    )?;

    let args = request.build_args(&settings.policy);
    for value in ["web01", "prod", "ubuntu-16.04", "203.0.113.10", "m1.small", "ops", "net-123", "acme"] {
        assert!(args.iter().any(|a| a == value), "{} missing from {:?}", value, args);
    }

    let executor = helpers::ScriptedExecutor::default();
    let mut out = Vec::new();
    provision(&request, &settings, &executor, &mut out)?;
    let printed = String::from_utf8(out)?;
    assert!(printed.starts_with("knife openstack server create -T acme "));
    let executed = executor.executed.lock().unwrap();
    assert_eq!(executed.len(), 1);
    assert_eq!(executed[0].command, "knife");
    assert_eq!(executed[0].args, args);
    Ok(())
}

#[test]
fn custom_network_template_is_used() -> Result<()> {
    let (_dir, root) = helpers::utf8_tempdir();
    let env = helpers::chef_dir(&root, helpers::KNIFE_RB, &["encrypted_data_bag_secret"]);
    let mut cloud = helpers::FakeCloud::single();
    cloud.networks.insert("net-acme".into(), "net-999".into());
    let settings = Settings {
        network_name: "net-{project}".into(),
        ..Default::default()
    };
    let mut resolver = helpers::resolver("1\n1\n1\n1\n1\n1\nweb01\n");
    let request = collect_request(
        &env,
        "acme",
        &settings,
        &cloud,
        &helpers::FakeChef(vec!["prod".into()]),
        &mut resolver,
    )?;
    assert_eq!(request.network_id, "net-999");
    Ok(())
}

#[test]
fn apply_end_to_end_with_scripted_tools() -> Result<()> {
    let (_dir, root) = helpers::utf8_tempdir();
    let env = helpers::chef_dir(&root, helpers::KNIFE_RB, &["foo.txt", "encrypted_data_bag_secret"]);
    let executor = helpers::ScriptedExecutor::single();
    // environments sort to [_default, dev, prod]; pick prod
    let resolver = helpers::resolver("3\n1\n1\n1\n1\n1\nweb01\n");

    let request = apply(&apply_args(None), &env, &executor, resolver)?;

    assert_eq!(request.environment, "prod");
    assert_eq!(request.floating_ip, "203.0.113.10");
    assert_eq!(request.hostname, "web01");
    assert_eq!(request.project, "acme");

    assert_eq!(
        executor.captured_keys(),
        vec![
            "token issue",
            "environment list",
            "image list",
            "floating ip",
            "flavor list",
            "keypair list",
            "network list",
        ]
    );
    let captured = executor.captured.lock().unwrap();
    let token = &captured[0];
    assert!(token.env.contains(&(
        "OS_AUTH_URL".to_string(),
        "https://keystone.example.com:5000/v3/".to_string()
    )));
    let knife = &captured[1];
    assert_eq!(knife.command, "knife");
    assert!(knife.args.contains(&root.join(".chef/ops.pem").to_string()));

    assert_eq!(executor.executed.lock().unwrap().len(), 1);
    Ok(())
}

#[test]
fn apply_stops_on_rejected_credentials() {
    let (_dir, root) = helpers::utf8_tempdir();
    let env = helpers::chef_dir(&root, helpers::KNIFE_RB, &["encrypted_data_bag_secret"]);
    let executor = helpers::ScriptedExecutor::single().fail("token issue", "HTTP 401");
    let resolver = helpers::resolver("1\n1\n1\n1\n1\n1\nweb01\n");

    let err = apply(&apply_args(None), &env, &executor, resolver).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<KnifebootError>(),
        Some(KnifebootError::AuthenticationError(_))
    ));
    assert_eq!(executor.captured_keys(), vec!["token issue"]);
    assert!(executor.executed.lock().unwrap().is_empty());
}

#[test]
fn apply_rejects_incomplete_knife_config() {
    let (_dir, root) = helpers::utf8_tempdir();
    let env = helpers::chef_dir(&root, "node_name \"ops\"\n", &["encrypted_data_bag_secret"]);
    let executor = helpers::ScriptedExecutor::single();
    let resolver = helpers::resolver("");

    let err = apply(&apply_args(None), &env, &executor, resolver).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<KnifebootError>(),
        Some(KnifebootError::MissingSettings(keys)) if keys.len() == 7
    ));
    assert!(executor.captured_keys().is_empty());
}

#[test]
fn apply_aborts_on_invalid_selection() {
    let (_dir, root) = helpers::utf8_tempdir();
    let env = helpers::chef_dir(&root, helpers::KNIFE_RB, &["encrypted_data_bag_secret"]);
    let executor = helpers::ScriptedExecutor::single();
    let resolver = helpers::resolver("1\n5\n");

    let err = apply(&apply_args(None), &env, &executor, resolver).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<KnifebootError>(),
        Some(KnifebootError::InvalidSelection { .. })
    ));
    assert!(executor.executed.lock().unwrap().is_empty());
}

#[test]
fn apply_honors_settings_file() -> Result<()> {
    let (_dir, root) = helpers::utf8_tempdir();
    let env = helpers::chef_dir(&root, helpers::KNIFE_RB, &["encrypted_data_bag_secret"]);
    let settings_path = root.join("knifeboot.yml");
    fs::write(&settings_path, "policy:\n  ssh_user: centos\n  sudo: false\n")?;
    let executor = helpers::ScriptedExecutor::single();
    let resolver = helpers::resolver("1\n1\n1\n1\n1\n1\nweb01\n");

    apply(&apply_args(Some(settings_path)), &env, &executor, resolver)?;

    let executed = executor.executed.lock().unwrap();
    let args = &executed[0].args;
    assert!(args.windows(2).any(|w| w == ["--ssh-user", "centos"]));
    assert!(!args.iter().any(|a| a == "--sudo"));
    Ok(())
}

#[test]
fn validate_succeeds_on_complete_setup() -> Result<()> {
    let (_dir, root) = helpers::utf8_tempdir();
    let env = helpers::chef_dir(&root, helpers::KNIFE_RB, &["encrypted_data_bag_secret"]);
    let opts = ValidateArgs {
        common: CommonArgs {
            config: None,
            log_level: LogLevel::Error,
        },
    };
    validate(&opts, &env)
}

#[test]
fn validate_requires_a_secrets_file() {
    let (_dir, root) = helpers::utf8_tempdir();
    let env = helpers::chef_dir(&root, helpers::KNIFE_RB, &["foo.txt"]);
    let opts = ValidateArgs {
        common: CommonArgs {
            config: None,
            log_level: LogLevel::Error,
        },
    };
    let err = validate(&opts, &env).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<KnifebootError>(),
        Some(KnifebootError::NoCandidates(_))
    ));
}
