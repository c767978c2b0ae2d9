// tests/hosts.rs

//! Inventory, configuration and the VM install/update adapters against the
//! shipped data.

mod common;

use ciguest::ansible::{AnsiblePlaybook, GitRevision, extra_vars, validate_build_selection};
use ciguest::install::VirtInstall;
use ciguest::inventory::group_vars;
use ciguest::process::{ExternalCommand, command_line};
use ciguest::{BuildTarget, Config, Error, Inventory};
use common::{data_dir, fixtures_dir, names, projects, targets};
use serde_yaml::Value;
use std::fs;

fn inventory() -> Inventory {
    Inventory::load(&targets(), Some(fixtures_dir().join("inventory.yml").as_path())).unwrap()
}

fn config() -> Config {
    Config::load(&data_dir(), Some(fixtures_dir().join("config.yml").as_path())).unwrap()
}

fn seq(value: &Value) -> Vec<&str> {
    value
        .as_sequence()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect()
}

#[test]
fn test_inventory_skips_unknown_targets() {
    let inv = inventory();
    assert_eq!(
        inv.hosts(),
        ["centos-9-1", "debian-12-1", "debian-12-2", "fedora-41-1"]
    );
    assert_eq!(inv.host_target_name("centos-9-1").unwrap(), "centos-stream-9");
    assert!(matches!(inv.host_facts("sol-1"), Err(Error::InventoryError(_))));
}

#[test]
fn test_host_facts_overlay_target_facts() {
    let inv = inventory();
    let facts = inv.host_facts("debian-12-2").unwrap();
    assert_eq!(facts.get("fully_managed").and_then(Value::as_bool), Some(true));
    assert_eq!(facts["os"]["name"].as_str(), Some("Debian"));
    assert_eq!(facts["paths"]["make"].as_str(), Some("/usr/bin/make"));
    assert!(facts["install"]["url"].as_str().is_some());
}

#[test]
fn test_expand_hosts() {
    let inv = inventory();
    assert_eq!(inv.expand_hosts("debian-*").unwrap(), ["debian-12-1", "debian-12-2"]);
    assert_eq!(
        inv.expand_hosts("fedora-41-1,centos-9-1").unwrap(),
        ["centos-9-1", "fedora-41-1"]
    );
    assert!(inv.expand_hosts("sol-1").is_err());
}

#[test]
fn test_missing_inventory_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        Inventory::load(&targets(), Some(dir.path().join("nope.yml").as_path())),
        Err(Error::InventoryError(_))
    ));
}

#[test]
fn test_user_config_overrides_defaults() {
    let config = config();
    assert_eq!(config.get_str("install", "root_password"), Some("s3cret"));
    assert!(config.get_bool("install", "cloud_init"));
    assert_eq!(config.get_str("install", "flavor"), Some("test"));

    let install = config.install().unwrap();
    assert_eq!(install.vcpus, 4);
    assert_eq!(install.disk_size, 50);
    assert!(config.validate_vm_settings().is_ok());
}

#[test]
fn test_config_validation_failures() {
    let dir = tempfile::tempdir().unwrap();

    let empty = dir.path().join("empty.yml");
    fs::write(&empty, "").unwrap();
    assert!(matches!(
        Config::load(&data_dir(), Some(empty.as_path())),
        Err(Error::ConfigError(_))
    ));

    let gitlab = dir.path().join("gitlab.yml");
    fs::write(&gitlab, "install:\n  root_password: pw\n  flavor: gitlab\n").unwrap();
    let config = Config::load(&data_dir(), Some(gitlab.as_path())).unwrap();
    match config.validate_vm_settings() {
        Err(Error::ConfigError(msg)) => assert!(msg.contains("gitlab.runner_secret")),
        other => panic!("expected a config error, got {:?}", other),
    }

    let missing = dir.path().join("missing.yml");
    assert!(Config::load(&data_dir(), Some(missing.as_path())).is_err());
}

#[test]
fn test_group_vars() {
    let targets = targets();
    let projects = projects();
    let debian = BuildTarget::new(&targets, "debian-12", None)
        .unwrap()
        .with_native_arch(common::NATIVE_ARCH);

    let vars = group_vars(&config(), &debian, &projects, &names(&["test-minimal"])).unwrap();

    let packages = seq(&vars["packages"]);
    assert!(packages.contains(&"cloud-init"));
    assert!(packages.contains(&"openssh-server"));
    assert!(packages.contains(&"locales"));
    assert!(packages.contains(&"make"));
    assert_eq!(seq(&vars["unwanted_packages"]), ["nano", "postfix"]);
    assert_eq!(seq(&vars["early_install_packages"]), ["python3", "sudo"]);
    assert!(seq(&vars["pypi_packages"]).is_empty());
    assert_eq!(vars["packaging"]["command"].as_str(), Some("apt-get"));
}

#[test]
fn test_virt_install_from_inventory() {
    let dd = data_dir();
    let inv = inventory();
    let facts = inv.host_facts("fedora-41-1").unwrap();

    let vi = VirtInstall::new(&dd, "fedora-41-1", facts, &config(), false).unwrap();
    assert!(vi.initrd_inject().ends_with("kickstart.cfg"));
    let rendered = fs::read_to_string(vi.initrd_inject()).unwrap();
    assert!(rendered.contains("download.fedoraproject.org"));
    assert!(!rendered.contains("{{ install.url }}"));

    let args = vi.build_args().unwrap();
    let pos = args.iter().position(|a| a == "--vcpus").unwrap();
    assert_eq!(args[pos + 1], "4");
    assert!(command_line(&vi).unwrap().starts_with("virt-install --name fedora-41-1 "));
}

#[test]
fn test_update_playbook() {
    let dd = data_dir();
    let targets = targets();
    let projects = projects();
    let config = config();
    let debian = BuildTarget::new(&targets, "debian-12", None)
        .unwrap()
        .with_native_arch(common::NATIVE_ARCH);
    let selected = names(&["test-minimal"]);

    let base = AnsiblePlaybook::base_dir(&dd).unwrap();
    let playbook_base = AnsiblePlaybook::playbook_dir(&base, "update");
    let revision: GitRevision = "origin/main".parse().unwrap();
    let group = group_vars(&config, &debian, &projects, &selected).unwrap();
    let vars = extra_vars(&config, &group, &selected, &revision, &base, &playbook_base).unwrap();

    assert_eq!(vars["git_remote"], "origin");
    assert_eq!(vars["git_branch"], "main");
    assert_eq!(vars["selected_projects"][0], "test-minimal");
    assert_eq!(vars["install"]["root_password"], "s3cret");
    assert_eq!(vars["unwanted_packages"][0], "nano");

    let hosts = names(&["debian-12-1", "debian-12-2"]);
    let playbook = AnsiblePlaybook::new(&dd, "update", &hosts, &vars).unwrap();
    let args = playbook.build_args().unwrap();
    assert_eq!(args[..2], ["--limit", "debian-12-1,debian-12-2"]);
    assert!(args[4].ends_with("playbooks/update/main.yml"));
    assert!(playbook.envs()[0].1.ends_with("ansible.cfg"));

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(playbook.extra_vars_path()).unwrap()).unwrap();
    assert_eq!(written, vars);

    assert!(matches!(
        AnsiblePlaybook::new(&dd, "no-such-playbook", &hosts, &vars),
        Err(Error::CommandError(_))
    ));
}

#[test]
fn test_build_playbook() {
    let dd = data_dir();
    let config = config();
    let targets = targets();
    let projects = projects();
    let fedora = BuildTarget::new(&targets, "fedora-41", None)
        .unwrap()
        .with_native_arch(common::NATIVE_ARCH);
    let selected = names(&["test-minimal"]);

    assert!(validate_build_selection("test-minimal,test-perl").is_ok());
    assert!(matches!(validate_build_selection("all"), Err(Error::ValidationError(_))));
    assert!(matches!(validate_build_selection("test-*"), Err(Error::ValidationError(_))));

    let base = AnsiblePlaybook::base_dir(&dd).unwrap();
    let playbook_base = AnsiblePlaybook::playbook_dir(&base, "build");
    let group = group_vars(&config, &fedora, &projects, &selected).unwrap();
    let revision = GitRevision::default();
    let vars = extra_vars(&config, &group, &selected, &revision, &base, &playbook_base).unwrap();
    assert_eq!(vars["selected_projects"][0], "test-minimal");

    let hosts = names(&["fedora-41-1"]);
    let playbook = AnsiblePlaybook::new(&dd, "build", &hosts, &vars).unwrap();
    let args = playbook.build_args().unwrap();
    assert_eq!(args[..2], ["--limit", "fedora-41-1"]);
    assert!(args[4].ends_with("playbooks/build/main.yml"));
}
