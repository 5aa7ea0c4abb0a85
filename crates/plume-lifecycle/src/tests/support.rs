//! Shared fixtures for the controller behaviour suite.

use camino::{Utf8Path, Utf8PathBuf};
use nix::unistd::{Group, User, getegid, geteuid};
use plume_config::{ServiceParameters, TemplateSet};

/// Name of the user running the test process.
pub(crate) fn current_user() -> String {
    User::from_uid(geteuid())
        .expect("current user lookup should succeed")
        .expect("current user should exist")
        .name
}

/// Name of the primary group of the test process.
pub(crate) fn current_group() -> String {
    Group::from_gid(getegid())
        .expect("current group lookup should succeed")
        .expect("current group should exist")
        .name
}

/// Converts a temp path into a UTF-8 path.
pub(crate) fn utf8(path: std::path::PathBuf) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(path).expect("temp path should be UTF-8")
}

/// Builds a parameter snapshot rooted under `root`, owned by the current
/// user so unprivileged ownership changes succeed.
pub(crate) fn params_under(root: &Utf8Path) -> ServiceParameters {
    let mut templates = TemplateSet::default();
    templates
        .site_config
        .insert("notebook.server.port".to_owned(), "9995".to_owned());
    templates.env_script = "export NOTEBOOK_PORT=9995\n".to_owned();
    templates.access_control = "[users]\nadmin = secret\n".to_owned();
    templates.logging_config = "log4j.rootLogger = INFO, dailyfile\n".to_owned();
    ServiceParameters {
        service_dir: root.join("service"),
        package_dir: root.join("package"),
        conf_dir: root.join("conf"),
        pid_dir: root.join("pid"),
        log_dir: root.join("log"),
        log_file: "notebook-setup.log".to_owned(),
        user: current_user(),
        group: current_group(),
        service_host: "nb1.example".to_owned(),
        service_port: 9995,
        metastore_host: "ms1.example".to_owned(),
        metastore_port: 9083,
        store_server_port: 10000,
        views_enabled: true,
        runtime_home: "/usr/lib/jvm/java".into(),
        engine_version: "1.6.2".to_owned(),
        engine_home: "/usr/lib/engine".into(),
        engine_jar_dir: "/apps/engine/jars".into(),
        package_install_command: None,
        templates,
    }
}
