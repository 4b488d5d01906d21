//! Deployment automation.
//!
//! A linear sequence of shell commands issued to the web server over
//! ssh/scp/rsync subprocesses: make the project folders, push the release
//! build, write the production `.env`, sync the user database, configure an
//! Apache virtual host with SSL in front of a systemd service. No retries
//! and no rollback; each task prints what it is doing and the first failed
//! command stops the run.
//!
//! The server hosts several proxied apps, one Gunicorn-style local port
//! each; [`list_server_ports`] scans the Apache configs so a new deploy can
//! pick the next free port or reuse the one its domain already holds.

use crate::cli::{DeployCommand, DeployOptions};
use itertools::Itertools;
use once_cell::sync::Lazy;
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use regex::Regex;
use std::error::Error;
use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

/// Port assigned to the first app ever deployed on the server.
const FIRST_PORT: u16 = 6666;

const APACHE_SITES_DIR: &str = "/etc/apache2/sites-available";
const SYSTEMD_DIR: &str = "/etc/systemd/system";

static PORT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"ProxyPass\s+/\s+http://127\.0\.0\.1:(\d+)").unwrap());
static DOMAIN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(ServerName|ServerAlias)\s+(\S+)").unwrap());

/// One proxied app on the server: local port (`None` when the conf has no
/// proxy line), domain, and the Apache conf filename.
pub type SiteEntry = (Option<u16>, String, String);

/// Everything a deploy task needs to know about the target server.
#[derive(Debug, Clone)]
pub struct DeployConfig {
    /// `user@host` for the administrative connection.
    pub host: String,
    /// Public domain the app serves, e.g. `nzharold.example.works`.
    pub domain: String,
    /// Project name; names the remote folder and the service unit.
    pub project: String,
    /// Remote home directory holding `webapps/`.
    pub remote_root: String,
    /// Username of the default account recreated by the user-db sync.
    pub admin_user: String,
    /// Password for that account, from `ADMIN_PASSWORD`.
    pub admin_password: Option<String>,
}

impl DeployConfig {
    pub fn from_options(options: DeployOptions) -> Self {
        Self {
            host: options.host,
            domain: options.domain,
            project: "nzharold".to_string(),
            remote_root: options.remote_root,
            admin_user: options.admin_user,
            admin_password: options.admin_password,
        }
    }

    fn remote_dir(&self) -> String {
        format!("{}/webapps/{}", self.remote_root, self.project)
    }

    fn service_name(&self) -> String {
        format!("{}.service", self.project)
    }
}

/// Thin wrapper over the remote administrative connection.
pub struct Remote {
    host: String,
}

impl Remote {
    pub fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
        }
    }

    /// Run a command on the server and return its stdout.
    pub fn run(&self, command: &str) -> Result<String, Box<dyn Error>> {
        debug!(host = %self.host, %command, "ssh");
        run_local("ssh", &[&self.host, command])
    }

    /// Run a command on the server under sudo.
    pub fn sudo(&self, command: &str) -> Result<String, Box<dyn Error>> {
        self.run(&format!("sudo {command}"))
    }

    /// Copy a local file into the remote home directory.
    pub fn put(&self, local: &Path) -> Result<(), Box<dyn Error>> {
        let local = local.to_string_lossy();
        run_local("scp", &[local.as_ref(), &format!("{}:", self.host)])?;
        Ok(())
    }

    /// Whether a remote path exists.
    pub fn exists(&self, path: &str) -> bool {
        self.run(&format!("ls -ls {path}")).is_ok()
    }
}

fn run_local(program: &str, args: &[&str]) -> Result<String, Box<dyn Error>> {
    let output = Command::new(program).args(args).output()?;
    if !output.status.success() {
        return Err(format!(
            "`{program} {}` failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        )
        .into());
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Execute one `deploy` subcommand.
pub fn run_command(config: &DeployConfig, command: DeployCommand) -> Result<(), Box<dyn Error>> {
    let remote = Remote::new(&config.host);
    match command {
        DeployCommand::Ports => {
            for (port, domain, file) in list_server_ports(&remote)? {
                let port = port.map_or_else(|| "N/A".to_string(), |p| p.to_string());
                println!("{port} : {domain} : {file}");
            }
        }
        DeployCommand::Install => install(&remote, config)?,
        DeployCommand::Update => {
            section("Updating app...");
            push_files(config)?;
            restart_service(&remote, config)?;
        }
        DeployCommand::Status => {
            let status = remote.sudo(&format!("systemctl status {}", config.service_name()))?;
            println!("{status}");
        }
        DeployCommand::Remove => {
            delete_project_folder(&remote, config)?;
            delete_apache(&remote, config)?;
            delete_service(&remote, config)?;
        }
    }
    Ok(())
}

/// First-time deploy: the whole linear sequence.
fn install(remote: &Remote, config: &DeployConfig) -> Result<(), Box<dyn Error>> {
    let port = server_port(remote, config)?;
    info!(port, domain = %config.domain, "Deploying");
    init_project_folder(remote, config)?;
    push_files(config)?;
    init_dotenv(remote, config, port)?;
    init_user_db(remote, config)?;
    init_apache(remote, config, port)?;
    init_service(remote, config)?;
    section(&format!("The app should be working now at {}", config.domain));
    Ok(())
}

fn section(message: &str) {
    println!("{} {message}", "-".repeat(10));
}

/// Scan the Apache sites for `(port, domain, conf file)` triples, sorted
/// and deduplicated. SSL variants are skipped; they mirror the plain conf.
pub fn list_server_ports(remote: &Remote) -> Result<Vec<SiteEntry>, Box<dyn Error>> {
    let ls = remote.run(&format!("ls {APACHE_SITES_DIR}/*.conf"))?;
    let conf_files = ls
        .lines()
        .map(str::trim)
        .filter(|f| !f.is_empty() && !f.contains("-ssl"))
        .map(str::to_string)
        .collect::<Vec<_>>();

    let mut entries = Vec::new();
    for conf_file in conf_files {
        let content = remote.run(&format!("cat {conf_file}"))?;
        let name = conf_file
            .rsplit('/')
            .next()
            .unwrap_or(&conf_file)
            .to_string();
        entries.push(parse_site_conf(&name, &content));
    }
    Ok(entries.into_iter().unique().sorted().collect())
}

/// Pull the proxy port and domain out of one Apache conf.
pub fn parse_site_conf(conf_file: &str, content: &str) -> SiteEntry {
    let port = PORT_RE
        .captures(content)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok());
    let domain = DOMAIN_RE
        .captures(content)
        .and_then(|c| c.get(2))
        .map_or_else(|| "unknown".to_string(), |m| m.as_str().to_string());
    (port, domain, conf_file.to_string())
}

/// The port to deploy on: the one the domain already holds, otherwise one
/// past the highest port in use, starting from [`FIRST_PORT`].
pub fn next_free_port(entries: &[SiteEntry], domain: &str) -> u16 {
    let mut result = FIRST_PORT;
    for (port, entry_domain, _) in entries {
        if let Some(port) = port {
            if entry_domain == domain {
                return *port;
            }
            result = port + 1;
        }
    }
    result
}

fn server_port(remote: &Remote, config: &DeployConfig) -> Result<u16, Box<dyn Error>> {
    let entries = list_server_ports(remote)?;
    Ok(next_free_port(&entries, &config.domain))
}

fn init_project_folder(remote: &Remote, config: &DeployConfig) -> Result<(), Box<dyn Error>> {
    section("Making project folders on server...");
    let dir = config.remote_dir();
    remote.run(&format!("mkdir -p {dir}/site/logs"))?;
    remote.run(&format!("mkdir -p {dir}/bin"))?;
    Ok(())
}

/// Rsync the release binary to the server.
///
/// Expects `target/release/nzharold` to exist locally; building it is the
/// operator's step, the same way the previous generation expected a pushed
/// master branch.
fn push_files(config: &DeployConfig) -> Result<(), Box<dyn Error>> {
    section("Pushing release build to server via Rsync...");
    let target = format!("{}:{}/bin/", config.host, config.remote_dir());
    run_local("rsync", &["-av", "target/release/nzharold", &target])?;
    Ok(())
}

/// The production `.env` written on first deploy.
fn make_dotenv(config: &DeployConfig, port: u16) -> String {
    format!(
        "MODE=production\n\
         SECRET_KEY={}\n\
         HOST=127.0.0.1\n\
         PORT={port}\n\
         DATABASE_URL={}/users.sqlite\n",
        random_secret_key(),
        config.remote_dir()
    )
}

fn init_dotenv(remote: &Remote, config: &DeployConfig, port: u16) -> Result<(), Box<dyn Error>> {
    section("Writing production .env on server...");
    let tmp_path = std::env::temp_dir().join("nzharold.env.tmp");
    std::fs::write(&tmp_path, make_dotenv(config, port))?;
    remote.put(&tmp_path)?;
    remote.run(&format!(
        "mv nzharold.env.tmp {}/.env",
        config.remote_dir()
    ))?;
    std::fs::remove_file(&tmp_path)?;
    Ok(())
}

/// Recreate the default admin account in the remote user database.
///
/// Running this twice does not destroy the database, but it does recreate
/// the admin user — change `ADMIN_PASSWORD` and rerun to rotate it.
fn init_user_db(remote: &Remote, config: &DeployConfig) -> Result<(), Box<dyn Error>> {
    let Some(password) = &config.admin_password else {
        return Err("ADMIN_PASSWORD must be set to initialise the remote user database".into());
    };
    section(&format!(
        "Initialising user database and adding user '{}'...",
        config.admin_user
    ));
    let dir = config.remote_dir();
    let bin = format!("{dir}/bin/nzharold");
    remote.run(&format!(
        "cd {dir} && {bin} user init && {bin} user remove {admin} && {bin} user add {admin} {password} {admin}@{domain}",
        admin = config.admin_user,
        domain = config.domain,
    ))?;
    Ok(())
}

/// The plain (pre-certbot) Apache virtual host.
fn make_apache_conf(config: &DeployConfig, port: u16) -> String {
    format!(
        "<VirtualHost *:80>\n\
             ServerName {domain}\n\
         \n\
             ProxyPreserveHost On\n\
             ProxyPass / http://127.0.0.1:{port}/\n\
             ProxyPassReverse / http://127.0.0.1:{port}/\n\
         \n\
             ErrorLog {dir}/site/logs/error.log\n\
             CustomLog {dir}/site/logs/access.log combined\n\
         </VirtualHost>\n",
        domain = config.domain,
        dir = config.remote_dir(),
    )
}

/// Configure Apache for the domain and install an SSL certificate via
/// Let's Encrypt; certbot asks its questions interactively.
fn init_apache(remote: &Remote, config: &DeployConfig, port: u16) -> Result<(), Box<dyn Error>> {
    section(&format!("Configuring Apache for domain {}...", config.domain));
    let filename = format!("{}.conf", config.domain);
    let conf_path = format!("{APACHE_SITES_DIR}/{filename}");
    if remote.exists(&conf_path) {
        info!(%conf_path, "Apache conf already present; leaving it alone");
        return Ok(());
    }

    let tmp_path = std::env::temp_dir().join(&filename);
    std::fs::write(&tmp_path, make_apache_conf(config, port))?;
    // scp cannot write into root-owned folders, so land in the home
    // directory and sudo-move into place.
    remote.put(&tmp_path)?;
    remote.sudo(&format!("mv {filename} {APACHE_SITES_DIR}"))?;
    std::fs::remove_file(&tmp_path)?;

    remote.sudo(&format!("a2ensite {filename}"))?;
    remote.sudo(&format!("certbot --apache -d {}", config.domain))?;
    let check = remote.sudo("apachectl configtest")?;
    if check.contains("Syntax OK") {
        remote.sudo("service apache2 restart")?;
    }
    Ok(())
}

fn delete_apache(remote: &Remote, config: &DeployConfig) -> Result<(), Box<dyn Error>> {
    section(&format!("Deleting Apache config files for {}...", config.domain));
    let filenames = [
        format!("{}.conf", config.domain),
        format!("{}-le-ssl.conf", config.domain),
    ];
    for filename in filenames {
        let path = format!("{APACHE_SITES_DIR}/{filename}");
        if remote.exists(&path) {
            remote.sudo(&format!("a2dissite {filename}"))?;
            remote.sudo(&format!("rm {path}"))?;
            remote.sudo("service apache2 restart")?;
        }
    }
    Ok(())
}

/// The systemd unit standing in for the old Gunicorn service.
fn make_service_unit(config: &DeployConfig) -> String {
    let dir = config.remote_dir();
    format!(
        "[Unit]\n\
         Description=NZ Harold web application\n\
         After=network.target\n\
         \n\
         [Service]\n\
         WorkingDirectory={dir}\n\
         EnvironmentFile={dir}/.env\n\
         ExecStart={dir}/bin/nzharold serve\n\
         Restart=on-failure\n\
         \n\
         [Install]\n\
         WantedBy=multi-user.target\n"
    )
}

fn init_service(remote: &Remote, config: &DeployConfig) -> Result<(), Box<dyn Error>> {
    section("Creating systemd service...");
    let filename = config.service_name();
    let path = format!("{SYSTEMD_DIR}/{filename}");
    if remote.exists(&path) {
        info!(%path, "Service unit already present; leaving it alone");
        return Ok(());
    }

    let tmp_path = std::env::temp_dir().join(&filename);
    std::fs::write(&tmp_path, make_service_unit(config))?;
    remote.put(&tmp_path)?;
    remote.sudo(&format!("mv {filename} {SYSTEMD_DIR}"))?;
    std::fs::remove_file(&tmp_path)?;

    remote.sudo(&format!("systemctl enable {filename}"))?;
    remote.sudo(&format!("systemctl start {filename}"))?;
    println!("{}", remote.sudo(&format!("systemctl status {filename}"))?);
    Ok(())
}

fn restart_service(remote: &Remote, config: &DeployConfig) -> Result<(), Box<dyn Error>> {
    section("Restarting service...");
    let filename = config.service_name();
    remote.sudo(&format!("systemctl restart {filename}"))?;
    println!("{}", remote.sudo(&format!("systemctl status {filename}"))?);
    Ok(())
}

fn delete_service(remote: &Remote, config: &DeployConfig) -> Result<(), Box<dyn Error>> {
    section("Deleting systemd service...");
    let filename = config.service_name();
    let path = format!("{SYSTEMD_DIR}/{filename}");
    if remote.exists(&path) {
        remote.sudo(&format!("systemctl stop {filename}"))?;
        remote.sudo(&format!("rm {path}"))?;
    }
    Ok(())
}

fn delete_project_folder(remote: &Remote, config: &DeployConfig) -> Result<(), Box<dyn Error>> {
    section("Deleting project folder on server...");
    let dir = config.remote_dir();
    if remote.exists(&dir) {
        remote.run(&format!("rm -rf {dir}"))?;
    }
    Ok(())
}

/// 64 alphanumeric characters of session-key material.
fn random_secret_key() -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DeployConfig {
        DeployConfig {
            host: "deploy@web.example.works".to_string(),
            domain: "nzharold.example.works".to_string(),
            project: "nzharold".to_string(),
            remote_root: "/home/deploy".to_string(),
            admin_user: "mrcagney".to_string(),
            admin_password: Some("hunter2".to_string()),
        }
    }

    const CONF: &str = "<VirtualHost *:80>\n\
        ServerName nzharold.example.works\n\
        ProxyPass / http://127.0.0.1:6668/\n\
        ProxyPassReverse / http://127.0.0.1:6668/\n\
        </VirtualHost>\n";

    #[test]
    fn test_parse_site_conf() {
        let entry = parse_site_conf("nzharold.example.works.conf", CONF);
        assert_eq!(
            entry,
            (
                Some(6668),
                "nzharold.example.works".to_string(),
                "nzharold.example.works.conf".to_string()
            )
        );
    }

    #[test]
    fn test_parse_site_conf_without_proxy() {
        let content = "<VirtualHost *:80>\nServerAlias static.example.works\n</VirtualHost>\n";
        let entry = parse_site_conf("static.conf", content);
        assert_eq!(entry.0, None);
        assert_eq!(entry.1, "static.example.works");
    }

    #[test]
    fn test_parse_site_conf_without_domain() {
        let entry = parse_site_conf("odd.conf", "<VirtualHost *:80>\n</VirtualHost>\n");
        assert_eq!(entry.1, "unknown");
    }

    #[test]
    fn test_next_free_port_on_empty_server() {
        assert_eq!(next_free_port(&[], "nzharold.example.works"), 6666);
    }

    #[test]
    fn test_next_free_port_reuses_existing_assignment() {
        let entries = vec![
            (Some(6666), "other.example.works".to_string(), "a.conf".to_string()),
            (
                Some(6667),
                "nzharold.example.works".to_string(),
                "b.conf".to_string(),
            ),
            (Some(6670), "third.example.works".to_string(), "c.conf".to_string()),
        ];
        assert_eq!(next_free_port(&entries, "nzharold.example.works"), 6667);
    }

    #[test]
    fn test_next_free_port_takes_one_past_highest() {
        let entries = vec![
            (None, "static.example.works".to_string(), "s.conf".to_string()),
            (Some(6666), "a.example.works".to_string(), "a.conf".to_string()),
            (Some(6670), "b.example.works".to_string(), "b.conf".to_string()),
        ];
        assert_eq!(next_free_port(&entries, "nzharold.example.works"), 6671);
    }

    #[test]
    fn test_make_apache_conf() {
        let conf = make_apache_conf(&config(), 6671);
        assert!(conf.contains("ServerName nzharold.example.works"));
        assert!(conf.contains("ProxyPass / http://127.0.0.1:6671/"));
        assert!(conf.contains("ProxyPassReverse / http://127.0.0.1:6671/"));
        // The generated conf must itself parse back out.
        let entry = parse_site_conf("x.conf", &conf);
        assert_eq!(entry.0, Some(6671));
        assert_eq!(entry.1, "nzharold.example.works");
    }

    #[test]
    fn test_make_service_unit() {
        let unit = make_service_unit(&config());
        assert!(unit.contains("ExecStart=/home/deploy/webapps/nzharold/bin/nzharold serve"));
        assert!(unit.contains("EnvironmentFile=/home/deploy/webapps/nzharold/.env"));
        assert!(unit.contains("WantedBy=multi-user.target"));
    }

    #[test]
    fn test_make_dotenv() {
        let env = make_dotenv(&config(), 6671);
        assert!(env.contains("MODE=production\n"));
        assert!(env.contains("PORT=6671\n"));
        assert!(env.contains("DATABASE_URL=/home/deploy/webapps/nzharold/users.sqlite\n"));
        let key_line = env
            .lines()
            .find(|l| l.starts_with("SECRET_KEY="))
            .expect("secret key line");
        assert_eq!(key_line.len(), "SECRET_KEY=".len() + 64);
    }

    #[test]
    fn test_random_secret_key_is_alphanumeric() {
        let key = random_secret_key();
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
