use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Default request timeout against the device, in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Hostname the device answers on out of the box.
const DEFAULT_HOST: &str = "fritz.box";

/// Optional configuration file contents.
///
/// Every field can also come from the command line; flags win over the
/// file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    pub host: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Fully resolved connection settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub url: Url,
    pub user: String,
    pub password: String,
    pub timeout: Duration,
}

impl Settings {
    /// Merge the config file with the command-line values (which win) and
    /// validate the result.
    pub fn resolve(
        file: FileConfig,
        host: Option<String>,
        user: Option<String>,
        password: Option<String>,
        timeout_secs: Option<u64>,
    ) -> Result<Self> {
        let host = host
            .or(file.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let user = user.or(file.user).context(
            "No FRITZ!Box user configured; pass --user or set it in the config file",
        )?;
        let password = password.or(file.password).context(
            "No FRITZ!Box password configured; pass --password, set FRITZBOX_PASSWORD \
             or put it in the config file",
        )?;
        let timeout = Duration::from_secs(
            timeout_secs
                .or(file.timeout_secs)
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        );

        let url = Url::parse(&ensure_scheme(&host))
            .with_context(|| format!("Invalid FRITZ!Box host: {host}"))?;

        Ok(Settings {
            url,
            user,
            password,
            timeout,
        })
    }
}

/// Load the configuration file.
///
/// An explicitly named file must exist; the default location is optional
/// and silently yields empty defaults when absent.
pub fn load(path: Option<&Path>) -> Result<FileConfig> {
    if let Some(path) = path {
        return read_file(path);
    }

    match default_config_path() {
        Some(path) if path.exists() => read_file(&path),
        _ => Ok(FileConfig::default()),
    }
}

/// Platform config location, e.g. `~/.config/fritz-profiles/config.toml`
/// on Linux.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "fritz-profiles").map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Prefix a bare host with `http://`, the scheme the console speaks by
/// default; callers that need TLS pass an explicit `https://` URL.
pub fn ensure_scheme(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}

fn read_file(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn ensure_scheme_prefixes_bare_hosts() {
        assert_eq!(ensure_scheme("fritz.box"), "http://fritz.box");
        assert_eq!(ensure_scheme("192.168.178.1"), "http://192.168.178.1");
        assert_eq!(ensure_scheme("http://fritz.box"), "http://fritz.box");
        assert_eq!(ensure_scheme("https://fritz.box"), "https://fritz.box");
    }

    #[test]
    fn resolve_prefers_cli_values_over_the_file() {
        let file = FileConfig {
            host: Some("192.168.178.1".to_string()),
            user: Some("filed".to_string()),
            password: Some("filepass".to_string()),
            timeout_secs: Some(30),
        };

        let settings = Settings::resolve(
            file,
            Some("https://router.example".to_string()),
            Some("smith".to_string()),
            None,
            None,
        )
        .unwrap();

        assert_eq!(settings.url.as_str(), "https://router.example/");
        assert_eq!(settings.user, "smith");
        assert_eq!(settings.password, "filepass");
        assert_eq!(settings.timeout, Duration::from_secs(30));
    }

    #[test]
    fn resolve_defaults_host_and_timeout() {
        let settings = Settings::resolve(
            FileConfig::default(),
            None,
            Some("smith".to_string()),
            Some("secret".to_string()),
            None,
        )
        .unwrap();

        assert_eq!(settings.url.as_str(), "http://fritz.box/");
        assert_eq!(settings.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn resolve_without_password_fails() {
        let err = Settings::resolve(
            FileConfig::default(),
            None,
            Some("smith".to_string()),
            None,
            None,
        )
        .unwrap_err();

        assert!(err.to_string().contains("password"));
    }

    #[test]
    fn load_reads_a_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "host = \"192.168.178.1\"\nuser = \"smith\"\npassword = \"secret\"\ntimeout_secs = 5"
        )
        .unwrap();

        let config = load(Some(file.path())).unwrap();
        assert_eq!(config.host.as_deref(), Some("192.168.178.1"));
        assert_eq!(config.user.as_deref(), Some("smith"));
        assert_eq!(config.timeout_secs, Some(5));
    }

    #[test]
    fn load_with_explicit_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");

        assert!(load(Some(&missing)).is_err());
    }
}
