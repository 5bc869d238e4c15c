// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [server]
/// interpreter = "python3"
/// entry = "app/main.py"
/// workdir = "backend"
///
/// [server.env]
/// PYTHONIOENCODING = "utf-8"
///
/// [tool.reporter]
/// port = 8710
/// cmd = "npx serve reports -l 8710"
///
/// [build]
/// lock_file = ".stackctl/build.lock"
/// ```
///
/// All sections are optional in the TOML sense and have defaults; semantic
/// requirements (a non-empty server entry point, unique tool ports, ...) are
/// enforced by `validate::validate_config`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    /// The application server from `[server]`.
    #[serde(default)]
    pub server: ServerConfig,

    /// All auxiliary tools from `[tool.<name>]`.
    ///
    /// Keys are the *tool names* (e.g. `"reporter"`).
    #[serde(default)]
    pub tool: BTreeMap<String, ToolConfig>,

    /// Build pipeline settings from `[build]`.
    #[serde(default)]
    pub build: BuildConfig,
}

/// `[server]` section: the main application server.
///
/// The server is recognised in the OS process table by its command line:
/// the process image must be `interpreter` and the full command line must
/// contain `entry`. No handle or pid is persisted between invocations;
/// identity is re-derived on every query.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Process image used to launch (and recognise) the server.
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Entry-point script, passed to the interpreter and used as the
    /// command-line match fragment.
    #[serde(default)]
    pub entry: String,

    /// Working directory the server is launched from.
    #[serde(default = "default_workdir")]
    pub workdir: String,

    /// Wait after spawning/terminating before re-checking the process
    /// table, to absorb OS startup/shutdown latency.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Directory for timestamped log files capturing child stdout/stderr.
    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    /// Environment overrides applied to the spawned server, e.g. forcing a
    /// specific text encoding.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

fn default_interpreter() -> String {
    "python3".to_string()
}

fn default_workdir() -> String {
    ".".to_string()
}

fn default_settle_delay_ms() -> u64 {
    2000
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            entry: String::new(),
            workdir: default_workdir(),
            settle_delay_ms: default_settle_delay_ms(),
            log_dir: default_log_dir(),
            env: BTreeMap::new(),
        }
    }
}

impl ServerConfig {
    /// Settle delay as a `Duration`.
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// `[tool.<name>]` section: one auxiliary helper process.
///
/// Liveness for tools is port-based: a listener on `port` means the tool is
/// assumed running, without verifying its actual identity. Termination
/// matches `cmd` as a command-line fragment instead, since ports cannot be
/// mapped back to pids portably.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolConfig {
    /// Port the tool listens on; used as the liveness signal.
    #[serde(default)]
    pub port: u16,

    /// Launch command, run via the shell.
    #[serde(default)]
    pub cmd: String,

    /// Working directory the tool is launched from.
    #[serde(default = "default_workdir")]
    pub workdir: String,
}

/// `[build]` section: the lock-guarded build pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildConfig {
    /// Well-known lock file serializing build runs across invocations.
    #[serde(default = "default_lock_file")]
    pub lock_file: String,

    /// External executables that must resolve on PATH before any step runs.
    #[serde(default = "default_required_tools")]
    pub required_tools: Vec<String>,

    /// Directory the backend install steps run in.
    #[serde(default = "default_backend_dir")]
    pub backend_dir: String,

    /// Backend dependency installation command.
    #[serde(default = "default_install_cmd")]
    pub install_cmd: String,

    /// Package force-reinstalled after install to resolve a known
    /// transitive version conflict. Both `pin_package` and `pin_version`
    /// must be set for the remediation step to run.
    #[serde(default)]
    pub pin_package: Option<String>,

    /// Pinned version for `pin_package`.
    #[serde(default)]
    pub pin_version: Option<String>,

    /// Directory the frontend build runs in.
    #[serde(default = "default_frontend_dir")]
    pub frontend_dir: String,

    /// Frontend build command.
    #[serde(default = "default_frontend_cmd")]
    pub frontend_cmd: String,

    /// Build output directory produced by `frontend_cmd`.
    #[serde(default = "default_frontend_dist")]
    pub frontend_dist: String,

    /// Destination directory replaced with `frontend_dist` after the build.
    #[serde(default = "default_deploy_dir")]
    pub deploy_dir: String,
}

fn default_lock_file() -> String {
    ".stackctl/build.lock".to_string()
}

fn default_required_tools() -> Vec<String> {
    vec!["poetry".to_string(), "npm".to_string()]
}

fn default_backend_dir() -> String {
    "backend".to_string()
}

fn default_install_cmd() -> String {
    "poetry install".to_string()
}

fn default_frontend_dir() -> String {
    "frontend".to_string()
}

fn default_frontend_cmd() -> String {
    "npm install && npm run build".to_string()
}

fn default_frontend_dist() -> String {
    "frontend/dist".to_string()
}

fn default_deploy_dir() -> String {
    "backend/app/static".to_string()
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            lock_file: default_lock_file(),
            required_tools: default_required_tools(),
            backend_dir: default_backend_dir(),
            install_cmd: default_install_cmd(),
            pin_package: None,
            pin_version: None,
            frontend_dir: default_frontend_dir(),
            frontend_cmd: default_frontend_cmd(),
            frontend_dist: default_frontend_dist(),
            deploy_dir: default_deploy_dir(),
        }
    }
}
