use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure for the QA agent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Generative backend configuration
    #[serde(default)]
    pub backend: BackendConfig,

    /// Refinement loop configuration
    #[serde(default)]
    pub refinement: RefinementConfig,

    /// Mock/test process execution configuration
    #[serde(default)]
    pub process: ProcessConfig,

    /// Test outcome classification markers
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Prompt construction limits
    #[serde(default)]
    pub prompts: PromptConfig,

    /// Output directory configuration
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Generative backend (Ollama-compatible) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BackendConfig {
    /// Base URL of the backend, without the `/api/generate` suffix
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier sent with every request
    #[serde(default = "default_model")]
    pub model: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_k")]
    pub top_k: u32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Context window requested from the backend
    #[serde(default = "default_num_ctx")]
    pub num_ctx: u32,

    /// Retries for transient transport failures (0 disables)
    #[serde(default = "default_backend_max_retries")]
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3:latest".to_string()
}

const fn default_request_timeout_secs() -> u64 {
    300
}

const fn default_temperature() -> f32 {
    0.3
}

const fn default_top_k() -> u32 {
    40
}

const fn default_top_p() -> f32 {
    0.9
}

const fn default_num_ctx() -> u32 {
    4096
}

const fn default_backend_max_retries() -> u32 {
    2
}

const fn default_initial_backoff_ms() -> u64 {
    1_000
}

const fn default_max_backoff_ms() -> u64 {
    30_000
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            request_timeout_secs: default_request_timeout_secs(),
            temperature: default_temperature(),
            top_k: default_top_k(),
            top_p: default_top_p(),
            num_ctx: default_num_ctx(),
            max_retries: default_backend_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Refinement loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RefinementConfig {
    /// Repair attempts allowed after the initial run
    #[serde(default = "default_retry_budget")]
    pub retry_budget: u32,

    /// Request edge-case suggestions for assets that pass
    #[serde(default = "default_true")]
    pub edge_cases: bool,
}

const fn default_retry_budget() -> u32 {
    3
}

const fn default_true() -> bool {
    true
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            retry_budget: default_retry_budget(),
            edge_cases: default_true(),
        }
    }
}

/// How the supervisor decides a freshly started mock is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessProbe {
    /// Sleep for the full grace period, then check liveness
    Grace,
    /// Poll until the service's UDP port is bound, bounded by the grace period
    Port,
}

/// Mock/test process execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProcessConfig {
    /// Interpreter used to launch mock and test artifacts
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Arguments placed before the artifact path
    #[serde(default)]
    pub interpreter_args: Vec<String>,

    /// Wait after starting the mock before the liveness check
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,

    /// How long a SIGTERM'd mock may take to exit before SIGKILL
    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,

    /// Wall-clock bound on one test-script run
    #[serde(default = "default_test_timeout_secs")]
    pub test_timeout_secs: u64,

    #[serde(default = "default_readiness")]
    pub readiness: ReadinessProbe,

    /// Per-stream memory bound for mock and test output; the head and the
    /// tail of a longer stream are kept
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
}

fn default_interpreter() -> String {
    "python3".to_string()
}

const fn default_grace_period_ms() -> u64 {
    2_000
}

const fn default_stop_timeout_ms() -> u64 {
    5_000
}

const fn default_test_timeout_secs() -> u64 {
    60
}

const fn default_readiness() -> ReadinessProbe {
    ReadinessProbe::Grace
}

const fn default_max_output_bytes() -> usize {
    64 * 1024
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            interpreter_args: vec![],
            grace_period_ms: default_grace_period_ms(),
            stop_timeout_ms: default_stop_timeout_ms(),
            test_timeout_secs: default_test_timeout_secs(),
            readiness: default_readiness(),
            max_output_bytes: default_max_output_bytes(),
        }
    }
}

/// Test outcome classification markers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ClassifierConfig {
    /// Token that must appear in stderr for a pass
    #[serde(default = "default_success_marker")]
    pub success_marker: String,

    /// Tokens whose presence in stderr forces a fail
    #[serde(default = "default_failure_markers")]
    pub failure_markers: Vec<String>,
}

fn default_success_marker() -> String {
    "OK".to_string()
}

fn default_failure_markers() -> Vec<String> {
    vec!["FAIL".to_string(), "ERROR".to_string()]
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            success_marker: default_success_marker(),
            failure_markers: default_failure_markers(),
        }
    }
}

/// Prompt construction limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PromptConfig {
    /// Character budget for each embedded section (notes, code, output)
    #[serde(default = "default_max_section_chars")]
    pub max_section_chars: usize,
}

const fn default_max_section_chars() -> usize {
    6_000
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            max_section_chars: default_max_section_chars(),
        }
    }
}

/// Output directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OutputConfig {
    /// Prefix of the timestamped run directory
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
}

fn default_base_dir() -> PathBuf {
    PathBuf::from("generated_udp_qa_suite")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: LogFormat,

    /// Directory for rolling JSON log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    #[serde(default)]
    pub rotation: RotationPolicy,
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: RotationPolicy::default(),
        }
    }
}
