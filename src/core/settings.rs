//! Process settings read from `CLUSTERMAID_*` environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use validator::{Validate, ValidationError};

use crate::core::util::duration::parse_duration;
use crate::domain::proxy_config::ResourceKind;
use crate::scheduler::retry::RetryPolicy;

pub const ENV_PREFIX: &str = "CLUSTERMAID_";
pub const DEFAULT_NAMESPACE: &str = "default";
pub const DEFAULT_REQUEUE_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunMode {
    /// Watch `ClusterMaid` objects through a kube-runtime controller.
    #[default]
    Controller,
    /// Tick on a fixed cadence without a watch.
    Standalone,
}

impl FromStr for RunMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "controller" => Ok(RunMode::Controller),
            "standalone" => Ok(RunMode::Standalone),
            other => Err(anyhow!("unknown mode {other:?}, expected controller or standalone")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AdminTransport {
    /// Through the API server pod proxy subresource.
    #[default]
    Proxy,
    /// Straight to the pod IP.
    Direct,
}

impl FromStr for AdminTransport {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "proxy" => Ok(AdminTransport::Proxy),
            "direct" => Ok(AdminTransport::Direct),
            other => Err(anyhow!("unknown admin transport {other:?}, expected proxy or direct")),
        }
    }
}

/// Offline decode-and-render of a dump file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugSettings {
    pub dump: PathBuf,
    /// `None` renders every kind the dump carries.
    pub kind: Option<ResourceKind>,
    pub format: String,
}

#[derive(Debug, Clone, Validate)]
pub struct Settings {
    pub mode: RunMode,
    /// Standalone target namespace when no controlling resource is named.
    pub namespace: Option<String>,
    pub resource_name: Option<String>,
    #[validate(length(min = 1))]
    pub resource_namespace: String,
    #[validate(custom(function = "non_zero_duration"))]
    pub requeue_interval: Duration,

    #[validate(range(min = 1))]
    pub admin_port: u16,
    #[validate(custom(function = "non_zero_duration"))]
    pub admin_timeout: Duration,
    pub admin_transport: AdminTransport,
    #[validate(length(min = 1))]
    pub sidecar_container: String,

    #[validate(range(min = 1, max = 64))]
    pub max_concurrency: usize,
    #[validate(range(min = 1, max = 10))]
    pub fetch_max_attempts: u32,
    pub retry_initial_delay: Duration,

    pub http_enabled: bool,
    pub http_addr: SocketAddr,
    pub log_dir: Option<PathBuf>,
    pub debug: Option<DebugSettings>,
}

fn non_zero_duration(value: &Duration) -> Result<(), ValidationError> {
    if value.is_zero() {
        return Err(ValidationError::new("zero_duration"));
    }
    Ok(())
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: RunMode::Controller,
            namespace: None,
            resource_name: None,
            resource_namespace: DEFAULT_NAMESPACE.to_string(),
            requeue_interval: DEFAULT_REQUEUE_INTERVAL,
            admin_port: 15000,
            admin_timeout: Duration::from_secs(3),
            admin_transport: AdminTransport::Proxy,
            sidecar_container: "istio-proxy".to_string(),
            max_concurrency: 4,
            fetch_max_attempts: 3,
            retry_initial_delay: Duration::from_millis(200),
            http_enabled: true,
            http_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            log_dir: None,
            debug: None,
        }
    }
}

/// Reads one prefixed key; blank values count as unset.
struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn raw(&self, key: &str) -> Option<String> {
        (self.lookup)(&format!("{ENV_PREFIX}{key}"))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.raw(key)
            .map(|v| {
                v.parse::<T>()
                    .map_err(|e| anyhow!("{ENV_PREFIX}{key}={v:?}: {e}"))
            })
            .transpose()
    }

    fn duration(&self, key: &str) -> Result<Option<Duration>> {
        self.raw(key)
            .map(|v| parse_duration(&v).with_context(|| format!("{ENV_PREFIX}{key}={v:?}")))
            .transpose()
    }
}

impl Settings {
    /// Load from the process environment. Call `dotenvy::dotenv()` first to
    /// honour a local `.env` file.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup };
        let defaults = Settings::default();

        let debug = if env.parse::<bool>("DEBUG_MODE")?.unwrap_or(false) {
            let dump = env
                .raw("DEBUG_DUMP")
                .ok_or_else(|| anyhow!("{ENV_PREFIX}DEBUG_DUMP is required in debug mode"))?;
            let kind = match env.raw("DEBUG_KIND") {
                None => Some(ResourceKind::Route),
                Some(k) if k.eq_ignore_ascii_case("all") => None,
                Some(k) => Some(
                    k.parse::<ResourceKind>()
                        .map_err(|e| anyhow!("{ENV_PREFIX}DEBUG_KIND: {e}"))?,
                ),
            };
            Some(DebugSettings {
                dump: PathBuf::from(dump),
                kind,
                format: env.raw("DEBUG_FORMAT").unwrap_or_else(|| "summary".to_string()),
            })
        } else {
            None
        };

        let settings = Settings {
            mode: env.parse("MODE")?.unwrap_or(defaults.mode),
            namespace: env.raw("NAMESPACE"),
            resource_name: env.raw("RESOURCE_NAME"),
            resource_namespace: env
                .raw("RESOURCE_NAMESPACE")
                .unwrap_or(defaults.resource_namespace),
            requeue_interval: env
                .duration("REQUEUE_INTERVAL")?
                .unwrap_or(defaults.requeue_interval),
            admin_port: env.parse("ADMIN_PORT")?.unwrap_or(defaults.admin_port),
            admin_timeout: env.duration("ADMIN_TIMEOUT")?.unwrap_or(defaults.admin_timeout),
            admin_transport: env
                .parse("ADMIN_TRANSPORT")?
                .unwrap_or(defaults.admin_transport),
            sidecar_container: env
                .raw("SIDECAR_CONTAINER")
                .unwrap_or(defaults.sidecar_container),
            max_concurrency: env
                .parse("MAX_CONCURRENCY")?
                .unwrap_or(defaults.max_concurrency),
            fetch_max_attempts: env
                .parse("FETCH_MAX_ATTEMPTS")?
                .unwrap_or(defaults.fetch_max_attempts),
            retry_initial_delay: env
                .duration("RETRY_INITIAL_DELAY")?
                .unwrap_or(defaults.retry_initial_delay),
            http_enabled: env.parse("HTTP_ENABLED")?.unwrap_or(defaults.http_enabled),
            http_addr: env.parse("HTTP_ADDR")?.unwrap_or(defaults.http_addr),
            log_dir: env.raw("LOG_DIR").map(PathBuf::from),
            debug,
        };

        settings
            .validate()
            .map_err(|e| anyhow!("invalid {ENV_PREFIX}* settings: {e}"))?;
        Ok(settings)
    }

    /// Namespace scanned in standalone mode when no resource is named.
    pub fn fallback_namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.fetch_max_attempts, self.retry_initial_delay)
    }
}
