use thiserror::Error;

/// Errors that abort configuration loading before any stage exists.
///
/// Config-fatal: the process logs and exits 1 without starting anything.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("queues.persistent.enabled value is invalid. Must be true or false.")]
    InvalidPersistentEnabled,

    #[error("HTTPS isn't supported for connecting to ElasticSearch yet.")]
    HttpsUnsupported,

    #[error("invalid channel specification '{0}'")]
    InvalidChannelSpec(String),

    #[error("invalid port {port} for host entry '{host}'")]
    InvalidPort { host: String, port: i64 },

    #[error("invalid BSSID '{0}', expected aa:bb:cc:dd:ee:ff")]
    InvalidBssid(String),

    #[error("unknown logging level '{0}'")]
    InvalidLoggingLevel(String),

    #[error("{0}")]
    Invalid(String),
}

/// Errors returned by a stage's `init_function`.
///
/// Init-fatal: the owning stage transitions to `InitFailed` and the
/// topology builder aborts startup.
#[derive(Error, Debug)]
pub enum StageInitError {
    #[error("interface '{0}' does not exist or is not usable")]
    InvalidInterface(String),

    #[error("failed to open capture: {0}")]
    CaptureOpen(String),

    #[error("capture file '{0}' not found")]
    FileNotFound(String),

    #[error("link type {0:?} is not an 802.11 link type")]
    UnsupportedLinkType(pcap::Linktype),

    #[error("no reachable indexer endpoint")]
    NoReachableIndexer,

    #[error("failed to open output file '{path}': {source}")]
    FileWriterOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse decryption key: {0}")]
    BadDecryptionKey(String),

    #[error("channel plan is empty")]
    EmptyChannelPlan,
}

/// Errors reported by stage-runtime lifecycle operations (`init`/`start`/
/// `stop`/`kill`). These are never fatal to the process; callers log and
/// move on.
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("init() called from status {0:?}, which does not permit (re-)initialization")]
    InitNotPermitted(crate::stage::StageStatus),

    #[error("start() called from status {0:?}, which does not permit starting")]
    StartNotPermitted(crate::stage::StageStatus),

    #[error("kill() refused: stage is Running")]
    KillWhileRunning,

    #[error(transparent)]
    Init(#[from] StageInitError),
}

/// A single frame failed to parse into a document; the frame is dropped
/// and processing continues with the next one.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("frame too short")]
    TooShort,

    #[error("no radiotap header present")]
    MissingRadiotap,

    #[error("radiotap header length {0} exceeds captured frame length")]
    RadiotapTruncated(usize),

    #[error("802.11 header truncated")]
    Dot11Truncated,

    #[error("information element truncated (tag {tag}, claimed length {len})")]
    IeTruncated { tag: u8, len: usize },
}
