#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load script {script}: {message}")]
    ScriptLoad { script: String, message: String },

    #[error("script {script} failed in {hook}: {message}")]
    ScriptRuntime { script: String, hook: &'static str, message: String },

    #[error("invalid {what} file: {message}")]
    Serialization { what: &'static str, message: String },

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("export failed: {0}")]
    Export(String),

    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Log a failure and, when `die` is set, terminate the process.
///
/// `die` is only meant for front ends that were explicitly asked to treat a
/// failure as fatal; the library itself always passes `false`.
pub fn fail(err: &Error, die: bool) {
    tracing::error!("{}", err);
    if die {
        std::process::exit(1);
    }
}
