use thiserror::Error;

macro_rules! source_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Source {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Source {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Almost all resolution outcomes inside the graph engine are reported as
/// [`crate::graph::Fault`] entries rather than errors; `Error` is reserved for the
/// boundary with the binary-format reader and for genuine I/O failures. A reader that
/// cannot enumerate a module's declarations returns one of these, and the engine
/// converts it into an Error-severity fault at the point of enumeration.
///
/// # Error Categories
///
/// ## Reader Errors
/// - [`Error::Source`] - The underlying module reader failed to produce declarations
/// - [`Error::ModuleNotFound`] - A module could not be located on the resolution path
///
/// ## I/O and Infrastructure
/// - [`Error::FileError`] - Filesystem I/O errors from a file-backed reader
/// - [`Error::LockError`] - Thread synchronization failure
/// - [`Error::Error`] - Miscellaneous failures
#[derive(Error, Debug)]
pub enum Error {
    /// The module reader failed while enumerating declarations.
    ///
    /// This error indicates that the underlying binary source is damaged, truncated
    /// or otherwise unreadable. The error includes the source location where the
    /// failure was detected for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of the failure
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Source - {file}:{line}: {message}")]
    Source {
        /// The message to be printed for the Source error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A referenced module could not be located on the resolution path.
    ///
    /// Inside the engine this condition is normally degraded to a Missing-module
    /// sentinel plus a Warning fault; the error form exists for callers that load
    /// modules directly and want a hard failure.
    #[error("Module could not be located - {0}")]
    ModuleNotFound(String),

    /// File I/O error.
    ///
    /// Wraps standard I/O errors that can occur when a file-backed module reader
    /// accesses the disk.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Failed to lock target.
    ///
    /// This error occurs when thread synchronization fails, typically when a
    /// mutex or rwlock is poisoned by a panicking thread.
    #[error("Failed to lock target")]
    LockError,

    /// Generic error for miscellaneous failures.
    ///
    /// Used for errors that don't fit into other categories or for wrapping
    /// external failures with additional context.
    #[error("{0}")]
    Error(String),
}
