pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// Child name is empty or contains a path separator
    InvalidName(String),
    AlreadyExists(String),
    NotFound(String),
    /// Deletion of a directory that still has real content
    NotEmpty(String),
    /// Wrong node kind handed to `set`, or an operation on an unbound node
    TypeMismatch(String),
    /// Opaque failure reported by a store client
    BackingStore(String),
    /// Directory bookkeeping broke one of its own invariants
    Inconsistent(String),
    IoError(std::io::Error),
    JsonError(serde_json::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            Error::InvalidName(ref name) => write!(f, "Invalid file/dir name: {name:?}"),
            Error::AlreadyExists(ref path) => write!(f, "File/dir already exists: {path}"),
            Error::NotFound(ref path) => write!(f, "Not found: {path}"),
            Error::NotEmpty(ref path) => write!(f, "Directory not empty: {path}"),
            Error::TypeMismatch(ref msg) => write!(f, "Type mismatch: {msg}"),
            Error::BackingStore(ref msg) => write!(f, "Backing store error: {msg}"),
            Error::Inconsistent(ref msg) => write!(f, "Inconsistent directory state: {msg}"),
            Error::IoError(ref err) => write!(f, "{err}"),
            Error::JsonError(ref err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            Error::IoError(ref err) => Some(err),
            Error::JsonError(ref err) => Some(err),
            _ => None,
        }
    }
}

impl std::convert::From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Error {
        Error::IoError(error)
    }
}

impl std::convert::From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Error {
        Error::JsonError(error)
    }
}

impl std::convert::From<Error> for std::io::Error {
    fn from(error: Error) -> std::io::Error {
        match error {
            Error::IoError(err) => err,
            Error::NotFound(_) => std::io::Error::new(std::io::ErrorKind::NotFound, error),
            Error::AlreadyExists(_) => {
                std::io::Error::new(std::io::ErrorKind::AlreadyExists, error)
            }
            other => std::io::Error::new(std::io::ErrorKind::Other, other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_the_path() {
        let err = Error::NotEmpty("bucket/a".to_string());
        assert_eq!(err.to_string(), "Directory not empty: bucket/a");

        let err = Error::InvalidName("a/b".to_string());
        assert_eq!(err.to_string(), "Invalid file/dir name: \"a/b\"");
    }

    #[test]
    fn test_io_conversion_keeps_kind() {
        let io: std::io::Error = Error::NotFound("x".to_string()).into();
        assert_eq!(io.kind(), std::io::ErrorKind::NotFound);

        let io: std::io::Error = Error::BackingStore("denied".to_string()).into();
        assert_eq!(io.kind(), std::io::ErrorKind::Other);
    }
}
