use std::fmt;
use std::io;

pub(crate) type AmbraResult<T> = Result<T, Error>;

/// Errors that can occur during ambra usage
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred when reading a custom language or theme file
    Io(io::Error),

    /// JSON parsing failed when loading a custom language descriptor.
    Json(serde_json::Error),

    /// The engine rejected a custom grammar definition.
    SyntaxParse(syntect::parsing::ParseSyntaxError),

    /// The engine failed to load a custom theme.
    ThemeLoad(syntect::LoadingError),

    /// The engine failed while generating markup.
    Engine(syntect::Error),

    /// A language was not found among the built-in syntaxes or the registered
    /// custom languages. Only happens when plain-text fallback is disabled.
    LanguageNotFound(String),

    /// A theme was not found among the built-in or registered themes.
    ThemeNotFound(String),

    /// Dual themes style a single markup tree through CSS classes, so they
    /// cannot be rendered with inline style attributes.
    DualThemeNeedsClasses,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Json(err) => write!(f, "JSON parsing error: {}", err),
            Error::SyntaxParse(err) => write!(f, "grammar parsing error: {}", err),
            Error::ThemeLoad(err) => write!(f, "theme loading error: {}", err),
            Error::Engine(err) => write!(f, "highlighting engine error: {}", err),
            Error::LanguageNotFound(name) => write!(f, "language '{}' not found", name),
            Error::ThemeNotFound(name) => write!(f, "theme '{}' not found", name),
            Error::DualThemeNeedsClasses => {
                write!(f, "dual themes require CSS class based rendering")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Json(err) => Some(err),
            Error::SyntaxParse(err) => Some(err),
            Error::ThemeLoad(err) => Some(err),
            Error::Engine(err) => Some(err),
            Error::LanguageNotFound(_) | Error::ThemeNotFound(_) | Error::DualThemeNeedsClasses => {
                None
            }
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<syntect::parsing::ParseSyntaxError> for Error {
    fn from(err: syntect::parsing::ParseSyntaxError) -> Self {
        Error::SyntaxParse(err)
    }
}

impl From<syntect::LoadingError> for Error {
    fn from(err: syntect::LoadingError) -> Self {
        Error::ThemeLoad(err)
    }
}

impl From<syntect::Error> for Error {
    fn from(err: syntect::Error) -> Self {
        Error::Engine(err)
    }
}
