use core::fmt;

/// A backend failure that ended the dispatch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError<S, T> {
    /// The serial backend can no longer deliver bytes.
    Serial(S),
    /// The tone generator rejected a start or stop.
    Tone(T),
}

impl<S: fmt::Display, T: fmt::Display> fmt::Display for DispatchError<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Serial(e) => write!(f, "serial input: {}", e),
            DispatchError::Tone(e) => write!(f, "tone generator: {}", e),
        }
    }
}

impl<S, T> core::error::Error for DispatchError<S, T>
where
    S: fmt::Debug + fmt::Display,
    T: fmt::Debug + fmt::Display,
{
}
