/// Classification for retry policy.
///
/// Used by the data adapter to decide what happens after a source attempt fails.
///
/// # Behavior Summary
///
/// | Class | Retry same source? | Try next source? |
/// |-------|--------------------|------------------|
/// | `Retry` | Yes (with backoff) | After retries are exhausted |
/// | `NextSource` | No | Yes |
/// | `Never` | No | No, surface immediately |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Transient failure: I/O error, timeout, non-zero exit or a payload that
    /// failed to parse. Retried on the same source per the refresh policy.
    Retry,

    /// This source can never succeed as configured (e.g. it references a CLI
    /// service that does not exist). Skip its retries and move on.
    NextSource,

    /// Terminal: the caller cancelled or the error is not about a source at all.
    Never,
}
