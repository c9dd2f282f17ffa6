//! Classify fetch errors as transient (worth a retry) or permanent.

use crate::context::Interrupt;
use crate::error::Doc2xError;
use std::error::Error as StdError;
use std::io;

/// Report whether a fetch error is temporary and merits consuming a retry.
///
/// * Cancellation and deadline expiry are never transient; they must
///   propagate immediately.
/// * Network timeouts, refused or reset connections and similar socket-level
///   conditions are transient. A connect error caused by a failed TLS
///   handshake or a rejected certificate is not.
/// * Everything else (non-2xx status, API error codes, malformed bodies,
///   validation errors, failed tasks) is permanent.
///
/// Pure: no side effects, safe to call from any task.
pub fn is_transient(err: &Doc2xError) -> bool {
    match err {
        Doc2xError::Cancelled { .. } | Doc2xError::WaitAborted { .. } => false,
        Doc2xError::Http { source, .. } => {
            if source.is_timeout() {
                return true;
            }
            if source.is_connect() {
                return !chain_has_tls_failure(source) && !chain_is_interrupted(source);
            }
            chain_is_transient(source)
        }
        Doc2xError::Io { source, .. } => chain_is_transient(source),
        _ => false,
    }
}

/// Walk the source chain: an interruption anywhere makes the error
/// permanent, otherwise any transient I/O kind makes it transient.
fn chain_is_transient(err: &(dyn StdError + 'static)) -> bool {
    if chain_is_interrupted(err) {
        return false;
    }
    io_errors(err).any(|io_err| io_kind_is_transient(io_err.kind()))
}

fn chain_is_interrupted(err: &(dyn StdError + 'static)) -> bool {
    chain(err).any(|e| {
        e.downcast_ref::<Interrupt>().is_some()
            || e.downcast_ref::<io::Error>()
                .and_then(io::Error::get_ref)
                .is_some_and(|inner| inner.downcast_ref::<Interrupt>().is_some())
    })
}

/// TLS stacks surface handshake and certificate failures as `InvalidData`.
fn chain_has_tls_failure(err: &(dyn StdError + 'static)) -> bool {
    io_errors(err).any(|io_err| io_err.kind() == io::ErrorKind::InvalidData)
}

fn chain<'a>(
    err: &'a (dyn StdError + 'static),
) -> impl Iterator<Item = &'a (dyn StdError + 'static)> {
    std::iter::successors(Some(err), |&e| e.source())
}

fn io_errors<'a>(err: &'a (dyn StdError + 'static)) -> impl Iterator<Item = &'a io::Error> {
    chain(err).filter_map(|e| e.downcast_ref::<io::Error>())
}

fn io_kind_is_transient(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::TimedOut
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::UnexpectedEof
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Operation;

    fn io_error(kind: io::ErrorKind) -> Doc2xError {
        Doc2xError::io("get status", io::Error::new(kind, "boom"))
    }

    #[test]
    fn socket_level_failures_are_transient() {
        for kind in [
            io::ErrorKind::TimedOut,
            io::ErrorKind::ConnectionReset,
            io::ErrorKind::ConnectionRefused,
            io::ErrorKind::BrokenPipe,
        ] {
            assert!(is_transient(&io_error(kind)), "{kind:?} should be transient");
        }
    }

    #[test]
    fn other_io_failures_are_permanent() {
        assert!(!is_transient(&io_error(io::ErrorKind::PermissionDenied)));
        assert!(!is_transient(&io_error(io::ErrorKind::NotFound)));
    }

    #[test]
    fn nested_io_error_is_found() {
        #[derive(Debug, thiserror::Error)]
        #[error("transport")]
        struct Transport(#[source] io::Error);

        let inner = io::Error::new(
            io::ErrorKind::Other,
            Transport(io::Error::from(io::ErrorKind::ConnectionReset)),
        );
        assert!(is_transient(&Doc2xError::io("fetch", inner)));
    }

    #[test]
    fn interruptions_are_never_transient() {
        let cancelled = Doc2xError::Cancelled {
            operation: Operation::GetStatus,
            cause: Interrupt::Cancelled,
        };
        let expired = Doc2xError::WaitAborted {
            operation: Operation::Parsing,
            cause: Interrupt::DeadlineExceeded,
        };
        assert!(!is_transient(&cancelled));
        assert!(!is_transient(&expired));

        // An interruption wrapped inside an io error still wins.
        let wrapped = io::Error::new(io::ErrorKind::TimedOut, Interrupt::DeadlineExceeded);
        assert!(!is_transient(&Doc2xError::io("fetch", wrapped)));
    }

    #[test]
    fn tls_failures_are_recognised_in_the_chain() {
        #[derive(Debug, thiserror::Error)]
        #[error("client error (Connect)")]
        struct Connect(#[source] io::Error);

        let handshake = Connect(io::Error::new(
            io::ErrorKind::InvalidData,
            "invalid peer certificate: UnknownIssuer",
        ));
        assert!(chain_has_tls_failure(&handshake));

        let refused = Connect(io::Error::from(io::ErrorKind::ConnectionRefused));
        assert!(!chain_has_tls_failure(&refused));
        assert!(chain_is_transient(&refused));
    }

    #[test]
    fn remote_failures_are_permanent() {
        let status = Doc2xError::Status {
            operation: Operation::GetStatus,
            status: 503,
            reason: "Service Unavailable".into(),
            trace_id: "t".into(),
        };
        let api = Doc2xError::Api {
            operation: Operation::GetStatus,
            code: "unauthorized".into(),
            msg: String::new(),
            trace_id: "t".into(),
        };
        assert!(!is_transient(&status));
        assert!(!is_transient(&api));
        assert!(!is_transient(&Doc2xError::EmptyUid));
    }
}
