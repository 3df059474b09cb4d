//! Best-effort readiness signal to a supervising init system.
//!
//! `watch`/`sync` loops call [`notify_ready`] once, on their first
//! successful iteration. The signal is a single `READY=1` datagram to the
//! socket named by `NOTIFY_SOCKET`; absence of the socket, an unsupported
//! platform, or a send failure are all silently tolerated — the loop must
//! never abort because no supervisor is listening.

#[cfg(unix)]
pub fn notify_ready() {
    use std::os::unix::net::UnixDatagram;

    let Ok(socket_path) = std::env::var("NOTIFY_SOCKET") else {
        return;
    };
    // Abstract-namespace sockets ('@'-prefixed) need platform-specific
    // addressing; only filesystem sockets are supported here.
    if socket_path.starts_with('@') {
        tracing::debug!(socket = %socket_path, "abstract notify socket not supported; skipping");
        return;
    }

    let result = UnixDatagram::unbound()
        .and_then(|socket| socket.send_to(b"READY=1", &socket_path));
    match result {
        Ok(_) => tracing::debug!(socket = %socket_path, "notified supervisor of readiness"),
        Err(err) => {
            tracing::debug!(socket = %socket_path, error = %err, "readiness notify failed")
        }
    }
}

#[cfg(not(unix))]
pub fn notify_ready() {}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::net::UnixDatagram;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn notify_sends_ready_datagram_and_tolerates_absence() {
        // Without a socket configured, the call is a silent no-op.
        std::env::remove_var("NOTIFY_SOCKET");
        notify_ready();

        let dir = TempDir::new().expect("tempdir");
        let socket_path = dir.path().join("notify.sock");
        let receiver = UnixDatagram::bind(&socket_path).expect("bind");

        std::env::set_var("NOTIFY_SOCKET", &socket_path);
        notify_ready();
        std::env::remove_var("NOTIFY_SOCKET");

        let mut buf = [0u8; 16];
        let (len, _) = receiver.recv_from(&mut buf).expect("datagram");
        assert_eq!(&buf[..len], b"READY=1");
    }
}
