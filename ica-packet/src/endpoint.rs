//! Normalization of the host gRPC address given on the command line.

/// Makes a listen address dialable and turns it into a URI:
/// the first `0.0.0.0` becomes `localhost` and `http://` is prepended when
/// the address carries no scheme.
pub fn normalize_endpoint(addr: &str) -> String {
    let addr = addr.trim().replacen("0.0.0.0", "localhost", 1);
    if addr.contains("://") {
        addr
    } else {
        format!("http://{addr}")
    }
}
