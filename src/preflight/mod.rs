//! Operator-side prerequisites.
//!
//! Every probe shells out to the OpenSSH client, so a run refuses to start
//! when `ssh` or `scp` is not on `PATH`. Without this each check would fail
//! on its own with a spawn error and the report would blame the target.
//!
//! ```rust
//! use install_verify::preflight::{missing_clients, OPENSSH_CLIENTS};
//!
//! for (client, package) in missing_clients(OPENSSH_CLIENTS) {
//!     eprintln!("{} not found, install {}", client, package);
//! }
//! ```

use anyhow::{bail, Result};

/// Client programs a run shells out to, with the package providing each.
pub const OPENSSH_CLIENTS: &[(&str, &str)] = &[("ssh", "openssh-clients"), ("scp", "openssh-clients")];

/// Entries of `clients` whose program is not on `PATH`.
pub fn missing_clients<'a>(clients: &[(&'a str, &'a str)]) -> Vec<(&'a str, &'a str)> {
    clients
        .iter()
        .copied()
        .filter(|(program, _)| which::which(program).is_err())
        .collect()
}

/// Fail with one line per missing client.
pub fn require_clients(clients: &[(&str, &str)]) -> Result<()> {
    let missing = missing_clients(clients);
    if missing.is_empty() {
        return Ok(());
    }

    let lines = missing
        .iter()
        .map(|(program, package)| format!("  {} (from {})", program, package))
        .collect::<Vec<_>>()
        .join("\n");
    bail!("cannot reach targets, OpenSSH client tools missing:\n{}", lines);
}

/// [`require_clients`] for [`OPENSSH_CLIENTS`].
pub fn check_host_tools() -> Result<()> {
    require_clients(OPENSSH_CLIENTS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_is_never_missing() {
        assert!(missing_clients(&[("sh", "bash")]).is_empty());
    }

    #[test]
    fn test_missing_client_is_reported_with_package() {
        let clients = &[("sh", "bash"), ("ssh-but-not-really-9f3c", "openssh-clients")];
        assert_eq!(
            missing_clients(clients),
            vec![("ssh-but-not-really-9f3c", "openssh-clients")]
        );

        let err = require_clients(clients).unwrap_err();
        assert!(err
            .to_string()
            .contains("ssh-but-not-really-9f3c (from openssh-clients)"));
        assert!(!err.to_string().contains("bash"));
    }

    #[test]
    fn test_nothing_required_passes() {
        assert!(require_clients(&[]).is_ok());
    }
}
