//! Format checks for values interpolated into the launch command line.
//!
//! QEMU splits option strings on `,` and nspawn treats `:` in bind specs as
//! a separator, so anything coming from outside is checked here first.

use cycore_shared::errors::{CycoreResult, PlanError};

use super::policy::SandboxPolicy;

/// Linux IFNAMSIZ minus the trailing NUL.
const MAX_IFNAME_LEN: usize = 15;

fn invalid(field: &'static str, value: &str, reason: impl Into<String>) -> PlanError {
    PlanError::InvalidConfig {
        field,
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Decimal port in 1..=65535.
pub fn spice_port(value: &str) -> Result<u16, PlanError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("spice_port", value, "must be a decimal number"));
    }
    match value.parse::<u16>() {
        Ok(0) => Err(invalid("spice_port", value, "must be greater than zero")),
        Ok(port) => Ok(port),
        Err(_) => Err(invalid("spice_port", value, "must be at most 65535")),
    }
}

/// Six colon-separated hex octets.
pub fn mac_address(value: &str) -> Result<(), PlanError> {
    let octets: Vec<&str> = value.split(':').collect();
    let well_formed = octets.len() == 6
        && octets
            .iter()
            .all(|o| o.len() == 2 && o.bytes().all(|b| b.is_ascii_hexdigit()));
    if !well_formed {
        return Err(invalid(
            "mac",
            value,
            "must look like 52:54:00:12:34:56",
        ));
    }
    Ok(())
}

/// QEMU `-m` size: digits with an optional K/M/G/T suffix (optionally followed by B).
pub fn ram_size(value: &str) -> Result<(), PlanError> {
    let digits_end = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, suffix) = value.split_at(digits_end);

    if digits.is_empty() {
        return Err(invalid("ram", value, "must start with a number"));
    }
    if digits.bytes().all(|b| b == b'0') {
        return Err(invalid("ram", value, "must be greater than zero"));
    }

    let suffix = suffix.to_ascii_uppercase();
    match suffix.as_str() {
        "" | "K" | "M" | "G" | "T" | "KB" | "MB" | "GB" | "TB" => Ok(()),
        _ => Err(invalid("ram", value, "unknown size suffix")),
    }
}

/// RBD image spec, embedded in `file=rbd:<spec>`.
pub fn block_device(value: &str) -> Result<(), PlanError> {
    if value.is_empty() {
        return Err(invalid("block_device", value, "must not be empty"));
    }
    if value.starts_with('-') {
        return Err(invalid("block_device", value, "must not start with '-'"));
    }
    if value.contains(',') {
        return Err(invalid("block_device", value, "must not contain ','"));
    }
    if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(invalid("block_device", value, "must not contain whitespace"));
    }
    Ok(())
}

/// Host bridge interface name.
pub fn bridge_name(value: &str) -> Result<(), PlanError> {
    if value.is_empty() || value.len() > MAX_IFNAME_LEN {
        return Err(invalid(
            "bridge_interface",
            value,
            format!("must be 1-{} characters", MAX_IFNAME_LEN),
        ));
    }
    if !value
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-'))
    {
        return Err(invalid(
            "bridge_interface",
            value,
            "may only contain letters, digits, '_', '.' and '-'",
        ));
    }
    Ok(())
}

/// `bridge_name` lifted into the crate result type, for options checks.
pub fn validate_bridge(value: &str) -> CycoreResult<()> {
    bridge_name(value).map_err(Into::into)
}

/// Policy values end up in the same option strings as instance values.
pub fn policy(policy: &SandboxPolicy) -> Result<(), PlanError> {
    if policy.program.is_empty() {
        return Err(invalid("program", &policy.program, "must not be empty"));
    }
    for cap in &policy.capabilities {
        if cap.is_empty() || cap.contains(',') {
            return Err(invalid("capabilities", cap, "must be a single capability name"));
        }
    }
    for mount in &policy.bind_mounts {
        for path in [&mount.source, &mount.target] {
            let s = path.to_string_lossy();
            if !path.is_absolute() || s.contains(':') {
                return Err(invalid(
                    "bind_mounts",
                    &s,
                    "must be an absolute path without ':'",
                ));
            }
        }
    }
    for (field, value) in [
        ("spice_addr", &policy.spice_addr),
        ("display", &policy.display),
        ("cpu_model", &policy.cpu_model),
        ("nic_model", &policy.nic_model),
        ("drive_cache", &policy.drive_cache),
    ] {
        if value.is_empty() || value.contains(',') || value.contains(char::is_whitespace) {
            return Err(invalid(field, value, "must be a single non-empty token"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launch::policy::BindMount;

    #[test]
    fn test_spice_port() {
        assert_eq!(spice_port("5901").unwrap(), 5901);
        for bad in ["", "abc", "59o1", "-1", "+5901", "0", "65536", " 5901"] {
            assert!(spice_port(bad).is_err(), "{:?} should be rejected", bad);
        }
    }

    #[test]
    fn test_mac_address() {
        mac_address("52:54:00:12:34:56").unwrap();
        mac_address("52:54:00:AB:cd:EF").unwrap();
        for bad in ["", "52:54:00:12:34", "52-54-00-12-34-56", "52:54:00:12:34:5g", "525:4:00:12:34:56"] {
            assert!(mac_address(bad).is_err(), "{:?} should be rejected", bad);
        }
    }

    #[test]
    fn test_ram_size() {
        for ok in ["4096", "4G", "512m", "2GB", "1T"] {
            ram_size(ok).unwrap();
        }
        for bad in ["", "G", "0", "00M", "4 G", "4X", "4096,slots=2"] {
            assert!(ram_size(bad).is_err(), "{:?} should be rejected", bad);
        }
    }

    #[test]
    fn test_block_device() {
        block_device("pool/vm42").unwrap();
        block_device("pool/vm42@snap").unwrap();
        for bad in ["", "pool/vm42,if=ide", "-pool", "pool/vm 42"] {
            assert!(block_device(bad).is_err(), "{:?} should be rejected", bad);
        }
    }

    #[test]
    fn test_bridge_name() {
        bridge_name("public").unwrap();
        bridge_name("br-lan.10").unwrap();
        for bad in ["", "a-very-long-bridge-name", "br0,id=x", "br 0"] {
            assert!(bridge_name(bad).is_err(), "{:?} should be rejected", bad);
        }
    }

    #[test]
    fn test_policy() {
        policy(&SandboxPolicy::default()).unwrap();

        let mut bad = SandboxPolicy::default();
        bad.bind_mounts.push(BindMount::new("relative", "/x"));
        assert!(policy(&bad).is_err());

        let mut bad = SandboxPolicy::default();
        bad.spice_addr = "0.0.0.0,password=x".into();
        assert!(policy(&bad).is_err());
    }
}
