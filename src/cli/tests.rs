#[cfg(test)]
mod tests {
    use crate::cli::commands::COMMANDS;
    use crate::cli::helper::{local_ip, random_string, validate_address};
    use crate::error::DhtError;
    use std::collections::HashSet;
    use std::net::IpAddr;

    // ============================================================
    // ADDRESS VALIDATION
    // ============================================================

    #[test]
    fn test_validate_address_accepts_host_port() {
        assert_eq!(
            validate_address("127.0.0.1:3400").expect("valid").0,
            "127.0.0.1:3400"
        );
        // Hostnames are opaque to the ring; only the shape is checked.
        assert!(validate_address("node-3.cluster.local:80").is_ok());
        // Surrounding whitespace is tolerated.
        assert_eq!(validate_address("  10.0.0.1:9000 ").expect("valid").0, "10.0.0.1:9000");
    }

    #[test]
    fn test_validate_address_rejects_malformed_input() {
        for bad in [
            "no-colon",
            ":3400",
            "host:",
            "host:notaport",
            "host:0",
            "host:99999",
            "",
        ] {
            let err = validate_address(bad).expect_err("should be rejected");
            assert!(
                matches!(err.downcast_ref::<DhtError>(), Some(DhtError::InvalidAddress(_))),
                "wrong error for {bad:?}: {err}"
            );
        }
    }

    // ============================================================
    // HELPERS
    // ============================================================

    #[test]
    fn test_random_string_shape() {
        let value = random_string(16);
        assert_eq!(value.len(), 16);
        assert!(value.chars().all(|c| c.is_ascii_alphanumeric()));

        // Not a fixed string.
        assert_ne!(random_string(16), random_string(16));
    }

    #[test]
    fn test_local_ip_is_an_ip() {
        let ip = local_ip();
        assert!(ip.parse::<IpAddr>().is_ok(), "not an IP: {ip}");
    }

    // ============================================================
    // COMMAND TABLE
    // ============================================================

    #[test]
    fn test_command_names_are_unique() {
        let names: HashSet<&str> = COMMANDS.iter().map(|c| c.name).collect();
        assert_eq!(names.len(), COMMANDS.len());
    }

    #[test]
    fn test_command_usage_starts_with_name() {
        for spec in COMMANDS {
            assert!(
                spec.usage.starts_with(spec.name),
                "usage {:?} does not match {:?}",
                spec.usage,
                spec.name
            );
            assert!(!spec.description.is_empty());
        }
    }

    #[test]
    fn test_data_commands_require_membership() {
        for name in ["put", "get", "delete", "putrandom", "dump", "dumpkey", "dumpall"] {
            let spec = COMMANDS
                .iter()
                .find(|c| c.name == name)
                .expect("command exists");
            assert!(spec.join_required, "{name} should require membership");
        }
        for name in ["create", "join", "ping", "port", "quit", "dumpaddr"] {
            let spec = COMMANDS
                .iter()
                .find(|c| c.name == name)
                .expect("command exists");
            assert!(!spec.join_required, "{name} should not require membership");
        }
    }

    // ============================================================
    // ERROR SURFACE
    // ============================================================

    #[test]
    fn test_error_messages() {
        assert_eq!(DhtError::NoSuchKey.to_string(), "no such key");
        assert!(DhtError::LookupExhausted(32).to_string().contains("32"));
        assert!(DhtError::InvalidAddress("x".to_string())
            .to_string()
            .contains("x"));
    }
}
