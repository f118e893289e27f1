// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the adapters crate.

fn parse_u16(var: &str) -> Option<u16> {
    std::env::var(var).ok().and_then(|s| s.parse::<u16>().ok())
}

/// Port the child's outgoing hooks should call back on, composed into
/// `TIDE_SERVER` and passed to every spawned child. `TIDE_PORT` takes
/// precedence over `PORT`; defaults to 4190.
pub fn callback_port() -> u16 {
    parse_u16("TIDE_PORT").or_else(|| parse_u16("PORT")).unwrap_or(4190)
}

/// Build the `TIDE_SERVER` URL passed to every spawned child.
pub fn tide_server_url() -> String {
    format!("http://127.0.0.1:{}", callback_port())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn defaults_to_4190_when_unset() {
        std::env::remove_var("TIDE_PORT");
        std::env::remove_var("PORT");
        assert_eq!(callback_port(), 4190);
        assert_eq!(tide_server_url(), "http://127.0.0.1:4190");
    }

    #[test]
    #[serial]
    fn tide_port_takes_precedence_over_port() {
        std::env::set_var("PORT", "8080");
        std::env::set_var("TIDE_PORT", "9090");
        assert_eq!(callback_port(), 9090);
        std::env::remove_var("PORT");
        std::env::remove_var("TIDE_PORT");
    }
}
