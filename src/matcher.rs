//! Matching primitives over captured command output.
//!
//! Both primitives are vacuously true for an empty requirement list.

use regex::Regex;
use tracing::{debug, warn};

use crate::derive::Pattern;

/// Every pattern holds against `text`.
///
/// Lines are compared with surrounding whitespace removed. A
/// [`Pattern::Line`] must match at least one line; a [`Pattern::Absent`]
/// must match none. A pattern that fails to compile never holds.
pub fn all_lines_match(text: &str, patterns: &[Pattern]) -> bool {
    patterns.iter().all(|pattern| {
        let re = match Regex::new(pattern.regex()) {
            Ok(re) => re,
            Err(e) => {
                warn!(pattern = %pattern, "invalid pattern: {}", e);
                return false;
            }
        };

        let found = text.lines().map(str::trim).any(|line| re.is_match(line));
        let holds = match pattern {
            Pattern::Line(_) => found,
            Pattern::Absent(_) => !found,
        };
        if !holds {
            debug!(pattern = %pattern, "pattern not satisfied");
        }
        holds
    })
}

/// Every literal appears somewhere in `text`.
pub fn all_contained<S: AsRef<str>>(text: &str, literals: &[S]) -> bool {
    literals.iter().all(|literal| {
        let literal = literal.as_ref();
        let holds = text.contains(literal);
        if !holds {
            debug!(literal, "literal not found");
        }
        holds
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::network::{bond_membership_patterns, Membership};

    const BONDING: &str = "Ethernet Channel Bonding Driver: v3.7.1 (April 27, 2011)\n\
                           \n\
                           Bonding Mode: fault-tolerance (active-backup)\n\
                           Currently Active Slave: eth0\n\
                           \n\
                           Slave Interface: eth0\n\
                           MII Status: up\n\
                           \n\
                           Slave Interface: eth1\n\
                           MII Status: up\n";

    #[test]
    fn test_empty_lists_are_vacuously_true() {
        assert!(all_lines_match("", &[]));
        assert!(all_lines_match("anything\nat all", &[]));
        assert!(all_contained::<&str>("", &[]));
        assert!(all_contained::<&str>("anything", &[]));
    }

    #[test]
    fn test_each_pattern_may_match_a_different_line() {
        let text = "em1:connected\nem2:disconnected\n";
        let patterns = vec![
            Pattern::Line("^em1:(connected|connecting)".into()),
            Pattern::Line("^em2:disconnected$".into()),
        ];
        assert!(all_lines_match(text, &patterns));
        assert!(!all_lines_match("em1:connected\n", &patterns));
    }

    #[test]
    fn test_lines_are_trimmed() {
        let text = "2: em1: <BROADCAST,MULTICAST,UP>\r\n    inet 10.0.0.5/24 brd 10.0.0.255 scope global em1\r\n";
        assert!(all_lines_match(text, &[Pattern::Line(r"^inet\s+10\.0\.0\.5(/|\s|$)".into())]));
    }

    #[test]
    fn test_bond_non_membership() {
        let absent = bond_membership_patterns(&["eth2"], Membership::NotEnslaved);
        assert!(all_lines_match(BONDING, &absent));

        let with_eth2 = format!("{}\nSlave Interface: eth2\nMII Status: up\n", BONDING);
        assert!(!all_lines_match(&with_eth2, &absent));

        let active_eth2 = "Slave Interface: eth0\nCurrently Active Slave: eth2\n";
        assert!(!all_lines_match(active_eth2, &absent));

        let eth20 = "Slave Interface: eth20\nMII Status: up\n";
        assert!(!all_lines_match(eth20, &absent));
    }

    #[test]
    fn test_bond_membership() {
        let present = bond_membership_patterns(&["eth0", "eth1"], Membership::Enslaved);
        assert!(all_lines_match(BONDING, &present));
        let missing = bond_membership_patterns(&["eth2"], Membership::Enslaved);
        assert!(!all_lines_match(BONDING, &missing));
    }

    #[test]
    fn test_invalid_regex_never_holds() {
        assert!(!all_lines_match("(", &[Pattern::Line("(".into())]));
    }

    #[test]
    fn test_all_contained() {
        let text = "   System Locale: LANG=en_US.UTF-8\n       VC Keymap: us\n      X11 Layout: us\n";
        assert!(all_contained(text, &["VC Keymap: us", "X11 Layout: us"]));
        assert!(!all_contained(text, &["VC Keymap: de"]));
    }
}
