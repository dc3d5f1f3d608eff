//! Sentinel patterns and ignore lists shared across the extraction core.
//!
//! The upstream bundler's output is undocumented and drifts between builds;
//! everything here encodes the shapes actually observed in shipped bundles.

use once_cell::sync::Lazy;
use regex::Regex;

/// File extension every lazy chunk ships under.
pub const BUNDLE_EXT: &str = ".js";

/// Sentinel key identifying the one true localization object in a script.
pub const STRINGS_SENTINEL_KEY: &str = "DISCORD";

/// Client-info property names as they appear in the bundle.
pub const BUILD_NUMBER_KEY: &str = "buildNumber";
pub const BUILD_HASH_KEY: &str = "versionHash";
pub const BUILT_AT_KEY: &str = "built_at";

/// Experiment object must carry all of these property names.
pub const EXPERIMENT_FIELDS: &[&str] = &["kind", "id", "label"];

/// Fields skipped during experiment coercion; they embed executable closures
/// the evaluator cannot represent.
pub const COERCE_IGNORE_FIELDS: &[&str] = &["defaultConfig", "config"];

/// Well-known literal filenames that look like manifest values but are not
/// lazy chunks.
pub const MANIFEST_IGNORE_PREFIXES: &[&str] = &["lib/", "istanbul", "src"];

/// Path-prefix character reserved for a different resource kind (assets
/// referenced absolutely, not chunk hashes).
pub const RESERVED_PATH_PREFIX: char = '/';

/// Script content contains an experiment registration call.
pub static HAS_EXPERIMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"createExperiment").unwrap());

/// Script content contains the client-info record.
pub static HAS_CLIENT_INFO: Lazy<Regex> = Lazy::new(|| Regex::new(r"client_info:").unwrap());

/// A second client-info shape that shipped without the `client_info:` wrapper.
pub static HAS_BUILD_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"buildNumber:").unwrap());

/// Script content contains the localization table.
pub static HAS_LANGUAGE_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"DISCORD:").unwrap());

/// Content-hash token shape: alphanumeric only. The at-least-one-letter /
/// at-least-one-digit requirement is checked separately since the `regex`
/// crate has no lookaheads.
pub static HASH_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9]+$").unwrap());

/// True when `token` has the shape of a content hash: alphanumeric with at
/// least one letter and at least one digit.
pub fn is_hash_token(token: &str) -> bool {
    HASH_TOKEN.is_match(token)
        && token.chars().any(|c| c.is_ascii_alphabetic())
        && token.chars().any(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_token_requires_letter_and_digit() {
        assert!(is_hash_token("abcd1234"));
        assert!(is_hash_token("ff00aa11"));
        assert!(!is_hash_token("abcdefgh"));
        assert!(!is_hash_token("12345678"));
        assert!(!is_hash_token("abc-123"));
        assert!(!is_hash_token(""));
    }

    #[test]
    fn sentinel_regexes_match_observed_sources() {
        assert!(HAS_LANGUAGE_OBJECT.is_match(r#"e.exports={DISCORD:"Discord"}"#));
        assert!(HAS_CLIENT_INFO.is_match(r#"window.GLOBAL_ENV={client_info:{}}"#));
        assert!(HAS_BUILD_NUMBER.is_match(r#"{buildNumber:"42"}"#));
        assert!(HAS_EXPERIMENT.is_match(r#"createExperiment({kind:"user"})"#));
        assert!(!HAS_EXPERIMENT.is_match("nothing to see here"));
    }
}
