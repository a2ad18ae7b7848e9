//! Extra-options string parsing.
//!
//! Both entry points accept a free-form options string. Unrecognized options
//! are reported through diagnostics rather than failing the conversion, so
//! drivers can pass through future flags.

#[derive(Debug, Clone)]
pub struct Options {
    /// Accept the container even when its integrity hash does not validate.
    pub disable_hash_check: bool,
    /// Skip the post-lowering IR cleanup pass.
    pub no_dxil_cleanup: bool,
    /// Unrecognized option tokens, surfaced in diagnostics.
    pub unknown: Vec<String>,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            disable_hash_check: false,
            no_dxil_cleanup: false,
            unknown: Vec::new(),
        }
    }
}

impl Options {
    pub fn parse(extra_options: &str) -> Options {
        let mut options = Options::default();
        for token in extra_options.split_whitespace() {
            match token {
                "-disableHashCheck" => options.disable_hash_check = true,
                "-no-dxil-cleanup" => options.no_dxil_cleanup = true,
                other => options.unknown.push(other.to_owned()),
            }
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_flags() {
        let o = Options::parse(" -disableHashCheck  -no-dxil-cleanup ");
        assert!(o.disable_hash_check);
        assert!(o.no_dxil_cleanup);
        assert!(o.unknown.is_empty());
    }

    #[test]
    fn unknown_flags_are_collected_not_fatal() {
        let o = Options::parse("-disableHashCheck -future-flag");
        assert!(o.disable_hash_check);
        assert_eq!(o.unknown, vec!["-future-flag".to_owned()]);
    }

    #[test]
    fn empty_string_is_defaults() {
        let o = Options::parse("");
        assert!(!o.disable_hash_check);
        assert!(!o.no_dxil_cleanup);
    }
}
