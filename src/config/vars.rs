//! Environment variable interpolation for config files.
//!
//! Supported forms:
//! - `$VAR` / `${VAR}`: required, an unset variable is an error
//! - `${VAR:-fallback}`: fallback when VAR is unset or empty
//! - `${VAR-fallback}`: fallback only when VAR is unset
//! - `$$`: a literal `$`

use regex::{Captures, Regex};
use std::env;
use std::sync::LazyLock;

static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        \$\$
        |
        \$\{
            (?P<braced>[A-Za-z_][A-Za-z0-9_]*)
            (?:(?P<op>:?-)(?P<fallback>[^}]*))?
        \}
        |
        \$(?P<bare>[A-Za-z_][A-Za-z0-9_]*)
        ",
    )
    .expect("Invalid regex pattern")
});

/// Substitute environment variables in `input`.
///
/// Every unresolved variable is collected so a broken config file reports
/// all of its problems at once.
pub fn interpolate(input: &str) -> Result<String, Vec<String>> {
    let mut errors = Vec::new();

    let text = ENV_VAR_PATTERN
        .replace_all(input, |caps: &Captures| resolve(caps, &mut errors))
        .into_owned();

    if errors.is_empty() {
        Ok(text)
    } else {
        Err(errors)
    }
}

fn resolve(caps: &Captures, errors: &mut Vec<String>) -> String {
    let whole = &caps[0];
    if whole == "$$" {
        return "$".to_string();
    }

    let Some(name) = caps.name("braced").or_else(|| caps.name("bare")) else {
        return whole.to_string();
    };
    let name = name.as_str();
    let op = caps.name("op").map(|m| m.as_str());
    let fallback = caps.name("fallback").map(|m| m.as_str());

    match env::var(name) {
        Ok(value) if value.contains(['\n', '\r']) => {
            errors.push(format!(
                "environment variable '{name}' contains newlines, which is not allowed"
            ));
            whole.to_string()
        }
        Ok(value) if value.is_empty() && op == Some(":-") => {
            fallback.unwrap_or_default().to_string()
        }
        Ok(value) => value,
        Err(_) => match fallback {
            Some(fallback) => fallback.to_string(),
            None => {
                errors.push(format!("environment variable '{name}' is not set"));
                whole.to_string()
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_env_vars<F, R>(vars: &[(&str, Option<&str>)], f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let originals: Vec<_> = vars.iter().map(|(k, _)| (*k, env::var(k).ok())).collect();

        // SAFETY: each test uses its own variable names and restores them afterwards
        for (key, value) in vars {
            match value {
                Some(v) => unsafe { env::set_var(key, v) },
                None => unsafe { env::remove_var(key) },
            }
        }

        let result = f();

        // SAFETY: restoring original environment state
        for (key, original) in originals {
            match original {
                Some(v) => unsafe { env::set_var(key, v) },
                None => unsafe { env::remove_var(key) },
            }
        }

        result
    }

    #[test]
    fn test_bare_and_braced_substitution() {
        with_env_vars(&[("GLACIER_TEST_BUCKET", Some("lake"))], || {
            let text = interpolate("raw: s3://$GLACIER_TEST_BUCKET/${GLACIER_TEST_BUCKET}").unwrap();
            assert_eq!(text, "raw: s3://lake/lake");
        });
    }

    #[test]
    fn test_all_missing_variables_reported() {
        with_env_vars(
            &[("GLACIER_TEST_MISS_A", None), ("GLACIER_TEST_MISS_B", None)],
            || {
                let errors = interpolate("a: $GLACIER_TEST_MISS_A\nb: ${GLACIER_TEST_MISS_B}")
                    .unwrap_err();
                assert_eq!(errors.len(), 2);
                assert!(errors[0].contains("GLACIER_TEST_MISS_A"));
                assert!(errors[1].contains("not set"));
            },
        );
    }

    #[test]
    fn test_colon_dash_covers_empty_values() {
        with_env_vars(&[("GLACIER_TEST_EMPTY", Some(""))], || {
            assert_eq!(
                interpolate("${GLACIER_TEST_EMPTY:-data/gold}").unwrap(),
                "data/gold"
            );
            assert_eq!(interpolate("${GLACIER_TEST_EMPTY-data/gold}").unwrap(), "");
        });
    }

    #[test]
    fn test_fallback_used_when_unset() {
        with_env_vars(&[("GLACIER_TEST_UNSET", None)], || {
            assert_eq!(
                interpolate("silver: ${GLACIER_TEST_UNSET-data/silver}").unwrap(),
                "silver: data/silver"
            );
        });
    }

    #[test]
    fn test_set_value_wins_over_fallback() {
        with_env_vars(&[("GLACIER_TEST_SET", Some("s3://prod"))], || {
            assert_eq!(
                interpolate("${GLACIER_TEST_SET:-data}").unwrap(),
                "s3://prod"
            );
        });
    }

    #[test]
    fn test_escaped_dollar() {
        assert_eq!(interpolate("cost: $$5").unwrap(), "cost: $5");
    }

    #[test]
    fn test_newlines_rejected() {
        with_env_vars(&[("GLACIER_TEST_NEWLINE", Some("a\nb"))], || {
            let errors = interpolate("$GLACIER_TEST_NEWLINE").unwrap_err();
            assert!(errors[0].contains("newlines"));
        });
    }
}
