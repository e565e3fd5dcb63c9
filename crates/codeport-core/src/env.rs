//! Environment provider trait for testable configuration loading.

use std::collections::HashMap;
use std::ffi::OsString;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static ENV_VAR_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\$\{(\w+)\}").ok());

/// Trait for accessing environment variables (injectable for testing).
pub trait EnvProvider: Send + Sync {
    /// Get an environment variable.
    fn get(&self, key: &str) -> Option<OsString>;

    /// Get an environment variable as UTF-8, ignoring non-UTF-8 values.
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.into_string().ok())
    }
}

/// Production environment provider that reads from the actual process environment.
pub struct SystemEnv;

impl EnvProvider for SystemEnv {
    fn get(&self, key: &str) -> Option<OsString> {
        std::env::var_os(key)
    }
}

/// Environment provider backed by a fixed map.
#[derive(Debug, Default, Clone)]
pub struct MockEnv {
    vars: HashMap<String, OsString>,
}

impl MockEnv {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<OsString>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }
}

impl EnvProvider for MockEnv {
    fn get(&self, key: &str) -> Option<OsString> {
        self.vars.get(key).cloned()
    }
}

/// Replace `${VAR_NAME}` tokens with values from `env`.
///
/// Names are word characters only. Unresolved variables and malformed
/// tokens are left verbatim.
pub fn expand_env_vars(value: &str, env: &dyn EnvProvider) -> String {
    let Some(re) = ENV_VAR_RE.as_ref() else {
        return value.to_string();
    };
    re.replace_all(value, |caps: &Captures<'_>| {
        env.var(&caps[1]).unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
}
