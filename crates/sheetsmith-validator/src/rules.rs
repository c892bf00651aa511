//! Forbidden-construct rules
//!
//! Rules are plain data so deployments can tighten or relax them:
//! - `call`: a call whose resolved callee matches a target
//! - `import`: an import of a matching module
//! - `network`: a matching call whose destination is not a literal URL on
//!   an allowlisted host

use serde::{Deserialize, Serialize};

/// What a rule inspects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    /// Function or method calls
    Call,
    /// Import statements
    Import,
    /// Calls that open network connections
    Network,
}

/// One forbidden-construct rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForbiddenRule {
    /// Stable rule id reported in violations
    pub id: String,
    /// What the rule inspects
    pub kind: RuleKind,
    /// Dotted-name patterns; `x.*` matches any suffix, `*.x` any receiver
    pub targets: Vec<String>,
    /// Hosts a network rule permits (subdomains included)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow_hosts: Vec<String>,
}

impl ForbiddenRule {
    /// Create rule
    #[must_use]
    pub fn new<I, S>(id: impl Into<String>, kind: RuleKind, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            kind,
            targets: targets.into_iter().map(Into::into).collect(),
            allow_hosts: Vec::new(),
        }
    }

    /// Permit network access to a host
    #[must_use]
    pub fn allow_host(mut self, host: impl Into<String>) -> Self {
        self.allow_hosts.push(host.into());
        self
    }

    /// Whether a host is allowlisted
    #[must_use]
    pub fn permits_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.allow_hosts.iter().any(|allowed| {
            let allowed = allowed.to_ascii_lowercase();
            host == allowed || host.ends_with(&format!(".{allowed}"))
        })
    }

    pub(crate) fn patterns(&self) -> Vec<TargetPattern> {
        self.targets.iter().map(|t| TargetPattern::parse(t)).collect()
    }
}

/// Rules applied when configuration names none
#[must_use]
pub fn default_rules() -> Vec<ForbiddenRule> {
    vec![
        ForbiddenRule::new(
            "process-spawn",
            RuleKind::Call,
            [
                "os.system",
                "os.popen",
                "os.spawn*",
                "os.exec*",
                "os.fork",
                "subprocess.*",
                "pty.spawn",
            ],
        ),
        ForbiddenRule::new(
            "dynamic-eval",
            RuleKind::Call,
            ["eval", "exec", "compile", "__import__"],
        ),
        ForbiddenRule::new(
            "filesystem-delete",
            RuleKind::Call,
            [
                "os.remove",
                "os.unlink",
                "os.rmdir",
                "os.removedirs",
                "shutil.rmtree",
                "*.unlink",
                "*.rmdir",
            ],
        ),
        ForbiddenRule::new(
            "network-egress",
            RuleKind::Network,
            [
                "requests.*",
                "httpx.*",
                "urllib.request.urlopen",
                "urllib.request.Request",
                "urllib3.*",
                "aiohttp.*",
                "socket.socket",
                "socket.create_connection",
            ],
        ),
    ]
}

/// Compiled target pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TargetPattern {
    Exact(String),
    Prefix(String),
    AnyReceiver(String),
}

impl TargetPattern {
    pub(crate) fn parse(target: &str) -> Self {
        let target = target.trim();
        if let Some(attr) = target.strip_prefix("*.") {
            Self::AnyReceiver(attr.to_string())
        } else if let Some(prefix) = target.strip_suffix('*') {
            Self::Prefix(prefix.to_string())
        } else {
            Self::Exact(target.to_string())
        }
    }

    /// Match a call by resolved callee and final attribute
    pub(crate) fn matches_call(&self, qualified: Option<&str>, last: &str) -> bool {
        match self {
            Self::AnyReceiver(attr) => !attr.is_empty() && last == attr,
            Self::Exact(name) => qualified == Some(name.as_str()),
            Self::Prefix(prefix) => qualified.is_some_and(|q| q.starts_with(prefix.as_str())),
        }
    }

    /// Match an imported module path
    ///
    /// An exact target also matches its submodules.
    pub(crate) fn matches_module(&self, module: &str) -> bool {
        match self {
            Self::AnyReceiver(attr) => module.rsplit('.').next() == Some(attr.as_str()),
            Self::Exact(name) => {
                module == name
                    || module
                        .strip_prefix(name.as_str())
                        .is_some_and(|rest| rest.starts_with('.'))
            }
            Self::Prefix(prefix) => module.starts_with(prefix.as_str()),
        }
    }
}
