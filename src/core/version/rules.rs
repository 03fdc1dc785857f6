// ─── Rules ───
// `allow`/`disallow` rule lists gating libraries and launch arguments,
// evaluated against an explicit `Platform`.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::platform::Platform;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub action: RuleAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<OsRule>,
    /// Launch features (`is_demo_user`, `has_custom_resolution`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<BTreeMap<String, bool>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Regular expression matched against the OS version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
}

impl OsRule {
    fn matches(&self, platform: &Platform) -> bool {
        if let Some(name) = &self.name {
            if name != &platform.name {
                return false;
            }
        }
        if let Some(arch) = &self.arch {
            if arch != &platform.arch {
                return false;
            }
        }
        if let Some(pattern) = &self.version {
            match Regex::new(pattern) {
                Ok(re) => {
                    if !re.is_match(&platform.version) {
                        return false;
                    }
                }
                Err(e) => {
                    debug!("Ignoring rule with invalid os.version pattern {:?}: {}", pattern, e);
                    return false;
                }
            }
        }
        true
    }
}

impl Rule {
    fn matches(&self, platform: &Platform, features: &BTreeMap<String, bool>) -> bool {
        if let Some(os) = &self.os {
            if !os.matches(platform) {
                return false;
            }
        }
        if let Some(required) = &self.features {
            let all_enabled = required
                .iter()
                .all(|(name, wanted)| features.get(name).copied().unwrap_or(false) == *wanted);
            if !all_enabled {
                return false;
            }
        }
        true
    }
}

/// Evaluate a rule list top-to-bottom.
///
/// - No rules → allowed.
/// - Otherwise start disallowed; every matching rule sets the state to its action.
pub fn rules_allow(
    rules: &[Rule],
    platform: &Platform,
    features: &BTreeMap<String, bool>,
) -> bool {
    if rules.is_empty() {
        return true;
    }

    let mut allowed = false;
    for rule in rules {
        if rule.matches(platform, features) {
            allowed = rule.action == RuleAction::Allow;
        }
    }
    allowed
}

// ─── Launch arguments ───

/// One entry of `arguments.game` / `arguments.jvm`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LaunchArgument {
    Literal(String),
    Conditional {
        rules: Vec<Rule>,
        value: ArgumentValue,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgumentValue {
    Single(String),
    Many(Vec<String>),
}

impl ArgumentValue {
    fn tokens(&self) -> Vec<String> {
        match self {
            ArgumentValue::Single(s) => vec![s.clone()],
            ArgumentValue::Many(values) => values.clone(),
        }
    }
}

/// Flatten arguments into plain tokens, dropping conditional entries whose
/// rules reject the platform (no launch features enabled).
pub fn flatten_arguments(args: &[LaunchArgument], platform: &Platform) -> Vec<String> {
    let no_features = BTreeMap::new();
    args.iter()
        .flat_map(|arg| match arg {
            LaunchArgument::Literal(token) => vec![token.clone()],
            LaunchArgument::Conditional { rules, value } => {
                if rules_allow(rules, platform, &no_features) {
                    value.tokens()
                } else {
                    vec![]
                }
            }
        })
        .collect()
}

/// JVM arguments assumed for manifests that predate structured `arguments`.
pub fn default_jvm_arguments() -> Vec<LaunchArgument> {
    fn when(os: OsRule, value: ArgumentValue) -> LaunchArgument {
        LaunchArgument::Conditional {
            rules: vec![Rule {
                action: RuleAction::Allow,
                os: Some(os),
                features: None,
            }],
            value,
        }
    }
    let literal = |s: &str| LaunchArgument::Literal(s.to_string());

    vec![
        when(
            OsRule {
                name: Some("osx".into()),
                ..OsRule::default()
            },
            ArgumentValue::Many(vec!["-XstartOnFirstThread".into()]),
        ),
        when(
            OsRule {
                name: Some("windows".into()),
                ..OsRule::default()
            },
            ArgumentValue::Single(
                "-XX:HeapDumpPath=MojangTricksIntelDriversForPerformance_javaw.exe_minecraft.exe.heapdump"
                    .into(),
            ),
        ),
        when(
            OsRule {
                name: Some("windows".into()),
                version: Some("^10\\.".into()),
                ..OsRule::default()
            },
            ArgumentValue::Many(vec![
                "-Dos.name=Windows 10".into(),
                "-Dos.version=10.0".into(),
            ]),
        ),
        when(
            OsRule {
                arch: Some("x86".into()),
                ..OsRule::default()
            },
            ArgumentValue::Single("-Xss1M".into()),
        ),
        literal("-Djava.library.path=${natives_directory}"),
        literal("-Dminecraft.launcher.brand=${launcher_name}"),
        literal("-Dminecraft.launcher.version=${launcher_version}"),
        literal("-cp"),
        literal("${classpath}"),
    ]
}
