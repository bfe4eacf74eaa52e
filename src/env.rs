//! Workspace build environment
//!
//! Selects the environment variables a workspace build should see, based on
//! the workspace kind and feature flags, and reports misconfiguration.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Variables passed to every workspace
const COMMON_VARS: &[&str] = &["NODE_ENV", "CI"];

/// Broad category of a workspace, inferred from its id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkspaceKind {
    Web,
    Mobile,
    Backend,
    Generic,
}

impl WorkspaceKind {
    /// Classify a workspace id (`web`, `admin-web`, `api`, ...)
    pub fn from_id(id: &str) -> Self {
        let id = id.rsplit('/').next().unwrap_or(id);
        match id {
            "web" => Self::Web,
            "mobile" => Self::Mobile,
            "backend" | "api" => Self::Backend,
            _ if id.ends_with("-web") => Self::Web,
            _ if id.ends_with("-mobile") => Self::Mobile,
            _ if id.ends_with("-backend") => Self::Backend,
            _ => Self::Generic,
        }
    }
}

impl fmt::Display for WorkspaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Web => write!(f, "web"),
            Self::Mobile => write!(f, "mobile"),
            Self::Backend => write!(f, "backend"),
            Self::Generic => write!(f, "generic"),
        }
    }
}

/// Problems found in a workspace's environment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnvironmentReport {
    pub kind: Option<WorkspaceKind>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl EnvironmentReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Stateless filter over a snapshot of environment variables
#[derive(Debug, Clone, Default)]
pub struct EnvironmentResolver {
    vars: BTreeMap<String, String>,
}

impl EnvironmentResolver {
    /// Resolver over an explicit set of variables
    pub fn new<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Snapshot the current process environment
    pub fn from_process_env() -> Self {
        Self::new(std::env::vars())
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Flag that is on unless set to `false`
    fn enabled_by_default(&self, flag: &str) -> bool {
        !self
            .get(flag)
            .is_some_and(|value| value.eq_ignore_ascii_case("false"))
    }

    /// Flag that is off unless set to `true`
    fn enabled_explicitly(&self, flag: &str) -> bool {
        self.get(flag)
            .is_some_and(|value| value.eq_ignore_ascii_case("true"))
    }

    /// Variables a workspace's build should receive
    pub fn validate_workspace_environment(&self, workspace_id: &str) -> BTreeMap<String, String> {
        let kind = WorkspaceKind::from_id(workspace_id);
        let mut names: Vec<&str> = COMMON_VARS.to_vec();
        let mut prefix = None;

        match kind {
            WorkspaceKind::Web => {
                prefix = Some("NEXT_PUBLIC_");
                if self.enabled_by_default("ENABLE_AUTH") {
                    names.extend(["NEXTAUTH_URL", "NEXTAUTH_SECRET"]);
                }
                if self.enabled_by_default("ENABLE_DATABASE") {
                    names.push("DATABASE_URL");
                }
                if self.enabled_explicitly("ENABLE_PAYMENTS") {
                    names.extend(["STRIPE_SECRET_KEY", "STRIPE_WEBHOOK_SECRET"]);
                }
            }
            WorkspaceKind::Mobile => prefix = Some("EXPO_PUBLIC_"),
            WorkspaceKind::Backend => {
                names.push("JWT_SECRET_KEY");
                if self.enabled_by_default("ENABLE_DATABASE") {
                    names.push("DATABASE_URL");
                }
                if self.enabled_by_default("ENABLE_AI") {
                    names.extend(["OPENAI_API_KEY", "OPENROUTER_API_KEY"]);
                }
                if self.enabled_explicitly("ENABLE_MODAL") {
                    names.extend(["MODAL_TOKEN_ID", "MODAL_TOKEN_SECRET"]);
                }
            }
            WorkspaceKind::Generic => {}
        }

        self.vars
            .iter()
            .filter(|(name, _)| {
                names.contains(&name.as_str())
                    || prefix.is_some_and(|prefix| name.starts_with(prefix))
            })
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// Check feature flags against the variables they need
    pub fn check_workspace_environment(&self, workspace_id: &str) -> EnvironmentReport {
        let kind = WorkspaceKind::from_id(workspace_id);
        let mut report = EnvironmentReport {
            kind: Some(kind),
            ..EnvironmentReport::default()
        };

        let database_enabled = self.enabled_by_default("ENABLE_DATABASE");
        let has_database_url = self.get("DATABASE_URL").is_some();

        match kind {
            WorkspaceKind::Backend => {
                if database_enabled && !has_database_url {
                    report
                        .errors
                        .push("DATABASE_URL is required when ENABLE_DATABASE is true".to_string());
                } else if !database_enabled {
                    report
                        .warnings
                        .push("Database features disabled (ENABLE_DATABASE=false)".to_string());
                }

                if self.enabled_by_default("ENABLE_PRISMA") && !has_database_url {
                    report.warnings.push(
                        "ENABLE_PRISMA is true but DATABASE_URL is not configured".to_string(),
                    );
                }

                if self.enabled_by_default("ENABLE_AI") && self.get("OPENAI_API_KEY").is_none() {
                    report.warnings.push(
                        "AI features enabled but OPENAI_API_KEY not configured".to_string(),
                    );
                }

                if self.enabled_explicitly("ENABLE_MODAL") && self.get("MODAL_TOKEN_ID").is_none()
                {
                    report.warnings.push(
                        "Modal deployment enabled but MODAL_TOKEN_ID not configured".to_string(),
                    );
                }

                if self.get("JWT_SECRET_KEY").is_none() {
                    if self.get("NODE_ENV") == Some("production") {
                        report
                            .errors
                            .push("JWT_SECRET_KEY is required in production".to_string());
                    } else {
                        report.warnings.push("JWT_SECRET_KEY not configured".to_string());
                    }
                }
            }
            WorkspaceKind::Web => {
                if database_enabled && !has_database_url {
                    report
                        .warnings
                        .push("ENABLE_DATABASE is on but DATABASE_URL is not set".to_string());
                }
                if self.enabled_by_default("ENABLE_AUTH") && self.get("NEXTAUTH_SECRET").is_none()
                {
                    report
                        .warnings
                        .push("ENABLE_AUTH is on but NEXTAUTH_SECRET is not set".to_string());
                }
                if self.enabled_explicitly("ENABLE_PAYMENTS")
                    && self.get("STRIPE_SECRET_KEY").is_none()
                {
                    report.errors.push(
                        "STRIPE_SECRET_KEY is required when ENABLE_PAYMENTS is true".to_string(),
                    );
                }
            }
            WorkspaceKind::Mobile | WorkspaceKind::Generic => {}
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn resolver(vars: &[(&str, &str)]) -> EnvironmentResolver {
        EnvironmentResolver::new(vars.iter().copied())
    }

    fn keys(map: &BTreeMap<String, String>) -> Vec<&str> {
        map.keys().map(String::as_str).collect()
    }

    #[test]
    fn kind_from_id() {
        assert_eq!(WorkspaceKind::from_id("web"), WorkspaceKind::Web);
        assert_eq!(WorkspaceKind::from_id("admin-web"), WorkspaceKind::Web);
        assert_eq!(WorkspaceKind::from_id("mobile"), WorkspaceKind::Mobile);
        assert_eq!(WorkspaceKind::from_id("api"), WorkspaceKind::Backend);
        assert_eq!(WorkspaceKind::from_id("billing-backend"), WorkspaceKind::Backend);
        assert_eq!(WorkspaceKind::from_id("workspaces/web"), WorkspaceKind::Web);
        assert_eq!(WorkspaceKind::from_id("docs"), WorkspaceKind::Generic);
        assert_eq!(WorkspaceKind::from_id("webhooks"), WorkspaceKind::Generic);
    }

    #[test]
    fn web_gets_public_prefix_and_default_on_flags() {
        let env = resolver(&[
            ("NODE_ENV", "production"),
            ("NEXT_PUBLIC_API_URL", "https://api"),
            ("EXPO_PUBLIC_X", "no"),
            ("NEXTAUTH_SECRET", "s"),
            ("DATABASE_URL", "postgres://"),
            ("STRIPE_SECRET_KEY", "sk"),
            ("HOME", "/root"),
        ]);

        let vars = env.validate_workspace_environment("web");

        assert_eq!(
            keys(&vars),
            vec!["DATABASE_URL", "NEXTAUTH_SECRET", "NEXT_PUBLIC_API_URL", "NODE_ENV"]
        );
    }

    #[test]
    fn web_payments_need_explicit_true() {
        let env = resolver(&[("ENABLE_PAYMENTS", "true"), ("STRIPE_SECRET_KEY", "sk")]);
        assert!(env
            .validate_workspace_environment("web")
            .contains_key("STRIPE_SECRET_KEY"));

        let env = resolver(&[("ENABLE_PAYMENTS", "yes"), ("STRIPE_SECRET_KEY", "sk")]);
        assert!(!env
            .validate_workspace_environment("web")
            .contains_key("STRIPE_SECRET_KEY"));
    }

    #[test]
    fn disabled_flags_drop_variables() {
        let env = resolver(&[
            ("ENABLE_AUTH", "false"),
            ("ENABLE_DATABASE", "FALSE"),
            ("NEXTAUTH_URL", "http://localhost"),
            ("DATABASE_URL", "postgres://"),
        ]);

        assert!(env.validate_workspace_environment("web").is_empty());
    }

    #[test]
    fn mobile_only_gets_expo_prefix() {
        let env = resolver(&[
            ("CI", "true"),
            ("EXPO_PUBLIC_SUPABASE_URL", "https://x"),
            ("NEXT_PUBLIC_API_URL", "https://api"),
            ("DATABASE_URL", "postgres://"),
        ]);

        assert_eq!(
            keys(&env.validate_workspace_environment("mobile")),
            vec!["CI", "EXPO_PUBLIC_SUPABASE_URL"]
        );
    }

    #[test]
    fn backend_modal_is_opt_in() {
        let base = [
            ("JWT_SECRET_KEY", "jwt"),
            ("OPENAI_API_KEY", "sk"),
            ("MODAL_TOKEN_ID", "id"),
            ("MODAL_TOKEN_SECRET", "secret"),
        ];

        let vars = resolver(&base).validate_workspace_environment("backend");
        assert_eq!(keys(&vars), vec!["JWT_SECRET_KEY", "OPENAI_API_KEY"]);

        let mut with_modal = base.to_vec();
        with_modal.push(("ENABLE_MODAL", "true"));
        with_modal.push(("ENABLE_AI", "false"));
        let vars = resolver(&with_modal).validate_workspace_environment("api");
        assert_eq!(
            keys(&vars),
            vec!["JWT_SECRET_KEY", "MODAL_TOKEN_ID", "MODAL_TOKEN_SECRET"]
        );
    }

    #[test]
    fn generic_gets_common_only() {
        let env = resolver(&[("NODE_ENV", "test"), ("NEXT_PUBLIC_X", "1"), ("JWT_SECRET_KEY", "j")]);

        assert_eq!(keys(&env.validate_workspace_environment("docs")), vec!["NODE_ENV"]);
    }

    #[test]
    fn backend_report_errors_and_warnings() {
        let report = resolver(&[("NODE_ENV", "production")]).check_workspace_environment("backend");

        assert!(!report.is_valid());
        assert_eq!(report.kind, Some(WorkspaceKind::Backend));
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors[1].contains("JWT_SECRET_KEY"));
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn backend_report_development_only_warns() {
        let report = resolver(&[("DATABASE_URL", "postgres://"), ("OPENAI_API_KEY", "sk")])
            .check_workspace_environment("backend");

        assert!(report.is_valid());
        assert_eq!(report.warnings, vec!["JWT_SECRET_KEY not configured".to_string()]);
    }

    #[test]
    fn generic_report_is_clean() {
        let report = resolver(&[]).check_workspace_environment("docs");
        assert!(report.is_valid());
        assert!(report.warnings.is_empty());
    }

    #[test]
    #[serial]
    fn snapshots_process_environment() {
        std::env::set_var("NEXT_PUBLIC_HOARD_TEST", "1");
        let env = EnvironmentResolver::from_process_env();
        std::env::remove_var("NEXT_PUBLIC_HOARD_TEST");

        assert_eq!(
            env.validate_workspace_environment("web")
                .get("NEXT_PUBLIC_HOARD_TEST")
                .map(String::as_str),
            Some("1")
        );
    }
}
