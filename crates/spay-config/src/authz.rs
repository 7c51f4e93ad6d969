use crate::process_env;

/// Authorization policy switches.
#[derive(Clone, Debug, Default)]
pub struct AuthorizationConfig {
    /// When set, resource deletion uses the manager gate instead of the
    /// historical delete gate. `AUTHZ_STRICT_DELETE_GATE`, default `false`.
    pub strict_delete_gate: bool,
}

impl AuthorizationConfig {
    pub fn from_env() -> Self {
        Self::from_source(process_env)
    }

    pub fn from_source<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let strict_delete_gate = lookup("AUTHZ_STRICT_DELETE_GATE")
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false);

        Self { strict_delete_gate }
    }
}
