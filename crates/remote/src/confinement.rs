//! Resolves a requesting process's confinement label to the
//! `application_id` string the agent chain evaluates against. Runs on
//! the listener, since that's where the chain executes (see
//! DESIGN.md).

use tb_domain::{ApplicationId, Error, Pid, Result};

pub trait ConfinementResolver: Send + Sync {
    fn resolve(&self, pid: Pid) -> Result<ApplicationId>;
}

/// Reads the AppArmor confinement label from `/proc/<pid>/attr/current`
/// and uses it verbatim as the application id (the label itself is
/// conventionally `<package>_<app>_<version>`, which `AppIdFormatter`
/// downstream normalizes).
pub struct AppArmorConfinementResolver;

impl ConfinementResolver for AppArmorConfinementResolver {
    fn resolve(&self, pid: Pid) -> Result<ApplicationId> {
        let path = format!("/proc/{}/attr/current", pid.get());
        let raw = std::fs::read_to_string(&path)
            .map_err(|e| Error::Other(format!("reading confinement label for pid {pid}: {e}")))?;
        let label = raw.trim_end_matches('\0').trim();
        if label.is_empty() || label == "unconfined" {
            return Ok(ApplicationId::from("unconfined"));
        }
        Ok(ApplicationId::from(label))
    }
}

/// Fixed mapping, used by tests and by deployments without AppArmor.
pub struct StaticConfinementResolver {
    pub application_id: ApplicationId,
}

impl ConfinementResolver for StaticConfinementResolver {
    fn resolve(&self, _pid: Pid) -> Result<ApplicationId> {
        Ok(self.application_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_resolver_always_returns_configured_id() {
        let resolver = StaticConfinementResolver {
            application_id: "app_bar_1.0".into(),
        };
        assert_eq!(resolver.resolve(Pid::new(1)).unwrap().to_string(), "app_bar_1.0");
    }
}
