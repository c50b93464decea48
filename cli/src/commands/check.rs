use anyhow::{anyhow, Context, Result};
use audit::{
    AuditOutcome, AuditRecord, AuditSink, AuditWriterHandle, DenialReason, SecureAuditLog,
    SecureAuditLogConfig, TracingAuditSink,
};
use authz::{
    types::{Action, CompositeRequirement, Requirement, Role},
    AuthzEvaluator, PermissionTable, RequirementCheck,
};
use colored::*;
use guard::{Guard, GuardConfig, GuardOutcome, RenderInstruction};
use serde_json::json;
use session::{InMemorySessionProvider, SessionConfig, TenantScope};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Options for `authzctl check`
pub struct CheckArgs {
    pub role: String,
    pub requirements: Vec<String>,
    pub any: bool,
    pub enterprise: Option<String>,
    pub site: Option<String>,
    pub format: String,
    pub audit_log: Option<PathBuf>,
    /// Guard YAML file
    pub guard_config: Option<PathBuf>,
    /// Overrides `redirect_on_denial` from the guard file
    pub redirect: Option<String>,
}

/// Parse `resource:action`
pub fn parse_requirement(input: &str) -> Result<Requirement> {
    let (resource, action) = input
        .rsplit_once(':')
        .ok_or_else(|| anyhow!("Requirement '{}' must look like resource:action", input))?;
    if resource.is_empty() {
        return Err(anyhow!("Requirement '{}' has an empty resource", input));
    }
    let action: Action = action.parse()?;
    Ok(Requirement::new(resource, action))
}

/// Resolve the guard configuration from `--guard-config` and `--redirect`.
pub fn load_guard_config(path: Option<&Path>, redirect: Option<String>) -> Result<GuardConfig> {
    let mut config = match path {
        Some(path) => GuardConfig::from_file(path)?,
        None => GuardConfig::default(),
    };
    if let Some(redirect) = redirect {
        config.redirect_on_denial = Some(redirect);
    }
    config.validate()?;
    Ok(config)
}

/// The secure log when a path is given, otherwise the tracing sink.
fn open_sink(audit_log: Option<&Path>) -> Result<(Arc<dyn AuditSink>, Option<AuditWriterHandle>)> {
    match audit_log {
        Some(path) => {
            let (log, writer) = SecureAuditLog::open(SecureAuditLogConfig {
                log_path: path.to_path_buf(),
            })
            .with_context(|| format!("Failed to open audit log {}", path.display()))?;
            Ok((Arc::new(log) as Arc<dyn AuditSink>, Some(writer)))
        }
        None => Ok((Arc::new(TracingAuditSink) as Arc<dyn AuditSink>, None)),
    }
}

/// Run one guarded check as the given role. Returns whether access was granted.
pub async fn execute(table: Arc<PermissionTable>, args: CheckArgs) -> Result<bool> {
    let requirements = args
        .requirements
        .iter()
        .map(|input| parse_requirement(input))
        .collect::<Result<Vec<_>>>()?;
    let requirement = if args.any {
        CompositeRequirement::any(requirements)
    } else {
        CompositeRequirement::all(requirements)
    };
    let config = load_guard_config(args.guard_config.as_deref(), args.redirect.clone())?;

    let (sink, writer) = open_sink(args.audit_log.as_deref())?;

    let role: Role = match args.role.parse() {
        Ok(role) => role,
        Err(e) => {
            // No session can carry an unknown role, so the guard never runs.
            warn!("Denying check for unknown role: {}", e);
            let record = AuditRecord::new(
                AuditOutcome::Denied,
                DenialReason::UnknownResourceOrRole,
                &requirement,
            )
            .with_scope(args.enterprise.clone(), args.site.clone());
            if let Err(e) = sink.record_unauthorized_access(record) {
                warn!("Audit sink rejected record: {}", e);
            }
            drop(sink);
            if let Some(writer) = writer {
                writer.join().await?;
            }

            let outcome = GuardOutcome::Denied {
                role: None,
                reason: DenialReason::UnknownResourceOrRole,
                redirect: config.redirect_on_denial,
            };
            print_unknown_role(&args.role, &requirement, &outcome, &args.format)?;
            return Ok(false);
        }
    };

    let provider = InMemorySessionProvider::new(SessionConfig::from_env()?);
    let scope = TenantScope {
        enterprise_id: args.enterprise.clone(),
        site_id: args.site.clone(),
    };
    provider.sign_in("authzctl", role, scope).await;

    let evaluator = AuthzEvaluator::new(table);
    let checks = evaluator.explain(role, &requirement);
    let mut guard = Guard::new(evaluator, requirement.clone(), sink, config);
    let outcome = guard.check(&provider).await;
    debug!(
        "Guard settled in {:?} after {} transitions",
        guard.state(),
        guard.transitions()
    );

    // The writer drains once the last sink handle is gone.
    drop(guard);
    if let Some(writer) = writer {
        writer.join().await?;
    }

    match args.format.as_str() {
        "json" => {
            let output = json!({
                "role": role,
                "mode": requirement.mode,
                "allowed": outcome.is_granted(),
                "reason": outcome.reason(),
                "navigate": navigate_target(&outcome),
                "checks": checks,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => print_text(role, &outcome, &checks),
    }

    Ok(outcome.is_granted())
}

fn navigate_target(outcome: &GuardOutcome) -> Option<String> {
    match outcome.render_instruction() {
        RenderInstruction::Navigate(path) => Some(path),
        _ => None,
    }
}

fn print_render_instruction(outcome: &GuardOutcome) {
    match outcome.render_instruction() {
        RenderInstruction::RenderContent => {}
        RenderInstruction::RenderFallback => {
            println!("  {} fallback", "Render:".bold());
        }
        RenderInstruction::Navigate(path) => {
            println!("  {} {}", "Navigate:".bold(), path.yellow());
        }
    }
}

fn print_text(role: Role, outcome: &GuardOutcome, checks: &[RequirementCheck]) {
    let verdict = if outcome.is_granted() {
        "ALLOWED".green().bold()
    } else {
        "DENIED".red().bold()
    };
    println!("{} for role {}", verdict, role.to_string().cyan());

    for check in checks {
        let mark = if check.allowed { "✓".green() } else { "✗".red() };
        println!("  {} {}", mark, check.requirement);
    }

    if let Some(reason) = outcome.reason() {
        println!("  {} {}", "Reason:".bold(), reason);
    }
    print_render_instruction(outcome);
}

fn print_unknown_role(
    role: &str,
    requirement: &CompositeRequirement,
    outcome: &GuardOutcome,
    format: &str,
) -> Result<()> {
    match format {
        "json" => {
            let output = json!({
                "role": role,
                "mode": requirement.mode,
                "allowed": false,
                "reason": outcome.reason(),
                "navigate": navigate_target(outcome),
                "checks": [],
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => {
            println!("{} unknown role {}", "DENIED".red().bold(), role.yellow());
            print_render_instruction(outcome);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(role: &str, requirement: &str, audit_log: Option<PathBuf>) -> CheckArgs {
        CheckArgs {
            role: role.to_string(),
            requirements: vec![requirement.to_string()],
            any: false,
            enterprise: Some("ent-1".to_string()),
            site: None,
            format: "json".to_string(),
            audit_log,
            guard_config: None,
            redirect: None,
        }
    }

    #[test]
    fn test_parse_requirement() {
        let requirement = parse_requirement("patients:update").unwrap();
        assert_eq!(requirement.resource.as_str(), "patients");
        assert_eq!(requirement.action, Action::Update);
    }

    #[test]
    fn test_parse_requirement_errors() {
        assert!(parse_requirement("patients").is_err());
        assert!(parse_requirement(":read").is_err());
        assert!(parse_requirement("patients:write").is_err());
    }

    #[test]
    fn test_load_guard_config() {
        assert_eq!(load_guard_config(None, None).unwrap(), GuardConfig::default());
        assert_eq!(
            load_guard_config(None, Some("/login".to_string())).unwrap(),
            GuardConfig::with_redirect("/login")
        );
        assert!(load_guard_config(None, Some("login".to_string())).is_err());

        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("guard.yaml");
        std::fs::write(&path, "redirect_on_denial: /denied\n").unwrap();
        assert_eq!(
            load_guard_config(Some(&path), None).unwrap(),
            GuardConfig::with_redirect("/denied")
        );
        assert_eq!(
            load_guard_config(Some(&path), Some("/login".to_string())).unwrap(),
            GuardConfig::with_redirect("/login")
        );
    }

    #[tokio::test]
    async fn test_execute_with_audit_log() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let log_path = temp_dir.path().join("audit.log");

        let allowed = execute(
            Arc::new(PermissionTable::clinic_default()),
            args("front-desk", "settings:read", Some(log_path.clone())),
        )
        .await
        .unwrap();

        assert!(!allowed);
        let entries = audit::read_entries(&log_path).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].record.enterprise_id.as_deref(), Some("ent-1"));
        assert!(audit::verify_chain(&log_path).unwrap());
    }

    #[tokio::test]
    async fn test_unknown_role_is_audited() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let log_path = temp_dir.path().join("audit.log");

        let allowed = execute(
            Arc::new(PermissionTable::clinic_default()),
            args("janitor", "patients:read", Some(log_path.clone())),
        )
        .await
        .unwrap();

        assert!(!allowed);
        let entries = audit::read_entries(&log_path).unwrap();
        assert_eq!(entries.len(), 1);
        let record = &entries[0].record;
        assert_eq!(record.reason, DenialReason::UnknownResourceOrRole);
        assert_eq!(record.outcome, AuditOutcome::Denied);
        assert_eq!(record.role, None);
        assert_eq!(record.requirements_label(), "patients:read");
        assert_eq!(record.enterprise_id.as_deref(), Some("ent-1"));
    }

    #[tokio::test]
    async fn test_granted_check_leaves_log_untouched() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let log_path = temp_dir.path().join("audit.log");

        let allowed = execute(
            Arc::new(PermissionTable::clinic_default()),
            args("physician", "patients:update", Some(log_path.clone())),
        )
        .await
        .unwrap();

        assert!(allowed);
        assert!(!log_path.exists());
    }
}
