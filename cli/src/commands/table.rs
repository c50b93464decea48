use anyhow::Result;
use authz::{
    cedar::{self, CedarMirror},
    config::PermissionTableDefinition,
    types::{Action, Role},
    AuthzEvaluator, PermissionTable,
};
use colored::*;
use std::sync::Arc;

/// Print the permission table
pub fn execute(table: &PermissionTable, format: &str) -> Result<()> {
    match format {
        "json" => {
            let definition = PermissionTableDefinition::from_table(table);
            println!("{}", serde_json::to_string_pretty(&definition)?);
        }
        "yaml" => {
            let definition = PermissionTableDefinition::from_table(table);
            print!("{}", definition.to_yaml()?);
        }
        _ => print_text(table),
    }
    Ok(())
}

/// Print the table as Cedar policies
pub fn export_cedar(table: &PermissionTable) -> Result<()> {
    print!("{}", cedar::to_cedar_policies(table));
    Ok(())
}

/// Check that Cedar reaches the same decision as the evaluator for every
/// role, resource and action. Returns whether they all agree.
pub fn verify_cedar(table: &Arc<PermissionTable>) -> Result<bool> {
    let mirror = CedarMirror::from_table(table)?;
    let evaluator = AuthzEvaluator::new(table.clone());

    let mut checked = 0;
    let mut mismatches = 0;
    for role in Role::ALL {
        for resource in table.resources() {
            for action in Action::ALL {
                let expected = evaluator.can(role, resource.as_str(), action);
                let actual = mirror.is_authorized(role, resource.as_str(), action)?;
                checked += 1;
                if expected != actual {
                    mismatches += 1;
                    println!(
                        "{} {} {} {}: table={} cedar={}",
                        "MISMATCH".red().bold(),
                        role,
                        resource,
                        action,
                        expected,
                        actual
                    );
                }
            }
        }
    }

    if mismatches == 0 {
        println!(
            "{} {} policies agree with the table on {} decisions",
            "OK".green().bold(),
            mirror.policy_count(),
            checked
        );
    } else {
        println!(
            "{} {} of {} decisions differ",
            "FAILED".red().bold(),
            mismatches,
            checked
        );
    }
    Ok(mismatches == 0)
}

fn print_text(table: &PermissionTable) {
    println!("{}", "Permission Table".bold().underline());
    println!();

    for role in Role::ALL {
        let entries: Vec<_> = table
            .entries()
            .into_iter()
            .filter(|entry| entry.role == role)
            .collect();
        if entries.is_empty() {
            continue;
        }

        println!("{}", role.to_string().cyan().bold());
        for entry in entries {
            let actions: Vec<&str> = entry.actions.iter().map(|a| a.as_str()).collect();
            println!("  {:<18} {}", entry.resource.as_str(), actions.join(", "));
        }
        println!();
    }

    println!(
        "{} {} entries, {} resources",
        "Total:".bold(),
        table.len(),
        table.resources().len()
    );
}
