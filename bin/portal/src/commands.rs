//! Command implementations.
//!
//! Every command reads the orchestrator from the enclosing auth scope and
//! prints JSON to stdout.

use crate::Command;
use crate::error::PortalError;
use lynx_access::{AuthSnapshot, use_auth};
use rootcause::prelude::Report;
use serde::Serialize;
use serde_json::{Value, json};

pub async fn execute(command: Command) -> Result<(), Report<PortalError>> {
    let auth = use_auth();
    let snapshot = auth.wait_until_loaded().await;

    match command {
        Command::Status => print_json(&status(&snapshot)),
        Command::SignIn { email, password } => {
            auth.sign_in(&email, &password)
                .await
                .map_err(|e| PortalError::Credentials {
                    message: e.message().to_string(),
                })?;
            print_json(&status(&auth.snapshot()))
        }
        Command::SignUp { email, password } => {
            auth.sign_up(&email, &password)
                .await
                .map_err(|e| PortalError::Credentials {
                    message: e.message().to_string(),
                })?;
            let snapshot = auth.snapshot();
            if !snapshot.is_authenticated {
                tracing::info!("check your inbox to confirm the account");
            }
            print_json(&status(&snapshot))
        }
        Command::SignOut => {
            auth.sign_out().await;
            print_json(&status(&auth.snapshot()))
        }
        Command::Roles => print_json(&json!({
            "selected_role": snapshot.selected_role.as_str(),
            "available_roles": roles(&snapshot),
        })),
        Command::SwitchRole { role } => {
            if !auth.switch_role(role.clone()) {
                return Err(PortalError::RoleNotHeld {
                    role: role.to_string(),
                }
                .into());
            }
            print_json(&status(&auth.snapshot()))
        }
        Command::Menu { role } => print_json(&auth.menu_for_role(role.as_ref())),
    }
}

fn roles(snapshot: &AuthSnapshot) -> Vec<Value> {
    snapshot
        .available_roles
        .iter()
        .map(|role| json!({ "role": role.as_str(), "label": role.label() }))
        .collect()
}

/// Renders a snapshot without its tokens.
fn status(snapshot: &AuthSnapshot) -> Value {
    let user = snapshot.user.as_ref().map(|user| {
        json!({
            "id": user.id().as_str(),
            "email": user.email(),
            "name": user.display_name(),
        })
    });
    json!({
        "state": snapshot.state,
        "loading": snapshot.is_loading(),
        "is_authenticated": snapshot.is_authenticated,
        "user": user,
        "expires_at": snapshot.session.as_ref().map(|session| session.expires_at().to_rfc3339()),
        "selected_role": snapshot.selected_role.as_str(),
        "available_roles": roles(snapshot),
    })
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), Report<PortalError>> {
    let rendered = serde_json::to_string_pretty(value).map_err(|e| PortalError::Output {
        details: e.to_string(),
    })?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lynx_access::{AccessConfig, MemoryProvider, MemoryStore, Role, SessionOrchestrator};
    use std::sync::Arc;

    #[tokio::test]
    async fn status_hides_tokens() {
        let provider = Arc::new(MemoryProvider::new());
        provider.register_account("a@b.com", "pw", [Role::Driver]);
        let auth = SessionOrchestrator::new(
            provider,
            Arc::new(MemoryStore::new()),
            AccessConfig::default(),
        );
        auth.start();
        auth.wait_until_loaded().await;
        auth.sign_in("a@b.com", "pw").await.expect("sign in");

        let rendered = status(&auth.snapshot());

        assert_eq!(rendered["state"], "authenticated");
        assert_eq!(rendered["user"]["email"], "a@b.com");
        assert_eq!(rendered["selected_role"], "driver");
        assert_eq!(rendered["available_roles"][0]["label"], "Driver");
        assert!(!rendered.to_string().contains("access_token"));
    }

    #[tokio::test]
    async fn execute_runs_inside_auth_scope() {
        let auth = SessionOrchestrator::new(
            Arc::new(MemoryProvider::new()),
            Arc::new(MemoryStore::new()),
            AccessConfig::default(),
        );
        auth.start();

        let result = lynx_access::provide_auth(
            auth.clone(),
            execute(Command::SwitchRole {
                role: Role::Driver,
            }),
        )
        .await;

        let report = result.expect_err("no user is signed in");
        assert!(matches!(
            report.current_context(),
            PortalError::RoleNotHeld { .. }
        ));
    }
}
