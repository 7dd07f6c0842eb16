//! Local-mirror <-> remote synchronization, shared by `u_create`, `u_update`
//! and `u_sync`.

use tracing::error;

use crate::directory::RemoteUser;
use crate::error::ApiError;
use crate::store::{Account, AccountStatus, AccountStore};

pub async fn synchronize_account(
    accounts: &dyn AccountStore,
    username: &str,
    remote: Option<&RemoteUser>,
) -> Result<(), ApiError> {
    let local = accounts.load(username).await?;
    match (local, remote) {
        (None, None) => Ok(()),
        (None, Some(remote)) => create_local(accounts, remote).await,
        (Some(local), None) => reset_local(accounts, local).await,
        (Some(local), Some(remote)) => sync_fields(accounts, local, remote).await,
    }
}

async fn create_local(accounts: &dyn AccountStore, remote: &RemoteUser) -> Result<(), ApiError> {
    let mut a = Account::new(remote.username());
    a.first_name = Some(remote.given_name.clone());
    a.last_name = Some(remote.family_name.clone());
    a.status = if remote.suspended {
        AccountStatus::Disabled
    } else {
        AccountStatus::Active
    };
    a.is_admin = Some(remote.is_admin);
    accounts.create(&a).await?;
    Ok(())
}

/// Re-initializes the local account to the unprovisioned state: the remote
/// side is gone, so everything reporting-derived is dropped.
async fn reset_local(accounts: &dyn AccountStore, mut local: Account) -> Result<(), ApiError> {
    local.account_id = None;
    local.status = AccountStatus::Unprovisioned;
    local.is_admin = None;
    local.suspension = None;
    local.disk_usage = None;
    local.creation = None;
    local.last_login = None;
    local.last_webmail = None;
    accounts.update(&local).await?;
    Ok(())
}

async fn sync_fields(accounts: &dyn AccountStore, mut local: Account, remote: &RemoteUser) -> Result<(), ApiError> {
    if local.account_name != remote.username() {
        return Err(ApiError::permanent(format!(
            "Cannot synchronize accounts with different usernames ({} - {})",
            local.account_name,
            remote.username()
        )));
    }

    local.first_name = Some(remote.given_name.clone());
    local.last_name = Some(remote.family_name.clone());

    let was_disabled = matches!(local.status, AccountStatus::Disabled);
    if remote.suspended && !was_disabled {
        error!(
            account = %local.account_name,
            reason = ?remote.suspension_reason,
            critical = true,
            "account is now suspended"
        );
    }

    let was_admin = local.is_admin.unwrap_or(false);
    if remote.is_admin && !was_admin {
        error!(account = %local.account_name, critical = true, "account is now administrator of the domain");
    } else if !remote.is_admin && was_admin {
        error!(account = %local.account_name, critical = true, "account is no longer administrator of the domain");
    }

    local.is_admin = Some(remote.is_admin);
    local.status = if remote.suspended {
        AccountStatus::Disabled
    } else {
        AccountStatus::Active
    };

    accounts.update(&local).await?;
    Ok(())
}
