use serde::Serialize;

use crate::db::DbPool;
use crate::errors::AppError;
use crate::time;
use super::{client, report, task, user};

// ---------- Types ----------

/// One headline figure on the admin dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatEntry {
    pub count: i64,
    pub change: String,
    pub change_type: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub active_users: StatEntry,
    pub pending_tasks: StatEntry,
    pub active_clients: StatEntry,
    pub reports_generated: StatEntry,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentStatus {
    pub status: &'static str,
    pub description: String,
    pub badge: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    pub user_management: ComponentStatus,
    pub task_system: ComponentStatus,
    pub client_portal: ComponentStatus,
    pub report_engine: ComponentStatus,
}

fn online(status: &'static str, description: String) -> ComponentStatus {
    ComponentStatus {
        status,
        description,
        badge: "online",
    }
}

/// "Last report: 3:07 PM" from a stored timestamp.
pub fn last_report_description(last: Option<&str>) -> String {
    match last.and_then(time::parse_timestamp) {
        Some(ts) => format!("Last report: {}", ts.format("%-I:%M %p")),
        None => "No reports generated".to_string(),
    }
}

// ---------- Queries ----------

pub async fn stats(pool: &DbPool) -> Result<DashboardStats, AppError> {
    let week_ago = time::days_ago(7);
    let month_ago = time::days_ago(30);

    let active_users = user::count_active(pool).await?;
    let new_users = user::count_created_since(pool, &week_ago).await?;
    let pending_tasks = task::count_pending(pool).await?;
    let completed_tasks = task::count_completed_since(pool, &week_ago).await?;
    let clients = client::count(pool).await?;
    let new_clients = client::count_created_since(pool, &week_ago).await?;
    let reports = report::count_since(pool, &month_ago).await?;

    Ok(DashboardStats {
        active_users: StatEntry {
            count: active_users,
            change: format!("+{new_users} new"),
            change_type: "positive",
        },
        pending_tasks: StatEntry {
            count: pending_tasks,
            change: format!("{completed_tasks} completed"),
            change_type: "neutral",
        },
        active_clients: StatEntry {
            count: clients,
            change: format!("+{new_clients} this week"),
            change_type: if new_clients > 0 { "positive" } else { "neutral" },
        },
        reports_generated: StatEntry {
            count: reports,
            change: format!("+{reports} this month"),
            change_type: "positive",
        },
    })
}

pub async fn system_status(pool: &DbPool) -> Result<SystemStatus, AppError> {
    let active_users = user::count_active(pool).await?;
    let pending_tasks = task::count_pending(pool).await?;
    let clients = client::count(pool).await?;
    let last_report = report::last_generated_at(pool).await?;

    Ok(SystemStatus {
        user_management: online("Active", format!("{active_users} active users")),
        task_system: online("Running", format!("{pending_tasks} pending tasks")),
        client_portal: online("Active", format!("{clients} clients connected")),
        report_engine: online("Ready", last_report_description(last_report.as_deref())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_engine_description() {
        assert_eq!(
            last_report_description(Some("2024-05-01 15:07:00")),
            "Last report: 3:07 PM"
        );
        assert_eq!(
            last_report_description(Some("2024-05-01 09:30:59")),
            "Last report: 9:30 AM"
        );
        assert_eq!(last_report_description(None), "No reports generated");
    }
}
