use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Admin,
    #[serde(rename = "Co-Admin")]
    CoAdmin,
    Client,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::CoAdmin => "Co-Admin",
            Role::Client => "Client",
        }
    }

    /// Admin and Co-Admin run the office; clients only see their own data.
    pub fn is_staff(self) -> bool {
        matches!(self, Role::Admin | Role::CoAdmin)
    }

    /// Page the dashboard opens after login.
    pub fn landing_page(self) -> &'static str {
        match self {
            Role::Client => "client-dashboard.html",
            _ => "dashboard.html",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "co-admin" | "coadmin" | "co_admin" => Ok(Role::CoAdmin),
            "client" => Ok(Role::Client),
            _ => Err(format!("Invalid role '{s}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Inactive,
    Deleted,
}

impl UserStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
            UserStatus::Deleted => "deleted",
        }
    }
}

impl FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(UserStatus::Active),
            "inactive" => Ok(UserStatus::Inactive),
            "deleted" => Ok(UserStatus::Deleted),
            _ => Err(format!("Invalid status '{s}'")),
        }
    }
}

/// Internal user row for authentication, includes the password hash.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: String,
    pub status: String,
}

impl User {
    /// Unknown role text is treated as the least privileged role.
    pub fn role(&self) -> Role {
        self.role.parse().unwrap_or(Role::Client)
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active.as_str()
    }
}

/// Safe version for API output, no password hash.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserDisplay {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: Option<String>,
    pub last_login: Option<String>,
}

/// The `{id, username, email, role, full_name}` shape returned by login and current-user.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
    pub full_name: String,
}

impl From<&User> for UserSummary {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            username: u.username.clone(),
            email: u.email.clone(),
            role: u.role.clone(),
            full_name: u.full_name.clone(),
        }
    }
}

impl From<UserDisplay> for UserSummary {
    fn from(u: UserDisplay) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            role: u.role,
            full_name: u.full_name,
        }
    }
}

pub struct UserPage {
    pub users: Vec<UserDisplay>,
    pub page: i64,
    pub per_page: i64,
    pub total_count: i64,
}

pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: Role,
    pub status: UserStatus,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
    pub password: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.full_name.is_none()
            && self.role.is_none()
            && self.status.is_none()
            && self.password.is_none()
    }
}
