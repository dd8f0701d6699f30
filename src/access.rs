#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Viewer,
}

/// Identity of whoever issued the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub role: Role,
}

impl Caller {
    pub fn admin() -> Self {
        Self { role: Role::Admin }
    }

    pub fn viewer() -> Self {
        Self { role: Role::Viewer }
    }

    /// Elevates the caller when the provided key equals the configured admin
    /// key. With no admin key configured nobody is elevated.
    pub fn from_api_key(provided: Option<&str>, admin_key: Option<&str>) -> Self {
        match (provided, admin_key) {
            (Some(p), Some(k)) if !k.is_empty() && p == k => Self::admin(),
            _ => Self::viewer(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
