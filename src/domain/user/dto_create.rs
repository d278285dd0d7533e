use super::UserRole;

/// New account, password already hashed
#[derive(Debug, Clone)]
pub struct CreateUserDto {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
}
