#[derive(Debug, Clone, Default)]
pub struct GetUserDto {
    /// Substring filter on name or email
    pub search: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}
