use sea_orm::ConnectionTrait;

use crate::checkin::RosterService;
use crate::error::AppError;

/// Resolve the term a request is scoped to.
///
/// An explicit `term_id` wins. Otherwise the active term is looked up once
/// here and passed down explicitly.
pub async fn resolve_term<C>(db: &C, term_id: Option<String>) -> Result<String, AppError>
where
    C: ConnectionTrait + sea_orm::TransactionTrait,
{
    if let Some(term_id) = term_id.filter(|t| !t.trim().is_empty()) {
        return Ok(term_id);
    }
    RosterService::new(db)
        .active_term()
        .await?
        .map(|t| t.id)
        .ok_or_else(|| {
            AppError::Validation("No active term; pass term_id or activate a term".into())
        })
}
