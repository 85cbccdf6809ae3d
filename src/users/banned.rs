use super::repo::{StoreError, UserTx};

/// May `viewer_id` see or befriend `target_id`?
///
/// False only when `target_id` holds an active ban against `viewer_id`; no
/// relation at all means permitted. Store failures come back as `Err` and
/// must not be read as either answer.
pub async fn is_permitted(
    tx: &mut dyn UserTx,
    viewer_id: i64,
    target_id: i64,
) -> Result<bool, StoreError> {
    let ban = tx.find_ban(target_id, viewer_id).await?;
    Ok(ban.is_none())
}
