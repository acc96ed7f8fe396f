use anyhow::{Context, Result};
use shared::{
    domain::{ComplaintId, ComplaintStatus},
    protocol::UpdateComplaintStatusRequest,
};
use tracing::{info, warn};

use crate::{
    session::{ensure_success, AdminSession},
    views::ComplaintList,
};

/// Changes a complaint's status on the server, then marks the row in the
/// loaded page without waiting for a refetch.
pub async fn update_complaint_status(
    session: &AdminSession,
    list: &ComplaintList,
    complaint_id: ComplaintId,
    status: ComplaintStatus,
) -> Result<()> {
    let url = format!(
        "{}/complaints/{}/status",
        session.server_url(),
        complaint_id
    );
    let builder = session
        .http()
        .patch(&url)
        .json(&UpdateComplaintStatusRequest { status });
    let response = session
        .authorized(builder)
        .await
        .send()
        .await
        .with_context(|| format!("failed to reach {url}"))?;
    ensure_success(response).await?;

    let patched = list
        .patch_items(
            |complaint| complaint.complaint_id == complaint_id,
            |complaint| complaint.status = status,
        )
        .await;
    if patched == 0 {
        warn!(%complaint_id, "updated complaint is not on the loaded page");
    }
    info!(%complaint_id, status = status.as_str(), "complaint status updated");
    Ok(())
}

#[cfg(test)]
#[path = "tests/complaints_tests.rs"]
mod tests;
