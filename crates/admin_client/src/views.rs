//! Ready-made list views for the admin screens.

use std::sync::Arc;

use list_state::{FilterMap, ListError, ListFilters, ListInit, ListStateController};
use shared::{
    domain::{ComplaintStatus, Resource},
    protocol::{ComplaintSummary, StaffSummary, StudentSummary},
};

use crate::{rest::RestPageFetcher, session::AdminSession};

pub type StudentList = ListStateController<StudentSummary, FilterMap>;
pub type StaffList = ListStateController<StaffSummary, FilterMap>;
pub type ComplaintList = ListStateController<ComplaintSummary, ComplaintFilters>;

/// Filters offered by the complaints screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComplaintFilters {
    pub status: Option<ComplaintStatus>,
    pub hostel: Option<String>,
    pub search: Option<String>,
}

/// Partial update of [`ComplaintFilters`]; `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComplaintFiltersPatch {
    /// `Some(None)` clears the status filter.
    pub status: Option<Option<ComplaintStatus>>,
    pub hostel: Option<String>,
    pub search: Option<String>,
}

impl ComplaintFiltersPatch {
    pub fn search(query: impl Into<String>) -> Self {
        Self {
            search: Some(query.into()),
            ..Self::default()
        }
    }

    pub fn status(status: Option<ComplaintStatus>) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

impl ListFilters for ComplaintFilters {
    type Patch = ComplaintFiltersPatch;

    fn merge_patch(&mut self, patch: Self::Patch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(hostel) = patch.hostel {
            self.hostel = non_blank(hostel);
        }
        if let Some(search) = patch.search {
            self.search = non_blank(search);
        }
    }

    fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(status) = self.status {
            pairs.push(("status".to_string(), status.as_str().to_string()));
        }
        if let Some(hostel) = &self.hostel {
            pairs.push(("hostel".to_string(), hostel.clone()));
        }
        if let Some(search) = &self.search {
            pairs.push(("search".to_string(), search.clone()));
        }
        pairs
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub fn student_list(
    session: &Arc<AdminSession>,
    init: ListInit<FilterMap>,
) -> Result<StudentList, ListError> {
    ListStateController::new(
        Arc::new(RestPageFetcher::<StudentSummary>::new(
            Arc::clone(session),
            Resource::Students,
        )),
        init,
    )
}

pub fn staff_list(
    session: &Arc<AdminSession>,
    init: ListInit<FilterMap>,
) -> Result<StaffList, ListError> {
    ListStateController::new(
        Arc::new(RestPageFetcher::<StaffSummary>::new(
            Arc::clone(session),
            Resource::Staff,
        )),
        init,
    )
}

pub fn complaint_list(
    session: &Arc<AdminSession>,
    init: ListInit<ComplaintFilters>,
) -> Result<ComplaintList, ListError> {
    ListStateController::new(
        Arc::new(RestPageFetcher::<ComplaintSummary>::new(
            Arc::clone(session),
            Resource::Complaints,
        )),
        init,
    )
}

#[cfg(test)]
#[path = "tests/views_tests.rs"]
mod tests;
