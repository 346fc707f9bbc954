//! # License Request Records
//!
//! One generic request record serves all four license variants. The
//! workflow fields are shared; the variant-specific payload is a tagged
//! union riding alongside them, so the transition service and the sweep
//! have one implementation, not four.

use dede_core::{LicenseType, RequestId, Timestamp, UserId};
use dede_workflow::RequestStatus;
use serde::{Deserialize, Serialize};

use crate::store::Store;

// -- Variant Payloads ---------------------------------------------------------

/// The domain payload that distinguishes the four request variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "license_type")]
pub enum LicensePayload {
    /// First-time energy-production permit.
    New {
        /// Name of the production plant.
        plant_name: String,
        /// Rated production capacity in kilowatts.
        capacity_kw: u64,
        /// Physical address of the production site.
        site_address: String,
    },
    /// Renewal of an expiring permit.
    Renewal {
        /// Number of the license being renewed.
        license_no: String,
        /// Expiry date of the current license.
        expires_at: Timestamp,
    },
    /// Capacity extension of an active permit.
    Extension {
        /// Number of the license being extended.
        license_no: String,
        /// Additional capacity requested, in kilowatts.
        additional_capacity_kw: u64,
    },
    /// Capacity reduction of an active permit.
    Reduction {
        /// Number of the license being reduced.
        license_no: String,
        /// Capacity removed, in kilowatts.
        reduced_capacity_kw: u64,
    },
}

impl LicensePayload {
    /// The variant tag this payload belongs to.
    pub fn license_type(&self) -> LicenseType {
        match self {
            Self::New { .. } => LicenseType::New,
            Self::Renewal { .. } => LicenseType::Renewal,
            Self::Extension { .. } => LicenseType::Extension,
            Self::Reduction { .. } => LicenseType::Reduction,
        }
    }
}

// -- License Request ----------------------------------------------------------

/// A license request moving through the approval workflow.
///
/// Invariants:
/// - `status` is always a node of the transition table.
/// - `deadline`, when set, was derived from `status` by the table's
///   deadline function — never supplied by a caller.
/// - `license_type` always agrees with the payload's variant; the
///   constructor derives the tag from the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseRequest {
    /// Unique request identifier.
    pub id: RequestId,
    /// Which variant family this request belongs to.
    pub license_type: LicenseType,
    /// The applicant who owns the request.
    pub owner: UserId,
    /// Variant-specific domain payload.
    pub payload: LicensePayload,
    /// Current workflow status.
    pub status: RequestStatus,
    /// Inspector assigned to the request, once assigned.
    pub inspector: Option<UserId>,
    /// The section head who performed the assignment.
    pub assigned_by: Option<UserId>,
    /// When the assignment happened.
    pub assigned_at: Option<Timestamp>,
    /// Scheduled site-inspection appointment.
    pub appointment_date: Option<Timestamp>,
    /// When the inspection started.
    pub inspection_date: Option<Timestamp>,
    /// When the request reached a terminal status.
    pub completion_date: Option<Timestamp>,
    /// Current status deadline, derived from the transition table.
    pub deadline: Option<Timestamp>,
    /// Reason recorded on rejection.
    pub rejection_reason: Option<String>,
    /// Comment from the most recent transition.
    pub notes: Option<String>,
    /// When the request was created.
    pub created_at: Timestamp,
    /// When the request was last written.
    pub updated_at: Timestamp,
}

impl LicenseRequest {
    /// Create a new draft request owned by `owner`.
    pub fn draft(owner: UserId, payload: LicensePayload) -> Self {
        let now = Timestamp::now();
        Self {
            id: RequestId::new(),
            license_type: payload.license_type(),
            owner,
            payload,
            status: RequestStatus::Draft,
            inspector: None,
            assigned_by: None,
            assigned_at: None,
            appointment_date: None,
            inspection_date: None,
            completion_date: None,
            deadline: None,
            rejection_reason: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the request sits in a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

// -- Request Store ------------------------------------------------------------

/// The request repository: one table per license variant, fronted by a
/// single facade keyed on the `LicenseType` tag.
///
/// The per-variant split mirrors the store schema (one license-request
/// table per variant); the engine never branches on the variant beyond
/// this lookup.
#[derive(Debug, Clone, Default)]
pub struct RequestStore {
    new: Store<RequestId, LicenseRequest>,
    renewal: Store<RequestId, LicenseRequest>,
    extension: Store<RequestId, LicenseRequest>,
    reduction: Store<RequestId, LicenseRequest>,
}

impl RequestStore {
    /// Create an empty request store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The table backing one variant family.
    pub fn table(&self, license_type: LicenseType) -> &Store<RequestId, LicenseRequest> {
        match license_type {
            LicenseType::New => &self.new,
            LicenseType::Renewal => &self.renewal,
            LicenseType::Extension => &self.extension,
            LicenseType::Reduction => &self.reduction,
        }
    }

    /// Insert a request into its variant table.
    pub fn insert(&self, request: LicenseRequest) {
        self.table(request.license_type)
            .insert(request.id, request);
    }

    /// Fetch a request by variant tag and id.
    pub fn get(&self, license_type: LicenseType, id: RequestId) -> Option<LicenseRequest> {
        self.table(license_type).get(&id)
    }

    /// Atomically read-validate-update a request. See [`Store::try_update`].
    pub fn try_update<R, E>(
        &self,
        license_type: LicenseType,
        id: RequestId,
        f: impl FnOnce(&mut LicenseRequest) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.table(license_type).try_update(&id, f)
    }

    /// List every request across all four variant tables.
    pub fn list_all(&self) -> Vec<LicenseRequest> {
        LicenseType::ALL
            .iter()
            .flat_map(|lt| self.table(*lt).list())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> LicensePayload {
        LicensePayload::New {
            plant_name: "Ban Pong Solar".into(),
            capacity_kw: 950,
            site_address: "42 Moo 3, Ratchaburi".into(),
        }
    }

    #[test]
    fn draft_starts_with_derived_tag_and_no_deadline() {
        let req = LicenseRequest::draft(UserId::new(), payload());
        assert_eq!(req.license_type, LicenseType::New);
        assert_eq!(req.status, RequestStatus::Draft);
        assert_eq!(req.deadline, None);
        assert!(!req.is_terminal());
    }

    #[test]
    fn variant_tables_are_disjoint() {
        let store = RequestStore::new();
        let req = LicenseRequest::draft(UserId::new(), payload());
        let id = req.id;
        store.insert(req);

        assert!(store.get(LicenseType::New, id).is_some());
        assert!(store.get(LicenseType::Renewal, id).is_none());
        assert_eq!(store.list_all().len(), 1);
    }

    #[test]
    fn payload_serializes_with_variant_tag() {
        let json = serde_json::to_value(payload()).unwrap();
        assert_eq!(json["license_type"], "new");
        assert_eq!(json["capacity_kw"], 950);
    }
}
