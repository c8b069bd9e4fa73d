use std::sync::Arc;

use connection_types::{
    describe_validation_errors, AddressRef, ConfirmFeasibility, ConnectionRequest,
    ConnectionState, CreateConnectionRequest, RejectFeasibility, SubmissionOrigin, Transition,
};
use validator::Validate;

use super::{Result, WorkflowError};
use crate::models::{Feasibility, NewConnection, StateUpdate};
use crate::repository::ConnectionStore;

/// Creation and the two terminal decisions of a connection request.
#[derive(Clone)]
pub struct ConnectionWorkflow {
    store: Arc<dyn ConnectionStore>,
}

fn validate<T: Validate>(body: &T) -> Result<()> {
    body.validate()
        .map_err(|errors| WorkflowError::Validation(describe_validation_errors(&errors)))
}

fn require_positive_id(id: i64) -> Result<()> {
    if id <= 0 {
        return Err(WorkflowError::Validation(
            "id_conexion must be a positive integer".to_string(),
        ));
    }
    Ok(())
}

impl ConnectionWorkflow {
    pub fn new(store: Arc<dyn ConnectionStore>) -> Self {
        Self { store }
    }

    /// "Solicitar conexión": persist a new request directly in its first visible state.
    ///
    /// Self-service and ordinary staff submissions land in `pending_review`. A staff submission
    /// with `factibilidad_inmediata` carries NAP and VLAN and is written as `confirmed` in the
    /// same insert, so no reviewer can observe it pending.
    pub async fn solicit(&self, request: CreateConnectionRequest) -> Result<ConnectionRequest> {
        validate(&request)?;
        let address = request.address_ref().ok_or_else(|| {
            WorkflowError::Validation(
                "exactly one of id_direccion or direccion is required".to_string(),
            )
        })?;

        let (transition, feasibility) = if request.immediate_feasibility {
            if request.origin != SubmissionOrigin::Staff {
                return Err(WorkflowError::Validation(
                    "factibilidad_inmediata is only available to staff submissions".to_string(),
                ));
            }
            let (Some(nap), Some(vlan)) = (request.nap.clone(), request.vlan) else {
                return Err(WorkflowError::Validation(
                    "nap and vlan are required when factibilidad_inmediata is set".to_string(),
                ));
            };
            let feasibility = Feasibility {
                nap,
                vlan,
                port: request.port,
            };
            (Transition::ConfirmOnCreation, Some(feasibility))
        } else {
            (Transition::Submit, None)
        };

        let state = ConnectionState::Created
            .apply(transition)
            .map_err(|source| WorkflowError::InvalidTransition { id: 0, source })?;

        self.check_references(&request, &address).await?;

        let created = self
            .store
            .insert(NewConnection {
                person_id: request.person_id,
                plan_id: request.plan_id,
                address,
                latitude: request.latitude,
                longitude: request.longitude,
                origin: request.origin,
                state,
                feasibility,
                observations: request.observations,
            })
            .await?;

        tracing::info!(
            id_conexion = created.id,
            numero_solicitud = created.request_number,
            id_persona = created.person_id,
            origin = ?request.origin,
            state = %created.state,
            "connection request created"
        );

        Ok(created)
    }

    async fn check_references(
        &self,
        request: &CreateConnectionRequest,
        address: &AddressRef,
    ) -> Result<()> {
        if !self.store.person_exists(request.person_id).await? {
            return Err(WorkflowError::NotFound(format!(
                "person {} not found",
                request.person_id
            )));
        }
        if !self.store.plan_exists(request.plan_id).await? {
            return Err(WorkflowError::NotFound(format!(
                "plan {} not found",
                request.plan_id
            )));
        }
        match address {
            AddressRef::Existing(id) => {
                if !self.store.address_exists(*id).await? {
                    return Err(WorkflowError::NotFound(format!("address {id} not found")));
                }
            }
            AddressRef::New(new_address) => {
                if !self.store.district_exists(new_address.district_id).await? {
                    return Err(WorkflowError::NotFound(format!(
                        "district {} not found",
                        new_address.district_id
                    )));
                }
            }
        }
        Ok(())
    }

    /// "Confirmar factibilidad": pending_review -> confirmed, recording NAP / VLAN / port.
    pub async fn confirm(&self, id: i64, body: ConfirmFeasibility) -> Result<ConnectionRequest> {
        require_positive_id(id)?;
        validate(&body)?;

        let confirmed = self
            .decide(
                id,
                Transition::Confirm,
                Some(Feasibility {
                    nap: body.nap,
                    vlan: body.vlan,
                    port: body.port,
                }),
                body.observations,
            )
            .await?;

        tracing::info!(
            id_conexion = id,
            nap = confirmed.nap.as_deref().unwrap_or_default(),
            vlan = confirmed.vlan,
            "feasibility confirmed"
        );
        Ok(confirmed)
    }

    /// "Rechazar factibilidad": pending_review -> rejected; the reason becomes the observations.
    pub async fn reject(&self, id: i64, body: RejectFeasibility) -> Result<ConnectionRequest> {
        require_positive_id(id)?;
        validate(&body)?;

        let rejected = self
            .decide(id, Transition::Reject, None, Some(body.reason))
            .await?;

        tracing::info!(id_conexion = id, "feasibility rejected");
        Ok(rejected)
    }

    async fn decide(
        &self,
        id: i64,
        transition: Transition,
        feasibility: Option<Feasibility>,
        observations: Option<String>,
    ) -> Result<ConnectionRequest> {
        let expected = ConnectionState::PendingReview;
        let next = expected
            .apply(transition)
            .map_err(|source| WorkflowError::InvalidTransition { id, source })?;

        let update = StateUpdate {
            id,
            expected,
            next,
            feasibility,
            observations,
        };
        if let Some(updated) = self.store.transition(update).await? {
            return Ok(updated);
        }

        // Nothing matched (id, pending_review): tell a missing id apart from a wrong state.
        match self.store.find(id).await? {
            None => Err(WorkflowError::NotFound(format!(
                "connection request {id} not found"
            ))),
            Some(current) => match current.state.apply(transition) {
                Err(source) => {
                    tracing::warn!(
                        id_conexion = id,
                        state = %current.state,
                        %transition,
                        "transition refused"
                    );
                    Err(WorkflowError::InvalidTransition { id, source })
                }
                Ok(_) => Err(WorkflowError::Conflict(format!(
                    "connection request {id} changed while it was being updated"
                ))),
            },
        }
    }

    /// Detail view. With a person scope, other persons' requests are reported as missing.
    pub async fn get(&self, id: i64, person_scope: Option<i64>) -> Result<ConnectionRequest> {
        require_positive_id(id)?;

        self.store
            .find(id)
            .await?
            .filter(|request| person_scope.map_or(true, |person| request.person_id == person))
            .ok_or_else(|| WorkflowError::NotFound(format!("connection request {id} not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ConnectionSearch;
    use crate::repository::{MemoryStore, StoreError};
    use connection_types::NewAddress;

    fn workflow() -> (Arc<MemoryStore>, ConnectionWorkflow) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), ConnectionWorkflow::new(store))
    }

    fn request(origin: SubmissionOrigin) -> CreateConnectionRequest {
        CreateConnectionRequest {
            person_id: 5,
            origin,
            plan_id: 7,
            address_id: Some(42),
            address: None,
            latitude: -31.4,
            longitude: -64.2,
            immediate_feasibility: false,
            nap: None,
            vlan: None,
            port: None,
            observations: None,
        }
    }

    fn confirm_body(nap: &str, vlan: i32) -> ConfirmFeasibility {
        ConfirmFeasibility {
            nap: nap.to_string(),
            vlan,
            port: None,
            observations: None,
        }
    }

    #[tokio::test]
    async fn test_solicit_lands_pending() {
        let (_, workflow) = workflow();
        let created = workflow
            .solicit(request(SubmissionOrigin::SelfService))
            .await
            .unwrap();

        assert!(created.id > 0);
        assert_eq!(created.state, ConnectionState::PendingReview);
        assert_eq!(created.nap, None);
    }

    #[tokio::test]
    async fn test_solicit_with_new_address() {
        let (_, workflow) = workflow();
        let mut req = request(SubmissionOrigin::Staff);
        req.address_id = None;
        req.address = Some(NewAddress {
            street: "Belgrano".to_string(),
            number: "880".to_string(),
            district_id: 4,
            unit: Some("3B".to_string()),
            reference: None,
        });

        let created = workflow.solicit(req).await.unwrap();
        assert_eq!(created.district_id, 4);
        assert_eq!(created.address, "Belgrano 880 3B, Nueva Córdoba");
    }

    #[tokio::test]
    async fn test_solicit_unknown_plan() {
        let (store, workflow) = workflow();
        let mut req = request(SubmissionOrigin::SelfService);
        req.plan_id = 99;

        let err = workflow.solicit(req).await.unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound(ref m) if m.contains("plan 99")));

        assert!(store.find(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_immediate_feasibility_skips_review() {
        let (_, workflow) = workflow();
        let mut req = request(SubmissionOrigin::Staff);
        req.immediate_feasibility = true;
        req.nap = Some("NAP-07".to_string());
        req.vlan = Some(300);

        let created = workflow.solicit(req).await.unwrap();
        assert_eq!(created.state, ConnectionState::Confirmed);
        assert_eq!(created.nap.as_deref(), Some("NAP-07"));
        assert!(created.resolved_at.is_some());
    }

    #[tokio::test]
    async fn test_immediate_feasibility_requires_nap_and_vlan() {
        let (store, workflow) = workflow();
        let mut req = request(SubmissionOrigin::Staff);
        req.immediate_feasibility = true;
        req.nap = Some("NAP-07".to_string());

        let err = workflow.solicit(req).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(ref m) if m.contains("vlan")));
        assert_eq!(store.query_count(), 0);
    }

    #[tokio::test]
    async fn test_immediate_feasibility_not_for_self_service() {
        let (_, workflow) = workflow();
        let mut req = request(SubmissionOrigin::SelfService);
        req.immediate_feasibility = true;
        req.nap = Some("NAP-07".to_string());
        req.vlan = Some(300);

        assert!(matches!(
            workflow.solicit(req).await.unwrap_err(),
            WorkflowError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_confirm_then_reject_is_invalid_transition() {
        let (_, workflow) = workflow();
        let created = workflow
            .solicit(request(SubmissionOrigin::SelfService))
            .await
            .unwrap();

        let confirmed = workflow
            .confirm(created.id, confirm_body("NAP-01", 120))
            .await
            .unwrap();
        assert_eq!(confirmed.state, ConnectionState::Confirmed);
        assert_eq!(confirmed.vlan, Some(120));

        let err = workflow
            .reject(
                created.id,
                RejectFeasibility {
                    reason: "sin puertos libres".to_string(),
                },
            )
            .await
            .unwrap_err();
        match err {
            WorkflowError::InvalidTransition { id, source } => {
                assert_eq!(id, created.id);
                assert_eq!(source.from, ConnectionState::Confirmed);
            }
            other => panic!("expected InvalidTransition, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_second_confirm_keeps_first_values() {
        let (_, workflow) = workflow();
        let created = workflow
            .solicit(request(SubmissionOrigin::SelfService))
            .await
            .unwrap();
        workflow
            .confirm(created.id, confirm_body("NAP-01", 120))
            .await
            .unwrap();

        let err = workflow
            .confirm(created.id, confirm_body("NAP-99", 999))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));

        let stored = workflow.get(created.id, None).await.unwrap();
        assert_eq!(stored.nap.as_deref(), Some("NAP-01"));
        assert_eq!(stored.vlan, Some(120));
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let (_, workflow) = workflow();
        let err = workflow
            .confirm(404, confirm_body("NAP-01", 120))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_person_scope_hides_other_requests() {
        let (_, workflow) = workflow();
        let created = workflow
            .solicit(request(SubmissionOrigin::SelfService))
            .await
            .unwrap();

        assert!(workflow.get(created.id, Some(5)).await.is_ok());
        assert!(matches!(
            workflow.get(created.id, Some(6)).await.unwrap_err(),
            WorkflowError::NotFound(_)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_decisions_have_one_winner() {
        let (_, workflow) = workflow();
        let created = workflow
            .solicit(request(SubmissionOrigin::SelfService))
            .await
            .unwrap();

        let (confirmed, rejected) = tokio::join!(
            workflow.confirm(created.id, confirm_body("NAP-01", 120)),
            workflow.reject(
                created.id,
                RejectFeasibility {
                    reason: "sin cobertura".to_string(),
                },
            ),
        );

        let stored = workflow.get(created.id, None).await.unwrap();
        match (confirmed, rejected) {
            (Ok(winner), Err(loser)) | (Err(loser), Ok(winner)) => {
                assert_eq!(stored.state, winner.state);
                assert!(matches!(
                    loser,
                    WorkflowError::InvalidTransition { .. } | WorkflowError::Conflict(_)
                ));
            }
            other => panic!("expected exactly one decision to land, got {other:?}"),
        }
    }

    /// Loses every guarded update as if another writer got there first and the row was
    /// then put back to pending.
    struct LosingStore(MemoryStore);

    #[async_trait::async_trait]
    impl ConnectionStore for LosingStore {
        async fn person_exists(&self, person_id: i64) -> std::result::Result<bool, StoreError> {
            self.0.person_exists(person_id).await
        }

        async fn plan_exists(&self, plan_id: i64) -> std::result::Result<bool, StoreError> {
            self.0.plan_exists(plan_id).await
        }

        async fn address_exists(&self, address_id: i64) -> std::result::Result<bool, StoreError> {
            self.0.address_exists(address_id).await
        }

        async fn district_exists(&self, district_id: i64) -> std::result::Result<bool, StoreError> {
            self.0.district_exists(district_id).await
        }

        async fn insert(
            &self,
            new: NewConnection,
        ) -> std::result::Result<ConnectionRequest, StoreError> {
            self.0.insert(new).await
        }

        async fn find(&self, id: i64) -> std::result::Result<Option<ConnectionRequest>, StoreError> {
            self.0.find(id).await
        }

        async fn transition(
            &self,
            _update: StateUpdate,
        ) -> std::result::Result<Option<ConnectionRequest>, StoreError> {
            Ok(None)
        }

        async fn search(
            &self,
            search: &ConnectionSearch,
        ) -> std::result::Result<(Vec<ConnectionRequest>, i64), StoreError> {
            self.0.search(search).await
        }
    }

    #[tokio::test]
    async fn test_lost_update_on_pending_row_is_conflict() {
        let workflow = ConnectionWorkflow::new(Arc::new(LosingStore(MemoryStore::new())));
        let created = workflow
            .solicit(request(SubmissionOrigin::SelfService))
            .await
            .unwrap();

        let err = workflow
            .confirm(created.id, confirm_body("NAP-01", 120))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Conflict(ref m) if m.contains("changed")));

        let stored = workflow.get(created.id, None).await.unwrap();
        assert_eq!(stored.state, ConnectionState::PendingReview);
    }
}
