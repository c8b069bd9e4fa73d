use chrono::{DateTime, Utc};
use connection_types::{AddressRef, ConnectionRequest, ConnectionState, SubmissionOrigin};
use sqlx::FromRow;

/// Physical installation parameters confirmed by feasibility review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feasibility {
    pub nap: String,
    pub vlan: i32,
    pub port: Option<i32>,
}

/// A validated request ready to be written, already in its first persisted state.
#[derive(Debug, Clone)]
pub struct NewConnection {
    pub person_id: i64,
    pub plan_id: i64,
    pub address: AddressRef,
    pub latitude: f64,
    pub longitude: f64,
    pub origin: SubmissionOrigin,
    pub state: ConnectionState,
    pub feasibility: Option<Feasibility>,
    pub observations: Option<String>,
}

/// A guarded state change: applied only if the row is still in `expected`.
#[derive(Debug, Clone)]
pub struct StateUpdate {
    pub id: i64,
    pub expected: ConnectionState,
    pub next: ConnectionState,
    pub feasibility: Option<Feasibility>,
    /// Replaces the stored observations when present
    pub observations: Option<String>,
}

/// Row shape of the joined connection query.
#[derive(Debug, Clone, FromRow)]
pub struct ConnectionRow {
    pub id_conexion: i64,
    pub numero_solicitud: i64,
    pub id_persona: i64,
    pub cliente: String,
    pub id_plan: i64,
    pub plan: String,
    pub id_direccion: i64,
    pub direccion: String,
    pub id_distrito: i64,
    pub latitud: f64,
    pub longitud: f64,
    pub estado: String,
    pub nap: Option<String>,
    pub vlan: Option<i32>,
    pub puerto: Option<i32>,
    pub observaciones: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl TryFrom<ConnectionRow> for ConnectionRequest {
    type Error = connection_types::UnknownState;

    fn try_from(row: ConnectionRow) -> Result<Self, Self::Error> {
        Ok(ConnectionRequest {
            id: row.id_conexion,
            request_number: row.numero_solicitud,
            person_id: row.id_persona,
            client_name: row.cliente,
            plan_id: row.id_plan,
            plan_name: row.plan,
            address_id: row.id_direccion,
            address: row.direccion,
            district_id: row.id_distrito,
            latitude: row.latitud,
            longitude: row.longitud,
            state: row.estado.parse()?,
            nap: row.nap,
            vlan: row.vlan,
            port: row.puerto,
            observations: row.observaciones,
            requested_at: row.created_at,
            resolved_at: row.resolved_at,
        })
    }
}

pub fn origin_as_str(origin: SubmissionOrigin) -> &'static str {
    match origin {
        SubmissionOrigin::SelfService => "cliente",
        SubmissionOrigin::Staff => "staff",
    }
}
