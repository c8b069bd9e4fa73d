use async_trait::async_trait;
use connection_types::{AddressRef, ConnectionRequest, SortDirection, SortField};
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{ConnectionStore, StoreError, UserStore};
use crate::models::{
    origin_as_str, ConnectionRow, ConnectionSearch, NewConnection, StateUpdate, UserRecord,
};

/// Columns of the joined view; the connection row is always aliased `c`.
const SELECT_VIEW: &str = r#"
    SELECT
        c.id_conexion,
        c.numero_solicitud,
        c.id_persona,
        p.nombre || ' ' || p.apellido AS cliente,
        c.id_plan,
        pl.nombre AS plan,
        c.id_direccion,
        concat_ws(' ', d.calle, d.numero, d.piso_depto) || ', ' || di.nombre AS direccion,
        d.id_distrito,
        c.latitud,
        c.longitud,
        c.estado,
        c.nap,
        c.vlan,
        c.puerto,
        c.observaciones,
        c.created_at,
        c.resolved_at
"#;

const JOINS: &str = r#"
    JOIN personas p ON p.id_persona = c.id_persona
    JOIN planes pl ON pl.id_plan = c.id_plan
    JOIN direcciones d ON d.id_direccion = c.id_direccion
    JOIN distritos di ON di.id_distrito = d.id_distrito
    JOIN departamentos de ON de.id_departamento = di.id_departamento
"#;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, sql: &str, id: i64) -> Result<bool, StoreError> {
        let found: bool = sqlx::query_scalar(sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(found)
    }
}

fn into_view(row: ConnectionRow) -> Result<ConnectionRequest, StoreError> {
    ConnectionRequest::try_from(row).map_err(|e| StoreError::Corrupt(e.to_string()))
}

/// FK, unique and check violations surface as `Constraint`; everything else stays a
/// database error.
fn map_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if matches!(db.code().as_deref(), Some("23503" | "23505" | "23514")) {
            return StoreError::Constraint(db.message().to_string());
        }
    }
    StoreError::Database(err)
}

fn escape_like(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len() + 2);
    for ch in fragment.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn push_conditions<'a>(builder: &mut QueryBuilder<'a, Postgres>, search: &'a ConnectionSearch) {
    let filter = &search.filter;
    builder.push(" WHERE 1=1");

    if let Some(state) = search.state {
        builder.push(" AND c.estado = ").push_bind(state.as_str());
    }
    if let Some(person_id) = search.person_id {
        builder.push(" AND c.id_persona = ").push_bind(person_id);
    }
    if let Some(district_id) = filter.district_id {
        builder.push(" AND d.id_distrito = ").push_bind(district_id);
    }
    if let Some(department_id) = filter.department_id {
        builder.push(" AND di.id_departamento = ").push_bind(department_id);
    }
    if let Some(province_id) = filter.province_id {
        builder.push(" AND de.id_provincia = ").push_bind(province_id);
    }
    if let Some(plan_id) = filter.plan_id {
        builder.push(" AND c.id_plan = ").push_bind(plan_id);
    }
    if let Some(client) = filter.client_name.as_deref() {
        builder
            .push(" AND (p.nombre || ' ' || p.apellido) ILIKE '%' || ")
            .push_bind(escape_like(client))
            .push(" || '%'");
    }
    if let Some(from) = filter.date_from {
        builder
            .push(" AND (c.created_at AT TIME ZONE 'UTC')::date >= ")
            .push_bind(from);
    }
    if let Some(to) = filter.date_to {
        builder
            .push(" AND (c.created_at AT TIME ZONE 'UTC')::date <= ")
            .push_bind(to);
    }
}

fn order_by(field: SortField, direction: SortDirection) -> String {
    let dir = direction.as_sql();
    let primary = match field {
        SortField::RequestDate => format!("c.created_at {dir}"),
        SortField::Plan => format!("pl.nombre {dir}"),
        SortField::Client => format!("p.apellido {dir}, p.nombre {dir}"),
        SortField::RequestNumber => format!("c.numero_solicitud {dir}"),
    };
    format!(" ORDER BY {primary}, c.id_conexion {dir}")
}

#[async_trait]
impl ConnectionStore for PgStore {
    async fn person_exists(&self, person_id: i64) -> Result<bool, StoreError> {
        self.exists(
            "SELECT EXISTS(SELECT 1 FROM personas WHERE id_persona = $1)",
            person_id,
        )
        .await
    }

    async fn plan_exists(&self, plan_id: i64) -> Result<bool, StoreError> {
        self.exists(
            "SELECT EXISTS(SELECT 1 FROM planes WHERE id_plan = $1 AND activo)",
            plan_id,
        )
        .await
    }

    async fn address_exists(&self, address_id: i64) -> Result<bool, StoreError> {
        self.exists(
            "SELECT EXISTS(SELECT 1 FROM direcciones WHERE id_direccion = $1)",
            address_id,
        )
        .await
    }

    async fn district_exists(&self, district_id: i64) -> Result<bool, StoreError> {
        self.exists(
            "SELECT EXISTS(SELECT 1 FROM distritos WHERE id_distrito = $1)",
            district_id,
        )
        .await
    }

    async fn insert(&self, new: NewConnection) -> Result<ConnectionRequest, StoreError> {
        let mut tx = self.pool.begin().await?;

        let address_id = match &new.address {
            AddressRef::Existing(id) => *id,
            AddressRef::New(address) => sqlx::query_scalar(
                r#"
                INSERT INTO direcciones (id_distrito, calle, numero, piso_depto, referencia)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id_direccion
                "#,
            )
            .bind(address.district_id)
            .bind(&address.street)
            .bind(&address.number)
            .bind(&address.unit)
            .bind(&address.reference)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_write_error)?,
        };

        let (nap, vlan, port) = match &new.feasibility {
            Some(f) => (Some(f.nap.as_str()), Some(f.vlan), f.port),
            None => (None, None, None),
        };

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO conexiones (
                id_persona, id_plan, id_direccion, latitud, longitud,
                estado, origen, nap, vlan, puerto, observaciones, resolved_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                    CASE WHEN $12 THEN NOW() END)
            RETURNING id_conexion
            "#,
        )
        .bind(new.person_id)
        .bind(new.plan_id)
        .bind(address_id)
        .bind(new.latitude)
        .bind(new.longitude)
        .bind(new.state.as_str())
        .bind(origin_as_str(new.origin))
        .bind(nap)
        .bind(vlan)
        .bind(port)
        .bind(&new.observations)
        .bind(new.state.is_terminal())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_write_error)?;

        let row: ConnectionRow =
            sqlx::query_as(&format!("{SELECT_VIEW} FROM conexiones c {JOINS} WHERE c.id_conexion = $1"))
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;
        into_view(row)
    }

    async fn find(&self, id: i64) -> Result<Option<ConnectionRequest>, StoreError> {
        let row: Option<ConnectionRow> =
            sqlx::query_as(&format!("{SELECT_VIEW} FROM conexiones c {JOINS} WHERE c.id_conexion = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(into_view).transpose()
    }

    async fn transition(
        &self,
        update: StateUpdate,
    ) -> Result<Option<ConnectionRequest>, StoreError> {
        let (nap, vlan, port) = match &update.feasibility {
            Some(f) => (Some(f.nap.as_str()), Some(f.vlan), f.port),
            None => (None, None, None),
        };

        // Single statement: the state guard and the write cannot interleave with another
        // reviewer's decision on the same row.
        let sql = format!(
            r#"
            WITH c AS (
                UPDATE conexiones
                SET estado = $3,
                    nap = COALESCE($4, nap),
                    vlan = COALESCE($5, vlan),
                    puerto = COALESCE($6, puerto),
                    observaciones = COALESCE($7, observaciones),
                    resolved_at = CASE WHEN $8 THEN NOW() ELSE resolved_at END,
                    updated_at = NOW()
                WHERE id_conexion = $1 AND estado = $2
                RETURNING *
            )
            {SELECT_VIEW} FROM c {JOINS}
            "#
        );

        let row: Option<ConnectionRow> = sqlx::query_as(&sql)
            .bind(update.id)
            .bind(update.expected.as_str())
            .bind(update.next.as_str())
            .bind(nap)
            .bind(vlan)
            .bind(port)
            .bind(&update.observations)
            .bind(update.next.is_terminal())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)?;

        row.map(into_view).transpose()
    }

    async fn search(
        &self,
        search: &ConnectionSearch,
    ) -> Result<(Vec<ConnectionRequest>, i64), StoreError> {
        let filter = &search.filter;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM conexiones c");
        count.push(JOINS);
        push_conditions(&mut count, search);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        if total == 0 {
            return Ok((Vec::new(), 0));
        }

        let mut page = QueryBuilder::<Postgres>::new(SELECT_VIEW);
        page.push(" FROM conexiones c").push(JOINS);
        push_conditions(&mut page, search);
        page.push(order_by(filter.sort_field, filter.sort_direction));
        page.push(" LIMIT ")
            .push_bind(i64::from(filter.limit))
            .push(" OFFSET ")
            .push_bind(filter.offset());

        let rows: Vec<ConnectionRow> = page.build_query_as().fetch_all(&self.pool).await?;
        let items = rows
            .into_iter()
            .map(into_view)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((items, total))
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_active_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let user: Option<UserRecord> = sqlx::query_as(
            r#"
            SELECT
                u.id_usuario,
                u.id_persona,
                u.email,
                u.password_hash,
                u.activo,
                COALESCE(
                    array_agg(r.nombre::TEXT ORDER BY r.nombre) FILTER (WHERE r.nombre IS NOT NULL),
                    ARRAY[]::TEXT[]
                ) AS roles
            FROM usuarios u
            LEFT JOIN usuario_roles ur ON ur.id_usuario = u.id_usuario
            LEFT JOIN roles r ON r.id_rol = ur.id_rol
            WHERE LOWER(u.email) = LOWER($1) AND u.activo
            GROUP BY u.id_usuario
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}
