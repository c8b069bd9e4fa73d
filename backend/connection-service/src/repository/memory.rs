use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use connection_types::{AddressRef, ConnectionRequest, SortDirection, SortField};
use parking_lot::Mutex;

use super::{ConnectionStore, StoreError, UserStore};
use crate::models::{ConnectionSearch, NewConnection, StateUpdate, UserRecord};

struct Person {
    first_name: String,
    last_name: String,
}

struct District {
    name: String,
    department_id: i64,
}

struct Address {
    district_id: i64,
    label: String,
}

#[derive(Default)]
struct Inner {
    persons: HashMap<i64, Person>,
    plans: HashMap<i64, String>,
    /// department -> province
    departments: HashMap<i64, i64>,
    districts: HashMap<i64, District>,
    addresses: HashMap<i64, Address>,
    users: Vec<UserRecord>,
    connections: Vec<ConnectionRequest>,
    next_connection_id: i64,
    next_request_number: i64,
    next_address_id: i64,
}

/// In-process store with a small fixed reference data set.
///
/// Every trait call bumps a counter so tests can assert that a rejected request never
/// reached persistence.
pub struct MemoryStore {
    inner: Mutex<Inner>,
    calls: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Empty store seeded with:
    /// - provinces 1 (Córdoba) and 2 (Santa Fe), departments 10 and 20
    /// - districts 3 and 4 in department 10, district 5 in department 20
    /// - persons 1 (staff), 5 (Ana Pérez) and 6 (Bruno Díaz)
    /// - plans 7 (Fibra 300) and 8 (Fibra 600)
    /// - addresses 42 (district 3) and 43 (district 5)
    pub fn new() -> Self {
        let mut inner = Inner {
            next_connection_id: 1,
            next_request_number: 1000,
            next_address_id: 100,
            ..Inner::default()
        };

        inner.departments.insert(10, 1);
        inner.departments.insert(20, 2);
        for (id, name, department_id) in [
            (3, "Centro", 10),
            (4, "Nueva Córdoba", 10),
            (5, "Rosario Centro", 20),
        ] {
            inner.districts.insert(
                id,
                District {
                    name: name.to_string(),
                    department_id,
                },
            );
        }
        for (id, first, last) in [(1, "Mesa", "Operativa"), (5, "Ana", "Pérez"), (6, "Bruno", "Díaz")] {
            inner.persons.insert(
                id,
                Person {
                    first_name: first.to_string(),
                    last_name: last.to_string(),
                },
            );
        }
        inner.plans.insert(7, "Fibra 300".to_string());
        inner.plans.insert(8, "Fibra 600".to_string());
        inner.addresses.insert(
            42,
            Address {
                district_id: 3,
                label: "San Martín 120, Centro".to_string(),
            },
        );
        inner.addresses.insert(
            43,
            Address {
                district_id: 5,
                label: "Córdoba 1550, Rosario Centro".to_string(),
            },
        );

        Self {
            inner: Mutex::new(inner),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn add_user(&self, user: UserRecord) {
        self.inner.lock().users.push(user);
    }

    /// Move a request's submission timestamp, for date-range and ordering scenarios.
    pub fn backdate(&self, id: i64, requested_at: DateTime<Utc>) -> bool {
        let mut inner = self.inner.lock();
        match inner.connections.iter_mut().find(|c| c.id == id) {
            Some(connection) => {
                connection.requested_at = requested_at;
                true
            }
            None => false,
        }
    }

    /// Number of store operations served so far.
    pub fn query_count(&self) -> usize {
        self.calls.load(AtomicOrdering::SeqCst)
    }

    fn touch(&self) {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
    }
}

impl Inner {
    fn matches(&self, connection: &ConnectionRequest, search: &ConnectionSearch) -> bool {
        let filter = &search.filter;
        let district = self.districts.get(&connection.district_id);
        let department_id = district.map(|d| d.department_id);
        let province_id = department_id.and_then(|id| self.departments.get(&id).copied());
        let date = connection.requested_at.date_naive();

        search.state.map_or(true, |s| connection.state == s)
            && search.person_id.map_or(true, |p| connection.person_id == p)
            && filter.district_id.map_or(true, |d| connection.district_id == d)
            && filter.department_id.map_or(true, |d| department_id == Some(d))
            && filter.province_id.map_or(true, |p| province_id == Some(p))
            && filter.plan_id.map_or(true, |p| connection.plan_id == p)
            && filter.client_name.as_deref().map_or(true, |fragment| {
                connection
                    .client_name
                    .to_lowercase()
                    .contains(&fragment.to_lowercase())
            })
            && filter.date_from.map_or(true, |from| date >= from)
            && filter.date_to.map_or(true, |to| date <= to)
    }

    fn compare(
        &self,
        a: &ConnectionRequest,
        b: &ConnectionRequest,
        field: SortField,
        direction: SortDirection,
    ) -> Ordering {
        let name_key = |c: &ConnectionRequest| {
            self.persons
                .get(&c.person_id)
                .map(|p| (p.last_name.clone(), p.first_name.clone()))
                .unwrap_or_default()
        };

        let ordering = match field {
            SortField::RequestDate => a.requested_at.cmp(&b.requested_at),
            SortField::Plan => a.plan_name.cmp(&b.plan_name),
            SortField::Client => name_key(a).cmp(&name_key(b)),
            SortField::RequestNumber => a.request_number.cmp(&b.request_number),
        }
        .then(a.id.cmp(&b.id));

        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

fn constraint(what: &str, id: i64) -> StoreError {
    StoreError::Constraint(format!("{what} {id} does not exist"))
}

#[async_trait]
impl ConnectionStore for MemoryStore {
    async fn person_exists(&self, person_id: i64) -> Result<bool, StoreError> {
        self.touch();
        Ok(self.inner.lock().persons.contains_key(&person_id))
    }

    async fn plan_exists(&self, plan_id: i64) -> Result<bool, StoreError> {
        self.touch();
        Ok(self.inner.lock().plans.contains_key(&plan_id))
    }

    async fn address_exists(&self, address_id: i64) -> Result<bool, StoreError> {
        self.touch();
        Ok(self.inner.lock().addresses.contains_key(&address_id))
    }

    async fn district_exists(&self, district_id: i64) -> Result<bool, StoreError> {
        self.touch();
        Ok(self.inner.lock().districts.contains_key(&district_id))
    }

    async fn insert(&self, new: NewConnection) -> Result<ConnectionRequest, StoreError> {
        self.touch();
        let mut inner = self.inner.lock();

        let person = inner
            .persons
            .get(&new.person_id)
            .ok_or_else(|| constraint("person", new.person_id))?;
        let client_name = format!("{} {}", person.first_name, person.last_name);
        let plan_name = inner
            .plans
            .get(&new.plan_id)
            .cloned()
            .ok_or_else(|| constraint("plan", new.plan_id))?;

        let address_id = match &new.address {
            AddressRef::Existing(id) => {
                if !inner.addresses.contains_key(id) {
                    return Err(constraint("address", *id));
                }
                *id
            }
            AddressRef::New(address) => {
                let district = inner
                    .districts
                    .get(&address.district_id)
                    .ok_or_else(|| constraint("district", address.district_id))?;
                let mut label = format!("{} {}", address.street, address.number);
                if let Some(unit) = &address.unit {
                    label.push(' ');
                    label.push_str(unit);
                }
                label.push_str(", ");
                label.push_str(&district.name);

                let id = inner.next_address_id;
                inner.next_address_id += 1;
                inner.addresses.insert(
                    id,
                    Address {
                        district_id: address.district_id,
                        label,
                    },
                );
                id
            }
        };

        let (address_label, district_id) = inner
            .addresses
            .get(&address_id)
            .map(|a| (a.label.clone(), a.district_id))
            .ok_or_else(|| constraint("address", address_id))?;

        let now = Utc::now();
        let connection = ConnectionRequest {
            id: inner.next_connection_id,
            request_number: inner.next_request_number,
            person_id: new.person_id,
            client_name,
            plan_id: new.plan_id,
            plan_name,
            address_id,
            address: address_label,
            district_id,
            latitude: new.latitude,
            longitude: new.longitude,
            state: new.state,
            nap: new.feasibility.as_ref().map(|f| f.nap.clone()),
            vlan: new.feasibility.as_ref().map(|f| f.vlan),
            port: new.feasibility.as_ref().and_then(|f| f.port),
            observations: new.observations,
            requested_at: now,
            resolved_at: new.state.is_terminal().then_some(now),
        };

        inner.next_connection_id += 1;
        inner.next_request_number += 1;
        inner.connections.push(connection.clone());
        Ok(connection)
    }

    async fn find(&self, id: i64) -> Result<Option<ConnectionRequest>, StoreError> {
        self.touch();
        Ok(self
            .inner
            .lock()
            .connections
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn transition(
        &self,
        update: StateUpdate,
    ) -> Result<Option<ConnectionRequest>, StoreError> {
        self.touch();
        let mut inner = self.inner.lock();

        let Some(connection) = inner
            .connections
            .iter_mut()
            .find(|c| c.id == update.id && c.state == update.expected)
        else {
            return Ok(None);
        };

        connection.state = update.next;
        if let Some(feasibility) = update.feasibility {
            connection.nap = Some(feasibility.nap);
            connection.vlan = Some(feasibility.vlan);
            if feasibility.port.is_some() {
                connection.port = feasibility.port;
            }
        }
        if update.observations.is_some() {
            connection.observations = update.observations;
        }
        if update.next.is_terminal() {
            connection.resolved_at = Some(Utc::now());
        }

        Ok(Some(connection.clone()))
    }

    async fn search(
        &self,
        search: &ConnectionSearch,
    ) -> Result<(Vec<ConnectionRequest>, i64), StoreError> {
        self.touch();
        let inner = self.inner.lock();
        let filter = &search.filter;

        let mut matched: Vec<&ConnectionRequest> = inner
            .connections
            .iter()
            .filter(|c| inner.matches(c, search))
            .collect();
        matched.sort_by(|a, b| inner.compare(a, b, filter.sort_field, filter.sort_direction));

        let total = matched.len() as i64;
        let items = matched
            .into_iter()
            .skip(usize::try_from(filter.offset()).unwrap_or(usize::MAX))
            .take(filter.limit as usize)
            .cloned()
            .collect();

        Ok((items, total))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_active_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        self.touch();
        Ok(self
            .inner
            .lock()
            .users
            .iter()
            .find(|u| u.active && u.email.eq_ignore_ascii_case(email))
            .cloned())
    }
}
