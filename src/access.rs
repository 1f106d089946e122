//! Access control and the in-memory locality registry
//!
//! The core carries no session state. Callers authenticate once against
//! [`Credentials`] and pass the resulting [`AccessContext`] into every
//! mutating operation of [`LocalityRegistry`]; reads need no context.

use crate::error::{Error, Result};
use crate::model::{Agency, Coordinates, Locality};
use crate::zone::ZoneThresholds;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Viewer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("admin"),
            Role::Viewer => f.write_str("viewer"),
        }
    }
}

/// Who is calling, scoped to one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessContext {
    pub username: String,
    pub role: Role,
}

impl AccessContext {
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fail with [`Error::Unauthorized`] unless the caller is an admin
    pub fn require_admin(&self, action: &str) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            tracing::warn!(user = %self.username, role = %self.role, action, "denied");
            Err(Error::Unauthorized(format!(
                "{} requires the admin role ({} is {})",
                action, self.username, self.role
            )))
        }
    }
}

/// Hex SHA-256 of a password
pub fn password_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct UserRecord {
    /// Hex SHA-256 of the password
    pub password_sha256: String,
    pub role: Role,
}

/// Known users; only password digests are kept
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Credentials {
    #[serde(default)]
    pub users: BTreeMap<String, UserRecord>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user, hashing `password`
    pub fn add_user(&mut self, username: &str, password: &str, role: Role) {
        self.users.insert(
            username.to_string(),
            UserRecord {
                password_sha256: password_digest(password),
                role,
            },
        );
    }

    /// Check a password and open a context for the user
    ///
    /// Unknown users and wrong passwords fail alike.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<AccessContext> {
        let digest = password_digest(password);
        match self.users.get(username) {
            Some(record) if record.password_sha256.eq_ignore_ascii_case(&digest) => {
                tracing::info!(user = username, role = %record.role, "authenticated");
                Ok(AccessContext::new(username, record.role))
            }
            _ => Err(Error::Unauthorized("invalid username or password".to_string())),
        }
    }
}

/// Handle of a registered locality
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LocalityId(pub u64);

impl fmt::Display for LocalityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Fields to change on a locality; `None` keeps the current value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalityUpdate {
    pub commune: Option<String>,
    pub agency_code: Option<String>,
    pub position: Option<Coordinates>,
}

/// Localities with their distance and zone kept consistent
#[derive(Debug, Clone)]
pub struct LocalityRegistry {
    thresholds: ZoneThresholds,
    agencies: BTreeMap<String, Agency>,
    localities: BTreeMap<LocalityId, Locality>,
    next_id: u64,
}

impl LocalityRegistry {
    pub fn new(thresholds: ZoneThresholds, agencies: impl IntoIterator<Item = Agency>) -> Self {
        Self {
            thresholds,
            agencies: agencies.into_iter().map(|a| (a.code.clone(), a)).collect(),
            localities: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.localities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.localities.is_empty()
    }

    pub fn get(&self, id: LocalityId) -> Result<&Locality> {
        self.localities
            .get(&id)
            .ok_or_else(|| Error::Lookup(format!("no locality {}", id)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (LocalityId, &Locality)> {
        self.localities.iter().map(|(id, l)| (*id, l))
    }

    /// Localities of one agency
    pub fn by_agency<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a Locality> + 'a {
        self.localities.values().filter(move |l| l.agency_code == code)
    }

    /// Add a locality, computing its distance and zone
    pub fn insert(&mut self, ctx: &AccessContext, locality: Locality) -> Result<LocalityId> {
        ctx.require_admin("insert")?;
        let located = self.locate(locality)?;
        let id = LocalityId(self.next_id);
        self.next_id += 1;
        tracing::info!(%id, commune = %located.commune, user = %ctx.username, "locality inserted");
        self.localities.insert(id, located);
        Ok(id)
    }

    /// Change a locality; distance and zone are recomputed when its
    /// position or agency changes
    pub fn update(
        &mut self,
        ctx: &AccessContext,
        id: LocalityId,
        update: LocalityUpdate,
    ) -> Result<&Locality> {
        ctx.require_admin("update")?;
        let current = self.get(id)?.clone();
        let relocate = update.position.is_some_and(|p| p != current.position)
            || update
                .agency_code
                .as_ref()
                .is_some_and(|c| *c != current.agency_code);

        let mut changed = current;
        if let Some(commune) = update.commune {
            changed.commune = commune;
        }
        if let Some(code) = update.agency_code {
            changed.agency_code = code;
        }
        if let Some(position) = update.position {
            changed.position = position;
        }
        if relocate {
            changed = self.locate(changed)?;
        }

        tracing::info!(%id, relocate, user = %ctx.username, "locality updated");
        self.localities.insert(id, changed);
        self.get(id)
    }

    pub fn delete(&mut self, ctx: &AccessContext, id: LocalityId) -> Result<Locality> {
        ctx.require_admin("delete")?;
        let removed = self
            .localities
            .remove(&id)
            .ok_or_else(|| Error::Lookup(format!("no locality {}", id)))?;
        tracing::info!(%id, commune = %removed.commune, user = %ctx.username, "locality deleted");
        Ok(removed)
    }

    /// Distance from the registered agency, or from the position carried by
    /// the locality; a locality with neither keeps a given distance
    fn locate(&self, mut locality: Locality) -> Result<Locality> {
        let agency = self
            .agencies
            .get(&locality.agency_code)
            .cloned()
            .or_else(|| {
                locality.agency_position.map(|position| Agency {
                    code: locality.agency_code.clone(),
                    position,
                })
            });
        match agency {
            Some(agency) => {
                let (distance, zone) = self.thresholds.locate(&locality, &agency)?;
                locality.distance_km = Some(distance);
                locality.zone = Some(zone);
                locality.agency_position = Some(agency.position);
            }
            None => {
                let distance = locality.distance_km.ok_or_else(|| {
                    Error::input(format!(
                        "{}: unknown agency '{}' and no distance given",
                        locality.commune, locality.agency_code
                    ))
                })?;
                locality.zone = Some(self.thresholds.classify(distance)?);
            }
        }
        Ok(locality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Zone;
    use pretty_assertions::assert_eq;

    fn at(lat: f64, lon: f64) -> Coordinates {
        Coordinates::new(lat, lon).unwrap()
    }

    fn registry() -> LocalityRegistry {
        LocalityRegistry::new(
            ZoneThresholds::default(),
            vec![Agency {
                code: "NT14G".into(),
                position: at(49.18, -0.37),
            }],
        )
    }

    fn locality(commune: &str, position: Coordinates) -> Locality {
        Locality {
            commune: commune.into(),
            agency_code: "NT14G".into(),
            position,
            distance_km: None,
            zone: None,
            agency_position: None,
        }
    }

    fn admin() -> AccessContext {
        AccessContext::new("alice", Role::Admin)
    }

    #[test]
    fn test_viewer_cannot_mutate() {
        let mut reg = registry();
        let viewer = AccessContext::new("bob", Role::Viewer);
        let err = reg
            .insert(&viewer, locality("Caen", at(49.18, -0.37)))
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
        assert!(reg.is_empty());

        let id = reg.insert(&admin(), locality("Caen", at(49.18, -0.37))).unwrap();
        assert!(matches!(
            reg.delete(&viewer, id),
            Err(Error::Unauthorized(_))
        ));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_insert_computes_distance_and_zone() {
        let mut reg = registry();
        let id = reg.insert(&admin(), locality("Caen", at(49.18, -0.37))).unwrap();
        let caen = reg.get(id).unwrap();
        assert_eq!(caen.distance_km, Some(0.0));
        assert_eq!(caen.zone, Some(Zone::Zone1));
    }

    #[test]
    fn test_update_position_recomputes_zone() {
        let mut reg = registry();
        let id = reg.insert(&admin(), locality("Vire", at(49.18, -0.37))).unwrap();
        let update = LocalityUpdate {
            position: Some(at(48.84, -0.89)),
            ..LocalityUpdate::default()
        };
        let vire = reg.update(&admin(), id, update).unwrap();
        let distance = vire.distance_km.unwrap();
        assert!(distance > 40.0, "{}", distance);
        assert_eq!(vire.zone, Some(Zone::Zone3));
    }

    #[test]
    fn test_rename_keeps_distance() {
        let mut reg = registry();
        let id = reg.insert(&admin(), locality("Caen", at(49.18, -0.37))).unwrap();
        let update = LocalityUpdate {
            commune: Some("Caen Centre".into()),
            ..LocalityUpdate::default()
        };
        let renamed = reg.update(&admin(), id, update).unwrap();
        assert_eq!(renamed.commune, "Caen Centre");
        assert_eq!(renamed.distance_km, Some(0.0));
    }

    #[test]
    fn test_unknown_agency_needs_distance() {
        let mut reg = registry();
        let mut row = locality("Alençon", at(48.43, 0.09));
        row.agency_code = "NT61L".into();
        assert!(matches!(
            reg.insert(&admin(), row.clone()),
            Err(Error::InputValidation(_))
        ));
        row.distance_km = Some(25.0);
        let id = reg.insert(&admin(), row).unwrap();
        assert_eq!(reg.get(id).unwrap().zone, Some(Zone::Zone2));
    }

    #[test]
    fn test_delete_unknown_is_lookup() {
        let mut reg = registry();
        assert!(matches!(
            reg.delete(&admin(), LocalityId(7)),
            Err(Error::Lookup(_))
        ));
    }

    #[test]
    fn test_authenticate() {
        let mut creds = Credentials::new();
        creds.add_user("alice", "s3cret", Role::Admin);
        let ctx = creds.authenticate("alice", "s3cret").unwrap();
        assert!(ctx.is_admin());
        assert!(matches!(
            creds.authenticate("alice", "wrong"),
            Err(Error::Unauthorized(_))
        ));
        assert!(creds.authenticate("mallory", "s3cret").is_err());
        assert_ne!(creds.users["alice"].password_sha256, "s3cret");
        assert_eq!(creds.users["alice"].password_sha256.len(), 64);
    }
}
