use crate::prelude::IdentityError;
use crate::target::snapshot::TargetSnapshot;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

const U64_MAX_DIGITS: &str = "18446744073709551615";

/// Identifier families that can be generated for an open track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKind {
    Id,
    MobileId,
    SatelliteId,
}

impl IdentityKind {
    fn is_numeric(&self) -> bool {
        !matches!(self, Self::SatelliteId)
    }
}

impl fmt::Display for IdentityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Id => "id",
            Self::MobileId => "mobile id",
            Self::SatelliteId => "satellite id",
        };
        f.write_str(name)
    }
}

/// Fixed prefix followed by random decimal digits up to `length` characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdTemplate {
    pub prefix: String,
    pub length: usize,
}

impl IdTemplate {
    pub fn new(prefix: impl Into<String>, length: usize) -> Self {
        Self {
            prefix: prefix.into(),
            length,
        }
    }

    pub fn validate(&self, kind: IdentityKind) -> Result<(), IdentityError> {
        if !self.prefix.chars().all(|c| c.is_ascii_digit()) {
            return Err(IdentityError::InvalidPrefix {
                kind,
                prefix: self.prefix.clone(),
            });
        }
        if self.length <= self.prefix.len() {
            return Err(IdentityError::TooShort {
                kind,
                prefix: self.prefix.clone(),
                length: self.length,
            });
        }
        if kind.is_numeric() {
            let widest = format!(
                "{}{}",
                self.prefix,
                "9".repeat(self.length - self.prefix.len())
            );
            let overflows = widest.len() > U64_MAX_DIGITS.len()
                || (widest.len() == U64_MAX_DIGITS.len() && widest.as_str() > U64_MAX_DIGITS);
            if overflows {
                return Err(IdentityError::Overflow {
                    kind,
                    length: self.length,
                });
            }
        }
        Ok(())
    }

    pub fn generate<R: Rng + ?Sized>(&self, kind: IdentityKind, rng: &mut R) -> Result<String, IdentityError> {
        self.validate(kind)?;
        let mut value = String::with_capacity(self.length);
        value.push_str(&self.prefix);
        for _ in self.prefix.len()..self.length {
            let digit = rng.gen_range(0..10u8);
            value.push(char::from(b'0' + digit));
        }
        Ok(value)
    }

    fn generate_numeric<R: Rng + ?Sized>(&self, kind: IdentityKind, rng: &mut R) -> Result<u64, IdentityError> {
        let text = self.generate(kind, rng)?;
        text.parse::<u64>().map_err(|_| IdentityError::Overflow {
            kind,
            length: self.length,
        })
    }
}

/// Templates used when an open track is missing an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityPolicy {
    pub id: IdTemplate,
    pub mobile_id: IdTemplate,
    pub satellite_id: IdTemplate,
}

impl Default for IdentityPolicy {
    fn default() -> Self {
        Self {
            id: IdTemplate::new("11", 20),
            mobile_id: IdTemplate::new("41", 9),
            satellite_id: IdTemplate::new("1", 7),
        }
    }
}

impl IdentityPolicy {
    pub fn validate(&self) -> Result<(), IdentityError> {
        self.id.validate(IdentityKind::Id)?;
        self.mobile_id.validate(IdentityKind::MobileId)?;
        self.satellite_id.validate(IdentityKind::SatelliteId)
    }
}

/// Identifiers filled in by [`ensure_identity`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedIdentity {
    pub id: Option<u64>,
    pub mobile_id: Option<u64>,
    pub satellite_id: Option<String>,
}

impl GeneratedIdentity {
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.mobile_id.is_none() && self.satellite_id.is_none()
    }
}

/// Fills the identifiers the snapshot's class requires but does not carry yet.
///
/// Populated identifiers are never replaced, so calling this before every
/// assembly generates each identifier at most once per open track.
pub fn ensure_identity<R: Rng + ?Sized>(
    snapshot: &mut TargetSnapshot,
    policy: &IdentityPolicy,
    rng: &mut R,
) -> Result<GeneratedIdentity, IdentityError> {
    let mut generated = GeneratedIdentity::default();
    let class = snapshot.class;

    if class.requires_id() && snapshot.id == 0 {
        let id = policy.id.generate_numeric(IdentityKind::Id, rng)?;
        snapshot.id = id;
        generated.id = Some(id);
    }
    if class.requires_mobile_id() && snapshot.mobile_id == 0 {
        let mobile_id = policy.mobile_id.generate_numeric(IdentityKind::MobileId, rng)?;
        snapshot.mobile_id = mobile_id;
        generated.mobile_id = Some(mobile_id);
    }
    if class.requires_satellite_id() && snapshot.satellite_id.trim().is_empty() {
        let satellite_id = policy
            .satellite_id
            .generate(IdentityKind::SatelliteId, rng)?;
        snapshot.satellite_id = satellite_id.clone();
        generated.satellite_id = Some(satellite_id);
    }

    Ok(generated)
}
