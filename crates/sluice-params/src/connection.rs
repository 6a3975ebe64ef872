//! Connection references and resolution.
//!
//! Connection-typed parameters carry an opaque textual identifier which is
//! resolved into a concrete [`Connection`] bundle (credentials, endpoints)
//! by a [`ConnectionResolver`] collaborator. Two resolvers are provided:
//! [`StaticConnectionResolver`] over an explicitly supplied set of
//! connections, and [`EnvConnectionResolver`] which reads the local
//! environment. The choice of resolver is the "connected vs. local" mode
//! switch; it is always constructed explicitly and passed in.

use std::collections::{BTreeMap, HashMap};
use std::env;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

/// The external system a connection points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionKind {
  Dhis2,
  Postgresql,
  S3,
  Gcs,
  Iaso,
  Custom,
}

impl ConnectionKind {
  /// Wire-format type tag, shared with parameter specs.
  pub fn spec_type(&self) -> &'static str {
    match self {
      ConnectionKind::Dhis2 => "dhis2",
      ConnectionKind::Postgresql => "postgresql",
      ConnectionKind::S3 => "s3",
      ConnectionKind::Gcs => "gcs",
      ConnectionKind::Iaso => "iaso",
      ConnectionKind::Custom => "custom",
    }
  }

  /// Field names an environment-resolved connection of this kind carries.
  ///
  /// Custom connections have no fixed field list; they are collected by
  /// prefix scan instead.
  fn field_names(&self) -> &'static [&'static str] {
    match self {
      ConnectionKind::Dhis2 | ConnectionKind::Iaso => &["url", "username", "password"],
      ConnectionKind::Postgresql => &["host", "port", "username", "password", "database_name"],
      ConnectionKind::S3 => &["access_key_id", "secret_access_key", "bucket_name"],
      ConnectionKind::Gcs => &["service_account_key", "bucket_name"],
      ConnectionKind::Custom => &[],
    }
  }
}

/// A resolved credential/endpoint bundle for an external system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
  pub kind: ConnectionKind,
  pub identifier: String,
  pub fields: BTreeMap<String, String>,
}

impl Connection {
  /// Create an empty connection of the given kind.
  pub fn new(kind: ConnectionKind, identifier: impl Into<String>) -> Self {
    Self {
      kind,
      identifier: identifier.into(),
      fields: BTreeMap::new(),
    }
  }

  /// Add a named field.
  pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.fields.insert(name.into(), value.into());
    self
  }

  /// Look up a field by name.
  pub fn field(&self, name: &str) -> Option<&str> {
    self.fields.get(name).map(String::as_str)
  }

  /// JSON object representation, used as the validated parameter value.
  pub fn to_value(&self) -> Value {
    json!({
      "kind": self.kind.spec_type(),
      "identifier": self.identifier,
      "fields": self.fields,
    })
  }
}

/// A referenced connection identifier could not be resolved.
#[derive(Debug, Error)]
#[error("connection '{identifier}' does not exist")]
pub struct ConnectionDoesNotExist {
  pub identifier: String,
}

/// Resolves connection identifiers into concrete connections.
pub trait ConnectionResolver: Send + Sync {
  fn resolve(
    &self,
    kind: ConnectionKind,
    identifier: &str,
  ) -> Result<Connection, ConnectionDoesNotExist>;
}

/// Resolver over an explicitly supplied set of connections.
///
/// This is the "connected" mode: the surrounding platform preloads every
/// connection a run may reference.
#[derive(Debug, Clone, Default)]
pub struct StaticConnectionResolver {
  connections: HashMap<String, Connection>,
}

impl StaticConnectionResolver {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a connection under its identifier.
  pub fn with_connection(mut self, connection: Connection) -> Self {
    self
      .connections
      .insert(connection.identifier.clone(), connection);
    self
  }
}

impl ConnectionResolver for StaticConnectionResolver {
  fn resolve(
    &self,
    kind: ConnectionKind,
    identifier: &str,
  ) -> Result<Connection, ConnectionDoesNotExist> {
    match self.connections.get(identifier) {
      Some(connection) if connection.kind == kind => Ok(connection.clone()),
      _ => Err(ConnectionDoesNotExist {
        identifier: identifier.to_string(),
      }),
    }
  }
}

/// Resolver backed by environment variables ("local" mode).
///
/// Fields are read from `<IDENTIFIER>_<FIELD>` variables, with the
/// identifier uppercased and dashes mapped to underscores. Custom
/// connections collect every variable under the `<IDENTIFIER>_` prefix.
#[derive(Debug, Clone, Default)]
pub struct EnvConnectionResolver;

impl EnvConnectionResolver {
  pub fn new() -> Self {
    Self
  }

  fn env_prefix(identifier: &str) -> String {
    identifier.to_uppercase().replace('-', "_")
  }
}

impl ConnectionResolver for EnvConnectionResolver {
  fn resolve(
    &self,
    kind: ConnectionKind,
    identifier: &str,
  ) -> Result<Connection, ConnectionDoesNotExist> {
    let prefix = Self::env_prefix(identifier);
    let mut fields = BTreeMap::new();

    if kind == ConnectionKind::Custom {
      let marker = format!("{prefix}_");
      for (key, value) in env::vars() {
        if let Some(field) = key.strip_prefix(&marker) {
          fields.insert(field.to_lowercase(), value);
        }
      }
      if fields.is_empty() {
        return Err(ConnectionDoesNotExist {
          identifier: identifier.to_string(),
        });
      }
    } else {
      for field in kind.field_names() {
        let key = format!("{prefix}_{}", field.to_uppercase());
        match env::var(&key) {
          Ok(value) => {
            fields.insert((*field).to_string(), value);
          }
          Err(_) => {
            return Err(ConnectionDoesNotExist {
              identifier: identifier.to_string(),
            });
          }
        }
      }
    }

    Ok(Connection {
      kind,
      identifier: identifier.to_string(),
      fields,
    })
  }
}
