use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Profile record returned by the auth endpoints.
///
/// The backend owns the schema, so the profile is kept as an open JSON object
/// with typed accessors for the fields the client actually relies on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProfile(Map<String, Value>);

impl UserProfile {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// `id` or the document store's `_id`
    pub fn id(&self) -> Option<String> {
        let value = self.0.get("id").or_else(|| self.0.get("_id"))?;
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    pub fn email(&self) -> Option<&str> {
        self.0.get("email").and_then(Value::as_str)
    }

    pub fn role(&self) -> Option<&str> {
        self.0.get("role").and_then(Value::as_str)
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some("admin")
    }

    /// Name for display, falling back to email and then id.
    pub fn display_name(&self) -> String {
        self.name()
            .or_else(|| self.email())
            .map(str::to_string)
            .or_else(|| self.id())
            .unwrap_or_else(|| "unknown user".to_string())
    }

    /// Overlay `changes` on this profile, field by field.
    pub fn merge(&mut self, changes: &UserProfile) {
        for (key, value) in &changes.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }
}

impl From<Map<String, Value>> for UserProfile {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// `data` of a successful login or registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Partial profile change sent to `PUT /auth/profile`. Unset fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.address.is_none()
            && self.extra.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn profile(value: Value) -> UserProfile {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_accessors() {
        let user = profile(json!({"id": 1, "role": "admin", "email": "a@b.com"}));
        assert_eq!(user.id().as_deref(), Some("1"));
        assert!(user.is_admin());
        assert_eq!(user.display_name(), "a@b.com");

        let mongo = profile(json!({"_id": "64f0", "name": "Ana", "role": "customer"}));
        assert_eq!(mongo.id().as_deref(), Some("64f0"));
        assert!(!mongo.is_admin());
        assert_eq!(mongo.display_name(), "Ana");
    }

    #[test]
    fn test_merge_overlays_fields() {
        let mut user = profile(json!({"id": 1, "name": "Ana", "role": "admin"}));
        user.merge(&profile(json!({"name": "Ana Maria", "phone": "555"})));
        assert_eq!(
            serde_json::to_value(&user).unwrap(),
            json!({"id": 1, "name": "Ana Maria", "role": "admin", "phone": "555"})
        );
    }

    #[test]
    fn test_profile_update_skips_unset_fields() {
        let update = ProfileUpdate {
            name: Some("Ana".to_string()),
            ..Default::default()
        };
        assert!(!update.is_empty());
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({"name": "Ana"}));
        assert!(ProfileUpdate::default().is_empty());
    }
}
