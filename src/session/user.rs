use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Profile returned by login and refresh responses. Unknown fields are kept
/// so that persisting a profile does not drop what the server sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::UserProfile;
    use serde_json::json;

    #[test]
    fn keeps_unknown_fields_and_accepts_mongo_id() {
        let user: UserProfile = serde_json::from_value(json!({
            "_id": "64f1c0ffee",
            "name": "Ada",
            "email": "ada@example.com",
            "role": "admin",
            "avatarUrl": "https://cdn.example.com/a.png"
        }))
        .unwrap();

        assert_eq!(user.id.as_deref(), Some("64f1c0ffee"));
        assert_eq!(user.role.as_deref(), Some("admin"));

        let stored = serde_json::to_value(&user).unwrap();
        assert_eq!(stored["id"], "64f1c0ffee");
        assert_eq!(stored["avatarUrl"], "https://cdn.example.com/a.png");
    }
}
