use serde::Serialize;
use sqlx::FromRow;

/// User record in the store. Email is the identity and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string, not exposed in JSON
    pub image_path: String,    // empty until an upload succeeds
}

impl User {
    pub fn new(name: String, email: String, password_hash: String) -> Self {
        Self {
            name,
            email,
            password_hash,
            image_path: String::new(),
        }
    }
}

/// Field-scoped change to a stored user. `None` leaves the column as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub password_hash: Option<String>,
    pub image_path: Option<String>,
}

impl UserUpdate {
    pub fn apply_to(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(hash) = &self.password_hash {
            user.password_hash = hash.clone();
        }
        if let Some(path) = &self.image_path {
            user.image_path = path.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialization_hides_hash() {
        let mut user = User::new("Jane Doe".into(), "jane@uni.edu".into(), "$argon2id$x".into());
        user.image_path = "images/1.png".into();

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "Jane Doe",
                "email": "jane@uni.edu",
                "imagePath": "images/1.png"
            })
        );
    }

    #[test]
    fn update_touches_only_given_fields() {
        let mut user = User::new("Jane".into(), "jane@uni.edu".into(), "old".into());
        user.image_path = "images/1.png".into();

        let update = UserUpdate {
            password_hash: Some("new".into()),
            ..Default::default()
        };
        update.apply_to(&mut user);

        assert_eq!(user.name, "Jane");
        assert_eq!(user.password_hash, "new");
        assert_eq!(user.image_path, "images/1.png");
    }
}
