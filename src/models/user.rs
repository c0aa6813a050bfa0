use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, sqlx::FromRow, Debug, Clone)]
pub struct User {
    pub id: u32,
    pub name: String,
    pub email_address: String,
    pub notify: bool,
}

// The struct used for receiving user data for creating a user record as json
#[derive(Deserialize, Serialize, Debug)]
pub struct NewUser {
    pub name: String,
    pub email_address: String,
    #[serde(default = "default_notify")]
    pub notify: bool,
}

fn default_notify() -> bool {
    true
}
