use anyhow::Result;

use super::OptionalExt;
use super::users::map_user;
use crate::models::UserRow;
use crate::{Database, now_timestamp};

impl Database {
    /// Issues `token` for the user and drops every session they held before,
    /// so only the newest login stays valid.
    pub fn replace_session(&self, user_id: &str, token: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let dropped = tx.execute("DELETE FROM sessions WHERE user_id = ?1", [user_id])?;
            tx.execute(
                "INSERT INTO sessions (token, user_id, created_at) VALUES (?1, ?2, ?3)",
                (token, user_id, now_timestamp()),
            )?;
            tx.commit()?;

            if dropped > 0 {
                tracing::debug!("Invalidated {} previous session(s) for {}", dropped, user_id);
            }
            Ok(())
        })
    }

    /// Resolves a bearer token to the user that owns it.
    pub fn get_session_user(&self, token: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.username, u.email, u.password, u.profile_picture, u.bio,
                        u.created_at, u.updated_at
                 FROM sessions s
                 JOIN users u ON u.id = s.user_id
                 WHERE s.token = ?1",
            )?;
            stmt.query_row([token], map_user).optional()
        })
    }

    pub fn delete_session(&self, token: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM sessions WHERE token = ?1", [token])?;
            Ok(deleted == 1)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support;

    #[test]
    fn new_session_invalidates_the_previous_one() {
        let db = test_support::db();
        let alice = test_support::user(&db, "alice");

        db.replace_session(&alice, "first").unwrap();
        assert_eq!(db.get_session_user("first").unwrap().unwrap().id, alice);

        db.replace_session(&alice, "second").unwrap();
        assert!(db.get_session_user("first").unwrap().is_none());
        assert_eq!(db.get_session_user("second").unwrap().unwrap().id, alice);
    }

    #[test]
    fn sessions_of_other_users_survive_a_login() {
        let db = test_support::db();
        let alice = test_support::user(&db, "alice");
        let bob = test_support::user(&db, "bob");

        db.replace_session(&alice, "alice-token").unwrap();
        db.replace_session(&bob, "bob-token").unwrap();

        assert!(db.get_session_user("alice-token").unwrap().is_some());
    }

    #[test]
    fn delete_session_reports_whether_it_existed() {
        let db = test_support::db();
        let alice = test_support::user(&db, "alice");
        db.replace_session(&alice, "token").unwrap();

        assert!(db.delete_session("token").unwrap());
        assert!(!db.delete_session("token").unwrap());
        assert!(db.get_session_user("token").unwrap().is_none());
    }
}
