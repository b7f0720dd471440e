use anyhow::Result;

use crate::{Database, now_timestamp};

impl Database {
    /// Returns false when the user had already liked the post.
    pub fn insert_like(&self, id: &str, user_id: &str, post_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO likes (id, post_id, user_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                (id, post_id, user_id, now_timestamp()),
            )?;
            Ok(inserted == 1)
        })
    }

    pub fn delete_like(&self, user_id: &str, post_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM likes WHERE user_id = ?1 AND post_id = ?2",
                (user_id, post_id),
            )?;
            Ok(deleted == 1)
        })
    }

    pub fn has_liked(&self, user_id: &str, post_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let exists = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM likes WHERE user_id = ?1 AND post_id = ?2)",
                (user_id, post_id),
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support;

    #[test]
    fn second_like_is_ignored() {
        let db = test_support::db();
        let alice = test_support::user(&db, "alice");
        let post = test_support::post(&db, &alice, "hello");

        assert!(db.insert_like("l1", &alice, &post).unwrap());
        assert!(!db.insert_like("l2", &alice, &post).unwrap());

        let counts = db.like_counts(&[post.clone()]).unwrap();
        assert_eq!(counts.get(&post), Some(&1));
    }

    #[test]
    fn unlike_reports_whether_a_like_existed() {
        let db = test_support::db();
        let alice = test_support::user(&db, "alice");
        let post = test_support::post(&db, &alice, "hello");

        assert!(!db.delete_like(&alice, &post).unwrap());
        db.insert_like("l1", &alice, &post).unwrap();
        assert!(db.has_liked(&alice, &post).unwrap());
        assert!(db.delete_like(&alice, &post).unwrap());
        assert!(!db.has_liked(&alice, &post).unwrap());
    }

    #[test]
    fn like_on_missing_post_fails_the_foreign_key() {
        let db = test_support::db();
        let alice = test_support::user(&db, "alice");
        assert!(db.insert_like("l1", &alice, "missing").is_err());
    }
}
