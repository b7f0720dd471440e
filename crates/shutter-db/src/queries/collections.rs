use anyhow::Result;
use rusqlite::{Connection, Row};

use super::OptionalExt;
use crate::models::CollectionRow;
use crate::{Database, now_timestamp};

const COLLECTION_SELECT: &str = "
    SELECT c.id, c.user_id, c.name, c.created_at,
           (SELECT COUNT(*) FROM collection_posts cp WHERE cp.collection_id = c.id)
    FROM collections c";

impl Database {
    pub fn create_collection(&self, id: &str, user_id: &str, name: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO collections (id, user_id, name, created_at) VALUES (?1, ?2, ?3, ?4)",
                (id, user_id, name, now_timestamp()),
            )?;
            Ok(())
        })
    }

    /// The user's collections, newest first, with their post counts.
    pub fn list_collections(&self, user_id: &str) -> Result<Vec<CollectionRow>> {
        self.with_conn(|conn| {
            query_collections(
                conn,
                &format!(
                    "{COLLECTION_SELECT} WHERE c.user_id = ?1
                     ORDER BY c.created_at DESC, c.rowid DESC"
                ),
                (user_id,),
            )
        })
    }

    /// Looks a collection up within its owner's scope; another user's
    /// collection is indistinguishable from a missing one.
    pub fn get_collection(&self, id: &str, user_id: &str) -> Result<Option<CollectionRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("{COLLECTION_SELECT} WHERE c.id = ?1 AND c.user_id = ?2"))?;
            stmt.query_row((id, user_id), map_collection).optional()
        })
    }

    pub fn delete_collection(&self, id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM collections WHERE id = ?1 AND user_id = ?2",
                (id, user_id),
            )?;
            Ok(deleted == 1)
        })
    }

    /// Returns false when the post was already in the collection.
    pub fn add_post_to_collection(&self, id: &str, collection_id: &str, post_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO collection_posts (id, collection_id, post_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                (id, collection_id, post_id, now_timestamp()),
            )?;
            Ok(inserted == 1)
        })
    }

    pub fn remove_post_from_collection(&self, collection_id: &str, post_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM collection_posts WHERE collection_id = ?1 AND post_id = ?2",
                (collection_id, post_id),
            )?;
            Ok(deleted == 1)
        })
    }

    /// The user's collections that already hold `post_id`.
    pub fn collections_with_post(&self, user_id: &str, post_id: &str) -> Result<Vec<CollectionRow>> {
        self.with_conn(|conn| {
            query_collections(
                conn,
                &format!(
                    "{COLLECTION_SELECT}
                     WHERE c.user_id = ?1
                       AND EXISTS (SELECT 1 FROM collection_posts cp
                                   WHERE cp.collection_id = c.id AND cp.post_id = ?2)
                     ORDER BY c.created_at DESC, c.rowid DESC"
                ),
                (user_id, post_id),
            )
        })
    }

    /// The user's collections that `post_id` could still be saved into.
    pub fn collections_without_post(&self, user_id: &str, post_id: &str) -> Result<Vec<CollectionRow>> {
        self.with_conn(|conn| {
            query_collections(
                conn,
                &format!(
                    "{COLLECTION_SELECT}
                     WHERE c.user_id = ?1
                       AND NOT EXISTS (SELECT 1 FROM collection_posts cp
                                       WHERE cp.collection_id = c.id AND cp.post_id = ?2)
                     ORDER BY c.created_at DESC, c.rowid DESC"
                ),
                (user_id, post_id),
            )
        })
    }
}

fn map_collection(row: &Row<'_>) -> rusqlite::Result<CollectionRow> {
    Ok(CollectionRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        created_at: row.get(3)?,
        posts_count: row.get::<_, i64>(4)? as u64,
    })
}

fn query_collections<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<CollectionRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, map_collection)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use crate::test_support;

    #[test]
    fn membership_is_unique_and_counted() {
        let db = test_support::db();
        let alice = test_support::user(&db, "alice");
        let post = test_support::post(&db, &alice, "hello");
        db.create_collection("col", &alice, "Favourites").unwrap();

        assert!(db.add_post_to_collection("cp1", "col", &post).unwrap());
        assert!(!db.add_post_to_collection("cp2", "col", &post).unwrap());

        let collection = db.get_collection("col", &alice).unwrap().unwrap();
        assert_eq!(collection.posts_count, 1);
        assert_eq!(db.posts_in_collection("col").unwrap().len(), 1);
    }

    #[test]
    fn removing_an_absent_membership_reports_false() {
        let db = test_support::db();
        let alice = test_support::user(&db, "alice");
        let post = test_support::post(&db, &alice, "hello");
        db.create_collection("col", &alice, "Favourites").unwrap();

        assert!(!db.remove_post_from_collection("col", &post).unwrap());
        db.add_post_to_collection("cp1", "col", &post).unwrap();
        assert!(db.remove_post_from_collection("col", &post).unwrap());
        assert!(!db.remove_post_from_collection("col", &post).unwrap());
    }

    #[test]
    fn collections_are_scoped_to_their_owner() {
        let db = test_support::db();
        let alice = test_support::user(&db, "alice");
        let bob = test_support::user(&db, "bob");
        db.create_collection("col", &alice, "Favourites").unwrap();

        assert!(db.get_collection("col", &bob).unwrap().is_none());
        assert!(!db.delete_collection("col", &bob).unwrap());
        assert!(db.list_collections(&bob).unwrap().is_empty());
        assert!(db.delete_collection("col", &alice).unwrap());
    }

    #[test]
    fn with_and_without_post_partition_the_users_collections() {
        let db = test_support::db();
        let alice = test_support::user(&db, "alice");
        let post = test_support::post(&db, &alice, "hello");
        db.create_collection("a", &alice, "A").unwrap();
        db.create_collection("b", &alice, "B").unwrap();
        db.create_collection("c", &alice, "C").unwrap();
        db.add_post_to_collection("cp1", "b", &post).unwrap();

        let with: Vec<_> = db
            .collections_with_post(&alice, &post)
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        let without: Vec<_> = db
            .collections_without_post(&alice, &post)
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();

        assert_eq!(with, vec!["b"]);
        assert_eq!(without, vec!["c", "a"]);
    }

    #[test]
    fn deleting_a_collection_drops_its_memberships() {
        let db = test_support::db();
        let alice = test_support::user(&db, "alice");
        let post = test_support::post(&db, &alice, "hello");
        db.create_collection("col", &alice, "Favourites").unwrap();
        db.add_post_to_collection("cp1", "col", &post).unwrap();

        db.delete_collection("col", &alice).unwrap();
        assert!(db.bookmarked_post_ids(&alice, &[post]).unwrap().is_empty());
    }
}
