use anyhow::Result;

use crate::Database;
use crate::models::CategoryRow;

impl Database {
    pub fn list_categories(&self) -> Result<Vec<CategoryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, name, created_at FROM categories ORDER BY created_at, rowid")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(CategoryRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn category_exists(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let exists = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM categories WHERE id = ?1)",
                [id],
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
    fn default_categories_are_seeded_in_order() {
        let db = test_support::db();
        let names: Vec<_> = db
            .list_categories()
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Funny", "Animals", "Sports"]);

        let id = test_support::category(&db);
        assert!(db.category_exists(&id).unwrap());
        assert!(!db.category_exists("nope").unwrap());
    }
}
