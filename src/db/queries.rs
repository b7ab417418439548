use crate::db::Database;
use crate::error::{FertiplanError, Result};
use crate::logic::deficit::validate_boost;
use crate::models::{
    default_catalog, FertilizerCategory, FertilizerProduct, RemovalRate, RemovalRateTable,
};
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

const SEEDED_AT_KEY: &str = "seeded_at";
const NITROGEN_BOOST_KEY: &str = "nitrogen_efficiency_boost";

// Seeding

impl Database {
    /// Writes the starter catalog and removal rates the first time a store
    /// is opened. Later opens leave user edits alone, even an emptied catalog.
    pub fn seed_defaults(&self) -> Result<()> {
        self.with_conn_mut(|conn| {
            if get_setting(conn, SEEDED_AT_KEY)?.is_some() {
                return Ok(());
            }

            let tx = conn.transaction()?;
            insert_defaults(&tx)?;
            set_setting(&tx, SEEDED_AT_KEY, &Utc::now().to_rfc3339())?;
            tx.commit()?;

            info!("Seeded store with default catalog and removal rates");
            Ok(())
        })
    }

    /// Drops every fertilizer, removal rate and setting, then reseeds.
    pub fn reset_to_defaults(&self) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute_batch(
                r#"
                DELETE FROM fertilizers;
                DELETE FROM removal_rates;
                DELETE FROM settings;
                "#,
            )?;
            insert_defaults(&tx)?;
            set_setting(&tx, SEEDED_AT_KEY, &Utc::now().to_rfc3339())?;
            tx.commit()?;

            info!("Store reset to defaults");
            Ok(())
        })
    }
}

fn insert_defaults(conn: &Connection) -> Result<()> {
    for product in default_catalog() {
        upsert_fertilizer_row(conn, &product)?;
    }
    for (crop, rate) in RemovalRateTable::default().entries() {
        upsert_rate_row(conn, crop, rate)?;
    }
    Ok(())
}

// Fertilizer Queries

impl Database {
    /// Catalog in insertion order. Any unreadable or out-of-range row fails
    /// the whole listing.
    pub fn list_fertilizers(&self) -> Result<Vec<FertilizerProduct>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM fertilizers ORDER BY position, id")?;
            let products = stmt
                .query_map([], row_to_fertilizer)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| malformed_row(e, FertiplanError::InvalidCatalog))?;
            for product in &products {
                product.validate()?;
            }
            Ok(products)
        })
    }

    pub fn get_fertilizer(&self, id: &str) -> Result<Option<FertilizerProduct>> {
        self.with_conn(|conn| {
            let product = conn
                .query_row(
                    "SELECT * FROM fertilizers WHERE id = ?1",
                    [id],
                    row_to_fertilizer,
                )
                .optional()
                .map_err(|e| malformed_row(e, FertiplanError::InvalidCatalog))?;
            if let Some(product) = &product {
                product.validate()?;
            }
            Ok(product)
        })
    }

    /// Inserts a new product at the end of the catalog, or updates an
    /// existing one in place.
    pub fn upsert_fertilizer(&self, product: &FertilizerProduct) -> Result<()> {
        product.validate()?;
        self.with_conn(|conn| upsert_fertilizer_row(conn, product))
    }

    pub fn delete_fertilizer(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM fertilizers WHERE id = ?1", [id])?;
            if deleted == 0 {
                return Err(FertiplanError::NotFound(format!("fertilizer '{}'", id)));
            }
            Ok(())
        })
    }
}

fn upsert_fertilizer_row(conn: &Connection, product: &FertilizerProduct) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO fertilizers
            (id, position, name, category, price, bag_weight_lb, n, p, k,
             s, ca, mg, zn, b, fe, mn, cu, updated_at)
        VALUES
            (?1, (SELECT COALESCE(MAX(position), 0) + 1 FROM fertilizers), ?2, ?3, ?4, ?5, ?6, ?7, ?8,
             ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name, category = excluded.category, price = excluded.price,
            bag_weight_lb = excluded.bag_weight_lb, n = excluded.n, p = excluded.p,
            k = excluded.k, s = excluded.s, ca = excluded.ca, mg = excluded.mg,
            zn = excluded.zn, b = excluded.b, fe = excluded.fe, mn = excluded.mn,
            cu = excluded.cu, updated_at = excluded.updated_at
        "#,
        params![
            product.id,
            product.name,
            product.category.as_str(),
            product.price,
            product.bag_weight_lb,
            product.n,
            product.p,
            product.k,
            product.s,
            product.ca,
            product.mg,
            product.zn,
            product.b,
            product.fe,
            product.mn,
            product.cu,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn row_to_fertilizer(row: &Row) -> rusqlite::Result<FertilizerProduct> {
    let id: String = row.get("id")?;
    let category_str: String = row.get("category")?;

    let category = FertilizerCategory::from_str(&category_str).ok_or_else(|| {
        let column = row.as_ref().column_index("category").unwrap_or(0);
        rusqlite::Error::FromSqlConversionFailure(
            column,
            Type::Text,
            format!("product '{}' has unknown category '{}'", id, category_str).into(),
        )
    })?;

    Ok(FertilizerProduct {
        id,
        name: row.get("name")?,
        category,
        price: row.get("price")?,
        bag_weight_lb: row.get("bag_weight_lb")?,
        n: row.get("n")?,
        p: row.get("p")?,
        k: row.get("k")?,
        s: row.get("s")?,
        ca: row.get("ca")?,
        mg: row.get("mg")?,
        zn: row.get("zn")?,
        b: row.get("b")?,
        fe: row.get("fe")?,
        mn: row.get("mn")?,
        cu: row.get("cu")?,
    })
}

// Removal Rate Queries

impl Database {
    pub fn load_removal_table(&self) -> Result<RemovalRateTable> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT crop, n, p, k FROM removal_rates ORDER BY crop")?;
            let rows: Vec<(String, RemovalRate)> = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        RemovalRate::new(row.get(1)?, row.get(2)?, row.get(3)?),
                    ))
                })?
                .collect::<rusqlite::Result<_>>()
                .map_err(|e| malformed_row(e, FertiplanError::Config))?;

            let default = rows
                .iter()
                .find(|(crop, _)| crop == RemovalRateTable::DEFAULT_KEY)
                .map(|(_, rate)| *rate)
                .ok_or_else(|| {
                    FertiplanError::Config("no default removal rate stored".into())
                })?;

            let mut table = RemovalRateTable::new(default);
            for (crop, rate) in rows {
                if crop != RemovalRateTable::DEFAULT_KEY {
                    table.insert(&crop, rate);
                }
            }
            table.validate()?;
            Ok(table)
        })
    }

    pub fn upsert_removal_rate(&self, crop: &str, rate: RemovalRate) -> Result<()> {
        let key = crop.trim().to_lowercase();
        if key.is_empty() {
            return Err(FertiplanError::InvalidData("crop id cannot be empty".into()));
        }
        if !rate.is_valid() {
            return Err(FertiplanError::InvalidData(format!(
                "removal rate for '{}' must be finite and non-negative",
                key
            )));
        }
        self.with_conn(|conn| upsert_rate_row(conn, &key, &rate))
    }

    pub fn delete_removal_rate(&self, crop: &str) -> Result<()> {
        let key = crop.trim().to_lowercase();
        if key == RemovalRateTable::DEFAULT_KEY {
            return Err(FertiplanError::InvalidData(
                "the default removal rate cannot be removed".into(),
            ));
        }
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM removal_rates WHERE crop = ?1", [&key])?;
            if deleted == 0 {
                return Err(FertiplanError::NotFound(format!("removal rate for '{}'", key)));
            }
            Ok(())
        })
    }
}

fn upsert_rate_row(conn: &Connection, crop: &str, rate: &RemovalRate) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO removal_rates (crop, n, p, k, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(crop) DO UPDATE SET
            n = excluded.n, p = excluded.p, k = excluded.k, updated_at = excluded.updated_at
        "#,
        params![crop, rate.n, rate.p, rate.k, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

// Settings Queries

impl Database {
    /// Stored nitrogen-efficiency boost, if one was ever saved.
    pub fn nitrogen_boost(&self) -> Result<Option<f64>> {
        self.with_conn(|conn| {
            let Some(raw) = get_setting(conn, NITROGEN_BOOST_KEY)? else {
                return Ok(None);
            };
            let value = raw.parse::<f64>().map_err(|_| {
                FertiplanError::Config(format!("stored nitrogen boost '{}' is not a number", raw))
            })?;
            validate_boost(value)?;
            Ok(Some(value))
        })
    }

    pub fn set_nitrogen_boost(&self, boost: f64) -> Result<()> {
        validate_boost(boost)?;
        self.with_conn(|conn| set_setting(conn, NITROGEN_BOOST_KEY, &boost.to_string()))
    }
}

/// Value conversion failures mean a corrupt row; anything else is a
/// database error.
fn malformed_row(e: rusqlite::Error, kind: fn(String) -> FertiplanError) -> FertiplanError {
    match e {
        rusqlite::Error::FromSqlConversionFailure(..)
        | rusqlite::Error::InvalidColumnType(..)
        | rusqlite::Error::IntegralValueOutOfRange(..) => kind(format!("unreadable row: {}", e)),
        other => FertiplanError::Database(other),
    }
}

fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM settings WHERE key = ?1",
        [key],
        |row| row.get(0),
    )
    .optional()
    .map_err(Into::into)
}

fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO settings (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Nutrient;

    #[test]
    fn new_store_is_seeded() {
        let db = Database::open_in_memory().unwrap();

        let catalog = db.list_fertilizers().unwrap();
        assert_eq!(catalog, default_catalog());

        let table = db.load_removal_table().unwrap();
        assert_eq!(table, RemovalRateTable::default());
    }

    #[test]
    fn seeding_runs_only_once() {
        let db = Database::open_in_memory().unwrap();
        for product in db.list_fertilizers().unwrap() {
            db.delete_fertilizer(&product.id).unwrap();
        }

        db.seed_defaults().unwrap();
        assert!(db.list_fertilizers().unwrap().is_empty());
    }

    #[test]
    fn new_products_go_to_the_end() {
        let db = Database::open_in_memory().unwrap();
        let product = FertilizerProduct::new(
            "sulfammo",
            "Sulfammo 23",
            FertilizerCategory::Specialized,
            52.0,
            (23.0, 0.0, 0.0),
        )
        .with_content(Nutrient::S, 12.0)
        .with_bag_weight(110.0);

        db.upsert_fertilizer(&product).unwrap();

        let catalog = db.list_fertilizers().unwrap();
        assert_eq!(catalog.len(), default_catalog().len() + 1);
        assert_eq!(catalog.last(), Some(&product));
    }

    #[test]
    fn updating_a_product_keeps_its_position() {
        let db = Database::open_in_memory().unwrap();
        let mut urea = db.get_fertilizer("urea").unwrap().unwrap();
        urea.price = 38.5;

        db.upsert_fertilizer(&urea).unwrap();

        let catalog = db.list_fertilizers().unwrap();
        assert_eq!(catalog[0].id, "urea");
        assert_eq!(catalog[0].price, 38.5);
        assert_eq!(catalog.len(), default_catalog().len());
    }

    #[test]
    fn invalid_products_are_rejected() {
        let db = Database::open_in_memory().unwrap();
        let bad = FertilizerProduct::new("bad", "Bad", FertilizerCategory::Commodity, -1.0, (1.0, 1.0, 1.0));
        assert!(matches!(
            db.upsert_fertilizer(&bad),
            Err(FertiplanError::InvalidCatalog(_))
        ));
        assert!(db.get_fertilizer("bad").unwrap().is_none());
    }

    #[test]
    fn deleting_missing_product_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            db.delete_fertilizer("nope"),
            Err(FertiplanError::NotFound(_))
        ));
    }

    #[test]
    fn removal_rates_crud() {
        let db = Database::open_in_memory().unwrap();

        db.upsert_removal_rate("  Sorgo ", RemovalRate::new(30.0, 12.0, 25.0))
            .unwrap();
        let table = db.load_removal_table().unwrap();
        assert!(table.contains("sorgo"));
        assert_eq!(table.lookup("SORGO").n, 30.0);

        db.delete_removal_rate("sorgo").unwrap();
        assert!(!db.load_removal_table().unwrap().contains("sorgo"));

        assert!(db
            .upsert_removal_rate("maiz", RemovalRate::new(-1.0, 0.0, 0.0))
            .is_err());
    }

    #[test]
    fn default_rate_is_protected() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            db.delete_removal_rate("default"),
            Err(FertiplanError::InvalidData(_))
        ));

        db.upsert_removal_rate("default", RemovalRate::new(18.0, 8.0, 18.0))
            .unwrap();
        assert_eq!(db.load_removal_table().unwrap().lookup("unknown").n, 18.0);
    }

    #[test]
    fn nitrogen_boost_setting() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.nitrogen_boost().unwrap(), None);

        db.set_nitrogen_boost(1.35).unwrap();
        assert_eq!(db.nitrogen_boost().unwrap(), Some(1.35));

        assert!(db.set_nitrogen_boost(0.5).is_err());
        assert_eq!(db.nitrogen_boost().unwrap(), Some(1.35));
    }

    #[test]
    fn unknown_stored_category_is_an_error() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            conn.execute(
                "UPDATE fertilizers SET category = 'specialised' WHERE id = 'nitroxtend'",
                [],
            )?;
            Ok(())
        })
        .unwrap();

        assert!(matches!(
            db.list_fertilizers(),
            Err(FertiplanError::InvalidCatalog(_))
        ));
        assert!(matches!(
            db.get_fertilizer("nitroxtend"),
            Err(FertiplanError::InvalidCatalog(_))
        ));
    }

    #[test]
    fn unreadable_stored_number_fails_the_catalog() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            conn.execute("UPDATE fertilizers SET n = 'abc' WHERE id = '17-6-18'", [])?;
            Ok(())
        })
        .unwrap();

        assert!(matches!(
            db.list_fertilizers(),
            Err(FertiplanError::InvalidCatalog(_))
        ));
    }

    #[test]
    fn out_of_range_stored_product_fails_the_catalog() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            conn.execute("UPDATE fertilizers SET k = 140 WHERE id = '0-0-60'", [])?;
            Ok(())
        })
        .unwrap();

        assert!(matches!(
            db.list_fertilizers(),
            Err(FertiplanError::InvalidCatalog(_))
        ));
    }

    #[test]
    fn malformed_removal_rates_are_config_errors() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            conn.execute("UPDATE removal_rates SET p = 'x' WHERE crop = 'maiz'", [])?;
            Ok(())
        })
        .unwrap();
        assert!(matches!(
            db.load_removal_table(),
            Err(FertiplanError::Config(_))
        ));

        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            conn.execute("DELETE FROM removal_rates WHERE crop = 'default'", [])?;
            Ok(())
        })
        .unwrap();
        assert!(matches!(
            db.load_removal_table(),
            Err(FertiplanError::Config(_))
        ));
    }

    #[test]
    fn unreadable_stored_boost_is_an_error() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| set_setting(conn, NITROGEN_BOOST_KEY, "fast"))
            .unwrap();
        assert!(matches!(db.nitrogen_boost(), Err(FertiplanError::Config(_))));

        db.with_conn(|conn| set_setting(conn, NITROGEN_BOOST_KEY, "0.4"))
            .unwrap();
        assert!(matches!(db.nitrogen_boost(), Err(FertiplanError::Config(_))));
    }

    #[test]
    fn reset_restores_defaults() {
        let db = Database::open_in_memory().unwrap();
        db.delete_fertilizer("urea").unwrap();
        db.delete_removal_rate("cafe").unwrap();
        db.set_nitrogen_boost(1.5).unwrap();

        db.reset_to_defaults().unwrap();

        assert_eq!(db.list_fertilizers().unwrap(), default_catalog());
        assert_eq!(db.load_removal_table().unwrap(), RemovalRateTable::default());
        assert_eq!(db.nitrogen_boost().unwrap(), None);
    }
}
