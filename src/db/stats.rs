//! Aggregate statistics over the catalog.

use anyhow::Result;

use super::Database;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub trips_total: i64,
    pub places_total: i64,
    /// Place photos plus trip place photos.
    pub photos_total: i64,
    /// Trips whose start date falls within the last 12 months.
    pub trips_last_year: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopVisitedPlace {
    pub place_id: i64,
    pub name: String,
    pub visit_count: i64,
}

impl Database {
    fn count(&self, sql: &str) -> Result<i64> {
        Ok(self.conn.query_row(sql, [], |row| row.get(0))?)
    }

    pub fn get_stats(&self) -> Result<Stats> {
        let place_photos = self.count("SELECT COUNT(*) FROM place_photos")?;
        let trip_photos = self.count("SELECT COUNT(*) FROM trip_place_photos")?;
        Ok(Stats {
            trips_total: self.count("SELECT COUNT(*) FROM trips")?,
            places_total: self.count("SELECT COUNT(*) FROM places")?,
            photos_total: place_photos + trip_photos,
            trips_last_year: self.count(
                "SELECT COUNT(*) FROM trips WHERE startDate >= date('now', '-12 months')",
            )?,
        })
    }

    /// Places with visited itinerary entries, most visited first.
    pub fn get_top_visited_places(&self) -> Result<Vec<TopVisitedPlace>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT p.id, p.name, COUNT(tp.id) AS visitCount
            FROM places p
            INNER JOIN trip_places tp ON tp.placeId = p.id
            WHERE tp.visited = 1
            GROUP BY p.id
            ORDER BY visitCount DESC
            "#,
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(TopVisitedPlace {
                    place_id: row.get(0)?,
                    name: row.get(1)?,
                    visit_count: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::places::NewPlace;
    use crate::db::trips::NewTrip;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    #[test]
    fn totals_cover_both_photo_tables() {
        let db = test_db();
        let p = db
            .insert_place(&NewPlace { name: "Lake".into(), ..NewPlace::default() })
            .unwrap();
        db.add_place_photo(p, "photos/a.jpg", None).unwrap();

        let t = db
            .insert_trip(&NewTrip {
                title: "T".into(),
                start_date: "2020-01-01".into(),
                end_date: "2020-01-05".into(),
                ..NewTrip::default()
            })
            .unwrap();
        let e = db.add_trip_place(t, p, None).unwrap();
        db.add_trip_place_photo(e, "photos/b.jpg", None).unwrap();

        let stats = db.get_stats().unwrap();
        assert_eq!(stats.trips_total, 1);
        assert_eq!(stats.places_total, 1);
        assert_eq!(stats.photos_total, 2);
        // Started in 2020: outside the rolling 12-month window.
        assert_eq!(stats.trips_last_year, 0);
    }

    #[test]
    fn top_visited_sorted_by_count() {
        let db = test_db();
        let a = db
            .insert_place(&NewPlace { name: "A".into(), ..NewPlace::default() })
            .unwrap();
        let b = db
            .insert_place(&NewPlace { name: "B".into(), ..NewPlace::default() })
            .unwrap();

        for start in ["2026-01-01", "2026-02-01"] {
            let t = db
                .insert_trip(&NewTrip {
                    title: format!("Trip {start}"),
                    start_date: start.into(),
                    end_date: start.into(),
                    ..NewTrip::default()
                })
                .unwrap();
            let e = db.add_trip_place(t, b, None).unwrap();
            db.mark_trip_place_visited(e, Some(start)).unwrap();
        }
        let t = db
            .insert_trip(&NewTrip {
                title: "Solo".into(),
                start_date: "2026-03-01".into(),
                end_date: "2026-03-02".into(),
                ..NewTrip::default()
            })
            .unwrap();
        let e = db.add_trip_place(t, a, None).unwrap();
        db.mark_trip_place_visited(e, None).unwrap();
        // Unvisited entries do not count.
        db.add_trip_place(t, b, None).unwrap();

        let top = db.get_top_visited_places().unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].name, "B");
        assert_eq!(top[0].visit_count, 2);
        assert_eq!(top[1].name, "A");
        assert_eq!(top[1].visit_count, 1);
    }
}
