//! Session storage in SQLite

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};

use crate::models::Machine;
use crate::session::{PriceEntry, SessionSnapshot};

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Prices set by hand or written by the cost engine
        CREATE TABLE IF NOT EXISTS material_prices (
            position INTEGER NOT NULL,
            material_id TEXT PRIMARY KEY,
            price REAL NOT NULL,
            calculated INTEGER NOT NULL DEFAULT 0
        );

        -- Edited machine parameters, keyed by machine name
        CREATE TABLE IF NOT EXISTS machines (
            position INTEGER NOT NULL,
            name TEXT PRIMARY KEY,
            worth REAL NOT NULL,
            total_uses REAL NOT NULL
        );

        -- Loose key/value session settings (last selected recipe, ...)
        CREATE TABLE IF NOT EXISTS session_state (
            key TEXT PRIMARY KEY,
            value TEXT
        );
        "#,
    )?;
    Ok(())
}

/// Replace the stored session with `snapshot`
pub fn save_snapshot(conn: &mut Connection, snapshot: &SessionSnapshot) -> Result<()> {
    let tx = conn.transaction()?;
    clear_tables(&tx)?;

    {
        let mut stmt = tx.prepare(
            "INSERT INTO material_prices (position, material_id, price, calculated)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for (position, entry) in snapshot.prices.iter().enumerate() {
            let calculated = snapshot.evaluated.contains(&entry.material_id);
            stmt.execute((position as i64, &entry.material_id, entry.price, calculated))?;
        }

        let mut stmt = tx.prepare(
            "INSERT INTO machines (position, name, worth, total_uses)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for (position, machine) in snapshot.machines.iter().enumerate() {
            stmt.execute((position as i64, &machine.name, machine.worth, machine.total_uses))?;
        }

        if let Some(recipe_id) = &snapshot.last_selected {
            tx.execute(
                "INSERT INTO session_state (key, value) VALUES ('last_selected', ?1)",
                [recipe_id],
            )?;
        }
    }

    tx.commit().context("Failed to store session")?;
    Ok(())
}

/// Load the stored session; empty when nothing was saved yet
pub fn load_snapshot(conn: &Connection) -> Result<SessionSnapshot> {
    let mut snapshot = SessionSnapshot::default();

    let mut stmt = conn.prepare(
        "SELECT material_id, price, calculated FROM material_prices ORDER BY position",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            PriceEntry {
                material_id: row.get(0)?,
                price: row.get(1)?,
            },
            row.get::<_, bool>(2)?,
        ))
    })?;
    for row in rows {
        let (entry, calculated) = row?;
        if calculated {
            snapshot.evaluated.push(entry.material_id.clone());
        }
        snapshot.prices.push(entry);
    }

    let mut stmt = conn.prepare("SELECT name, worth, total_uses FROM machines ORDER BY position")?;
    let rows = stmt.query_map([], |row| {
        Ok(Machine {
            name: row.get(0)?,
            worth: row.get(1)?,
            total_uses: row.get(2)?,
        })
    })?;
    for row in rows {
        snapshot.machines.push(row?);
    }

    snapshot.last_selected = conn
        .query_row(
            "SELECT value FROM session_state WHERE key = 'last_selected'",
            [],
            |row| row.get(0),
        )
        .optional()?;

    Ok(snapshot)
}

/// Forget all stored session state
pub fn clear_session(conn: &Connection) -> Result<()> {
    clear_tables(conn)
}

fn clear_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM material_prices;
        DELETE FROM machines;
        DELETE FROM session_state;
        "#,
    )?;
    Ok(())
}
