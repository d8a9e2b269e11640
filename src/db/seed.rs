//! Fixture clients loaded into an empty store.

use chrono::{DateTime, TimeZone, Utc};
use tracing::debug;

use super::{ClientStore, StoreResult};
use crate::models::NewClient;

const FIXTURES: [(&str, &str, f64, (i32, u32, u32, u32, u32), i32); 12] = [
    ("Conceição Evaristo", "10619244881", 1500.0, (2020, 7, 13, 20, 50), 2),
    ("Lázaro Ramos", "10619244882", 2500.0, (1996, 12, 23, 7, 0), 2),
    ("Clarice Lispector", "10919444522", 3800.0, (1960, 4, 13, 7, 50), 2),
    ("Carolina Maria de Jesus", "10419244771", 7500.0, (1996, 12, 23, 7, 0), 0),
    ("Gilberto Gil", "10419344882", 2500.0, (1949, 5, 5, 7, 0), 4),
    ("Djamila Ribeiro", "10619244884", 4500.0, (1975, 11, 10, 7, 0), 1),
    ("Jose Saramago", "10239254871", 5000.0, (1922, 11, 16, 7, 0), 1),
    ("Toni Morrison", "10219344681", 10000.0, (1931, 2, 18, 7, 0), 0),
    ("Chimamanda Adichie", "10114274861", 1500.0, (1977, 9, 15, 7, 0), 2),
    ("Silvio Almeida", "10164334861", 4500.0, (1976, 8, 17, 7, 0), 2),
    ("Jorge Amado", "10204374161", 1500.0, (1912, 8, 10, 7, 0), 3),
    ("Machado de Assis", "10214374173", 6500.0, (1939, 6, 21, 7, 0), 0),
];

fn timestamp((year, month, day, hour, minute): (i32, u32, u32, u32, u32)) -> Option<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).single()
}

/// The fixture records, in insertion order. Inserted into an empty store
/// they receive ids 1 through 12.
pub fn fixture_clients() -> Vec<NewClient> {
    FIXTURES
        .iter()
        .map(|&(name, cpf, income, born, children)| NewClient {
            name: name.to_string(),
            cpf: cpf.to_string(),
            income,
            birth_date: timestamp(born),
            children,
        })
        .collect()
}

/// Insert the fixture when the store holds no clients. Returns how many
/// records were inserted.
pub async fn seed_if_empty(store: &dyn ClientStore) -> StoreResult<usize> {
    if store.count().await? > 0 {
        debug!("Store already populated, skipping fixtures");
        return Ok(0);
    }

    let fixtures = fixture_clients();
    let total = fixtures.len();
    for client in fixtures {
        store.insert(client).await?;
    }
    Ok(total)
}
