use crate::db::{DbPool, ExecuteWithRetry};
use crate::models::Person;
use crate::schema::people;
use chrono::Utc;
use diesel::prelude::*;
use anyhow::Result;
use tracing::{instrument, debug, info};

/// Inserts a person
///
/// ### Arguments
///
/// * `pool` - A reference to the database connection pool
/// * `new_person` - The row to insert
///
/// ### Returns
///
/// A Result containing the inserted Person
///
/// ### Errors
///
/// Returns an error if:
/// - Unable to get a connection from the pool
/// - The database insert operation fails
#[instrument(skip(pool, new_person), fields(person_id = %new_person.id))]
pub async fn create_person(pool: &DbPool, new_person: Person) -> Result<Person> {
    debug!("Creating person");

    let mut conn = pool.get()?;

    diesel::insert_into(people::table)
        .values(new_person.clone())
        .execute_with_retry(&mut conn).await?;

    info!("Created person with id: {}", new_person.id);
    Ok(new_person)
}

/// Retrieves a person owned by `user_id`
#[instrument(skip(pool))]
pub fn get_person(pool: &DbPool, user_id: &str, person_id: &str) -> Result<Option<Person>> {
    debug!("Retrieving person by id");

    let conn = &mut pool.get()?;

    let result = people::table
        .filter(people::id.eq(person_id))
        .filter(people::user_id.eq(user_id))
        .select(Person::as_select())
        .first(conn)
        .optional()?;

    Ok(result)
}

/// Lists the people of a user ordered by name
#[instrument(skip(pool))]
pub fn list_people(pool: &DbPool, user_id: &str) -> Result<Vec<Person>> {
    let conn = &mut pool.get()?;

    let result = people::table
        .filter(people::user_id.eq(user_id))
        .order(people::name.asc())
        .select(Person::as_select())
        .load(conn)?;

    debug!("Retrieved {} people", result.len());
    Ok(result)
}

/// Writes every column of `updated` back to its row and bumps `updated_at`
///
/// ### Returns
///
/// A Result containing the saved row, or None if the person does not exist
/// for that user
#[instrument(skip(pool, updated), fields(person_id = %updated.id))]
pub async fn save_person(pool: &DbPool, mut updated: Person) -> Result<Option<Person>> {
    debug!("Saving person");

    updated.updated_at = Utc::now().naive_utc();

    let mut conn = pool.get()?;

    let rows = diesel::update(
        people::table
            .filter(people::id.eq(updated.id.clone()))
            .filter(people::user_id.eq(updated.user_id.clone())),
    )
    .set(&updated)
    .execute_with_retry(&mut conn).await?;

    if rows == 0 {
        return Ok(None);
    }

    info!("Saved person with id: {}", updated.id);
    Ok(Some(updated))
}

/// Deletes a person owned by `user_id`, returning whether a row was removed
#[instrument(skip(pool))]
pub async fn delete_person(pool: &DbPool, user_id: &str, person_id: &str) -> Result<bool> {
    let mut conn = pool.get()?;

    let rows = diesel::delete(
        people::table
            .filter(people::id.eq(person_id.to_string()))
            .filter(people::user_id.eq(user_id.to_string())),
    )
    .execute_with_retry(&mut conn).await?;

    if rows > 0 {
        info!("Deleted person with id: {}", person_id);
    }
    Ok(rows > 0)
}
